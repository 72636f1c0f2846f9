//! Scoped disposal of kernel handles.
//!
//! Every handle created during one layer build is registered here at
//! creation time and released exactly once when the scope drops, on
//! every exit path. Release failures are best-effort by contract
//! (`dispose` never fails), so nothing can re-throw during unwinding.

use crate::kernel::{CsgKernel, Handle, SectionHandle, SolidHandle};

/// Per-build disposal list borrowing the kernel it tracks against.
pub struct HandleScope<'k> {
    kernel: &'k dyn CsgKernel,
    handles: Vec<Handle>,
}

impl<'k> HandleScope<'k> {
    pub fn new(kernel: &'k dyn CsgKernel) -> Self {
        Self {
            kernel,
            handles: Vec::new(),
        }
    }

    /// Registers a solid handle, passing it through.
    pub fn solid(&mut self, handle: SolidHandle) -> SolidHandle {
        self.handles.push(handle.into());
        handle
    }

    /// Registers a section handle, passing it through.
    pub fn section(&mut self, handle: SectionHandle) -> SectionHandle {
        self.handles.push(handle.into());
        handle
    }

    /// Number of handles tracked so far.
    pub fn tracked(&self) -> usize {
        self.handles.len()
    }
}

impl Drop for HandleScope<'_> {
    fn drop(&mut self) {
        for handle in self.handles.drain(..) {
            self.kernel.dispose(handle);
        }
    }
}
