//! The boolean-CSG kernel contract.
//!
//! The engine never manipulates solids directly; it drives an
//! external kernel through this trait using opaque handles, and the
//! [`HandleScope`](crate::tracker::HandleScope) guarantees every
//! handle created during one layer build is disposed exactly once.
//! The default backend wraps `csgrs` ([`CsgrsKernel`]).

mod csgrs_backend;

pub use csgrs_backend::CsgrsKernel;

use crate::error::KernelResult;
use crate::mesh::MeshBuffers;

/// Opaque id of a 3D solid owned by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SolidHandle(pub(crate) u64);

/// Opaque id of a 2D cross-section owned by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectionHandle(pub(crate) u64);

/// Any disposable kernel resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    Solid(SolidHandle),
    Section(SectionHandle),
}

impl From<SolidHandle> for Handle {
    fn from(handle: SolidHandle) -> Self {
        Handle::Solid(handle)
    }
}

impl From<SectionHandle> for Handle {
    fn from(handle: SectionHandle) -> Self {
        Handle::Section(handle)
    }
}

/// Validity code reported for a built solid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolidStatus {
    /// Clean, usable solid.
    Ok,
    /// The solid carries no geometry.
    Empty,
}

/// Operations the solid builder requires from a boolean-CSG kernel.
///
/// All dimensions are millimeters, rotations degrees. Every method
/// that returns a handle transfers ownership of that handle to the
/// caller, who must eventually `dispose` it.
pub trait CsgKernel: Send + Sync {
    /// Whether the kernel's one-time initialization has completed.
    /// Builds must be refused while this is false.
    fn is_ready(&self) -> bool;

    /// Axis-aligned box; corner at the origin, or centered.
    fn make_box(&self, width: f64, height: f64, depth: f64, centered: bool)
        -> KernelResult<SolidHandle>;

    /// Z-aligned straight cylinder; base at z=0, or centered.
    ///
    /// The contract is deliberately narrower than a general frustum:
    /// every tool the builder cuts has a constant radius, so a single
    /// radius is carried instead of a top/bottom pair. Tapered tools
    /// would widen this signature rather than add a second method.
    fn make_cylinder(
        &self,
        height: f64,
        radius: f64,
        segments: usize,
        centered: bool,
    ) -> KernelResult<SolidHandle>;

    /// 2D cross-section from one or more closed CCW contours.
    fn cross_section(&self, contours: &[Vec<[f64; 2]>]) -> KernelResult<SectionHandle>;

    /// Extrudes a cross-section along +Z.
    fn extrude(&self, section: SectionHandle, height: f64) -> KernelResult<SolidHandle>;

    /// Rotated copy, per-axis degrees applied X then Y then Z.
    fn rotate(&self, solid: SolidHandle, degrees: [f64; 3]) -> KernelResult<SolidHandle>;

    /// Translated copy.
    fn translate(&self, solid: SolidHandle, offset: [f64; 3]) -> KernelResult<SolidHandle>;

    fn union(&self, a: SolidHandle, b: SolidHandle) -> KernelResult<SolidHandle>;

    fn difference(&self, a: SolidHandle, b: SolidHandle) -> KernelResult<SolidHandle>;

    /// Builds a solid from raw triangle buffers (the fillet path).
    fn solid_from_triangles(&self, mesh: &MeshBuffers) -> KernelResult<SolidHandle>;

    fn status(&self, solid: SolidHandle) -> KernelResult<SolidStatus>;

    /// Extracts the solid's triangle mesh.
    fn to_mesh(&self, solid: SolidHandle) -> KernelResult<MeshBuffers>;

    /// Releases a handle. Unknown or already-disposed handles are
    /// ignored; disposal never fails.
    fn dispose(&self, handle: Handle);

    /// Total dispose calls observed, for resource-balance checks.
    fn dispose_calls(&self) -> usize;
}
