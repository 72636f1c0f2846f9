//! Error types for the solid-construction engine.
//!
//! Every failure is contained to the single (footprint, layer) build
//! it occurred in: kernel trouble mid-build degrades the layer to a
//! visibly flagged fallback instead of propagating outward. Only
//! precondition violations surface as `Err` from a build.

use thiserror::Error;

use stackcarve_core::error::ExprError;
use stackcarve_core::model::FootprintId;

/// Errors raised by the CSG kernel abstraction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    /// The kernel has not finished its one-time initialization.
    #[error("CSG kernel is not ready")]
    NotReady,

    /// A handle was used after disposal or was never created.
    #[error("Invalid kernel handle: {0}")]
    InvalidHandle(u64),

    /// The kernel rejected the requested geometry.
    #[error("Kernel geometry error: {0}")]
    Geometry(String),
}

/// Result type alias for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;

/// Precondition failures that refuse a layer build outright.
#[derive(Error, Debug)]
pub enum BuildError {
    /// Builds invoked before the kernel signals readiness are refused,
    /// never queued.
    #[error("CSG kernel is not ready")]
    KernelNotReady,

    /// The requested footprint id is not in the registry.
    #[error("Unknown footprint: {0}")]
    UnknownFootprint(FootprintId),

    /// The layer thickness expression could not be evaluated.
    #[error("Layer thickness expression failed: {0}")]
    Thickness(#[from] ExprError),

    /// Kernel failure while constructing the base volume.
    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),
}

/// Result type alias for build operations.
pub type BuildResult<T> = Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_error_display() {
        assert_eq!(KernelError::NotReady.to_string(), "CSG kernel is not ready");
        assert_eq!(
            KernelError::InvalidHandle(7).to_string(),
            "Invalid kernel handle: 7"
        );
    }

    #[test]
    fn test_kernel_error_conversion() {
        let err: BuildError = KernelError::Geometry("open shell".to_string()).into();
        assert!(matches!(err, BuildError::Kernel(_)));
    }
}
