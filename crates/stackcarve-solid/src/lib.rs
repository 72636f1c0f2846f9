//! Layered solid construction for multi-layer fabricated boards.
//!
//! This crate turns the 2D design model of `stackcarve-core` into
//! per-layer 3D solids: footprints are flattened into world-space
//! shapes, each stackup layer gets a base volume, and every assigned
//! shape cuts, restores, and optionally fillets its pocket through a
//! boolean-CSG kernel. Outputs are plain triangle buffers for the
//! preview renderer and the STL exporter.
//!
//! The kernel is abstracted behind [`kernel::CsgKernel`]; the default
//! backend wraps `csgrs`. Every kernel handle created during a build
//! is disposed through a [`tracker::HandleScope`], and concurrent
//! rebuilds are serialized per result slot by [`gate::BuildGate`].

pub mod builder;
pub mod config;
pub mod contour;
pub mod error;
pub mod export;
pub mod fillet;
pub mod flatten;
pub mod gate;
pub mod kernel;
pub mod mesh;
pub mod tracker;

pub use builder::{LayerBuildOutput, LayerSolidBuilder};
pub use config::BuildConfig;
pub use error::{BuildError, BuildResult, KernelError, KernelResult};
pub use fillet::{FilletBuild, FilletSkip};
pub use flatten::{flatten_footprint, FlatGeometry, FlatShape, Transform2D};
pub use gate::{BuildGate, BuildTicket};
pub use kernel::{CsgKernel, CsgrsKernel, Handle, SectionHandle, SolidHandle, SolidStatus};
pub use mesh::MeshBuffers;
pub use tracker::HandleScope;
