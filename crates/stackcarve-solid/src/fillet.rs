//! Procedural fillet meshes for pocket floors.
//!
//! A fillet is built as a stack of resampled offset contours swept
//! along a quarter-circle profile, skinned into a closed triangle
//! mesh, and handed to the boolean kernel. The contour library keeps
//! the vertex count identical across offsets; that invariant is
//! checked per layer and any mismatch aborts the whole fillet rather
//! than emitting a partially built mesh.

use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::config::BuildConfig;
use crate::contour::{governing_dimension, offset_contour, signed_area};
use crate::flatten::FlatGeometry;
use crate::kernel::{CsgKernel, SolidHandle, SolidStatus};
use crate::mesh::MeshBuffers;
use crate::tracker::HandleScope;

use stackcarve_core::model::Point;

/// Fillets smaller than this are geometrically meaningless.
const MIN_FILLET_RADIUS: f64 = 0.001;
/// Angular resolution of the quarter-circle profile.
const PROFILE_STEPS: usize = 8;
/// Squared distance under which a bottom layer counts as collapsed.
const COLLAPSE_DIST_SQ: f64 = 1e-6;

/// Why no fillet was produced for a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilletSkip {
    /// Base profile has fewer than 3 vertices.
    ProfileTooSmall,
    /// Safe radius collapsed below the minimum.
    RadiusTooSmall,
    /// The shape kind cannot be resampled at an inward offset.
    UnsupportedGeometry,
    /// A resampled layer changed vertex count.
    TopologyMismatch,
}

/// Outcome of a fillet build attempt.
///
/// `Skipped` and `Fallback` are distinct on purpose: a skip leaves
/// the pocket unfilleted and is not an error, while a fallback means
/// the kernel rejected a mesh we built and the raw triangles must be
/// surfaced as errored output.
#[derive(Debug)]
pub enum FilletBuild {
    Skipped(FilletSkip),
    Solid(SolidHandle),
    Fallback(MeshBuffers),
}

#[derive(Debug, Clone, Copy)]
struct ZLayer {
    z: f64,
    offset: f64,
}

/// Builds the fillet triangle mesh in a local frame where `z = 0` is
/// the pocket opening and the floor sits at `z = -pocket_depth`.
///
/// With `invert` set the mesh is mirrored through z = 0 for pockets
/// carved from the underside.
pub fn fillet_mesh(
    geometry: &FlatGeometry,
    pocket_depth: f64,
    requested_radius: f64,
    invert: bool,
    config: &BuildConfig,
) -> Result<MeshBuffers, FilletSkip> {
    let governing = governing_dimension(geometry).ok_or(FilletSkip::UnsupportedGeometry)?;
    let base = offset_contour(geometry, 0.0, config).ok_or(FilletSkip::UnsupportedGeometry)?;
    if base.len() < 3 {
        return Err(FilletSkip::ProfileTooSmall);
    }

    let safe_radius = safe_fillet_radius(requested_radius, governing, pocket_depth);
    if safe_radius <= MIN_FILLET_RADIUS {
        return Err(FilletSkip::RadiusTooSmall);
    }

    let layers = profile_layers(pocket_depth, safe_radius, governing);

    let mut rings: Vec<Vec<Point>> = Vec::with_capacity(layers.len());
    for layer in &layers {
        let ring = offset_contour(geometry, layer.offset, config)
            .ok_or(FilletSkip::UnsupportedGeometry)?;
        if ring.len() != base.len() {
            warn!(
                base = base.len(),
                layer = ring.len(),
                offset = layer.offset,
                "fillet layer changed vertex count; aborting fillet"
            );
            return Err(FilletSkip::TopologyMismatch);
        }
        rings.push(ring);
    }

    let mut mesh = skin_layers(&layers, &rings);
    if invert {
        mirror_z(&mut mesh);
    }
    mesh.weld();
    mesh.cull_degenerate();
    debug!(
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        safe_radius,
        "fillet mesh built"
    );
    Ok(mesh)
}

/// Builds the fillet mesh and constructs a kernel solid from it.
///
/// The solid handle is registered with `scope` so it is disposed with
/// the rest of the layer build.
pub fn build_fillet(
    kernel: &dyn CsgKernel,
    scope: &mut HandleScope<'_>,
    geometry: &FlatGeometry,
    pocket_depth: f64,
    requested_radius: f64,
    invert: bool,
    config: &BuildConfig,
) -> FilletBuild {
    let mesh = match fillet_mesh(geometry, pocket_depth, requested_radius, invert, config) {
        Ok(mesh) => mesh,
        Err(skip) => return FilletBuild::Skipped(skip),
    };

    match kernel.solid_from_triangles(&mesh) {
        Ok(handle) => {
            let handle = scope.solid(handle);
            match kernel.status(handle) {
                Ok(SolidStatus::Ok) => FilletBuild::Solid(handle),
                Ok(SolidStatus::Empty) | Err(_) => {
                    warn!("kernel rejected fillet mesh; surfacing raw buffers");
                    FilletBuild::Fallback(mesh)
                }
            }
        }
        Err(err) => {
            warn!(%err, "fillet solid construction failed; surfacing raw buffers");
            FilletBuild::Fallback(mesh)
        }
    }
}

/// Largest fillet radius the pocket can carry: the request clamped by
/// half the governing dimension (with margin) and by the pocket depth.
///
/// The builder uses the same clamp when sizing the restore plug, so
/// the restored floor height always matches the radius actually swept.
pub(crate) fn safe_fillet_radius(requested: f64, governing: f64, pocket_depth: f64) -> f64 {
    requested.min(governing / 2.0 - 0.01).min(pocket_depth).max(0.0)
}

fn profile_layers(pocket_depth: f64, safe_radius: f64, governing: f64) -> SmallVec<[ZLayer; 12]> {
    let mut layers: SmallVec<[ZLayer; 12]> = SmallVec::new();
    layers.push(ZLayer { z: 0.0, offset: 0.0 });

    let wall_z = -(pocket_depth - safe_radius);
    if safe_radius < pocket_depth {
        layers.push(ZLayer {
            z: wall_z,
            offset: 0.0,
        });
    }
    for step in 1..=PROFILE_STEPS {
        let theta = std::f64::consts::FRAC_PI_2 * step as f64 / PROFILE_STEPS as f64;
        let offset = ((1.0 - theta.cos()) * safe_radius).min(governing / 2.0 - 0.001);
        layers.push(ZLayer {
            z: wall_z - theta.sin() * safe_radius,
            offset,
        });
    }
    layers
}

fn skin_layers(layers: &[ZLayer], rings: &[Vec<Point>]) -> MeshBuffers {
    let ring_len = rings[0].len();
    let mut mesh = MeshBuffers::new();
    for (layer, ring) in layers.iter().zip(rings) {
        for p in ring {
            mesh.push_vertex(p.x, p.y, layer.z);
        }
    }

    // Top cap, outward +z.
    for [a, b, c] in ear_clip(&rings[0]) {
        mesh.push_triangle(a as u32, b as u32, c as u32);
    }

    // Ruled skins, outward-facing for a CCW top profile.
    for level in 0..rings.len() - 1 {
        let upper = (level * ring_len) as u32;
        let lower = ((level + 1) * ring_len) as u32;
        for k in 0..ring_len as u32 {
            let next = (k + 1) % ring_len as u32;
            mesh.push_triangle(upper + k, lower + k, lower + next);
            mesh.push_triangle(upper + k, lower + next, upper + next);
        }
    }

    // Bottom cap, reversed, unless the last ring collapsed to a point.
    let last = rings.len() - 1;
    if !ring_collapsed(&rings[last]) {
        let base = (last * ring_len) as u32;
        for [a, b, c] in ear_clip(&rings[last]) {
            mesh.push_triangle(base + a as u32, base + c as u32, base + b as u32);
        }
    }
    mesh
}

fn ring_collapsed(ring: &[Point]) -> bool {
    let first = ring[0];
    ring.iter().all(|p| p.distance_sq(&first) < COLLAPSE_DIST_SQ)
}

fn mirror_z(mesh: &mut MeshBuffers) {
    for chunk in mesh.positions.chunks_exact_mut(3) {
        chunk[2] = -chunk[2];
    }
    for tri in mesh.indices.chunks_exact_mut(3) {
        tri.swap(1, 2);
    }
}

/// Ear-clipping triangulation of a simple CCW polygon. Falls back to
/// a fan when no ear can be found (near-degenerate input).
fn ear_clip(polygon: &[Point]) -> Vec<[usize; 3]> {
    let n = polygon.len();
    let mut triangles = Vec::with_capacity(n.saturating_sub(2));
    let mut remaining: Vec<usize> = (0..n).collect();

    while remaining.len() > 3 {
        let mut clipped = false;
        for i in 0..remaining.len() {
            let prev = remaining[(i + remaining.len() - 1) % remaining.len()];
            let curr = remaining[i];
            let next = remaining[(i + 1) % remaining.len()];
            if is_ear(polygon, &remaining, prev, curr, next) {
                triangles.push([prev, curr, next]);
                remaining.remove(i);
                clipped = true;
                break;
            }
        }
        if !clipped {
            // Degenerate remainder; finish with a fan.
            let anchor = remaining[0];
            for pair in remaining[1..].windows(2) {
                triangles.push([anchor, pair[0], pair[1]]);
            }
            return triangles;
        }
    }
    if remaining.len() == 3 {
        triangles.push([remaining[0], remaining[1], remaining[2]]);
    }
    triangles
}

fn is_ear(polygon: &[Point], remaining: &[usize], prev: usize, curr: usize, next: usize) -> bool {
    let a = polygon[prev];
    let b = polygon[curr];
    let c = polygon[next];
    // Convex corner of a CCW polygon.
    if signed_area(&[a, b, c]) <= 0.0 {
        return false;
    }
    for &other in remaining {
        if other == prev || other == curr || other == next {
            continue;
        }
        if point_in_triangle(polygon[other], a, b, c) {
            return false;
        }
    }
    true
}

fn point_in_triangle(p: Point, a: Point, b: Point, c: Point) -> bool {
    let d1 = signed_area(&[p, a, b]);
    let d2 = signed_area(&[p, b, c]);
    let d3 = signed_area(&[p, c, a]);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::CsgrsKernel;

    fn config() -> BuildConfig {
        BuildConfig::default()
    }

    fn circle(diameter: f64) -> FlatGeometry {
        FlatGeometry::Circle {
            center: Point::new(0.0, 0.0),
            diameter,
        }
    }

    fn rect(width: f64, height: f64, corner_radius: f64) -> FlatGeometry {
        FlatGeometry::RoundedRect {
            center: Point::new(0.0, 0.0),
            width,
            height,
            corner_radius,
            rotation_deg: 0.0,
        }
    }

    #[test]
    fn test_safe_radius_clamps_by_every_bound() {
        // Request within bounds passes through.
        assert!((safe_fillet_radius(0.5, 8.0, 2.0) - 0.5).abs() < 1e-12);
        // Half the governing dimension, less margin.
        assert!((safe_fillet_radius(50.0, 8.0, 10.0) - 3.99).abs() < 1e-12);
        // Never deeper than the pocket.
        assert!((safe_fillet_radius(3.0, 8.0, 1.5) - 1.5).abs() < 1e-12);
        // Tiny geometry floors at zero instead of going negative.
        assert_eq!(safe_fillet_radius(1.0, 0.01, 2.0), 0.0);
    }

    #[test]
    fn test_ear_clip_convex_polygon() {
        let square = [
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
        ];
        let triangles = ear_clip(&square);
        assert_eq!(triangles.len(), 2);
        let area: f64 = triangles
            .iter()
            .map(|[a, b, c]| signed_area(&[square[*a], square[*b], square[*c]]))
            .sum();
        assert!((area - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_ear_clip_concave_polygon() {
        let arrow = [
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 4.0),
            Point::new(2.0, 1.0),
            Point::new(0.0, 4.0),
        ];
        let triangles = ear_clip(&arrow);
        assert_eq!(triangles.len(), 3);
        let area: f64 = triangles
            .iter()
            .map(|[a, b, c]| signed_area(&[arrow[*a], arrow[*b], arrow[*c]]))
            .sum();
        assert!((area - signed_area(&arrow)).abs() < 1e-9);
    }

    #[test]
    fn test_fillet_mesh_is_watertight_for_circle() {
        let mesh = fillet_mesh(&circle(6.0), 2.0, 0.5, false, &config()).unwrap();
        assert!(!mesh.is_empty());
        // A closed mesh of the pocket negative: volume below the
        // straight-walled cylinder of the same depth.
        let cylinder = std::f64::consts::PI * 3.0 * 3.0 * 2.0;
        assert!(mesh.volume() > 0.0);
        assert!(mesh.volume() < cylinder);
    }

    #[test]
    fn test_radius_too_small_is_skipped() {
        assert_eq!(
            fillet_mesh(&circle(6.0), 2.0, 0.0, false, &config()),
            Err(FilletSkip::RadiusTooSmall)
        );
    }

    #[test]
    fn test_tiny_geometry_rejects_radius() {
        // governing/2 - 0.01 goes negative for a 0.01 mm circle.
        assert_eq!(
            fillet_mesh(&circle(0.01), 2.0, 1.0, false, &config()),
            Err(FilletSkip::RadiusTooSmall)
        );
    }

    #[test]
    fn test_polygon_geometry_unsupported() {
        let polygon = FlatGeometry::Polygon {
            points: vec![
                Point::new(0.0, 0.0),
                Point::new(4.0, 0.0),
                Point::new(4.0, 3.0),
            ],
        };
        assert_eq!(
            fillet_mesh(&polygon, 1.0, 0.5, false, &config()),
            Err(FilletSkip::UnsupportedGeometry)
        );
    }

    #[test]
    fn test_rect_layers_keep_vertex_count() {
        // Rounded corners survive every resample offset, so the
        // fillet builds.
        let mesh = fillet_mesh(&rect(10.0, 6.0, 1.0), 1.0, 0.5, false, &config()).unwrap();
        assert!(mesh.volume() > 0.0);
    }

    #[test]
    fn test_rect_topology_mismatch_aborts() {
        // The deepest layer offsets past the 0.3 mm corner radius and
        // the arcs collapse to plain corners.
        assert_eq!(
            fillet_mesh(&rect(10.0, 6.0, 0.3), 1.0, 1.0, false, &config()),
            Err(FilletSkip::TopologyMismatch)
        );
    }

    #[test]
    fn test_inverted_mesh_mirrors_volume() {
        let down = fillet_mesh(&circle(6.0), 2.0, 0.5, false, &config()).unwrap();
        let up = fillet_mesh(&circle(6.0), 2.0, 0.5, true, &config()).unwrap();
        assert!((down.volume() - up.volume()).abs() < 1e-6);
        assert!(down.signed_volume() > 0.0);
        assert!(up.signed_volume() > 0.0);
    }

    #[test]
    fn test_build_fillet_returns_tracked_solid() {
        let kernel = CsgrsKernel::ready();
        let mut scope = HandleScope::new(&kernel);
        let built = build_fillet(&kernel, &mut scope, &circle(6.0), 2.0, 0.5, false, &config());
        match built {
            FilletBuild::Solid(handle) => {
                let mesh = kernel.to_mesh(handle).unwrap();
                assert!(mesh.volume() > 0.0);
            }
            other => panic!("expected solid, got {:?}", other),
        }
        assert_eq!(scope.tracked(), 1);
    }
}
