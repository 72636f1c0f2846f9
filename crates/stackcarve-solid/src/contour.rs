//! Inward-offset 2D contours.
//!
//! Shared by the fillet generator (which resamples one shape at many
//! offsets) and by the tool-solid builder (offset zero). Offsetting
//! is analytic per shape kind rather than a generic polygon offset:
//! that keeps the vertex count identical across offsets, which the
//! fillet generator's ruled skins depend on.

use stackcarve_core::model::{rotate_point, Point};

use crate::config::BuildConfig;
use crate::flatten::FlatGeometry;

/// Squared distance below which consecutive contour points collapse.
const DEDUP_DIST_SQ: f64 = 1e-9;
/// Dimensions shrink to this floor instead of inverting.
const MIN_DIMENSION: f64 = 0.001;

/// Inward-offset outline of a flattened shape, counter-clockwise.
///
/// Returns `None` for shape kinds that cannot be offset (polygons and
/// board outlines at a non-zero offset). Pure: identical inputs give
/// identical output.
pub fn offset_contour(
    geometry: &FlatGeometry,
    offset: f64,
    config: &BuildConfig,
) -> Option<Vec<Point>> {
    let raw = match geometry {
        FlatGeometry::Circle { center, diameter } => {
            circle_contour(*center, *diameter, offset, config.circle_segments)
        }
        FlatGeometry::RoundedRect {
            center,
            width,
            height,
            corner_radius,
            rotation_deg,
        } => rect_contour(
            *center,
            *width,
            *height,
            *corner_radius,
            *rotation_deg,
            offset,
            config.corner_segments,
        ),
        FlatGeometry::Capsule { spine, thickness } => {
            capsule_contour(spine, *thickness, offset, config.cap_segments)?
        }
        FlatGeometry::Polygon { points } | FlatGeometry::BoardOutline { points } => {
            if offset != 0.0 {
                return None;
            }
            points.clone()
        }
    };
    Some(postprocess(raw))
}

/// The dimension that bounds how far a shape can be offset inward:
/// the diameter of a circle, the smaller side of a rectangle, the
/// stroke thickness of a capsule. `None` for free-form outlines.
pub fn governing_dimension(geometry: &FlatGeometry) -> Option<f64> {
    match geometry {
        FlatGeometry::Circle { diameter, .. } => Some(*diameter),
        FlatGeometry::RoundedRect { width, height, .. } => Some(width.min(*height)),
        FlatGeometry::Capsule { thickness, .. } => Some(*thickness),
        FlatGeometry::Polygon { .. } | FlatGeometry::BoardOutline { .. } => None,
    }
}

/// Axis-aligned bounds of a point list.
pub fn bounds(points: &[Point]) -> Option<(Point, Point)> {
    let first = points.first()?;
    let mut min = *first;
    let mut max = *first;
    for p in &points[1..] {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    Some((min, max))
}

/// Twice-signed area by the shoelace formula; positive for CCW.
pub fn signed_area(points: &[Point]) -> f64 {
    let mut doubled = 0.0;
    for (i, a) in points.iter().enumerate() {
        let b = &points[(i + 1) % points.len()];
        doubled += a.x * b.y - b.x * a.y;
    }
    doubled / 2.0
}

fn circle_contour(center: Point, diameter: f64, offset: f64, segments: usize) -> Vec<Point> {
    let radius = (diameter / 2.0 - offset).max(MIN_DIMENSION);
    (0..segments)
        .map(|i| {
            let angle = i as f64 / segments as f64 * std::f64::consts::TAU;
            Point::new(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            )
        })
        .collect()
}

fn rect_contour(
    center: Point,
    width: f64,
    height: f64,
    corner_radius: f64,
    rotation_deg: f64,
    offset: f64,
    corner_segments: usize,
) -> Vec<Point> {
    let w = (width - 2.0 * offset).max(MIN_DIMENSION);
    let h = (height - 2.0 * offset).max(MIN_DIMENSION);
    let radius = (corner_radius - offset).clamp(0.0, w.min(h) / 2.0);

    let local = if radius < MIN_DIMENSION {
        vec![
            Point::new(w / 2.0, -h / 2.0),
            Point::new(w / 2.0, h / 2.0),
            Point::new(-w / 2.0, h / 2.0),
            Point::new(-w / 2.0, -h / 2.0),
        ]
    } else {
        // Quarter arcs CCW starting from the +x/-y corner.
        let cx = w / 2.0 - radius;
        let cy = h / 2.0 - radius;
        let corners = [
            (Point::new(cx, -cy), -90.0_f64),
            (Point::new(cx, cy), 0.0),
            (Point::new(-cx, cy), 90.0),
            (Point::new(-cx, -cy), 180.0),
        ];
        let mut points = Vec::with_capacity(4 * (corner_segments + 1));
        for (arc_center, start_deg) in corners {
            for step in 0..=corner_segments {
                let angle =
                    (start_deg + 90.0 * step as f64 / corner_segments as f64).to_radians();
                points.push(Point::new(
                    arc_center.x + radius * angle.cos(),
                    arc_center.y + radius * angle.sin(),
                ));
            }
        }
        points
    };

    local
        .into_iter()
        .map(|p| {
            let world = Point::new(p.x + center.x, p.y + center.y);
            rotate_point(world, center, rotation_deg)
        })
        .collect()
}

fn capsule_contour(
    spine: &[Point],
    thickness: f64,
    offset: f64,
    cap_segments: usize,
) -> Option<Vec<Point>> {
    if spine.len() < 2 {
        return None;
    }
    let half = (thickness - 2.0 * offset).max(MIN_DIMENSION) / 2.0;

    // Left-of-travel unit normals, averaged at interior joints.
    let mut normals = Vec::with_capacity(spine.len());
    for i in 0..spine.len() {
        let before = segment_normal(spine, i.saturating_sub(1));
        let after = segment_normal(spine, i.min(spine.len() - 2));
        let avg = (
            (before.0 + after.0) / 2.0,
            (before.1 + after.1) / 2.0,
        );
        let length = (avg.0 * avg.0 + avg.1 * avg.1).sqrt();
        if length < 1e-12 {
            normals.push(after);
        } else {
            normals.push((avg.0 / length, avg.1 / length));
        }
    }

    let mut points = Vec::new();
    // Left side, start to end.
    for (p, n) in spine.iter().zip(&normals) {
        points.push(Point::new(p.x + n.0 * half, p.y + n.1 * half));
    }
    // Semicircular cap around the last point, left normal to right.
    let end = spine[spine.len() - 1];
    let end_n = normals[spine.len() - 1];
    for step in 1..cap_segments {
        let angle = std::f64::consts::PI * step as f64 / cap_segments as f64;
        let (x, y) = rotate_vec(end_n, -angle);
        points.push(Point::new(end.x + x * half, end.y + y * half));
    }
    // Right side, end to start.
    for (p, n) in spine.iter().zip(&normals).rev() {
        points.push(Point::new(p.x - n.0 * half, p.y - n.1 * half));
    }
    // Cap around the first point, closing back to the left side.
    let start = spine[0];
    let start_n = normals[0];
    for step in 1..cap_segments {
        let angle = std::f64::consts::PI * step as f64 / cap_segments as f64;
        let (x, y) = rotate_vec((-start_n.0, -start_n.1), -angle);
        points.push(Point::new(start.x + x * half, start.y + y * half));
    }
    Some(points)
}

fn segment_normal(spine: &[Point], segment: usize) -> (f64, f64) {
    let a = spine[segment];
    let b = spine[segment + 1];
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length = (dx * dx + dy * dy).sqrt();
    if length < 1e-12 {
        (0.0, 1.0)
    } else {
        (-dy / length, dx / length)
    }
}

fn rotate_vec(v: (f64, f64), angle: f64) -> (f64, f64) {
    let (sin, cos) = angle.sin_cos();
    (v.0 * cos - v.1 * sin, v.0 * sin + v.1 * cos)
}

/// Degenerate dedup, seam removal, CCW enforcement.
fn postprocess(mut points: Vec<Point>) -> Vec<Point> {
    points.dedup_by(|b, a| a.distance_sq(b) < DEDUP_DIST_SQ);
    while points.len() > 1
        && points[0].distance_sq(&points[points.len() - 1]) < DEDUP_DIST_SQ
    {
        points.pop();
    }
    if signed_area(&points) < 0.0 {
        points.reverse();
    }
    points
}
