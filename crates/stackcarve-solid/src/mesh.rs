//! Triangle mesh buffers exchanged with the kernel and the preview.
//!
//! The layout is the renderer/STL contract: flat `f32` positions
//! (x,y,z per vertex) and `u32` triangle indices.

use std::collections::HashMap;

/// Grid pitch used when welding nearby vertices.
pub const WELD_GRID: f64 = 1e-5;
/// Cross-product magnitude below which a triangle is culled.
pub const MIN_TRIANGLE_CROSS: f64 = 1e-12;

/// Indexed triangle mesh, positions in millimeters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBuffers {
    pub positions: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Appends a vertex, returning its index.
    pub fn push_vertex(&mut self, x: f64, y: f64, z: f64) -> u32 {
        let index = self.vertex_count() as u32;
        self.positions.push(x as f32);
        self.positions.push(y as f32);
        self.positions.push(z as f32);
        index
    }

    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.push(a);
        self.indices.push(b);
        self.indices.push(c);
    }

    pub fn vertex(&self, index: u32) -> [f64; 3] {
        let i = index as usize * 3;
        [
            self.positions[i] as f64,
            self.positions[i + 1] as f64,
            self.positions[i + 2] as f64,
        ]
    }

    /// Appends another mesh's triangles, reindexing its vertices.
    pub fn merge(&mut self, other: &MeshBuffers) {
        let base = self.vertex_count() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }

    pub fn translate(&mut self, dx: f64, dy: f64, dz: f64) {
        for chunk in self.positions.chunks_exact_mut(3) {
            chunk[0] += dx as f32;
            chunk[1] += dy as f32;
            chunk[2] += dz as f32;
        }
    }

    /// Welds vertices that quantize to the same [`WELD_GRID`] cell and
    /// remaps the triangle indices.
    pub fn weld(&mut self) {
        let mut keyed: HashMap<(i64, i64, i64), u32> = HashMap::new();
        let mut remap: Vec<u32> = Vec::with_capacity(self.vertex_count());
        let mut positions: Vec<f32> = Vec::new();

        for i in 0..self.vertex_count() {
            let [x, y, z] = self.vertex(i as u32);
            let key = (
                (x / WELD_GRID).round() as i64,
                (y / WELD_GRID).round() as i64,
                (z / WELD_GRID).round() as i64,
            );
            let next = (positions.len() / 3) as u32;
            let index = *keyed.entry(key).or_insert_with(|| {
                positions.push(x as f32);
                positions.push(y as f32);
                positions.push(z as f32);
                next
            });
            remap.push(index);
        }

        for index in &mut self.indices {
            *index = remap[*index as usize];
        }
        self.positions = positions;
    }

    /// Drops triangles referencing a repeated index or spanning
    /// near-zero area; protects the boolean kernel from degenerate
    /// input.
    pub fn cull_degenerate(&mut self) {
        let mut kept = Vec::with_capacity(self.indices.len());
        for tri in self.indices.chunks_exact(3) {
            let (a, b, c) = (tri[0], tri[1], tri[2]);
            if a == b || b == c || a == c {
                continue;
            }
            let va = self.vertex(a);
            let vb = self.vertex(b);
            let vc = self.vertex(c);
            let e1 = [vb[0] - va[0], vb[1] - va[1], vb[2] - va[2]];
            let e2 = [vc[0] - va[0], vc[1] - va[1], vc[2] - va[2]];
            let cross = [
                e1[1] * e2[2] - e1[2] * e2[1],
                e1[2] * e2[0] - e1[0] * e2[2],
                e1[0] * e2[1] - e1[1] * e2[0],
            ];
            let magnitude =
                (cross[0] * cross[0] + cross[1] * cross[1] + cross[2] * cross[2]).sqrt();
            if magnitude <= MIN_TRIANGLE_CROSS {
                continue;
            }
            kept.extend_from_slice(tri);
        }
        self.indices = kept;
    }

    /// Signed volume of the mesh by the divergence theorem; positive
    /// for outward-facing windings.
    pub fn signed_volume(&self) -> f64 {
        let mut volume = 0.0;
        for tri in self.indices.chunks_exact(3) {
            let a = self.vertex(tri[0]);
            let b = self.vertex(tri[1]);
            let c = self.vertex(tri[2]);
            volume += a[0] * (b[1] * c[2] - b[2] * c[1])
                - a[1] * (b[0] * c[2] - b[2] * c[0])
                + a[2] * (b[0] * c[1] - b[1] * c[0]);
        }
        volume / 6.0
    }

    /// Enclosed volume, orientation-independent.
    pub fn volume(&self) -> f64 {
        self.signed_volume().abs()
    }

    /// Total triangle area; spurious interior walls show up here even
    /// when their enclosed volume is negligible.
    pub fn surface_area(&self) -> f64 {
        let mut area = 0.0;
        for tri in self.indices.chunks_exact(3) {
            let a = self.vertex(tri[0]);
            let b = self.vertex(tri[1]);
            let c = self.vertex(tri[2]);
            let e1 = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
            let e2 = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
            let cross = [
                e1[1] * e2[2] - e1[2] * e2[1],
                e1[2] * e2[0] - e1[0] * e2[2],
                e1[0] * e2[1] - e1[1] * e2[0],
            ];
            area += (cross[0] * cross[0] + cross[1] * cross[1] + cross[2] * cross[2]).sqrt();
        }
        area / 2.0
    }

    /// Rotates -90° about X and recenters the bounding box on the
    /// origin: the shared preview frame for standalone boards.
    pub fn orient_for_preview(&mut self) {
        for chunk in self.positions.chunks_exact_mut(3) {
            let y = chunk[1];
            let z = chunk[2];
            chunk[1] = z;
            chunk[2] = -y;
        }
        if self.positions.is_empty() {
            return;
        }
        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];
        for chunk in self.positions.chunks_exact(3) {
            for axis in 0..3 {
                min[axis] = min[axis].min(chunk[axis]);
                max[axis] = max[axis].max(chunk[axis]);
            }
        }
        let center = [
            (min[0] + max[0]) / 2.0,
            (min[1] + max[1]) / 2.0,
            (min[2] + max[2]) / 2.0,
        ];
        for chunk in self.positions.chunks_exact_mut(3) {
            chunk[0] -= center[0];
            chunk[1] -= center[1];
            chunk[2] -= center[2];
        }
    }
}
