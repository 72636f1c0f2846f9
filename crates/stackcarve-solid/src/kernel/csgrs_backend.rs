//! Default kernel backend over `csgrs`.
//!
//! Handles index into a mutex-guarded table of owned `csgrs` values,
//! which models the manual-lifetime contract the builder is written
//! against: creation hands out an id, `dispose` drops the value.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use csgrs::mesh::polygon::Polygon;
use csgrs::mesh::vertex::Vertex;
use csgrs::mesh::Mesh;
use csgrs::sketch::Sketch;
use csgrs::traits::CSG;
use nalgebra::{Matrix4, Point3, Vector3};
use parking_lot::Mutex;
use tracing::debug;

use super::{CsgKernel, Handle, SectionHandle, SolidHandle, SolidStatus};
use crate::error::{KernelError, KernelResult};
use crate::mesh::MeshBuffers;

#[derive(Default)]
struct Tables {
    solids: HashMap<u64, Mesh<()>>,
    sections: HashMap<u64, Sketch<()>>,
}

/// `csgrs`-backed implementation of [`CsgKernel`].
pub struct CsgrsKernel {
    tables: Mutex<Tables>,
    next_id: AtomicU64,
    ready: AtomicBool,
    created: AtomicUsize,
    disposed: AtomicUsize,
}

impl CsgrsKernel {
    /// Creates an uninitialized kernel; builds are refused until
    /// [`initialize`](Self::initialize) is called.
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            next_id: AtomicU64::new(1),
            ready: AtomicBool::new(false),
            created: AtomicUsize::new(0),
            disposed: AtomicUsize::new(0),
        }
    }

    /// Creates a kernel that is ready immediately.
    pub fn ready() -> Self {
        let kernel = Self::new();
        kernel.initialize();
        kernel
    }

    /// Completes the one-time engine load.
    pub fn initialize(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    /// Handles currently alive, for leak checks in tests.
    pub fn live_handles(&self) -> usize {
        let tables = self.tables.lock();
        tables.solids.len() + tables.sections.len()
    }

    /// Total handles ever created.
    pub fn created_calls(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    fn insert_solid(&self, mesh: Mesh<()>) -> SolidHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.tables.lock().solids.insert(id, mesh);
        self.created.fetch_add(1, Ordering::SeqCst);
        SolidHandle(id)
    }

    fn insert_section(&self, sketch: Sketch<()>) -> SectionHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.tables.lock().sections.insert(id, sketch);
        self.created.fetch_add(1, Ordering::SeqCst);
        SectionHandle(id)
    }

    fn solid(&self, handle: SolidHandle) -> KernelResult<Mesh<()>> {
        self.tables
            .lock()
            .solids
            .get(&handle.0)
            .cloned()
            .ok_or(KernelError::InvalidHandle(handle.0))
    }

    fn section(&self, handle: SectionHandle) -> KernelResult<Sketch<()>> {
        self.tables
            .lock()
            .sections
            .get(&handle.0)
            .cloned()
            .ok_or(KernelError::InvalidHandle(handle.0))
    }

    fn check_ready(&self) -> KernelResult<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(KernelError::NotReady)
        }
    }
}

impl Default for CsgrsKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl CsgKernel for CsgrsKernel {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn make_box(
        &self,
        width: f64,
        height: f64,
        depth: f64,
        centered: bool,
    ) -> KernelResult<SolidHandle> {
        self.check_ready()?;
        if width <= 0.0 || height <= 0.0 || depth <= 0.0 {
            return Err(KernelError::Geometry(format!(
                "non-positive box dimensions {}x{}x{}",
                width, height, depth
            )));
        }
        let ring = [
            [0.0, 0.0],
            [width, 0.0],
            [width, height],
            [0.0, height],
        ];
        let mut mesh = Sketch::polygon(&ring, None).extrude(depth);
        if centered {
            let shift = Vector3::new(-width / 2.0, -height / 2.0, -depth / 2.0);
            mesh = mesh.transform(&Matrix4::new_translation(&shift));
        }
        Ok(self.insert_solid(mesh))
    }

    fn make_cylinder(
        &self,
        height: f64,
        radius: f64,
        segments: usize,
        centered: bool,
    ) -> KernelResult<SolidHandle> {
        self.check_ready()?;
        if height <= 0.0 || radius <= 0.0 || segments < 3 {
            return Err(KernelError::Geometry(format!(
                "degenerate cylinder h={} r={} segments={}",
                height, radius, segments
            )));
        }
        let mut mesh = Sketch::circle(radius, segments, None).extrude(height);
        if centered {
            let shift = Vector3::new(0.0, 0.0, -height / 2.0);
            mesh = mesh.transform(&Matrix4::new_translation(&shift));
        }
        Ok(self.insert_solid(mesh))
    }

    fn cross_section(&self, contours: &[Vec<[f64; 2]>]) -> KernelResult<SectionHandle> {
        self.check_ready()?;
        let mut combined: Option<Sketch<()>> = None;
        for contour in contours {
            if contour.len() < 3 {
                return Err(KernelError::Geometry(format!(
                    "contour with {} points",
                    contour.len()
                )));
            }
            let sketch = Sketch::polygon(contour, None);
            combined = Some(match combined {
                Some(current) => current.union(&sketch),
                None => sketch,
            });
        }
        let sketch =
            combined.ok_or_else(|| KernelError::Geometry("empty cross-section".to_string()))?;
        Ok(self.insert_section(sketch))
    }

    fn extrude(&self, section: SectionHandle, height: f64) -> KernelResult<SolidHandle> {
        self.check_ready()?;
        if height <= 0.0 {
            return Err(KernelError::Geometry(format!(
                "non-positive extrusion height {}",
                height
            )));
        }
        let sketch = self.section(section)?;
        Ok(self.insert_solid(sketch.extrude(height)))
    }

    fn rotate(&self, solid: SolidHandle, degrees: [f64; 3]) -> KernelResult<SolidHandle> {
        self.check_ready()?;
        let mesh = self.solid(solid)?;
        let rx = Matrix4::new_rotation(Vector3::new(degrees[0].to_radians(), 0.0, 0.0));
        let ry = Matrix4::new_rotation(Vector3::new(0.0, degrees[1].to_radians(), 0.0));
        let rz = Matrix4::new_rotation(Vector3::new(0.0, 0.0, degrees[2].to_radians()));
        Ok(self.insert_solid(mesh.transform(&(rz * ry * rx))))
    }

    fn translate(&self, solid: SolidHandle, offset: [f64; 3]) -> KernelResult<SolidHandle> {
        self.check_ready()?;
        let mesh = self.solid(solid)?;
        let shift = Vector3::new(offset[0], offset[1], offset[2]);
        Ok(self.insert_solid(mesh.transform(&Matrix4::new_translation(&shift))))
    }

    fn union(&self, a: SolidHandle, b: SolidHandle) -> KernelResult<SolidHandle> {
        self.check_ready()?;
        let left = self.solid(a)?;
        let right = self.solid(b)?;
        Ok(self.insert_solid(left.union(&right)))
    }

    fn difference(&self, a: SolidHandle, b: SolidHandle) -> KernelResult<SolidHandle> {
        self.check_ready()?;
        let left = self.solid(a)?;
        let right = self.solid(b)?;
        Ok(self.insert_solid(left.difference(&right)))
    }

    fn solid_from_triangles(&self, mesh: &MeshBuffers) -> KernelResult<SolidHandle> {
        self.check_ready()?;
        if mesh.is_empty() {
            return Err(KernelError::Geometry("empty triangle buffer".to_string()));
        }
        let mut polygons: Vec<Polygon<()>> = Vec::with_capacity(mesh.triangle_count());
        for tri in mesh.indices.chunks_exact(3) {
            let a = mesh.vertex(tri[0]);
            let b = mesh.vertex(tri[1]);
            let c = mesh.vertex(tri[2]);
            let pa = Point3::new(a[0], a[1], a[2]);
            let pb = Point3::new(b[0], b[1], b[2]);
            let pc = Point3::new(c[0], c[1], c[2]);
            let normal = (pb - pa).cross(&(pc - pa));
            let length = normal.norm();
            if length <= f64::EPSILON {
                return Err(KernelError::Geometry(
                    "zero-area triangle in buffer".to_string(),
                ));
            }
            let normal = normal / length;
            polygons.push(Polygon::new(
                vec![
                    Vertex::new(pa, normal),
                    Vertex::new(pb, normal),
                    Vertex::new(pc, normal),
                ],
                None,
            ));
        }
        debug!(triangles = polygons.len(), "building solid from raw triangles");
        Ok(self.insert_solid(Mesh::from_polygons(&polygons, None)))
    }

    fn status(&self, solid: SolidHandle) -> KernelResult<SolidStatus> {
        let mesh = self.solid(solid)?;
        if mesh.polygons.is_empty() {
            Ok(SolidStatus::Empty)
        } else {
            Ok(SolidStatus::Ok)
        }
    }

    fn to_mesh(&self, solid: SolidHandle) -> KernelResult<MeshBuffers> {
        let mesh = self.solid(solid)?;
        let triangulated = mesh.triangulate();
        let mut buffers = MeshBuffers::new();
        let mut seen: HashMap<(i64, i64, i64), u32> = HashMap::new();
        // Quantization only deduplicates bit-identical coordinates;
        // welding policy stays with the caller.
        let quantum = 1e-9;
        for polygon in &triangulated.polygons {
            if polygon.vertices.len() != 3 {
                continue;
            }
            let mut indices = [0u32; 3];
            for (slot, vertex) in polygon.vertices.iter().enumerate() {
                let p = vertex.pos;
                let key = (
                    (p.x / quantum).round() as i64,
                    (p.y / quantum).round() as i64,
                    (p.z / quantum).round() as i64,
                );
                let index = match seen.get(&key) {
                    Some(existing) => *existing,
                    None => {
                        let index = buffers.push_vertex(p.x, p.y, p.z);
                        seen.insert(key, index);
                        index
                    }
                };
                indices[slot] = index;
            }
            if indices[0] != indices[1] && indices[1] != indices[2] && indices[0] != indices[2] {
                buffers.push_triangle(indices[0], indices[1], indices[2]);
            }
        }
        Ok(buffers)
    }

    fn dispose(&self, handle: Handle) {
        let mut tables = self.tables.lock();
        let removed = match handle {
            Handle::Solid(SolidHandle(id)) => tables.solids.remove(&id).is_some(),
            Handle::Section(SectionHandle(id)) => tables.sections.remove(&id).is_some(),
        };
        drop(tables);
        self.disposed.fetch_add(1, Ordering::SeqCst);
        if !removed {
            debug!(?handle, "dispose of unknown handle ignored");
        }
    }

    fn dispose_calls(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }
}
