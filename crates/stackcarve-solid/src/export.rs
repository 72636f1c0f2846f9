//! Binary STL serialization of layer meshes.
//!
//! The mesh buffer is the sole input contract: positions plus
//! indices, as produced by a layer build. Normals are recomputed per
//! triangle from the winding.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use stl_io::{Normal, Triangle, Vertex};
use tracing::debug;

use crate::mesh::MeshBuffers;

/// Writes the mesh as binary STL.
pub fn write_stl<W: Write>(mesh: &MeshBuffers, writer: &mut W) -> io::Result<()> {
    let triangles: Vec<Triangle> = mesh
        .indices
        .chunks_exact(3)
        .map(|tri| {
            let a = mesh.vertex(tri[0]);
            let b = mesh.vertex(tri[1]);
            let c = mesh.vertex(tri[2]);
            Triangle {
                normal: face_normal(a, b, c),
                vertices: [to_vertex(a), to_vertex(b), to_vertex(c)],
            }
        })
        .collect();
    stl_io::write_stl(writer, triangles.iter())
}

/// Writes the mesh as a binary STL file.
pub fn export_stl_file(mesh: &MeshBuffers, path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    let mut file = File::create(path)?;
    write_stl(mesh, &mut file)?;
    debug!(path = %path.display(), triangles = mesh.triangle_count(), "stl exported");
    Ok(())
}

fn to_vertex(p: [f64; 3]) -> Vertex {
    Vertex::new([p[0] as f32, p[1] as f32, p[2] as f32])
}

fn face_normal(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> Normal {
    let e1 = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let e2 = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let cross = [
        e1[1] * e2[2] - e1[2] * e2[1],
        e1[2] * e2[0] - e1[0] * e2[2],
        e1[0] * e2[1] - e1[1] * e2[0],
    ];
    let length = (cross[0] * cross[0] + cross[1] * cross[1] + cross[2] * cross[2]).sqrt();
    if length < 1e-12 {
        Normal::new([0.0, 0.0, 1.0])
    } else {
        Normal::new([
            (cross[0] / length) as f32,
            (cross[1] / length) as f32,
            (cross[2] / length) as f32,
        ])
    }
}
