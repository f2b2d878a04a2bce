//! Instanced tetrahedron geometry.
//!
//! Every cell is one instance of a reference tetrahedron drawn as a
//! triangle strip. Local vertex `i` also carries the vertices of its
//! opposing face, listed counterclockwise seen from outside, so the vertex
//! shader computes the face normal as `(v2 - v1) x (v3 - v1)` pointing
//! away from `v0`.

use crate::buffer::{create_index_buffer, create_vertex_buffer};

/// Counterclockwise strip covering the four faces of a positively
/// oriented tetrahedron.
pub const TETRAHEDRON_STRIP: [u32; 6] = [0, 2, 1, 3, 0, 2];

/// Per local vertex attributes of the reference tetrahedron.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TetVertex {
    /// The local vertex index followed by its opposing face.
    pub local_vertices: [u32; 4],
    pub barycentric: [f32; 4],
}

pub const TETRAHEDRON_VERTICES: [TetVertex; 4] = [
    TetVertex {
        local_vertices: [0, 1, 2, 3],
        barycentric: [1.0, 0.0, 0.0, 0.0],
    },
    TetVertex {
        local_vertices: [1, 0, 3, 2],
        barycentric: [0.0, 1.0, 0.0, 0.0],
    },
    TetVertex {
        local_vertices: [2, 0, 1, 3],
        barycentric: [0.0, 0.0, 1.0, 0.0],
    },
    TetVertex {
        local_vertices: [3, 0, 2, 1],
        barycentric: [0.0, 0.0, 0.0, 1.0],
    },
];

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Uint32x4, 1 => Float32x4];

/// Returns the layout of the per-vertex buffer.
pub fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<TetVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRIBUTES,
    }
}

/// First free shader location after the per-vertex attributes.
pub const FIRST_INSTANCE_LOCATION: u32 = 2;

/// GPU buffers of the reference tetrahedron.
pub struct TetrahedronGeometry {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
}

impl TetrahedronGeometry {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            vertex_buffer: create_vertex_buffer(
                device,
                &TETRAHEDRON_VERTICES,
                Some("unray tetrahedron vertices"),
            ),
            index_buffer: create_index_buffer(
                device,
                &TETRAHEDRON_STRIP,
                Some("unray tetrahedron strip"),
            ),
        }
    }

    /// Number of indices drawn per instance.
    pub fn index_count(&self) -> u32 {
        TETRAHEDRON_STRIP.len() as u32
    }
}

/// Expands a triangle strip into triangles with consistent winding.
pub fn strip_triangles(strip: &[u32]) -> Vec<[u32; 3]> {
    strip
        .windows(3)
        .enumerate()
        .map(|(i, w)| {
            if i % 2 == 0 {
                [w[0], w[1], w[2]]
            } else {
                [w[1], w[0], w[2]]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    const REFERENCE: [Vec3; 4] = [Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z];

    fn normal(face: [u32; 3]) -> Vec3 {
        let [a, b, c] = face.map(|i| REFERENCE[i as usize]);
        (b - a).cross(c - a)
    }

    fn centroid(face: [u32; 3]) -> Vec3 {
        face.iter().map(|&i| REFERENCE[i as usize]).sum::<Vec3>() / 3.0
    }

    #[test]
    fn test_strip_faces_point_outward() {
        let triangles = strip_triangles(&TETRAHEDRON_STRIP);
        assert_eq!(triangles.len(), 4);
        for face in triangles {
            let opposite = (0..4).find(|v| !face.contains(v)).unwrap();
            let away = centroid(face) - REFERENCE[opposite as usize];
            assert!(normal(face).dot(away) > 0.0, "face {face:?} is inward");
        }
    }

    #[test]
    fn test_opposing_faces() {
        for (i, vertex) in TETRAHEDRON_VERTICES.iter().enumerate() {
            let [v, a, b, c] = vertex.local_vertices;
            assert_eq!(v as usize, i);
            let face = [a, b, c];
            assert!(!face.contains(&v));
            let away = centroid(face) - REFERENCE[i];
            assert!(normal(face).dot(away) > 0.0);
            assert_eq!(vertex.barycentric[i], 1.0);
            assert_eq!(vertex.barycentric.iter().sum::<f32>(), 1.0);
        }
    }

    #[test]
    fn test_vertex_layout() {
        let layout = vertex_layout();
        assert_eq!(layout.array_stride, 32);
        assert_eq!(layout.attributes.len(), FIRST_INSTANCE_LOCATION as usize);
    }
}
