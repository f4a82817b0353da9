//! Triangle mesh batch element

use crate::core::types::Vec3;
use crate::math::Triangle;

/// One batch element: a bag of triangles, immutable during a query batch
#[derive(Clone, Debug, Default)]
pub struct TriangleMesh {
    triangles: Vec<Triangle>,
}

impl TriangleMesh {
    /// Create a mesh from a triangle soup
    pub fn new(triangles: Vec<Triangle>) -> Self {
        Self { triangles }
    }

    /// Create a mesh from a shared vertex buffer and triangle indices
    pub fn from_vertices(vertices: &[Vec3], indices: &[[u32; 3]]) -> Self {
        let triangles = indices
            .iter()
            .map(|&[i, j, k]| {
                Triangle::new(
                    vertices[i as usize],
                    vertices[j as usize],
                    vertices[k as usize],
                )
            })
            .collect();
        Self { triangles }
    }

    /// Triangles as a slice
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Number of triangles
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    /// True if the mesh has no triangles
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}
