//! Tetrahedral mesh geometry: bounds and cell orientation normalization.
//!
//! # Orientation
//!
//! Each tetrahedron is drawn as one instance of a triangle strip whose faces
//! are wound counterclockwise when the cell has a positive Jacobian
//! determinant. Cells with a negative determinant would show their back
//! faces, so they are flipped by swapping their last two local vertices.
//!
//! The sign is taken from the scalar triple product of the three edges
//! leaving vertex 0. Degenerate (zero volume) cells get whatever sign the
//! floating point evaluation yields; there is no tolerance.

use glam::{DVec3, Vec3};

use crate::data::TypedArray;
use crate::error::{Result, UnrayError};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    /// Returns the center of the box.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns the extent of the box along each axis.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

/// Bounding sphere centered at the mass center of the points.
///
/// This is a cheap approximation and in general not the minimal enclosing
/// sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

/// Computes the componentwise min/max over all points.
pub fn compute_bounding_box(points: &[Vec3]) -> Option<BoundingBox> {
    let first = *points.first()?;
    let (min, max) = points
        .iter()
        .fold((first, first), |(min, max), &p| (min.min(p), max.max(p)));
    Some(BoundingBox { min, max })
}

/// Computes a sphere around the points' mass center reaching the farthest point.
#[allow(clippy::cast_precision_loss)]
pub fn compute_bounding_sphere(points: &[Vec3]) -> Option<BoundingSphere> {
    if points.is_empty() {
        return None;
    }
    let sum = points.iter().fold(DVec3::ZERO, |acc, p| acc + p.as_dvec3());
    let center = sum / points.len() as f64;
    let radius = points
        .iter()
        .map(|p| p.as_dvec3().distance(center))
        .fold(0.0f64, f64::max);
    #[allow(clippy::cast_possible_truncation)]
    Some(BoundingSphere {
        center: center.as_vec3(),
        radius: radius as f32,
    })
}

/// Returns six times the signed volume of a tetrahedron.
pub fn signed_volume(cell: &[u32; 4], points: &[Vec3]) -> f64 {
    let p = |k: usize| points[cell[k] as usize].as_dvec3();
    let origin = p(0);
    let e1 = p(1) - origin;
    let e2 = p(2) - origin;
    let e3 = p(3) - origin;
    e1.dot(e2.cross(e3))
}

/// Flags every cell whose signed volume is negative.
pub fn compute_orientations(cells: &[[u32; 4]], points: &[Vec3]) -> Vec<bool> {
    cells
        .iter()
        .map(|cell| signed_volume(cell, points) < 0.0)
        .collect()
}

/// Flips flagged cells in place by swapping their last two vertices.
pub fn apply_orientations(cells: &mut [[u32; 4]], flags: &[bool]) {
    for (cell, &flip) in cells.iter_mut().zip(flags) {
        if flip {
            cell.swap(2, 3);
        }
    }
}

/// Writes `src` into `dst` with flagged cells flipped, leaving `src` untouched.
pub fn copy_reoriented(dst: &mut [[u32; 4]], src: &[[u32; 4]], flags: &[bool]) {
    for ((d, s), &flip) in dst.iter_mut().zip(src).zip(flags) {
        *d = if flip { [s[0], s[1], s[3], s[2]] } else { *s };
    }
}

/// Returns a new cell buffer with flagged cells flipped.
pub fn reoriented(src: &[[u32; 4]], flags: &[bool]) -> Vec<[u32; 4]> {
    let mut dst = src.to_vec();
    apply_orientations(&mut dst, flags);
    dst
}

/// A tetrahedral mesh: cells of four vertex indices over a point array.
///
/// Every index in `cells` is guaranteed to be `< points.len()`.
#[derive(Debug, Clone, PartialEq)]
pub struct TetMesh {
    cells: Vec<[u32; 4]>,
    points: Vec<Vec3>,
}

impl TetMesh {
    /// Creates a mesh, validating that all cell indices reference a point.
    pub fn new(cells: Vec<[u32; 4]>, points: Vec<Vec3>) -> Result<Self> {
        for (i, cell) in cells.iter().enumerate() {
            if let Some(&index) = cell.iter().find(|&&v| v as usize >= points.len()) {
                return Err(UnrayError::IndexOutOfBounds {
                    cell: i,
                    index: i64::from(index),
                    num_points: points.len(),
                });
            }
        }
        Ok(Self { cells, points })
    }

    /// Creates a mesh from flat arrays of 4 indices per cell and 3 floats per point.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_arrays(cells: &TypedArray, points: &TypedArray) -> Result<Self> {
        if cells.len() % 4 != 0 {
            return Err(UnrayError::SizeMismatch {
                field: "cells".into(),
                expected: cells.len() / 4 * 4,
                actual: cells.len(),
            });
        }
        if points.len() % 3 != 0 {
            return Err(UnrayError::SizeMismatch {
                field: "points".into(),
                expected: points.len() / 3 * 3,
                actual: points.len(),
            });
        }

        let coords = points.to_f32_vec();
        let points: Vec<Vec3> = coords.chunks_exact(3).map(Vec3::from_slice).collect();

        let mut flat = Vec::with_capacity(cells.len());
        for (k, x) in cells.iter_f64().enumerate() {
            if x < 0.0 || x.fract() != 0.0 || x >= points.len() as f64 {
                return Err(UnrayError::IndexOutOfBounds {
                    cell: k / 4,
                    index: x as i64,
                    num_points: points.len(),
                });
            }
            flat.push(x as u32);
        }
        let cells = flat
            .chunks_exact(4)
            .map(|c| [c[0], c[1], c[2], c[3]])
            .collect();

        Ok(Self { cells, points })
    }

    /// Returns the number of tetrahedra.
    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// Returns the number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.points.len()
    }

    /// Returns the cells.
    pub fn cells(&self) -> &[[u32; 4]] {
        &self.cells
    }

    /// Returns the vertex positions.
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Flags the cells that need flipping.
    pub fn orientations(&self) -> Vec<bool> {
        compute_orientations(&self.cells, &self.points)
    }

    /// Flips negatively oriented cells in place and returns how many were flipped.
    pub fn normalize_orientation(&mut self) -> usize {
        let flags = self.orientations();
        apply_orientations(&mut self.cells, &flags);
        flags.iter().filter(|&&f| f).count()
    }

    /// Returns the cells as a flat array of 4 indices per cell.
    pub fn cells_array(&self) -> TypedArray {
        TypedArray::from(self.cells.iter().flatten().copied().collect::<Vec<u32>>())
    }

    /// Computes the axis-aligned bounding box of the points.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        compute_bounding_box(&self.points)
    }

    /// Computes the mass-center bounding sphere of the points.
    pub fn bounding_sphere(&self) -> Option<BoundingSphere> {
        compute_bounding_sphere(&self.points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn points() -> Vec<Vec3> {
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(-1.0, 0.0, 0.0),
        ]
    }

    #[test]
    fn test_bounding_box() {
        let pts = [Vec3::new(0.0, -1.0, 1.0), Vec3::new(2.0, -4.0, 6.0)];
        let bbox = compute_bounding_box(&pts).unwrap();
        assert_eq!(bbox.min, Vec3::new(0.0, -4.0, 1.0));
        assert_eq!(bbox.max, Vec3::new(2.0, -1.0, 6.0));
        assert_eq!(bbox.center(), Vec3::new(1.0, -2.5, 3.5));
        assert!(compute_bounding_box(&[]).is_none());
    }

    #[test]
    fn test_bounding_sphere() {
        let pts = [Vec3::new(0.0, -1.0, 1.0), Vec3::new(2.0, -4.0, 6.0)];
        let sphere = compute_bounding_sphere(&pts).unwrap();
        assert!((sphere.center - Vec3::new(1.0, -2.5, 3.5)).length() < 1e-6);
        let expected = (1.0f32 + 1.5 * 1.5 + 2.5 * 2.5).sqrt();
        assert!((sphere.radius - expected).abs() < 1e-6);
    }

    #[test]
    fn test_copy_reoriented() {
        let src = [[0, 1, 2, 3], [0, 1, 2, 4]];
        let mut dst = [[0; 4]; 2];
        copy_reoriented(&mut dst, &src, &[false, false]);
        assert_eq!(dst, src);
        copy_reoriented(&mut dst, &src, &[true, true]);
        assert_eq!(dst, [[0, 1, 3, 2], [0, 1, 4, 2]]);
    }

    #[test]
    fn test_orientation_flags() {
        let pts = points();
        let cells = [[0, 1, 2, 3], [0, 1, 2, 4]];
        let flipped = [[0, 1, 3, 2], [0, 1, 4, 2]];
        assert_eq!(compute_orientations(&cells, &pts), vec![true, false]);
        assert_eq!(compute_orientations(&flipped, &pts), vec![false, true]);
    }

    #[test]
    fn test_normalize_orientation() {
        let mut mesh = TetMesh::new(vec![[0, 1, 2, 3], [0, 1, 2, 4]], points()).unwrap();
        assert_eq!(mesh.normalize_orientation(), 1);
        assert_eq!(mesh.cells(), &[[0, 1, 3, 2], [0, 1, 2, 4]]);
        assert_eq!(mesh.normalize_orientation(), 0);
    }

    #[test]
    fn test_reoriented_leaves_source() {
        let src = vec![[0, 1, 2, 3]];
        let dst = reoriented(&src, &[true]);
        assert_eq!(src, vec![[0, 1, 2, 3]]);
        assert_eq!(dst, vec![[0, 1, 3, 2]]);
    }

    #[test]
    fn test_degenerate_cell_is_either_sign() {
        // Four coplanar points: the sign is whatever the arithmetic yields.
        let pts = vec![
            Vec3::ZERO,
            Vec3::X,
            Vec3::Y,
            Vec3::new(1.0, 1.0, 0.0),
        ];
        let mut mesh = TetMesh::new(vec![[0, 1, 2, 3]], pts).unwrap();
        assert_eq!(signed_volume(&mesh.cells()[0], mesh.points()), 0.0);
        mesh.normalize_orientation();
        assert!(signed_volume(&mesh.cells()[0], mesh.points()) >= 0.0);
    }

    #[test]
    fn test_index_out_of_bounds() {
        let result = TetMesh::new(vec![[0, 1, 2, 9]], points());
        assert!(matches!(
            result,
            Err(UnrayError::IndexOutOfBounds { cell: 0, index: 9, num_points: 5 })
        ));
    }

    #[test]
    fn test_from_arrays() {
        let cells = TypedArray::from(vec![0i32, 1, 2, 3, 0, 1, 2, 4]);
        let coords = TypedArray::from(vec![
            0.0f32, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, -1.0, 0.0, 0.0,
        ]);
        let mesh = TetMesh::from_arrays(&cells, &coords).unwrap();
        assert_eq!(mesh.num_cells(), 2);
        assert_eq!(mesh.num_vertices(), 5);
        assert_eq!(mesh.points()[4], Vec3::NEG_X);

        let bad = TypedArray::from(vec![0i32, 1, 2]);
        assert!(matches!(
            TetMesh::from_arrays(&bad, &coords),
            Err(UnrayError::SizeMismatch { .. })
        ));
        let negative = TypedArray::from(vec![0i32, 1, 2, -1]);
        assert!(matches!(
            TetMesh::from_arrays(&negative, &coords),
            Err(UnrayError::IndexOutOfBounds { index: -1, .. })
        ));
    }

    #[test]
    fn test_cells_array_roundtrip() {
        let mesh = TetMesh::new(vec![[0, 1, 2, 3]], points()).unwrap();
        assert_eq!(mesh.cells_array(), TypedArray::from(vec![0u32, 1, 2, 3]));
    }

    proptest! {
        #[test]
        fn prop_normalization_is_idempotent(
            coords in proptest::collection::vec(-10.0f32..10.0, 12..=36),
            picks in proptest::collection::vec(any::<[u8; 4]>(), 1..16),
        ) {
            let points: Vec<Vec3> = coords.chunks_exact(3).map(Vec3::from_slice).collect();
            let n = points.len();
            let cells: Vec<[u32; 4]> = picks
                .iter()
                .map(|p| p.map(|v| u32::from(v) % n as u32))
                .collect();
            let mut mesh = TetMesh::new(cells, points).unwrap();
            mesh.normalize_orientation();
            for cell in mesh.cells() {
                prop_assert!(signed_volume(cell, mesh.points()) >= 0.0);
            }
            prop_assert_eq!(mesh.normalize_orientation(), 0);
        }
    }
}
