//! Visibility ordering of cells.
//!
//! Blending-sensitive methods composite cells in view order. Each cell is
//! keyed by its nearest vertex: the minimum over its four vertices of the
//! signed distance `dot(v - reference, view_direction)`.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Direction of the cell ordering along the view ray.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Nearest cells first.
    FrontToBack,
    /// Farthest cells first.
    #[default]
    BackToFront,
}

/// Returns the identity ordering `[0, 1, ..., n - 1]`.
#[allow(clippy::cast_possible_truncation)]
pub fn identity_ordering(n: usize) -> Vec<u32> {
    (0..n as u32).collect()
}

/// Computes the sort key of every cell.
pub fn cell_depths(
    cells: &[[u32; 4]],
    points: &[Vec3],
    reference: Vec3,
    view_direction: Vec3,
) -> Vec<f32> {
    cells
        .iter()
        .map(|cell| {
            cell.iter()
                .map(|&v| view_direction.dot(points[v as usize] - reference))
                .fold(f32::INFINITY, f32::min)
        })
        .collect()
}

/// Sorts `ordering` front to back by nearest-vertex depth.
///
/// The sort is unstable: cells with equal keys may come out in any order.
pub fn sort_cells(
    ordering: &mut [u32],
    cells: &[[u32; 4]],
    points: &[Vec3],
    reference: Vec3,
    view_direction: Vec3,
) {
    sort_cells_by(
        ordering,
        cells,
        points,
        reference,
        view_direction,
        SortOrder::FrontToBack,
    );
}

/// Sorts `ordering` by nearest-vertex depth in the given order.
pub fn sort_cells_by(
    ordering: &mut [u32],
    cells: &[[u32; 4]],
    points: &[Vec3],
    reference: Vec3,
    view_direction: Vec3,
    order: SortOrder,
) {
    let depths = cell_depths(cells, points, reference, view_direction);
    let key = |i: u32| depths.get(i as usize).copied().unwrap_or(f32::INFINITY);
    match order {
        SortOrder::FrontToBack => ordering.sort_unstable_by(|&a, &b| key(a).total_cmp(&key(b))),
        SortOrder::BackToFront => ordering.sort_unstable_by(|&a, &b| key(b).total_cmp(&key(a))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn two_cells() -> (Vec<[u32; 4]>, Vec<Vec3>) {
        // cell 0 has its nearest vertex at depth 5, cell 1 at depth 1
        let points = vec![
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::new(1.0, 0.0, 6.0),
            Vec3::new(0.0, 1.0, 6.0),
            Vec3::new(0.0, 0.0, 7.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 2.0),
            Vec3::new(0.0, 1.0, 2.0),
            Vec3::new(0.0, 0.0, 3.0),
        ];
        (vec![[0, 1, 2, 3], [4, 5, 6, 7]], points)
    }

    #[test]
    fn test_nearest_cell_first() {
        let (cells, points) = two_cells();
        let mut ordering = identity_ordering(2);
        sort_cells(&mut ordering, &cells, &points, Vec3::ZERO, Vec3::Z);
        assert_eq!(ordering, vec![1, 0]);
        assert_eq!(cell_depths(&cells, &points, Vec3::ZERO, Vec3::Z), vec![5.0, 1.0]);
    }

    #[test]
    fn test_back_to_front() {
        let (cells, points) = two_cells();
        let mut ordering = vec![1, 0];
        sort_cells_by(
            &mut ordering,
            &cells,
            &points,
            Vec3::ZERO,
            Vec3::Z,
            SortOrder::BackToFront,
        );
        assert_eq!(ordering, vec![0, 1]);
    }

    #[test]
    fn test_reference_point_shifts_depths() {
        let (cells, points) = two_cells();
        let depths = cell_depths(&cells, &points, Vec3::new(0.0, 0.0, 1.0), Vec3::Z);
        assert_eq!(depths, vec![4.0, 0.0]);
    }

    proptest! {
        #[test]
        fn prop_sorted_keys_are_monotonic(
            coords in prop::collection::vec(-10.0f32..10.0, 24..=24),
            dir in prop::array::uniform3(-1.0f32..1.0),
        ) {
            let points: Vec<Vec3> = coords.chunks(3).map(Vec3::from_slice).collect();
            let cells = vec![[0, 1, 2, 3], [4, 5, 6, 7], [0, 2, 4, 6], [1, 3, 5, 7]];
            let dir = Vec3::from_array(dir);
            let mut ordering = identity_ordering(cells.len());
            sort_cells(&mut ordering, &cells, &points, Vec3::ZERO, dir);

            let depths = cell_depths(&cells, &points, Vec3::ZERO, dir);
            for pair in ordering.windows(2) {
                prop_assert!(depths[pair[0] as usize] <= depths[pair[1] as usize]);
            }
            let mut seen = ordering.clone();
            seen.sort_unstable();
            prop_assert_eq!(seen, vec![0, 1, 2, 3]);
        }
    }
}
