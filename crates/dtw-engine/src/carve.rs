//! Seam removal: splice a seam out of the linked grid in place.
//!
//! For a vertical seam every seam cell's left and right neighbours are
//! joined, then the up/down links between consecutive rows are repaired
//! where the seam stepped sideways. A horizontal seam is the transposed
//! mirror (up/down splice, left/right repair). Only cells whose
//! neighbour set changed get their energy recomputed, so one removal
//! costs O(seam length).
//!
//! Removed cells stay in the arena with every link cleared.

use std::cmp::Ordering;

use crate::energy;
use crate::grid::PixelGrid;
use crate::seam::{Direction, Seam};
use crate::types::{Dimensions, EngineError, MIN_DIMENSION};

fn corrupt(msg: String) -> EngineError {
    EngineError::CorruptTopology(msg)
}

/// Check that `seam` has one contiguous cell per layer of `grid` and that
/// its cells are the live cells at its positions.
fn validate_seam(grid: &PixelGrid, seam: &Seam) -> Result<(), EngineError> {
    let size = grid.dimensions();
    let direction = seam.direction();
    let layers = direction.layer_count(size) as usize;
    let len = direction.layer_len(size);

    if seam.len() != layers || seam.positions().len() != layers {
        return Err(corrupt(format!(
            "{direction:?} seam has {} cells, grid has {layers} layers",
            seam.len()
        )));
    }
    if !seam.is_contiguous() {
        return Err(corrupt(format!("{direction:?} seam is not contiguous")));
    }
    if let Some(&p) = seam.positions().iter().find(|&&p| p >= len) {
        return Err(corrupt(format!(
            "{direction:?} seam position {p} is outside a layer of {len}"
        )));
    }

    // Every cell must be the live cell at its position: the first is
    // found from the start cell, each later one from its predecessor.
    let after = direction.lateral();
    let before = after.opposite();
    let across = direction.traversal();
    let cells = seam.cells();
    let positions = seam.positions();

    let mut expected = Some(grid.start());
    for _ in 0..positions[0] {
        expected = expected.and_then(|id| grid.link(id, after));
    }
    for (k, &id) in cells.iter().enumerate() {
        if expected != Some(id) {
            return Err(corrupt(format!(
                "{direction:?} seam cell {id} is not the live cell at position {} of layer {k}",
                positions[k]
            )));
        }
        if let Some(&next_pos) = positions.get(k + 1) {
            let straight = grid.link(id, across);
            expected = match next_pos.cmp(&positions[k]) {
                Ordering::Greater => straight.and_then(|s| grid.link(s, after)),
                Ordering::Less => straight.and_then(|s| grid.link(s, before)),
                Ordering::Equal => straight,
            };
        }
    }
    Ok(())
}

/// Remove `seam` from `grid`, shrinking it by one in the perpendicular
/// dimension.
///
/// When `mark_deleted` is set, removed cells get the model's deleted
/// energy so stray references to them are easy to spot.
///
/// # Errors
///
/// Returns [`EngineError::InvalidDimensions`] if the removal would take
/// the grid below [`MIN_DIMENSION`], and [`EngineError::CorruptTopology`]
/// if the seam does not fit the grid or a link it relies on is missing.
pub fn remove_seam(grid: &mut PixelGrid, seam: &Seam, mark_deleted: bool) -> Result<(), EngineError> {
    let size = grid.dimensions();
    let direction = seam.direction();
    if direction.layer_len(size) <= MIN_DIMENSION {
        let shrunk = shrink(size, direction);
        return Err(EngineError::InvalidDimensions {
            width: shrunk.width,
            height: shrunk.height,
            minimum: MIN_DIMENSION,
        });
    }
    validate_seam(grid, seam)?;

    let after = direction.lateral();
    let before = after.opposite();
    let across = direction.traversal();
    let cells = seam.cells();
    let positions = seam.positions();
    let mut touched = Vec::with_capacity(cells.len() * 4);

    for (k, &id) in cells.iter().enumerate() {
        let prev = grid.link(id, before);
        let next = grid.link(id, after);

        if let Some(b) = prev {
            grid.set_link(b, after, next);
            touched.push(b);
        }
        if let Some(a) = next {
            grid.set_link(a, before, prev);
            touched.push(a);
        }

        if let Some(&next_pos) = positions.get(k + 1) {
            // When the seam steps sideways, the neighbour on that side
            // shifts into the seam's position and must be linked to the
            // cell straight across from the removed one.
            let bridge = match next_pos.cmp(&positions[k]) {
                Ordering::Greater => Some(next),
                Ordering::Less => Some(prev),
                Ordering::Equal => None,
            };
            if let Some(bridge) = bridge {
                let bridge = bridge.ok_or_else(|| {
                    corrupt(format!("seam cell {id} steps sideways off the grid"))
                })?;
                let below = grid.link(id, across).ok_or_else(|| {
                    corrupt(format!("seam cell {id} has no {across:?} neighbour"))
                })?;
                grid.set_link(bridge, across, Some(below));
                grid.set_link(below, across.opposite(), Some(bridge));
                touched.push(bridge);
                touched.push(below);
            }
        }

        if id == grid.start() {
            let promoted =
                next.ok_or_else(|| corrupt(format!("starting cell {id} has no {after:?} neighbour")))?;
            grid.set_start(promoted);
        }
    }

    let mark = mark_deleted.then(|| grid.model().deleted_energy());
    for &id in cells {
        grid.tombstone(id, mark);
    }
    grid.set_dimensions(shrink(size, direction));

    for id in touched {
        energy::recompute(grid, id);
    }

    log::debug!(
        "removed {direction:?} seam of energy {:.2}; grid is now {}",
        seam.total_energy(),
        grid.dimensions(),
    );
    Ok(())
}

const fn shrink(size: Dimensions, direction: Direction) -> Dimensions {
    match direction {
        Direction::Vertical => Dimensions::new(size.width - 1, size.height),
        Direction::Horizontal => Dimensions::new(size.width, size.height - 1),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::Rgba;

    use super::*;
    use crate::energy::EnergyModel;
    use crate::grid::Side;
    use crate::seam::find_seam;
    use crate::types::RgbaImage;

    #[allow(clippy::cast_possible_truncation)]
    fn pattern(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 31 + y * 7) as u8, (y * 53) as u8, (x * x * 11) as u8, 255])
        })
    }

    fn grid_of(image: &RgbaImage) -> PixelGrid {
        PixelGrid::build(image, EnergyModel::default()).unwrap()
    }

    /// Expected bitmap after removing one pixel per row/column, computed
    /// directly on the dense source.
    fn dense_remove(image: &RgbaImage, seam: &Seam) -> RgbaImage {
        let (w, h) = image.dimensions();
        match seam.direction() {
            Direction::Vertical => RgbaImage::from_fn(w - 1, h, |x, y| {
                let skip = seam.positions()[y as usize];
                let src = if x < skip { x } else { x + 1 };
                *image.get_pixel(src, y)
            }),
            Direction::Horizontal => RgbaImage::from_fn(w, h - 1, |x, y| {
                let skip = seam.positions()[x as usize];
                let src = if y < skip { y } else { y + 1 };
                *image.get_pixel(x, src)
            }),
        }
    }

    fn assert_energies_fresh(grid: &PixelGrid) {
        for id in grid.row_major().unwrap() {
            let fresh = energy::energy_of(grid, id);
            assert!(
                (grid.energy(id) - fresh).abs() < 1e-9,
                "cell {id} has stale energy {} (expected {fresh})",
                grid.energy(id),
            );
        }
    }

    #[test]
    fn vertical_removal_matches_dense_removal() {
        let image = pattern(8, 6);
        let mut grid = grid_of(&image);
        let seam = find_seam(&grid, Direction::Vertical).unwrap();
        let expected = dense_remove(&image, &seam);

        remove_seam(&mut grid, &seam, true).unwrap();

        assert_eq!(grid.dimensions(), Dimensions::new(7, 6));
        assert_eq!(grid.materialize().unwrap(), expected);
        assert!(grid.check_consistency().is_ok());
        assert_energies_fresh(&grid);
    }

    #[test]
    fn horizontal_removal_matches_dense_removal() {
        let image = pattern(6, 8);
        let mut grid = grid_of(&image);
        let seam = find_seam(&grid, Direction::Horizontal).unwrap();
        let expected = dense_remove(&image, &seam);

        remove_seam(&mut grid, &seam, true).unwrap();

        assert_eq!(grid.dimensions(), Dimensions::new(6, 7));
        assert_eq!(grid.materialize().unwrap(), expected);
        assert!(grid.check_consistency().is_ok());
        assert_energies_fresh(&grid);
    }

    #[test]
    fn repeated_removals_stay_consistent() {
        let image = pattern(12, 10);
        let mut grid = grid_of(&image);
        let mut dense = image;
        for round in 0..6 {
            let direction = if round % 2 == 0 {
                Direction::Vertical
            } else {
                Direction::Horizontal
            };
            let seam = find_seam(&grid, direction).unwrap();
            dense = dense_remove(&dense, &seam);
            remove_seam(&mut grid, &seam, true).unwrap();
            assert!(grid.check_consistency().is_ok(), "round {round}");
            assert_energies_fresh(&grid);
        }
        assert_eq!(grid.dimensions(), Dimensions::new(9, 7));
        assert_eq!(grid.materialize().unwrap(), dense);
    }

    #[test]
    fn removing_first_column_promotes_starting_cell() {
        // Column 0 is uniform with its neighbour, so it is the cheapest.
        let image = RgbaImage::from_fn(5, 4, |x, y| {
            if x <= 1 {
                Rgba([10, 10, 10, 255])
            } else {
                Rgba([u8::try_from(x * 60 + y * 5).unwrap_or(255), 0, 0, 255])
            }
        });
        let mut grid = grid_of(&image);
        let seam = find_seam(&grid, Direction::Vertical).unwrap();
        assert_eq!(seam.positions()[0], 0);

        remove_seam(&mut grid, &seam, false).unwrap();
        assert_eq!(grid.start(), 1);
        assert_eq!(grid.link(grid.start(), Side::Left), None);
        assert!(grid.check_consistency().is_ok());
    }

    #[test]
    fn removing_first_row_promotes_starting_cell() {
        // Row 0 is uniform with its neighbour, so it is the cheapest.
        let image = RgbaImage::from_fn(4, 5, |x, y| {
            if y <= 1 {
                Rgba([10, 10, 10, 255])
            } else {
                Rgba([u8::try_from(y * 60 + x * 5).unwrap_or(255), 0, 0, 255])
            }
        });
        let mut grid = grid_of(&image);
        let seam = find_seam(&grid, Direction::Horizontal).unwrap();
        assert!(seam.positions().iter().all(|&p| p == 0));

        remove_seam(&mut grid, &seam, false).unwrap();
        assert_eq!(grid.start(), 4);
        assert_eq!(grid.link(grid.start(), Side::Up), None);
        assert_eq!(grid.dimensions(), Dimensions::new(4, 4));
        assert!(grid.check_consistency().is_ok());
    }

    #[test]
    fn removing_the_same_seam_twice_is_rejected() {
        let image = RgbaImage::from_pixel(7, 6, Rgba([90, 90, 90, 255]));
        let mut grid = grid_of(&image);
        let seam = find_seam(&grid, Direction::Vertical).unwrap();
        remove_seam(&mut grid, &seam, false).unwrap();
        let before = grid.clone();

        assert!(matches!(
            remove_seam(&mut grid, &seam, false),
            Err(EngineError::CorruptTopology(_))
        ));
        assert_eq!(grid.dimensions(), Dimensions::new(6, 6));
        assert_eq!(grid.materialize().unwrap(), before.materialize().unwrap());
        assert!(grid.check_consistency().is_ok());
    }

    #[test]
    fn stale_sideways_seam_leaves_grid_untouched() {
        let image = pattern(8, 6);
        let mut grid = grid_of(&image);
        let first = find_seam(&grid, Direction::Vertical).unwrap();
        remove_seam(&mut grid, &first, false).unwrap();

        // A zig-zag through columns 1 and 2 of the shrunken grid, but made
        // of cells that no longer sit at those positions.
        let second = find_seam(&grid, Direction::Vertical).unwrap();
        let stale = Seam::from_parts(
            Direction::Vertical,
            first.cells().to_vec(),
            (0..6).map(|y| 1 + (y % 2)).collect(),
            0.0,
        );
        let snapshot = grid.materialize().unwrap();

        assert!(matches!(
            remove_seam(&mut grid, &stale, false),
            Err(EngineError::CorruptTopology(_))
        ));
        assert_eq!(grid.materialize().unwrap(), snapshot);
        assert!(grid.check_consistency().is_ok());
        remove_seam(&mut grid, &second, false).unwrap();
        assert_eq!(grid.dimensions(), Dimensions::new(6, 6));
    }

    #[test]
    fn removed_cells_are_tombstoned() {
        let image = pattern(6, 5);
        let mut grid = grid_of(&image);
        let seam = find_seam(&grid, Direction::Vertical).unwrap();
        remove_seam(&mut grid, &seam, true).unwrap();

        let deleted = grid.model().deleted_energy();
        for &id in seam.cells() {
            assert!(grid.cell(id).is_isolated());
            assert!((grid.energy(id) - deleted).abs() < f64::EPSILON);
        }
        let live = grid.row_major().unwrap();
        assert!(seam.cells().iter().all(|id| !live.contains(id)));
        assert_eq!(grid.arena_len(), 30);
    }

    #[test]
    fn refuses_to_shrink_below_minimum() {
        let image = pattern(3, 5);
        let mut grid = grid_of(&image);
        let seam = find_seam(&grid, Direction::Vertical).unwrap();
        assert!(matches!(
            remove_seam(&mut grid, &seam, false),
            Err(EngineError::InvalidDimensions { .. })
        ));
        assert_eq!(grid.dimensions(), Dimensions::new(3, 5));
    }

    #[test]
    fn mismatched_seam_is_rejected() {
        let image = pattern(6, 5);
        let mut grid = grid_of(&image);
        let horizontal = find_seam(&grid, Direction::Horizontal).unwrap();
        let seam = find_seam(&grid, Direction::Vertical).unwrap();
        remove_seam(&mut grid, &seam, false).unwrap();
        // The horizontal seam was found on the wider grid.
        assert!(matches!(
            remove_seam(&mut grid, &horizontal, false),
            Err(EngineError::CorruptTopology(_))
        ));
    }
}
