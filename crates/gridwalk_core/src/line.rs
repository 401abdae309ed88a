//! Straight-line step planning.
//!
//! Rasterizes the segment between two cells with integer Bresenham and
//! splits every diagonal advance into two orthogonal moves, so movers only
//! ever step to an edge-adjacent cell.

use crate::components::StepQueue;
use crate::grid::{GridCoordinate, GridQuery};

/// Plan the cells between `start` and `end`.
///
/// The result excludes `start`, ends at `end`, and every consecutive pair
/// (including `start` and the first step) differs by one unit on one axis.
/// Its length is always the Manhattan distance between the two cells.
/// Returns an empty queue when `start == end`.
#[must_use]
pub fn plan_line(start: GridCoordinate, end: GridCoordinate) -> StepQueue {
    let mut steps = StepQueue::new();

    // Error terms in i64: `2 * err` outgrows i32 for far-apart cells.
    let dx = (i64::from(end.x) - i64::from(start.x)).abs();
    let dy = (i64::from(end.y) - i64::from(start.y)).abs();
    let sx = if start.x < end.x { 1 } else { -1 };
    let sy = if start.y < end.y { 1 } else { -1 };
    let mut err = dx - dy;

    let mut x = start.x;
    let mut y = start.y;

    while x != end.x || y != end.y {
        let e2 = 2 * err;
        let step_x = e2 > -dy;
        let step_y = e2 < dx;

        if step_x {
            err -= dy;
            x += sx;
        }
        if step_y {
            err += dx;
            y += sy;
        }

        if step_x && step_y {
            // Corner cell: take the x move first.
            steps.push(GridCoordinate::new(x, y - sy));
        }
        steps.push(GridCoordinate::new(x, y));
    }

    steps
}

/// First impassable cell on `steps`, if any.
#[must_use]
pub fn first_obstruction<'a, G, I>(grid: &G, steps: I) -> Option<GridCoordinate>
where
    G: GridQuery + ?Sized,
    I: IntoIterator<Item = &'a GridCoordinate>,
{
    steps
        .into_iter()
        .copied()
        .find(|&cell| !grid.is_passable(cell))
}

/// Returns true if every cell on `steps` is passable.
#[must_use]
pub fn is_line_clear<'a, G, I>(grid: &G, steps: I) -> bool
where
    G: GridQuery + ?Sized,
    I: IntoIterator<Item = &'a GridCoordinate>,
{
    first_obstruction(grid, steps).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{CellClass, TileGrid};

    fn c(x: i32, y: i32) -> GridCoordinate {
        GridCoordinate::new(x, y)
    }

    fn assert_orthogonal(start: GridCoordinate, steps: &StepQueue) {
        let mut prev = start;
        for &cell in steps.iter() {
            assert!(
                prev.is_adjacent(cell),
                "{prev} -> {cell} is not an orthogonal unit step"
            );
            prev = cell;
        }
    }

    #[test]
    fn test_horizontal_line() {
        let steps = plan_line(c(0, 0), c(4, 0));
        assert_eq!(steps.to_vec(), vec![c(1, 0), c(2, 0), c(3, 0), c(4, 0)]);
    }

    #[test]
    fn test_vertical_line_downwards() {
        let steps = plan_line(c(2, 3), c(2, 0));
        assert_eq!(steps.to_vec(), vec![c(2, 2), c(2, 1), c(2, 0)]);
    }

    #[test]
    fn test_lines_near_coordinate_limits() {
        let start = c(i32::MAX - 2, i32::MIN + 1);
        let end = c(i32::MAX, i32::MIN + 3);
        let steps = plan_line(start, end);
        assert_eq!(steps.len(), 4);
        assert_eq!(steps.back(), Some(end));
        assert_orthogonal(start, &steps);
    }

    #[test]
    fn test_pure_diagonal_is_split() {
        let steps = plan_line(c(0, 0), c(2, 2));
        assert_eq!(steps.to_vec(), vec![c(1, 0), c(1, 1), c(2, 1), c(2, 2)]);
    }

    #[test]
    fn test_three_four_line() {
        let start = c(0, 0);
        let steps = plan_line(start, c(3, 4));
        assert_eq!(steps.len(), 7);
        assert_eq!(steps.back(), Some(c(3, 4)));
        assert!(!steps.contains(start));
        assert_orthogonal(start, &steps);
    }

    #[test]
    fn test_negative_quadrant() {
        let start = c(0, 0);
        let steps = plan_line(start, c(-5, -2));
        assert_eq!(steps.len(), 7);
        assert_eq!(steps.back(), Some(c(-5, -2)));
        assert_orthogonal(start, &steps);
    }

    #[test]
    fn test_same_cell_is_empty() {
        assert!(plan_line(c(3, 3), c(3, 3)).is_empty());
    }

    #[test]
    fn test_determinism() {
        let a = plan_line(c(-7, 2), c(11, -9));
        let b = plan_line(c(-7, 2), c(11, -9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_first_obstruction() {
        let mut grid = TileGrid::filled(6, 1, CellClass::Grass);
        grid.set_cell(c(2, 0), CellClass::Water);

        let steps = plan_line(c(0, 0), c(4, 0));
        assert_eq!(first_obstruction(&grid, steps.iter()), Some(c(2, 0)));
        assert!(!is_line_clear(&grid, steps.iter()));

        let clear = plan_line(c(3, 0), c(5, 0));
        assert!(is_line_clear(&grid, clear.iter()));

        // Leaving the grid counts as an obstruction.
        let off_grid = plan_line(c(4, 0), c(7, 0));
        assert_eq!(first_obstruction(&grid, off_grid.iter()), Some(c(6, 0)));
    }
}
