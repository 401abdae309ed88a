//! Integer grid model and the cell classification boundary.
//!
//! The movement core only ever reads the grid through [`GridQuery`].
//! [`TileGrid`] is the in-memory implementation used by the simulation,
//! the headless runner and the tests.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::{Fixed, Vec2Fixed};

/// Integer cell position. Row 0 is the bottom row; `y` grows upwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct GridCoordinate {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl GridCoordinate {
    /// Create a coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Snap a world position to the nearest cell (ties round away from zero).
    #[must_use]
    pub fn from_world(pos: Vec2Fixed) -> Self {
        Self {
            x: pos.x.saturating_round().to_num::<i32>(),
            y: pos.y.saturating_round().to_num::<i32>(),
        }
    }

    /// World position of this cell.
    #[must_use]
    pub fn to_world(self) -> Vec2Fixed {
        Vec2Fixed::new(Fixed::from_num(self.x), Fixed::from_num(self.y))
    }

    /// Offset this coordinate by `direction` scaled by `distance`.
    #[must_use]
    pub fn offset(self, direction: Direction, distance: i32) -> Self {
        let (dx, dy) = direction.delta();
        Self {
            x: self.x + dx * distance,
            y: self.y + dy * distance,
        }
    }

    /// Manhattan distance in cells.
    #[must_use]
    pub fn manhattan_distance(self, other: Self) -> u32 {
        self.x.abs_diff(other.x).saturating_add(self.y.abs_diff(other.y))
    }

    /// True if the two cells share an edge.
    #[must_use]
    pub fn is_adjacent(self, other: Self) -> bool {
        self.manhattan_distance(other) == 1
    }
}

impl fmt::Display for GridCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for GridCoordinate {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

/// Orthogonal unit directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// +x
    Right,
    /// -x
    Left,
    /// +y
    Up,
    /// -y
    Down,
}

impl Direction {
    /// Probe order used by the reroute search.
    pub const PROBE_ORDER: [Direction; 4] = [Self::Right, Self::Left, Self::Up, Self::Down];

    /// Unit offset for this direction.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::Right => (1, 0),
            Self::Left => (-1, 0),
            Self::Up => (0, 1),
            Self::Down => (0, -1),
        }
    }
}

/// Terrain classification of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellClass {
    /// Open ground.
    #[default]
    Grass,
    /// Tilled ground.
    Dirt,
    /// Rock floor.
    Stone,
    /// Impassable water.
    Water,
    /// Laid path.
    Path,
    /// Outside the grid, or no tile present.
    None,
}

impl CellClass {
    /// Every classification, in declaration order.
    pub const ALL: [CellClass; 6] = [
        Self::Grass,
        Self::Dirt,
        Self::Stone,
        Self::Water,
        Self::Path,
        Self::None,
    ];

    /// Returns true if a mover may stand on this cell.
    #[must_use]
    pub const fn is_passable(self) -> bool {
        !matches!(self, Self::Water | Self::None)
    }

    /// Single-character glyph used by ASCII maps.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::Grass => '.',
            Self::Dirt => ',',
            Self::Stone => '#',
            Self::Water => '~',
            Self::Path => '=',
            Self::None => ' ',
        }
    }

    /// Inverse of [`glyph`](Self::glyph).
    #[must_use]
    pub fn from_glyph(glyph: char) -> Option<Self> {
        Self::ALL.into_iter().find(|class| class.glyph() == glyph)
    }
}

impl fmt::Display for CellClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Grass => "grass",
            Self::Dirt => "dirt",
            Self::Stone => "stone",
            Self::Water => "water",
            Self::Path => "path",
            Self::None => "none",
        };
        f.write_str(name)
    }
}

/// Read-only classification service.
///
/// Implementations must be deterministic and return [`CellClass::None`] for
/// anything outside the grid. Classification never fails.
pub trait GridQuery {
    /// Classify the cell at `coord`.
    fn classify(&self, coord: GridCoordinate) -> CellClass;

    /// Returns true if a mover may stand on `coord`.
    fn is_passable(&self, coord: GridCoordinate) -> bool {
        self.classify(coord).is_passable()
    }
}

impl<T: GridQuery + ?Sized> GridQuery for &T {
    fn classify(&self, coord: GridCoordinate) -> CellClass {
        (**self).classify(coord)
    }
}

/// Why a [`TileGrid::lookup`] produced no tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMiss {
    /// The coordinate lies outside the grid.
    OutOfBounds,
    /// The coordinate is inside the grid but no tile was placed there.
    NoTile,
}

/// Error from parsing an ASCII map.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridParseError {
    /// The map had no rows or an empty first row.
    #[error("ASCII map is empty")]
    Empty,
    /// Rows differ in length.
    #[error("row {row} has width {found}, expected {expected}")]
    RaggedRow {
        /// Row index from the top of the text.
        row: usize,
        /// Width of the offending row.
        found: usize,
        /// Width of the first row.
        expected: usize,
    },
    /// A character outside the legend.
    #[error("unknown tile glyph '{glyph}' in row {row}")]
    UnknownGlyph {
        /// Row index from the top of the text.
        row: usize,
        /// The offending character.
        glyph: char,
    },
}

/// Rectangular tile map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileGrid {
    /// Grid width in cells.
    width: u32,
    /// Grid height in cells.
    height: u32,
    /// Tiles stored in row-major order, row 0 first.
    cells: Vec<Option<CellClass>>,
}

impl TileGrid {
    /// Create a grid with every cell set to `class`.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is zero.
    #[must_use]
    pub fn filled(width: u32, height: u32, class: CellClass) -> Self {
        assert!(width > 0, "TileGrid width must be positive");
        assert!(height > 0, "TileGrid height must be positive");

        Self {
            width,
            height,
            cells: vec![Some(class); (width as usize) * (height as usize)],
        }
    }

    /// Generate the farmland field: alternating grass and dirt rows with a
    /// water channel along row 10 and a single pond at (15, 20).
    #[must_use]
    pub fn farmland(width: u32, height: u32) -> Self {
        let mut grid = Self::filled(width, height, CellClass::Grass);

        for y in 0..height {
            for x in 0..width {
                let class = match (y % 2 == 0, x % 2 == 0) {
                    _ if y == 10 => CellClass::Water,
                    (true, true) | (false, false) => CellClass::Grass,
                    (true, false) | (false, true) => CellClass::Dirt,
                };
                grid.set_cell(GridCoordinate::new(x as i32, y as i32), class);
            }
        }
        grid.set_cell(GridCoordinate::new(15, 20), CellClass::Water);

        grid
    }

    /// Parse an ASCII map. The first line of text is the TOP row.
    pub fn from_ascii<S: AsRef<str>>(rows: &[S]) -> Result<Self, GridParseError> {
        let expected = rows
            .first()
            .map(|row| row.as_ref().chars().count())
            .filter(|&w| w > 0)
            .ok_or(GridParseError::Empty)?;

        let height = rows.len();
        let mut cells = vec![None; expected * height];

        for (row_index, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            let found = row.chars().count();
            if found != expected {
                return Err(GridParseError::RaggedRow {
                    row: row_index,
                    found,
                    expected,
                });
            }

            let y = height - 1 - row_index;
            for (x, glyph) in row.chars().enumerate() {
                let class = CellClass::from_glyph(glyph).ok_or(GridParseError::UnknownGlyph {
                    row: row_index,
                    glyph,
                })?;
                cells[y * expected + x] = (class != CellClass::None).then_some(class);
            }
        }

        Ok(Self {
            width: expected as u32,
            height: height as u32,
            cells,
        })
    }

    /// Grid width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Check if a coordinate is within grid bounds.
    #[must_use]
    pub fn in_bounds(&self, coord: GridCoordinate) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && (coord.x as u32) < self.width
            && (coord.y as u32) < self.height
    }

    #[inline]
    fn index(&self, coord: GridCoordinate) -> Option<usize> {
        self.in_bounds(coord)
            .then(|| (coord.y as usize) * (self.width as usize) + (coord.x as usize))
    }

    /// Look up a tile, distinguishing out-of-bounds from missing tiles.
    pub fn lookup(&self, coord: GridCoordinate) -> Result<CellClass, LookupMiss> {
        let index = self.index(coord).ok_or(LookupMiss::OutOfBounds)?;
        self.cells[index].ok_or(LookupMiss::NoTile)
    }

    /// Set the tile at `coord`. Returns `false` if out of bounds.
    pub fn set_cell(&mut self, coord: GridCoordinate, class: CellClass) -> bool {
        match self.index(coord) {
            Some(index) => {
                self.cells[index] = (class != CellClass::None).then_some(class);
                true
            }
            None => false,
        }
    }

    /// Remove the tile at `coord`. Returns `false` if out of bounds.
    pub fn clear_cell(&mut self, coord: GridCoordinate) -> bool {
        self.set_cell(coord, CellClass::None)
    }

    /// Render the grid as ASCII rows, top row first.
    #[must_use]
    pub fn to_ascii(&self) -> Vec<String> {
        (0..self.height as i32)
            .rev()
            .map(|y| {
                (0..self.width as i32)
                    .map(|x| self.classify(GridCoordinate::new(x, y)).glyph())
                    .collect()
            })
            .collect()
    }
}

impl GridQuery for TileGrid {
    fn classify(&self, coord: GridCoordinate) -> CellClass {
        self.lookup(coord).unwrap_or(CellClass::None)
    }
}

impl Default for TileGrid {
    /// The 128x128 farmland field.
    fn default() -> Self {
        Self::farmland(128, 128)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passability() {
        let passable: Vec<_> = CellClass::ALL
            .into_iter()
            .filter(|c| c.is_passable())
            .collect();
        assert_eq!(
            passable,
            vec![
                CellClass::Grass,
                CellClass::Dirt,
                CellClass::Stone,
                CellClass::Path
            ]
        );
    }

    #[test]
    fn test_snap_rounds_to_nearest() {
        let pos = Vec2Fixed::new(Fixed::from_num(2.4), Fixed::from_num(-1.6));
        assert_eq!(GridCoordinate::from_world(pos), GridCoordinate::new(2, -2));

        let half = Vec2Fixed::new(Fixed::from_num(0.5), Fixed::from_num(-0.5));
        assert_eq!(GridCoordinate::from_world(half), GridCoordinate::new(1, -1));
    }

    #[test]
    fn test_out_of_bounds_is_none() {
        let grid = TileGrid::filled(4, 4, CellClass::Grass);
        assert_eq!(grid.classify(GridCoordinate::new(-1, 0)), CellClass::None);
        assert_eq!(grid.classify(GridCoordinate::new(4, 0)), CellClass::None);
        assert_eq!(grid.classify(GridCoordinate::new(0, 4)), CellClass::None);
        assert_eq!(
            grid.lookup(GridCoordinate::new(0, 4)),
            Err(LookupMiss::OutOfBounds)
        );
    }

    #[test]
    fn test_missing_tile_is_distinguishable() {
        let mut grid = TileGrid::filled(3, 3, CellClass::Dirt);
        assert!(grid.clear_cell(GridCoordinate::new(1, 1)));
        assert_eq!(grid.lookup(GridCoordinate::new(1, 1)), Err(LookupMiss::NoTile));
        assert_eq!(grid.classify(GridCoordinate::new(1, 1)), CellClass::None);
        assert!(!grid.is_passable(GridCoordinate::new(1, 1)));
    }

    #[test]
    fn test_farmland_layout() {
        let grid = TileGrid::farmland(32, 32);
        assert_eq!(grid.classify(GridCoordinate::new(0, 0)), CellClass::Grass);
        assert_eq!(grid.classify(GridCoordinate::new(1, 0)), CellClass::Dirt);
        assert_eq!(grid.classify(GridCoordinate::new(0, 1)), CellClass::Dirt);
        assert_eq!(grid.classify(GridCoordinate::new(1, 1)), CellClass::Grass);
        assert_eq!(grid.classify(GridCoordinate::new(7, 10)), CellClass::Water);
        assert_eq!(grid.classify(GridCoordinate::new(15, 20)), CellClass::Water);
        assert_eq!(grid.classify(GridCoordinate::new(16, 20)), CellClass::Grass);
    }

    #[test]
    fn test_ascii_round_trip_orientation() {
        let rows = ["..~", "#= "];
        let grid = TileGrid::from_ascii(&rows).unwrap();
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 2);
        // Bottom row is the last line of text.
        assert_eq!(grid.classify(GridCoordinate::new(0, 0)), CellClass::Stone);
        assert_eq!(grid.classify(GridCoordinate::new(1, 0)), CellClass::Path);
        assert_eq!(grid.lookup(GridCoordinate::new(2, 0)), Err(LookupMiss::NoTile));
        assert_eq!(grid.classify(GridCoordinate::new(2, 1)), CellClass::Water);
        assert_eq!(grid.to_ascii(), vec!["..~".to_string(), "#= ".to_string()]);
    }

    #[test]
    fn test_ascii_errors() {
        let empty: [&str; 0] = [];
        assert_eq!(TileGrid::from_ascii(&empty), Err(GridParseError::Empty));
        assert!(matches!(
            TileGrid::from_ascii(&["...", ".."]),
            Err(GridParseError::RaggedRow { row: 1, .. })
        ));
        assert!(matches!(
            TileGrid::from_ascii(&["..x"]),
            Err(GridParseError::UnknownGlyph { glyph: 'x', .. })
        ));
    }

    #[test]
    fn test_offset_and_adjacency() {
        let origin = GridCoordinate::new(1, 0);
        assert_eq!(origin.offset(Direction::Up, 3), GridCoordinate::new(1, 3));
        assert_eq!(origin.offset(Direction::Left, 2), GridCoordinate::new(-1, 0));
        assert!(origin.is_adjacent(GridCoordinate::new(1, 1)));
        assert!(!origin.is_adjacent(GridCoordinate::new(2, 1)));
    }
}
