//! Integer grid geometry.
//!
//! The board is a fixed `columns × rows` lattice of cells. Column 0 is the
//! defended edge; attackers enter from beyond the last column and walk
//! west. Positions are signed so that entities may sit outside the board
//! (attackers waiting to enter, projectiles that have flown off the far edge).

use serde::{Deserialize, Serialize};

/// A cell coordinate on (or off) the board.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct GridPos {
    /// Column index, 0 at the defended edge.
    pub column: i32,
    /// Row (lane) index.
    pub row: i32,
}

impl GridPos {
    /// Create a new grid position.
    #[must_use]
    pub const fn new(column: i32, row: i32) -> Self {
        Self { column, row }
    }

    /// Translate this position by a displacement.
    #[must_use]
    pub const fn offset(self, delta: GridDelta) -> Self {
        Self {
            column: self.column + delta.columns,
            row: self.row + delta.rows,
        }
    }

    /// The 3×3 block of cells centred on this one, row-major, centre included.
    ///
    /// Cells are not clipped to any board; callers filter with
    /// [`GridSize::contains`].
    pub fn neighborhood(self) -> impl Iterator<Item = Self> {
        (-1..=1).flat_map(move |dr| {
            (-1..=1).map(move |dc| Self::new(self.column + dc, self.row + dr))
        })
    }
}

impl std::fmt::Display for GridPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

/// A per-turn displacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridDelta {
    /// Column change per turn.
    pub columns: i32,
    /// Row change per turn.
    pub rows: i32,
}

impl GridDelta {
    /// Create a new displacement.
    #[must_use]
    pub const fn new(columns: i32, rows: i32) -> Self {
        Self { columns, rows }
    }

    /// Move `speed` cells toward the defended edge.
    #[must_use]
    pub const fn west(speed: i32) -> Self {
        Self::new(-speed, 0)
    }

    /// Move `speed` cells toward the far edge.
    #[must_use]
    pub const fn east(speed: i32) -> Self {
        Self::new(speed, 0)
    }
}

/// Board dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    /// Number of columns.
    pub columns: i32,
    /// Number of rows.
    pub rows: i32,
}

impl GridSize {
    /// Create a new board size.
    #[must_use]
    pub const fn new(columns: i32, rows: i32) -> Self {
        Self { columns, rows }
    }

    /// Check whether a cell lies on the board.
    #[must_use]
    pub const fn contains(&self, pos: GridPos) -> bool {
        pos.column >= 0 && pos.column < self.columns && pos.row >= 0 && pos.row < self.rows
    }

    /// Check whether a cell lies past the far (spawn-side) edge.
    #[must_use]
    pub const fn is_beyond_far_edge(&self, pos: GridPos) -> bool {
        pos.column >= self.columns
    }

    /// All on-board cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = GridPos> {
        let columns = self.columns;
        (0..self.rows).flat_map(move |row| (0..columns).map(move |column| GridPos::new(column, row)))
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self::new(10, 5)
    }
}
