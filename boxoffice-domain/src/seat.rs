use std::fmt;

use serde::{Deserialize, Serialize};

/// A single seat, addressed by 0-based row and column.
///
/// Seats are ordered by (row, column), which is the order holds list them
/// in. Two seats are adjacent iff they share a row and their columns differ
/// by exactly one; the seat itself carries no layout reference, so adjacency
/// never depends on row width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Seat {
    pub row: usize,
    pub col: usize,
}

impl Seat {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// True iff `other` sits immediately left or right of this seat.
    pub fn is_adjacent(&self, other: &Seat) -> bool {
        self.row == other.row && self.col.abs_diff(other.col) == 1
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}
