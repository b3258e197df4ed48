use serde::{Deserialize, Serialize};

use crate::seat::Seat;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("seat ({row},{col}) outside the {rows}x{cols} stage")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("stage must have at least one row and one seat per row")]
    InvalidDimensions,
}

/// Immutable rectangular stage definition.
///
/// Maps between (row, column) coordinates and 0-based linear indexes, and is
/// the only place seat bounds are enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatLayout {
    rows: usize,
    cols: usize,
}

impl SeatLayout {
    pub fn new(rows: usize, cols: usize) -> Result<Self, LayoutError> {
        if rows == 0 || cols == 0 {
            return Err(LayoutError::InvalidDimensions);
        }
        Ok(Self { rows, cols })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn seats_per_row(&self) -> usize {
        self.cols
    }

    /// Total number of seats on the stage.
    pub fn capacity(&self) -> usize {
        self.rows * self.cols
    }

    /// The seat at a specific row and column, bounds-checked.
    pub fn at(&self, row: usize, col: usize) -> Result<Seat, LayoutError> {
        if row >= self.rows || col >= self.cols {
            return Err(LayoutError::OutOfBounds {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(Seat::new(row, col))
    }

    /// Converts a 0-based linear index into a seat.
    pub fn from_index(&self, idx: usize) -> Result<Seat, LayoutError> {
        self.at(idx / self.cols, idx % self.cols)
    }

    /// Converts a seat into its 0-based linear index without bounds checks.
    pub fn index_of(&self, seat: &Seat) -> usize {
        self.cols * seat.row + seat.col
    }
}
