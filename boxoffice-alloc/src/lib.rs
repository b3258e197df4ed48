pub mod center_out;
pub mod three_pass;

pub use center_out::CenterOutAllocator;
pub use three_pass::ThreePassAllocator;

use boxoffice_domain::{LayoutError, SeatHold, SeatLayout};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum AllocError {
    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("no free seats left while placing a group of {0}")]
    Exhausted(usize),
}

/// Strategy for finding and releasing seats.
///
/// Not thread-safe; the ticket service serializes all access behind its
/// mutex. The caller guarantees that `allocate` is only invoked when at
/// least `num_seats` seats are free, so a failure is a contract violation
/// rather than an expected outcome.
pub trait SeatAllocator {
    /// Chooses `num_seats` free seats, marks them used, and records them in
    /// `hold`.
    fn allocate(&mut self, num_seats: usize, hold: &mut SeatHold) -> Result<(), AllocError>;

    /// Returns every seat of `hold` to the free pool. All of them are
    /// assumed to have been handed out by a prior `allocate`.
    fn release(&mut self, hold: &SeatHold);
}

/// Which placement strategy a service runs with; selected in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllocatorKind {
    /// Three-pass front-to-back greedy over row bitmaps; O(C/8) bytes of
    /// state per row.
    ThreePass,
    /// Center-preferring divide-and-conquer over per-length run indexes;
    /// amortized O(N) per allocation.
    #[default]
    CenterOut,
}

impl AllocatorKind {
    pub fn build(self, layout: &SeatLayout) -> Box<dyn SeatAllocator + Send> {
        match self {
            AllocatorKind::ThreePass => Box::new(ThreePassAllocator::new(layout)),
            AllocatorKind::CenterOut => Box::new(CenterOutAllocator::new(layout)),
        }
    }
}
