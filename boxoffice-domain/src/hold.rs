use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::layout::{LayoutError, SeatLayout};
use crate::seat::Seat;

/// A maximal run of contiguous seats a hold occupies within one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RowRange {
    pub row: usize,
    pub col_lo: usize,
    pub col_hi: usize,
}

/// A group of seats held for one customer until an expiration instant.
///
/// The identifier is derived from a cryptographic hash by the service, so
/// seats held by one customer cannot be taken over by another who merely
/// guesses the id and email. Equality is deep over (id, seat set); the
/// owning email and expiration instant are bookkeeping, not identity.
#[derive(Debug, Clone, Serialize)]
pub struct SeatHold {
    id: i32,
    seats: BTreeSet<Seat>,
    customer_email: String,
    expires_at: DateTime<Utc>,
}

impl SeatHold {
    pub fn new(id: i32, customer_email: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            id,
            seats: BTreeSet::new(),
            customer_email: customer_email.into(),
            expires_at,
        }
    }

    /// A hold over an explicit seat list, unowned and already expired.
    /// Seats arriving in any order end up in (row, column) order.
    pub fn with_seats(id: i32, seats: impl IntoIterator<Item = Seat>) -> Self {
        Self {
            id,
            seats: seats.into_iter().collect(),
            customer_email: String::new(),
            expires_at: DateTime::UNIX_EPOCH,
        }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn seat_count(&self) -> usize {
        self.seats.len()
    }

    /// Seats in (row, column) order.
    pub fn seats(&self) -> impl Iterator<Item = &Seat> {
        self.seats.iter()
    }

    pub fn customer_email(&self) -> &str {
        &self.customer_email
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Adds the inclusive column range [col_lo, col_hi] of `row`.
    pub fn add_range(
        &mut self,
        layout: &SeatLayout,
        row: usize,
        col_lo: usize,
        col_hi: usize,
    ) -> Result<(), LayoutError> {
        for col in col_lo..=col_hi {
            self.seats.insert(layout.at(row, col)?);
        }
        Ok(())
    }

    /// Groups the ordered seats into per-row contiguous runs.
    pub fn row_ranges(&self) -> Vec<RowRange> {
        let mut ranges: Vec<RowRange> = Vec::new();
        for seat in &self.seats {
            match ranges.last_mut() {
                Some(last) if last.row == seat.row && last.col_hi + 1 == seat.col => {
                    last.col_hi = seat.col;
                }
                _ => ranges.push(RowRange {
                    row: seat.row,
                    col_lo: seat.col,
                    col_hi: seat.col,
                }),
            }
        }
        ranges
    }

    /// Compact description of the held seats, e.g. `2:5-6,9|3:6-9` for seats
    /// 5, 6 and 9 in row 2 plus 6 through 9 in row 3. One such string maps to
    /// exactly one seat set, which makes it handy for assertions and logs.
    pub fn seats_summary(&self) -> String {
        let mut out = String::new();
        let mut last_row = None;
        for range in self.row_ranges() {
            match last_row {
                None => out.push_str(&format!("{}:", range.row)),
                Some(row) if row != range.row => out.push_str(&format!("|{}:", range.row)),
                Some(_) => out.push(','),
            }
            if range.col_lo == range.col_hi {
                out.push_str(&range.col_lo.to_string());
            } else {
                out.push_str(&format!("{}-{}", range.col_lo, range.col_hi));
            }
            last_row = Some(range.row);
        }
        out
    }
}

impl PartialEq for SeatHold {
    fn eq(&self, other: &Self) -> bool {
        // ids first (fast path), then the full seat sets
        self.id == other.id && self.seats == other.seats
    }
}

impl Eq for SeatHold {}

impl fmt::Display for SeatHold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:08X}@", self.id)?;
        for (i, seat) in self.seats.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{seat}")?;
        }
        Ok(())
    }
}
