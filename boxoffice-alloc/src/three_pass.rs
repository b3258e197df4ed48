use boxoffice_domain::{SeatHold, SeatLayout};

use crate::{AllocError, SeatAllocator};

/// One bit per seat of a row.
#[derive(Debug)]
struct RowBitmap {
    words: Vec<u64>,
}

impl RowBitmap {
    fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
        }
    }

    fn get(&self, i: usize) -> bool {
        self.words[i / 64] >> (i % 64) & 1 == 1
    }

    fn set(&mut self, i: usize) {
        self.words[i / 64] |= 1 << (i % 64);
    }

    fn clear(&mut self, i: usize) {
        self.words[i / 64] &= !(1 << (i % 64));
    }
}

/// Space-lean greedy placement over per-row bitmaps.
///
/// A request for N seats runs three front-to-back passes with minimum run
/// sizes N, 2 and 1: keep the whole group together if any row can, otherwise
/// seat pairs, finally singletons. Pairs are taken in whole multiples of two
/// (four seats out of a five-seat run, not five), so an even remainder never
/// strands a lone companion. Front-most, left-most placement breaks ties.
///
/// Costs O(R*C) time per allocation and C bits of state per row.
pub struct ThreePassAllocator {
    layout: SeatLayout,
    used: Vec<RowBitmap>,
}

impl ThreePassAllocator {
    pub fn new(layout: &SeatLayout) -> Self {
        Self {
            layout: *layout,
            used: (0..layout.rows())
                .map(|_| RowBitmap::new(layout.seats_per_row()))
                .collect(),
        }
    }
}

impl SeatAllocator for ThreePassAllocator {
    fn allocate(&mut self, num_seats: usize, hold: &mut SeatHold) -> Result<(), AllocError> {
        let cols = self.layout.seats_per_row();
        let mut remaining = num_seats;
        for min_size in [num_seats, 2, 1] {
            'pass: for row in 0..self.layout.rows() {
                let bits = &mut self.used[row];
                let mut col1 = 0;
                while col1 < cols {
                    let mut col3 = col1 + 1;
                    while col3 < cols && bits.get(col3 - 1) == bits.get(col3) {
                        col3 += 1;
                    }
                    // all bits in [col1, col3) are equal
                    let size = col3 - col1;
                    if size >= min_size && !bits.get(col1) {
                        let take = (size / min_size * min_size).min(remaining);
                        for col in col1..col1 + take {
                            bits.set(col);
                        }
                        hold.add_range(&self.layout, row, col1, col1 + take - 1)?;
                        remaining -= take;
                        if remaining == 0 {
                            return Ok(());
                        }
                        if remaining < min_size {
                            break 'pass;
                        }
                    }
                    col1 = col3;
                }
            }
        }
        Err(AllocError::Exhausted(remaining))
    }

    fn release(&mut self, hold: &SeatHold) {
        for seat in hold.seats() {
            self.used[seat.row].clear(seat.col);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn empty_hold(id: i32) -> SeatHold {
        SeatHold::new(id, "test@stage.door", DateTime::UNIX_EPOCH)
    }

    fn take(alloc: &mut ThreePassAllocator, num_seats: usize) -> SeatHold {
        let mut hold = empty_hold(num_seats as i32);
        alloc.allocate(num_seats, &mut hold).unwrap();
        assert_eq!(num_seats, hold.seat_count());
        hold
    }

    #[test]
    fn test_contiguous_when_a_row_fits() {
        let layout = SeatLayout::new(3, 4).unwrap();
        let mut alloc = ThreePassAllocator::new(&layout);
        assert_eq!("0:0-3", take(&mut alloc, 4).seats_summary());
        assert_eq!("1:0-2", take(&mut alloc, 3).seats_summary());
        assert_eq!("2:0-1", take(&mut alloc, 2).seats_summary());
        assert_eq!("2:2-3", take(&mut alloc, 2).seats_summary());
        // the stage drains down to the last orphan seat
        assert_eq!("1:3", take(&mut alloc, 1).seats_summary());
    }

    #[test]
    fn test_pairs_pass_takes_whole_multiples_of_two() {
        let layout = SeatLayout::new(3, 5).unwrap();
        let mut alloc = ThreePassAllocator::new(&layout);
        let row0 = take(&mut alloc, 5);
        let _row1 = take(&mut alloc, 5);
        alloc.release(&row0);

        // two free rows of 5; a group of 8 gets 4 + 4, never splitting a pair
        assert_eq!("0:0-3|2:0-3", take(&mut alloc, 8).seats_summary());
        // the leftovers are the two orphan columns
        assert_eq!("0:4|2:4", take(&mut alloc, 2).seats_summary());
    }

    #[test]
    fn test_release_restores_placement() {
        let layout = SeatLayout::new(2, 4).unwrap();
        let mut alloc = ThreePassAllocator::new(&layout);
        let first = take(&mut alloc, 3);
        assert_eq!("0:0-2", first.seats_summary());
        take(&mut alloc, 4);

        alloc.release(&first);
        assert_eq!("0:0-2", take(&mut alloc, 3).seats_summary());
    }

    #[test]
    fn test_exhausted_grid_reports_shortfall() {
        let layout = SeatLayout::new(1, 2).unwrap();
        let mut alloc = ThreePassAllocator::new(&layout);
        take(&mut alloc, 2);

        let mut hold = empty_hold(99);
        match alloc.allocate(1, &mut hold) {
            Err(AllocError::Exhausted(1)) => {}
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }
}
