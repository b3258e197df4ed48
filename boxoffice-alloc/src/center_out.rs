use std::collections::{BTreeMap, BTreeSet};

use boxoffice_domain::{SeatHold, SeatLayout};

use crate::{AllocError, SeatAllocator};

/// An empty run of seats within one row. The derived order (rank, then
/// row, then starting column) is the order the allocator prefers runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct FreeRun {
    rank: usize,
    row: usize,
    col_lo: usize,
    col_hi: usize,
}

impl FreeRun {
    fn len(&self) -> usize {
        self.col_hi - self.col_lo + 1
    }
}

/// Center-preferring placement in amortized O(N) per allocation.
///
/// Every free run is indexed twice: in `by_len[k]`, the ordered set of all
/// runs of exactly k seats, and in a per-row map keyed by starting column
/// (the neighbor index used when a released run coalesces). A request walks
/// a breadth-first split tree: place the whole group in one run if any is
/// long enough, otherwise halve it and try again. A failed probe for n
/// seats proves no run of length >= n exists, so the shared `bound` drops
/// to n and no later probe looks past it; with siblings processed largest
/// first, the probes cannot rescan the same empty lengths twice.
pub struct CenterOutAllocator {
    layout: SeatLayout,
    center_row: usize,
    center_col: usize,
    /// by_len[k] holds every free run of exactly k seats; index 0 stays empty.
    by_len: Vec<BTreeSet<FreeRun>>,
    /// Free runs per row, col_lo -> col_hi.
    row_runs: Vec<BTreeMap<usize, usize>>,
}

impl CenterOutAllocator {
    pub fn new(layout: &SeatLayout) -> Self {
        let rows = layout.rows();
        let cols = layout.seats_per_row();
        let mut allocator = Self {
            layout: *layout,
            center_row: rows / 2,
            center_col: cols / 2,
            by_len: (0..=cols).map(|_| BTreeSet::new()).collect(),
            row_runs: vec![BTreeMap::new(); rows],
        };
        for row in 0..rows {
            allocator.insert_run(row, 0, cols - 1);
        }
        allocator
    }

    /// Preference distance of a seat from the sweet spot: one per column
    /// left or right of the center column, one per row behind the center
    /// row, two per row in front of it (back beats front).
    fn rank_of(&self, row: usize, col: usize) -> usize {
        let horizontal = col.abs_diff(self.center_col);
        let vertical = if row >= self.center_row {
            row - self.center_row
        } else {
            2 * (self.center_row - row)
        };
        horizontal + vertical
    }

    /// A run ranks as well as the best seat it contains.
    fn run_rank(&self, row: usize, col_lo: usize, col_hi: usize) -> usize {
        self.rank_of(row, self.center_col.clamp(col_lo, col_hi))
    }

    fn insert_run(&mut self, row: usize, col_lo: usize, col_hi: usize) {
        let run = FreeRun {
            rank: self.run_rank(row, col_lo, col_hi),
            row,
            col_lo,
            col_hi,
        };
        self.by_len[run.len()].insert(run);
        self.row_runs[row].insert(col_lo, col_hi);
    }

    fn remove_run(&mut self, run: &FreeRun) {
        self.by_len[run.len()].remove(run);
        self.row_runs[run.row].remove(&run.col_lo);
    }

    /// Carves `num_seats` out of the most preferred free run whose length
    /// lies in [num_seats, bound]; false when no such run exists.
    fn take_best_run(
        &mut self,
        num_seats: usize,
        bound: usize,
        hold: &mut SeatHold,
    ) -> Result<bool, AllocError> {
        let mut best: Option<FreeRun> = None;
        for len in num_seats..=bound {
            if let Some(&candidate) = self.by_len[len].first() {
                if best.map_or(true, |current| candidate < current) {
                    best = Some(candidate);
                }
            }
        }
        let Some(run) = best else {
            return Ok(false);
        };

        // center the taken window on the run's best seat, biased left
        let pivot = self.center_col.clamp(run.col_lo, run.col_hi);
        let start = pivot
            .saturating_sub(num_seats / 2)
            .clamp(run.col_lo, run.col_hi + 1 - num_seats);

        self.remove_run(&run);
        if start > run.col_lo {
            self.insert_run(run.row, run.col_lo, start - 1);
        }
        if start + num_seats <= run.col_hi {
            self.insert_run(run.row, start + num_seats, run.col_hi);
        }
        hold.add_range(&self.layout, run.row, start, start + num_seats - 1)?;
        tracing::debug!(
            row = run.row,
            col_lo = start,
            col_hi = start + num_seats - 1,
            "placed seat range"
        );
        Ok(true)
    }
}

impl SeatAllocator for CenterOutAllocator {
    fn allocate(&mut self, num_seats: usize, hold: &mut SeatHold) -> Result<(), AllocError> {
        // No free run can be longer than a row, so the probe bound starts
        // there and only tightens as probes fail.
        let mut bound = self.layout.seats_per_row();
        let mut remaining = num_seats;
        let mut level = vec![num_seats];
        while !level.is_empty() {
            let mut split = Vec::new();
            for &group in &level {
                if self.take_best_run(group, bound, hold)? {
                    remaining -= group;
                    continue;
                }
                if group == 1 {
                    return Err(AllocError::Exhausted(remaining));
                }
                bound = bound.min(group);
                split.push(group - group / 2);
                split.push(group / 2);
            }
            sort_near_equal_desc(&mut split);
            level = split;
        }
        Ok(())
    }

    fn release(&mut self, hold: &SeatHold) {
        for range in hold.row_ranges() {
            let mut col_lo = range.col_lo;
            let mut col_hi = range.col_hi;

            let left = self.row_runs[range.row]
                .range(..range.col_lo)
                .next_back()
                .map(|(&lo, &hi)| (lo, hi));
            if let Some((lo, hi)) = left {
                if hi + 1 == range.col_lo {
                    self.remove_run(&FreeRun {
                        rank: self.run_rank(range.row, lo, hi),
                        row: range.row,
                        col_lo: lo,
                        col_hi: hi,
                    });
                    col_lo = lo;
                }
            }

            let right = self.row_runs[range.row]
                .range(range.col_hi + 1..)
                .next()
                .map(|(&lo, &hi)| (lo, hi));
            if let Some((lo, hi)) = right {
                if lo == range.col_hi + 1 {
                    self.remove_run(&FreeRun {
                        rank: self.run_rank(range.row, lo, hi),
                        row: range.row,
                        col_lo: lo,
                        col_hi: hi,
                    });
                    col_hi = hi;
                }
            }

            self.insert_run(range.row, col_lo, col_hi);
        }
    }
}

/// Sorts in place, descending, a sequence whose values span at most two
/// adjacent integers: one pass finds the extremes, a second moves every
/// minimum to the tail. Linear, which keeps sorting a whole split level
/// within the allocation's time budget.
fn sort_near_equal_desc(values: &mut Vec<usize>) {
    let Some(&first) = values.first() else {
        return;
    };
    let (mut min, mut max) = (first, first);
    for &value in values.iter() {
        min = min.min(value);
        max = max.max(value);
    }
    debug_assert!(max - min <= 1, "split level spans more than two sizes");
    if min == max {
        return;
    }
    let len = values.len();
    values.retain(|&value| value != min);
    values.resize(len, min);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn empty_hold(id: i32) -> SeatHold {
        SeatHold::new(id, "test@stage.door", DateTime::UNIX_EPOCH)
    }

    fn take(alloc: &mut CenterOutAllocator, num_seats: usize) -> SeatHold {
        let mut hold = empty_hold(num_seats as i32);
        alloc.allocate(num_seats, &mut hold).unwrap();
        assert_eq!(num_seats, hold.seat_count());
        alloc.assert_consistent();
        hold
    }

    impl CenterOutAllocator {
        /// Both run indexes must stay exact mirrors of each other.
        fn assert_consistent(&self) {
            let mut from_rows = Vec::new();
            for (row, runs) in self.row_runs.iter().enumerate() {
                for (&col_lo, &col_hi) in runs {
                    from_rows.push(FreeRun {
                        rank: self.run_rank(row, col_lo, col_hi),
                        row,
                        col_lo,
                        col_hi,
                    });
                }
            }
            let mut from_lens: Vec<FreeRun> = self
                .by_len
                .iter()
                .enumerate()
                .flat_map(|(len, set)| {
                    set.iter().inspect(move |run| assert_eq!(len, run.len())).copied()
                })
                .collect();
            from_rows.sort_by_key(|r| (r.row, r.col_lo));
            from_lens.sort_by_key(|r| (r.row, r.col_lo));
            assert_eq!(from_rows, from_lens);
        }

        fn free_seats(&self) -> usize {
            self.row_runs
                .iter()
                .flat_map(|runs| runs.iter())
                .map(|(&lo, &hi)| hi - lo + 1)
                .sum()
        }
    }

    #[test]
    fn test_preference_grid_5x11() {
        let layout = SeatLayout::new(5, 11).unwrap();
        let alloc = CenterOutAllocator::new(&layout);
        let expected = [
            "98765456789",
            "76543234567",
            "54321012345",
            "65432123456",
            "76543234567",
        ];
        for (row, line) in expected.iter().enumerate() {
            let rendered: String = (0..11)
                .map(|col| char::from_digit(alloc.rank_of(row, col) as u32, 10).unwrap())
                .collect();
            assert_eq!(*line, rendered, "row {row}");
        }
    }

    #[test]
    fn test_sort_near_equal_desc() {
        let mut values = vec![7, 6, 7, 6, 6, 7, 7];
        sort_near_equal_desc(&mut values);
        assert_eq!(vec![7, 7, 7, 7, 6, 6, 6], values);

        let mut values: Vec<usize> = vec![];
        sort_near_equal_desc(&mut values);
        assert!(values.is_empty());

        let mut values = vec![4, 4, 4];
        sort_near_equal_desc(&mut values);
        assert_eq!(vec![4, 4, 4], values);

        let mut values = vec![2, 3];
        sort_near_equal_desc(&mut values);
        assert_eq!(vec![3, 2], values);
    }

    #[test]
    fn test_single_seat_lands_on_the_sweet_spot() {
        let layout = SeatLayout::new(5, 11).unwrap();
        let mut alloc = CenterOutAllocator::new(&layout);
        assert_eq!("2:5", take(&mut alloc, 1).seats_summary());
        // next-best seat is one column off within the same row
        assert_eq!("2:4", take(&mut alloc, 1).seats_summary());
    }

    #[test]
    fn test_group_centers_within_best_row() {
        let layout = SeatLayout::new(5, 11).unwrap();
        let mut alloc = CenterOutAllocator::new(&layout);
        assert_eq!("2:3-7", take(&mut alloc, 5).seats_summary());
        // center row is split; next group prefers the row just behind
        assert_eq!("3:3-7", take(&mut alloc, 5).seats_summary());
    }

    #[test]
    fn test_oversized_group_splits_behind_center() {
        let layout = SeatLayout::new(5, 11).unwrap();
        let mut alloc = CenterOutAllocator::new(&layout);
        // 13 > 11 forces one split into 7 + 6, landing centered in the
        // center row and the one behind it
        assert_eq!("2:2-8|3:2-7", take(&mut alloc, 13).seats_summary());
    }

    #[test]
    fn test_split_prefers_snug_runs_over_better_ranked_small_ones() {
        let layout = SeatLayout::new(1, 7).unwrap();
        let mut alloc = CenterOutAllocator::new(&layout);
        assert_eq!("0:2-3", take(&mut alloc, 2).seats_summary());
        // free runs are 0-1 and 4-6; a group of 4 must split into 2 + 2 and
        // the right-hand run wins the first pair on rank
        assert_eq!("0:0-1,4-5", take(&mut alloc, 4).seats_summary());
        assert_eq!("0:6", take(&mut alloc, 1).seats_summary());
    }

    #[test]
    fn test_release_coalesces_both_neighbors() {
        let layout = SeatLayout::new(2, 4).unwrap();
        let mut alloc = CenterOutAllocator::new(&layout);
        let back = take(&mut alloc, 4);
        assert_eq!("1:0-3", back.seats_summary());
        let front = take(&mut alloc, 3);
        assert_eq!("0:1-3", front.seats_summary());
        let corner = take(&mut alloc, 1);
        assert_eq!("0:0", corner.seats_summary());
        assert_eq!(0, alloc.free_seats());

        alloc.release(&front);
        alloc.assert_consistent();
        alloc.release(&corner);
        alloc.assert_consistent();
        // 0:0 and 0:1-3 merged back into the full front row
        assert_eq!(4, alloc.free_seats());
        assert_eq!("0:0-3", take(&mut alloc, 4).seats_summary());
    }

    #[test]
    fn test_release_restores_identical_placement() {
        let layout = SeatLayout::new(5, 11).unwrap();
        let mut alloc = CenterOutAllocator::new(&layout);
        let first = take(&mut alloc, 5);
        let _neighbor = take(&mut alloc, 5);

        alloc.release(&first);
        let again = take(&mut alloc, 5);
        assert_eq!(first.seats_summary(), again.seats_summary());
    }

    #[test]
    fn test_drains_a_fragmented_grid_completely() {
        let layout = SeatLayout::new(3, 5).unwrap();
        let mut alloc = CenterOutAllocator::new(&layout);
        let singles: Vec<SeatHold> = (0..5).map(|_| take(&mut alloc, 1)).collect();
        take(&mut alloc, 10);
        assert_eq!(0, alloc.free_seats());

        for hold in &singles {
            alloc.release(hold);
            alloc.assert_consistent();
        }
        assert_eq!(5, alloc.free_seats());
        assert_eq!(5, take(&mut alloc, 5).seat_count());

        let mut hold = empty_hold(99);
        match alloc.allocate(1, &mut hold) {
            Err(AllocError::Exhausted(1)) => {}
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }
}
