use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use boxoffice_alloc::{AllocError, AllocatorKind, SeatAllocator};
use boxoffice_domain::{LayoutError, SeatHold, SeatLayout};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;

use crate::clock::{Clock, SystemClock};
use crate::codes;
use crate::config::EngineConfig;

#[derive(Debug, thiserror::Error)]
pub enum TicketError {
    #[error("seat count {requested} out of range 1..={capacity}")]
    InvalidSeatCount { requested: usize, capacity: usize },

    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// The allocator refused a request the service had already validated
    /// against the availability counter. Never expected in a consistent
    /// engine; surfacing it beats silently overbooking.
    #[error("allocator refused a pre-validated request: {0}")]
    AllocatorContract(#[from] AllocError),
}

/// Sink for holds removed by the expiration sweep.
pub trait ExpiryObserver: Send + Sync {
    fn on_hold_expired(&self, hold: &SeatHold);
}

struct NoopObserver;

impl ExpiryObserver for NoopObserver {
    fn on_hold_expired(&self, _hold: &SeatHold) {}
}

/// The reservation engine for one venue.
///
/// All state lives behind a single mutex: the allocator, the live holds
/// keyed by id, the expiry queue in creation order, and the availability
/// counter. Public operations serialize on that mutex for their whole
/// duration; only the pure rendering of a confirmation code runs outside
/// it. There are no background timers: stale holds are reclaimed lazily
/// at the start of every operation, which works in amortized O(1) because
/// creation order is also expiration order.
///
/// A customer may take out any number of independent holds; newer holds
/// never extend older ones.
pub struct TicketService {
    layout: SeatLayout,
    hold_duration: Duration,
    salt: String,
    clock: Arc<dyn Clock>,
    observer: Box<dyn ExpiryObserver>,
    state: Mutex<EngineState>,
}

struct EngineState {
    allocator: Box<dyn SeatAllocator + Send>,
    holds: HashMap<i32, SeatHold>,
    expiry_queue: VecDeque<i32>,
    available: usize,
}

impl TicketService {
    pub fn new(layout: SeatLayout, hold_duration: Duration, allocator: AllocatorKind) -> Self {
        Self {
            state: Mutex::new(EngineState {
                allocator: allocator.build(&layout),
                holds: HashMap::new(),
                expiry_queue: VecDeque::new(),
                available: layout.capacity(),
            }),
            layout,
            hold_duration,
            salt: random_salt(),
            clock: Arc::new(SystemClock),
            observer: Box::new(NoopObserver),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, TicketError> {
        let layout = SeatLayout::new(config.venue.rows, config.venue.seats_per_row)?;
        let duration = Duration::seconds(config.holds.duration_seconds as i64);
        let mut service = Self::new(layout, duration, config.holds.allocator);
        if let Some(salt) = &config.holds.salt {
            service.salt = salt.clone();
        }
        Ok(service)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn ExpiryObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = salt.into();
        self
    }

    /// Replaces the placement strategy; meant for hosts bringing their own.
    pub fn with_allocator(self, allocator: Box<dyn SeatAllocator + Send>) -> Self {
        self.lock_state().allocator = allocator;
        self
    }

    pub fn layout(&self) -> &SeatLayout {
        &self.layout
    }

    /// The number of seats that are neither held nor reserved.
    pub fn num_available(&self) -> usize {
        let mut state = self.lock_state();
        self.expire_holds(&mut state);
        state.available
    }

    /// Finds and holds the best available group of `num_seats` for a
    /// customer. Returns `Ok(None)` when fewer seats than requested are
    /// currently available; the hold otherwise lasts for the configured
    /// duration unless reserved first.
    pub fn find_and_hold(
        &self,
        num_seats: usize,
        customer_email: &str,
    ) -> Result<Option<SeatHold>, TicketError> {
        let capacity = self.layout.capacity();
        if num_seats == 0 || num_seats > capacity {
            return Err(TicketError::InvalidSeatCount {
                requested: num_seats,
                capacity,
            });
        }

        let mut state = self.lock_state();
        self.expire_holds(&mut state);
        if num_seats > state.available {
            return Ok(None);
        }

        let now = self.clock.now();
        let id = self.derive_unique_id(&state, customer_email, now);
        let mut hold = SeatHold::new(id, customer_email, now + self.hold_duration);
        state.allocator.allocate(num_seats, &mut hold).map_err(|err| {
            tracing::error!(
                %err,
                num_seats,
                available = state.available,
                "allocator refused a pre-validated request"
            );
            debug_assert!(false, "allocator refused a pre-validated request: {err}");
            err
        })?;

        state.available -= num_seats;
        state.holds.insert(id, hold.clone());
        state.expiry_queue.push_back(id);
        tracing::info!(held = num_seats, available = state.available, "held seats");
        Ok(Some(hold))
    }

    /// Commits a hold to a permanent reservation and returns its
    /// confirmation code. Returns `None` when the hold does not exist, has
    /// expired, or belongs to a different email; which of the three failed
    /// is deliberately not disclosed, so a guessed id leaks nothing.
    pub fn reserve(&self, hold_id: i32, customer_email: &str) -> Option<String> {
        {
            let mut state = self.lock_state();
            self.expire_holds(&mut state);
            let owned = state
                .holds
                .get(&hold_id)
                .is_some_and(|hold| hold.customer_email() == customer_email);
            if !owned {
                return None;
            }
            // Reserved seats never return to the pool: dropping the hold
            // without releasing the allocator is what makes it permanent.
            if let Some(hold) = state.holds.remove(&hold_id) {
                tracing::info!(
                    reserved = hold.seat_count(),
                    available = state.available,
                    "reserved seats"
                );
            }
        }
        // pure computation, kept outside the lock
        Some(codes::encode_confirmation(hold_id))
    }

    /// Derives an id that is unique among live holds, nudging the time
    /// component forward on collision. A clash is a ~2^-32 event, so the
    /// loop is amortized O(1).
    fn derive_unique_id(
        &self,
        state: &EngineState,
        customer_email: &str,
        now: DateTime<Utc>,
    ) -> i32 {
        let mut millis = now.timestamp_millis();
        loop {
            let id = codes::derive_hold_id(customer_email, &self.salt, millis);
            if !state.holds.contains_key(&id) {
                tracing::debug!(
                    customer = customer_email,
                    id = format_args!("{id:08X}"),
                    "derived hold id"
                );
                return id;
            }
            millis += 1;
        }
    }

    // Removes every hold whose expiration instant has passed, walking the
    // queue from the oldest end; ids already reserved are skipped. Holds
    // carry a fixed duration from a non-decreasing clock, so the queue is
    // ordered by expiration too and the sweep stops at the first live hold.
    fn expire_holds(&self, state: &mut EngineState) -> usize {
        let now = self.clock.now();
        let mut freed = 0;
        while let Some(&oldest) = state.expiry_queue.front() {
            match state.holds.get(&oldest) {
                None => {
                    // reserved in the meantime
                    state.expiry_queue.pop_front();
                }
                Some(hold) if hold.is_expired(now) => {
                    state.expiry_queue.pop_front();
                    if let Some(hold) = state.holds.remove(&oldest) {
                        state.allocator.release(&hold);
                        freed += hold.seat_count();
                        tracing::debug!(hold = %hold, expires_at = %hold.expires_at(), "hold expired");
                        self.observer.on_hold_expired(&hold);
                    }
                }
                Some(_) => break,
            }
        }
        state.available += freed;
        if freed != 0 {
            tracing::info!(expired = freed, available = state.available, "expired holds");
        }
        freed
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn random_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
