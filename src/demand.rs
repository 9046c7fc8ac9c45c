use std::sync::atomic::{AtomicU64, Ordering};

///
/// The outcome of adding a request to a `PendingDemand` counter
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemandChange {
    /// The demand was added, leaving this many requests pending
    Pending(u64),

    /// The demand is unbounded (either it already was, or this request took it exactly to the maximum)
    Unbounded,

    /// The request would have overflowed the counter, which has been clamped to the maximum
    Overflowed { pending: u64, requested: u64 },
}

///
/// Counts the number of elements that have been requested but not yet received
///
/// The counter saturates at `u64::MAX`, which is treated as unbounded demand: once reached,
/// further requests and clears leave it unchanged.
///
#[derive(Debug, Default)]
pub struct PendingDemand {
    pending: AtomicU64
}

impl PendingDemand {
    /// The value that represents unbounded demand
    pub const UNBOUNDED: u64 = u64::MAX;

    ///
    /// Creates a new demand counter with no pending requests
    ///
    pub fn new() -> PendingDemand {
        PendingDemand {
            pending: AtomicU64::new(0)
        }
    }

    ///
    /// The number of requests that are currently pending
    ///
    #[inline]
    pub fn get(&self) -> u64 {
        self.pending.load(Ordering::Acquire)
    }

    ///
    /// True if this counter has saturated
    ///
    #[inline]
    pub fn is_unbounded(&self) -> bool {
        self.get() == Self::UNBOUNDED
    }

    ///
    /// Adds a request to this counter, reporting an overflow if the addition would not fit
    ///
    /// An overflowing request still leaves the counter at the maximum value.
    ///
    pub fn request(&self, requested: u64) -> DemandChange {
        let mut overflowed = false;

        let previous = self.pending.fetch_update(Ordering::AcqRel, Ordering::Acquire, |pending| {
            if pending == Self::UNBOUNDED {
                // No further requests are needed once the demand is unbounded
                None
            } else {
                match pending.checked_add(requested) {
                    Some(total) => { overflowed = false; Some(total) },
                    None        => { overflowed = true; Some(Self::UNBOUNDED) }
                }
            }
        });

        match previous {
            Err(_)                                  => DemandChange::Unbounded,
            Ok(pending) if overflowed               => DemandChange::Overflowed { pending, requested },
            Ok(pending)                             => {
                let total = pending + requested;

                if total == Self::UNBOUNDED {
                    DemandChange::Unbounded
                } else {
                    DemandChange::Pending(total)
                }
            }
        }
    }

    ///
    /// Adds to the counter, saturating at the maximum value rather than overflowing
    ///
    /// Returns the new pending count
    ///
    pub fn update(&self, requested: u64) -> u64 {
        let previous = self.pending.fetch_update(Ordering::AcqRel, Ordering::Acquire, |pending| {
            Some(pending.saturating_add(requested))
        });

        // fetch_update only fails if the closure returns None
        match previous {
            Ok(pending)     => pending.saturating_add(requested),
            Err(pending)    => pending
        }
    }

    ///
    /// Takes the pending requests from this counter, resetting it to 0
    ///
    /// Unbounded demand is not reset: the maximum value is returned and kept.
    ///
    pub fn clear(&self) -> u64 {
        let previous = self.pending.fetch_update(Ordering::AcqRel, Ordering::Acquire, |pending| {
            if pending == Self::UNBOUNDED {
                None
            } else {
                Some(0)
            }
        });

        match previous {
            Ok(pending)     => pending,
            Err(pending)    => pending
        }
    }
}
