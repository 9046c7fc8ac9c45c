use super::subscriber::*;
use super::stream_error::*;

use std::sync::*;
use std::sync::atomic::{AtomicU64, Ordering};

///
/// Hooks that let a `PushSubscription` react to demand and count the signals it delivers
///
/// The default implementation of every hook is a no-op, which is the behaviour of a 'full push'
/// subscription: messages are delivered as soon as they are produced.
///
pub trait DemandPolicy: Send+Sync {
    ///
    /// New demand has been requested for the subscription
    ///
    fn on_request(&self, _n: u64) -> Result<(), StreamError> { Ok(()) }

    ///
    /// The subscription has been cancelled
    ///
    fn on_cancel(&self) { }

    ///
    /// Counts a data signal sent through the subscription
    ///
    fn increment_current_next_signals(&self) { }

    ///
    /// Sets the maximum number of signals to request at once
    ///
    fn max_capacity(&self, _n: u64) { }

    ///
    /// True if the next batch of signals should be requested now
    ///
    fn should_request_pending_signals(&self) -> bool { false }
}

///
/// Demand policy for subscriptions that push every message as it arrives
///
#[derive(Debug, Clone, Copy, Default)]
pub struct FullPush;

impl DemandPolicy for FullPush { }

///
/// Demand policy that passes requests and cancellation on to a subscription from elsewhere
///
pub struct ForwardDemand {
    /// The subscription that demand is forwarded to
    target: Arc<dyn Subscription>
}

impl ForwardDemand {
    pub fn new(target: Arc<dyn Subscription>) -> ForwardDemand {
        ForwardDemand { target }
    }
}

impl DemandPolicy for ForwardDemand {
    fn on_request(&self, n: u64) -> Result<(), StreamError> {
        self.target.request(n);
        Ok(())
    }

    fn on_cancel(&self) {
        self.target.cancel();
    }
}

///
/// Demand policy that counts delivered signals and asks for more once a batch has been used up
///
#[derive(Debug)]
pub struct BoundedDemand {
    /// Signals delivered since the last batch was requested
    current_next_signals: AtomicU64,

    /// The size of a batch
    capacity: AtomicU64
}

impl BoundedDemand {
    ///
    /// Creates a bounded policy that requests more after every `capacity` signals
    ///
    pub fn new(capacity: u64) -> BoundedDemand {
        BoundedDemand {
            current_next_signals:   AtomicU64::new(0),
            capacity:               AtomicU64::new(capacity)
        }
    }

    ///
    /// The current batch size
    ///
    pub fn capacity(&self) -> u64 {
        self.capacity.load(Ordering::Acquire)
    }

    ///
    /// The number of signals counted in the current batch
    ///
    pub fn current_next_signals(&self) -> u64 {
        self.current_next_signals.load(Ordering::Acquire)
    }
}

impl DemandPolicy for BoundedDemand {
    fn increment_current_next_signals(&self) {
        self.current_next_signals.fetch_add(1, Ordering::AcqRel);
    }

    fn max_capacity(&self, n: u64) {
        self.capacity.store(n, Ordering::Release);
    }

    fn should_request_pending_signals(&self) -> bool {
        let capacity = self.capacity();

        // Claim the batch: only one caller sees the count reach the capacity
        self.current_next_signals
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                if current >= capacity { Some(0) } else { None }
            })
            .is_ok()
    }
}
