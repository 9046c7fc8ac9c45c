use super::push_subscription::*;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_PRODUCER_ID: AtomicU64 = AtomicU64::new(0);

///
/// Identifies a producer, so subscriptions can be compared without holding on to their source
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProducerId(u64);

impl ProducerId {
    ///
    /// Allocates a new, unique producer ID
    ///
    pub fn new() -> ProducerId {
        ProducerId(NEXT_PRODUCER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ProducerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "producer#{}", self.0)
    }
}

///
/// The producing side of a stream, as seen by the subscriptions it hands out
///
pub trait Producer<Message>: Send+Sync {
    ///
    /// The identity of this producer
    ///
    fn producer_id(&self) -> ProducerId;

    ///
    /// Removes a subscription from this producer (called when the subscription is cancelled)
    ///
    fn forget_subscription(&self, subscription: &PushSubscription<Message>);
}
