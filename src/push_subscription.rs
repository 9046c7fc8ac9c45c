use super::demand::*;
use super::producer::*;
use super::subscriber::*;
use super::stream_error::*;
use super::demand_policy::*;

use std::fmt;
use std::panic;
use std::hash::{Hash, Hasher};
use std::sync::*;
use std::sync::atomic::{AtomicBool, Ordering};

///
/// Where a push subscription's messages come from
///
enum SubscriptionSource<Message> {
    /// The subscription was created by a known producer
    Producer {
        id:         ProducerId,
        producer:   Weak<dyn Producer<Message>>
    },

    /// The subscription has no producer of its own (for example, because it wraps another subscription)
    Detached
}

///
/// The relationship between a producer and one of its subscribers
///
/// A push subscription tracks the demand requested by its subscriber and guarantees that the
/// subscriber sees at most one completion. The producer calls `on_next`, `on_error` and
/// `on_complete` to deliver signals; the subscriber calls `request` and `cancel`.
///
/// The subscription holds only a weak reference to its subscriber: it will not keep a
/// subscriber alive once the rest of the stream has let it go.
///
pub struct PushSubscription<Message> {
    /// The subscriber that signals are delivered to
    subscriber: Weak<dyn Subscriber<Message>>,

    /// The producer that created this subscription
    source: SubscriptionSource<Message>,

    /// Set once the subscription has been cancelled or completed
    terminated: AtomicBool,

    /// Demand requested by a subscriber when there's no producer to pass it on to
    pending_request_signals: PendingDemand,

    /// Hooks for variations on how demand is processed
    policy: Box<dyn DemandPolicy>
}

impl<Message> PushSubscription<Message> {
    ///
    /// Creates a full-push subscription between a producer and a subscriber
    ///
    pub fn new<TProducer>(producer: &Arc<TProducer>, subscriber: Arc<dyn Subscriber<Message>>) -> PushSubscription<Message>
    where TProducer: 'static+Producer<Message> {
        Self::with_policy(producer, subscriber, FullPush)
    }

    ///
    /// Creates a subscription between a producer and a subscriber that processes demand using the specified policy
    ///
    pub fn with_policy<TProducer, Policy>(producer: &Arc<TProducer>, subscriber: Arc<dyn Subscriber<Message>>, policy: Policy) -> PushSubscription<Message>
    where   TProducer:  'static+Producer<Message>,
            Policy:     'static+DemandPolicy {
        let id                                  = producer.producer_id();
        let producer: Arc<dyn Producer<Message>> = producer.clone();
        let producer                            = Arc::downgrade(&producer);

        PushSubscription {
            subscriber:                 Arc::downgrade(&subscriber),
            source:                     SubscriptionSource::Producer { id, producer },
            terminated:                 AtomicBool::new(false),
            pending_request_signals:    PendingDemand::new(),
            policy:                     Box::new(policy)
        }
    }

    ///
    /// Creates a subscription with no producer, which just tracks the demand requested by its subscriber
    ///
    pub fn detached<Policy>(subscriber: Arc<dyn Subscriber<Message>>, policy: Policy) -> PushSubscription<Message>
    where Policy: 'static+DemandPolicy {
        PushSubscription {
            subscriber:                 Arc::downgrade(&subscriber),
            source:                     SubscriptionSource::Detached,
            terminated:                 AtomicBool::new(false),
            pending_request_signals:    PendingDemand::new(),
            policy:                     Box::new(policy)
        }
    }

    ///
    /// Wraps a subscription from elsewhere so that its requests are tracked
    ///
    /// Errors raised while requesting more messages are sent to `error_subscriber`.
    ///
    pub fn wrap(subscription: Arc<dyn Subscription>, error_subscriber: Arc<dyn Subscriber<Message>>) -> PushSubscription<Message> {
        Self::detached(error_subscriber, ForwardDemand::new(subscription))
    }

    ///
    /// Requests `n` more messages
    ///
    /// This never fails: protocol violations and errors from the demand policy are sent to the
    /// subscriber's `on_error` instead.
    ///
    pub fn request(&self, n: u64) {
        let result = panic::catch_unwind(panic::AssertUnwindSafe(|| self.try_request(n)))
            .unwrap_or_else(|payload| Err(StreamError::from_panic(payload)));

        if let Err(error) = result {
            self.on_error(error);
        }
    }

    ///
    /// Adds to the pending demand (if detached) and passes the request on to the policy
    ///
    fn try_request(&self, n: u64) -> Result<(), StreamError> {
        if n == 0 {
            return Err(StreamError::InvalidDemand(n));
        }

        if let SubscriptionSource::Detached = self.source {
            if let DemandChange::Overflowed { pending, requested } = self.pending_request_signals.request(n) {
                log::warn!("Demand overflow on subscription: {} pending, {} requested", pending, requested);
                return Err(StreamError::DemandOverflow { pending, requested });
            }
        }

        self.policy.on_request(n)
    }

    ///
    /// Cancels this subscription, removing it from its producer
    ///
    /// Cancelling a subscription that's already terminated has no effect.
    ///
    pub fn cancel(&self) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            return;
        }

        if let SubscriptionSource::Producer { id, producer } = &self.source {
            log::debug!("Cancelling subscription to {}", id);

            if let Some(producer) = producer.upgrade() {
                producer.forget_subscription(self);
            }
        }

        self.policy.on_cancel();
    }

    ///
    /// Delivers a message to the subscriber, unless this subscription has been terminated
    ///
    pub fn on_next(&self, message: Message) {
        if !self.terminated.load(Ordering::Acquire) {
            if let Some(subscriber) = self.subscriber.upgrade() {
                subscriber.on_next(message);
            }
        }
    }

    ///
    /// Completes the subscription, notifying the subscriber if this is the first time it has been terminated
    ///
    pub fn on_complete(&self) {
        if self.terminated.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_ok() {
            if let Some(subscriber) = self.subscriber.upgrade() {
                subscriber.on_complete();
            }
        }
    }

    ///
    /// Sends an error to the subscriber
    ///
    /// Errors are delivered even if the subscription has already been cancelled or completed.
    ///
    pub fn on_error(&self, error: StreamError) {
        if let Some(subscriber) = self.subscriber.upgrade() {
            subscriber.on_error(error);
        }
    }

    ///
    /// Tells the subscriber that a batch has finished
    ///
    pub fn on_flush(&self) {
        if !self.terminated.load(Ordering::Acquire) {
            if let Some(subscriber) = self.subscriber.upgrade() {
                subscriber.on_flush();
            }
        }
    }

    ///
    /// Adds to the pending demand, saturating at the maximum rather than overflowing
    ///
    pub fn update_pending_requests(&self, n: u64) -> u64 {
        self.pending_request_signals.update(n)
    }

    ///
    /// Takes the pending requests, leaving none pending (unless the demand is unbounded)
    ///
    pub fn clear_pending_requests(&self) -> u64 {
        self.pending_request_signals.clear()
    }

    /// The number of requests that have been made but not yet passed on
    pub fn pending_request_signals(&self) -> u64 {
        self.pending_request_signals.get()
    }

    /// True once this subscription has been cancelled or completed
    pub fn is_complete(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// True if this subscription was created by a producer
    pub fn has_publisher(&self) -> bool {
        match self.source {
            SubscriptionSource::Producer { .. } => true,
            SubscriptionSource::Detached        => false
        }
    }

    /// The producer that created this subscription
    pub fn producer_id(&self) -> Option<ProducerId> {
        match &self.source {
            SubscriptionSource::Producer { id, .. } => Some(*id),
            SubscriptionSource::Detached            => None
        }
    }

    /// True while the subscriber is still alive
    pub fn has_subscriber(&self) -> bool {
        self.subscriber.strong_count() > 0
    }

    ///
    /// Retrieves the subscriber, if it's still alive
    ///
    pub fn subscriber(&self) -> Option<Arc<dyn Subscriber<Message>>> {
        self.subscriber.upgrade()
    }

    ///
    /// Counts a message delivered through this subscription against its demand policy
    ///
    pub fn increment_current_next_signals(&self) {
        self.policy.increment_current_next_signals()
    }

    ///
    /// Sets the largest batch the demand policy will request at once
    ///
    pub fn max_capacity(&self, n: u64) {
        self.policy.max_capacity(n)
    }

    ///
    /// True if the demand policy wants the next batch to be requested now
    ///
    pub fn should_request_pending_signals(&self) -> bool {
        self.policy.should_request_pending_signals()
    }

    ///
    /// Address of the subscriber, used as its identity
    ///
    fn subscriber_address(&self) -> usize {
        Weak::as_ptr(&self.subscriber) as *const () as usize
    }
}

impl<Message> Subscription for PushSubscription<Message>
where Message: 'static {
    fn request(&self, n: u64) {
        PushSubscription::request(self, n)
    }

    fn cancel(&self) {
        PushSubscription::cancel(self)
    }
}

impl<Message> PartialEq for PushSubscription<Message> {
    fn eq(&self, other: &Self) -> bool {
        self.producer_id() == other.producer_id()
            && self.subscriber_address() == other.subscriber_address()
    }
}

impl<Message> Eq for PushSubscription<Message> { }

impl<Message> Hash for PushSubscription<Message> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.producer_id().hash(state);
        self.subscriber_address().hash(state);
    }
}

impl<Message> fmt::Display for PushSubscription<Message> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{push}}")
    }
}

impl<Message> fmt::Debug for PushSubscription<Message> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PushSubscription")
            .field("producer", &self.producer_id())
            .field("terminated", &self.is_complete())
            .field("pending_request_signals", &self.pending_request_signals())
            .finish()
    }
}
