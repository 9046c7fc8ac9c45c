use super::stage::*;
use super::producer::*;
use super::subscriber::*;
use super::dispatcher::*;
use super::stream_error::*;
use super::demand_policy::*;
use super::push_subscription::*;

use smallvec::*;

use std::panic;
use std::sync::*;

/// The number of messages an action requests from its upstream subscription at a time, unless configured otherwise
pub const DEFAULT_BATCH_SIZE: u64 = 1024;

///
/// The subscribers attached to an action
///
/// Signals are delivered outside of the lock on the subscriber list, so subscribers may
/// cancel their subscriptions while they are being called.
///
pub struct Downstream<Message> {
    /// The subscriptions that signals are broadcast to
    subscriptions: Mutex<Vec<Arc<PushSubscription<Message>>>>
}

impl<Message> Downstream<Message> {
    fn new() -> Downstream<Message> {
        Downstream {
            subscriptions: Mutex::new(vec![])
        }
    }

    ///
    /// Copies the current set of subscriptions so they can be notified without holding the lock
    ///
    fn snapshot(&self) -> SmallVec<[Arc<PushSubscription<Message>>; 8]> {
        self.lock().iter().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<Vec<Arc<PushSubscription<Message>>>> {
        // A subscriber that panicked while we held the lock leaves the list itself intact
        self.subscriptions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    ///
    /// Adds a subscription, returning false if an equal subscription is already present
    ///
    /// Subscriptions whose subscribers have been dropped are discarded at the same time.
    ///
    fn add(&self, subscription: Arc<PushSubscription<Message>>) -> bool {
        let mut subscriptions = self.lock();

        subscriptions.retain(|existing| existing.has_subscriber());

        if subscriptions.iter().any(|existing| **existing == *subscription) {
            false
        } else {
            subscriptions.push(subscription);
            true
        }
    }

    ///
    /// Removes a subscription from this downstream
    ///
    fn remove(&self, subscription: &PushSubscription<Message>) {
        self.lock().retain(|existing| **existing != *subscription);
    }

    ///
    /// The number of subscribers currently attached
    ///
    pub fn count_subscribers(&self) -> usize {
        self.lock().len()
    }

    ///
    /// Sends an error to every subscriber
    ///
    pub fn broadcast_error(&self, error: StreamError) {
        self.snapshot().into_iter().for_each(|subscription| subscription.on_error(error.clone()));
    }

    ///
    /// Completes every subscriber, after which they are forgotten
    ///
    pub fn broadcast_complete(&self) {
        let subscriptions = self.lock().drain(..).collect::<SmallVec<[_; 8]>>();

        subscriptions.into_iter().for_each(|subscription| subscription.on_complete());
    }

    ///
    /// Sends a flush signal to every subscriber
    ///
    pub fn broadcast_flush(&self) {
        self.snapshot().into_iter().for_each(|subscription| subscription.on_flush());
    }
}

impl<Message: Clone> Downstream<Message> {
    ///
    /// Sends a message to every subscriber
    ///
    pub fn broadcast_next(&self, message: Message) {
        let subscriptions = self.snapshot();

        if let Some((last, others)) = subscriptions.split_last() {
            others.iter().for_each(|subscription| subscription.on_next(message.clone()));
            last.on_next(message);
        }
    }
}

///
/// The behaviour of an action: what it does with each signal it receives
///
/// Handlers are called from the action's dispatcher, so calls into a single handler never
/// overlap. The default behaviour for everything but messages is to pass the signal on.
///
pub trait ActionHandler<Message>: 'static+Send+Sync {
    ///
    /// Processes the next message
    ///
    fn do_next(&self, downstream: &Downstream<Message>, message: Message) -> Result<(), StreamError>;

    fn do_error(&self, downstream: &Downstream<Message>, error: StreamError) {
        downstream.broadcast_error(error);
    }

    fn do_complete(&self, downstream: &Downstream<Message>) {
        downstream.broadcast_complete();
    }

    fn do_flush(&self, downstream: &Downstream<Message>) {
        downstream.broadcast_flush();
    }

    ///
    /// The action has been attached to an upstream subscription and has requested its first batch
    ///
    fn do_subscribe(&self, _subscription: &Arc<dyn Subscription>, _batch_size: u64) { }
}

///
/// Action handler that relays every message it receives
///
#[derive(Debug, Clone, Copy, Default)]
pub struct Relay;

impl<Message: Clone> ActionHandler<Message> for Relay {
    #[inline]
    fn do_next(&self, downstream: &Downstream<Message>, message: Message) -> Result<(), StreamError> {
        downstream.broadcast_next(message);
        Ok(())
    }
}

///
/// The upstream side of an action
///
struct Upstream {
    /// The subscription this action receives its messages from
    subscription: Option<Arc<dyn Subscription>>,

    /// Number of messages to request at a time
    batch_size: u64
}

///
/// The shared core of an action
///
pub (crate) struct ActionCore<Message, Handler> {
    /// This action, when seen as a producer
    id: ProducerId,

    /// What this action does with its signals
    handler: Handler,

    /// Where the signals are processed
    dispatcher: Arc<dyn Dispatcher>,

    /// The subscribers to this action
    downstream: Downstream<Message>,

    /// The subscription this action receives messages from
    upstream: Mutex<Upstream>,

    /// Counts received messages so the next batch is requested once the current one is used up
    replenish: BoundedDemand
}

impl<Message, Handler> ActionCore<Message, Handler>
where   Message:    'static+Send,
        Handler:    ActionHandler<Message> {
    fn upstream(&self) -> MutexGuard<Upstream> {
        self.upstream.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    ///
    /// Runs a handler callback, turning any panic into a stream error
    ///
    fn guard<TFn: FnOnce() -> Result<(), StreamError>>(action: TFn) -> Result<(), StreamError> {
        panic::catch_unwind(panic::AssertUnwindSafe(action))
            .unwrap_or_else(|payload| Err(StreamError::from_panic(payload)))
    }

    fn next(&self, message: Message) {
        let result = Self::guard(|| self.handler.do_next(&self.downstream, message));

        match result {
            Ok(())      => self.replenish_upstream(),
            Err(error)  => self.error(error)
        }
    }

    fn error(&self, error: StreamError) {
        let result = Self::guard(|| { self.handler.do_error(&self.downstream, error); Ok(()) });

        if let Err(error) = result {
            // The error path itself failed: the subscribers can still be told about it
            self.downstream.broadcast_error(error);
        }
    }

    fn complete(&self) {
        let result = Self::guard(|| { self.handler.do_complete(&self.downstream); Ok(()) });

        if let Err(error) = result {
            self.downstream.broadcast_error(error);
        }
    }

    fn flush(&self) {
        let result = Self::guard(|| { self.handler.do_flush(&self.downstream); Ok(()) });

        if let Err(error) = result {
            self.error(error);
        }
    }

    ///
    /// Requests the next batch from upstream if the current batch has been used up
    ///
    fn replenish_upstream(&self) {
        self.replenish.increment_current_next_signals();

        if self.replenish.should_request_pending_signals() {
            let (subscription, batch_size) = {
                let upstream = self.upstream();
                (upstream.subscription.clone(), upstream.batch_size)
            };

            // Nothing is requested with a zero batch size
            if let Some(subscription) = subscription.filter(|_| batch_size > 0) {
                subscription.request(batch_size);
            }
        }
    }

    fn subscribe(&self, subscription: Arc<dyn Subscription>) {
        let batch_size = {
            let mut upstream = self.upstream();

            if upstream.subscription.is_some() {
                log::warn!("{} is already subscribed: cancelling the new subscription", self.id);
                None
            } else {
                upstream.subscription = Some(Arc::clone(&subscription));
                Some(upstream.batch_size)
            }
        };

        match batch_size {
            None                => subscription.cancel(),
            Some(batch_size)    => {
                log::debug!("{} subscribed upstream, requesting {}", self.id, batch_size);

                // A zero batch leaves the upstream to be driven from elsewhere
                if batch_size > 0 {
                    subscription.request(batch_size);
                }
                self.handler.do_subscribe(&subscription, batch_size);
            }
        }
    }
}

impl<Message, Handler> Subscriber<Message> for ActionCore<Message, Handler>
where   Message:    'static+Send,
        Handler:    ActionHandler<Message> {
    fn on_next(&self, message: Message)     { self.next(message); }
    fn on_error(&self, error: StreamError)  { self.error(error); }
    fn on_complete(&self)                   { self.complete(); }
    fn on_flush(&self)                      { self.flush(); }
}

impl<Message, Handler> Producer<Message> for ActionCore<Message, Handler>
where   Message:    'static+Send,
        Handler:    ActionHandler<Message> {
    fn producer_id(&self) -> ProducerId {
        self.id
    }

    fn forget_subscription(&self, subscription: &PushSubscription<Message>) {
        log::debug!("{} forgetting subscription", self.id);
        self.downstream.remove(subscription);
    }
}

///
/// An action is a stage that receives signals, processes them with its handler on its
/// dispatcher, and broadcasts the results to its own subscribers
///
/// Actions are handles to a shared core: cloning an action produces another handle to the
/// same stage.
///
pub struct Action<Message, Handler = Relay> {
    core: Arc<ActionCore<Message, Handler>>
}

impl<Message, Handler> Clone for Action<Message, Handler> {
    fn clone(&self) -> Self {
        Action {
            core: Arc::clone(&self.core)
        }
    }
}

impl<Message> Action<Message, Relay>
where Message: 'static+Send+Clone {
    ///
    /// Creates an action that relays whatever it receives to its subscribers
    ///
    pub fn new(dispatcher: Arc<dyn Dispatcher>) -> Action<Message, Relay> {
        Action::with_handler(Relay, dispatcher)
    }
}

impl<Message, Handler> Action<Message, Handler>
where   Message:    'static+Send,
        Handler:    ActionHandler<Message> {
    ///
    /// Creates an action with a custom handler
    ///
    pub fn with_handler(handler: Handler, dispatcher: Arc<dyn Dispatcher>) -> Action<Message, Handler> {
        let core = ActionCore {
            id:         ProducerId::new(),
            handler:    handler,
            dispatcher: dispatcher,
            downstream: Downstream::new(),
            upstream:   Mutex::new(Upstream { subscription: None, batch_size: DEFAULT_BATCH_SIZE }),
            replenish:  BoundedDemand::new(DEFAULT_BATCH_SIZE)
        };

        Action {
            core: Arc::new(core)
        }
    }

    /// The identity of this action as a producer
    pub fn id(&self) -> ProducerId {
        self.core.id
    }

    /// The handler for this action
    pub fn handler(&self) -> &Handler {
        &self.core.handler
    }

    /// The dispatcher this action processes its signals on
    pub fn dispatcher(&self) -> &Arc<dyn Dispatcher> {
        &self.core.dispatcher
    }

    /// The number of messages this action requests from upstream at a time
    pub fn batch_size(&self) -> u64 {
        self.core.upstream().batch_size
    }

    ///
    /// Sets the number of messages this action requests from upstream at a time
    ///
    pub fn prefetch(&self, batch_size: u64) -> &Self {
        self.core.upstream().batch_size = batch_size;
        self.core.replenish.max_capacity(batch_size);

        self
    }

    ///
    /// Counts the number of subscribers to this action
    ///
    pub fn count_subscribers(&self) -> usize {
        self.core.downstream.count_subscribers()
    }

    ///
    /// Subscribes to the messages sent from this action
    ///
    /// The subscription holds the subscriber weakly, so the caller is responsible for keeping it alive.
    ///
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber<Message>>) -> Arc<PushSubscription<Message>> {
        let subscription = Arc::new(PushSubscription::new(&self.core, subscriber));

        if self.core.downstream.add(Arc::clone(&subscription)) {
            log::debug!("{} gained a subscriber", self.core.id);
        }

        subscription
    }

    ///
    /// Connects a stage so that it receives the messages from this action
    ///
    /// If the stage can be driven by a subscription, it's told about its new upstream subscription.
    ///
    pub fn connect<TStage>(&self, stage: Arc<TStage>) -> Arc<PushSubscription<Message>>
    where TStage: 'static+Stage<Message> {
        let subscription = self.subscribe(Arc::clone(&stage) as Arc<dyn Subscriber<Message>>);

        if let Some(subscribable) = stage.subscribable() {
            subscribable.on_subscribe(Arc::clone(&subscription) as Arc<dyn Subscription>);
        }

        subscription
    }

    ///
    /// Runs a task for this action on its dispatcher
    ///
    fn dispatch<TFn>(&self, task: TFn)
    where TFn: 'static+Send+FnOnce(&ActionCore<Message, Handler>) -> () {
        let core = Arc::clone(&self.core);
        self.core.dispatcher.dispatch(Box::new(move || task(&*core)));
    }
}

impl<Message, Handler> Subscriber<Message> for Action<Message, Handler>
where   Message:    'static+Send,
        Handler:    ActionHandler<Message> {
    fn on_next(&self, message: Message) {
        self.dispatch(move |core| core.next(message));
    }

    fn on_error(&self, error: StreamError) {
        self.dispatch(move |core| core.error(error));
    }

    fn on_complete(&self) {
        self.dispatch(|core| core.complete());
    }

    fn on_flush(&self) {
        self.dispatch(|core| core.flush());
    }
}

impl<Message, Handler> Subscribable for Action<Message, Handler>
where   Message:    'static+Send,
        Handler:    ActionHandler<Message> {
    fn prefetch(&self, batch_size: u64) {
        Action::prefetch(self, batch_size);
    }

    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        self.dispatch(move |core| core.subscribe(subscription));
    }
}

impl<Message, Handler> Stage<Message> for Action<Message, Handler>
where   Message:    'static+Send,
        Handler:    ActionHandler<Message> {
    fn subscribable(self: Arc<Self>) -> Option<Arc<dyn Subscribable>> {
        Some(self)
    }

    fn immediate(self: Arc<Self>) -> Option<Arc<dyn Subscriber<Message>>> {
        Some(Arc::clone(&self.core) as Arc<dyn Subscriber<Message>>)
    }
}
