use super::stage::*;
use super::action::*;
use super::subscriber::*;
use super::dispatcher::*;
use super::stream_error::*;

use std::sync::*;
use std::sync::atomic::{AtomicU64, Ordering};

///
/// An action that splits its input in two: messages that match a predicate are sent to its
/// subscribers, and everything else is sent to a secondary 'otherwise' pipeline
///
/// Errors, completion and flushes are sent to both pipelines, the otherwise pipeline first. The
/// otherwise pipeline processes its signals as part of the filter's own, so its subscribers see
/// each signal before the filter's subscribers do whichever dispatcher is in use.
///
pub type FilterAction<Message, Pipeline = Action<Message>> = Action<Message, Filter<Message, Pipeline>>;

///
/// The predicate used when filtering on the result of a function that returns a boolean value
///
pub fn simple_predicate(value: &bool) -> bool {
    *value
}

///
/// Action handler that implements `FilterAction`
///
pub struct Filter<Message, Pipeline> {
    /// Decides which pipeline each message is sent to
    predicate: Box<dyn Fn(&Message) -> bool+Send+Sync>,

    /// The pipeline that receives the messages that fail the predicate
    otherwise: Arc<Pipeline>,

    /// The otherwise pipeline, if it can be subscribed to our upstream
    otherwise_subscribable: Option<Arc<dyn Subscribable>>,

    /// Receives the signals for the otherwise pipeline, on the same thread as this filter processes its own
    otherwise_signals: Arc<dyn Subscriber<Message>>,

    /// Number of messages that were sent to the otherwise pipeline
    rejected: AtomicU64
}

impl<Message, Pipeline> Filter<Message, Pipeline>
where   Pipeline:   'static+Stage<Message> {
    ///
    /// Creates a filter that sends its rejected messages to the specified pipeline
    ///
    pub fn new<Predicate>(predicate: Predicate, otherwise: Arc<Pipeline>) -> Filter<Message, Pipeline>
    where Predicate: 'static+Send+Sync+Fn(&Message) -> bool {
        let otherwise_subscribable  = Arc::clone(&otherwise).subscribable();
        let otherwise_signals       = Arc::clone(&otherwise).immediate()
            .unwrap_or_else(|| Arc::clone(&otherwise) as Arc<dyn Subscriber<Message>>);

        Filter {
            predicate:              Box::new(predicate),
            otherwise:              otherwise,
            otherwise_subscribable: otherwise_subscribable,
            otherwise_signals:      otherwise_signals,
            rejected:               AtomicU64::new(0)
        }
    }
}

impl<Message, Pipeline> ActionHandler<Message> for Filter<Message, Pipeline>
where   Message:    'static+Send+Clone,
        Pipeline:   'static+Stage<Message> {
    fn do_next(&self, downstream: &Downstream<Message>, message: Message) -> Result<(), StreamError> {
        if (self.predicate)(&message) {
            downstream.broadcast_next(message);
        } else {
            // Filtering is routine: rejected messages are neither errors nor worth logging
            self.rejected.fetch_add(1, Ordering::Relaxed);
            self.otherwise_signals.on_next(message);
        }

        Ok(())
    }

    fn do_error(&self, downstream: &Downstream<Message>, error: StreamError) {
        self.otherwise_signals.on_error(error.clone());
        downstream.broadcast_error(error);
    }

    fn do_complete(&self, downstream: &Downstream<Message>) {
        self.otherwise_signals.on_complete();
        downstream.broadcast_complete();
    }

    fn do_flush(&self, downstream: &Downstream<Message>) {
        self.otherwise_signals.on_flush();
        downstream.broadcast_flush();
    }

    fn do_subscribe(&self, subscription: &Arc<dyn Subscription>, batch_size: u64) {
        if let Some(otherwise) = &self.otherwise_subscribable {
            otherwise.prefetch(batch_size);
            otherwise.on_subscribe(Arc::clone(subscription));
        }
    }
}

impl<Message> Action<Message, Filter<Message, Action<Message>>>
where Message: 'static+Send+Clone {
    ///
    /// Creates a filter action whose otherwise pipeline relays the rejected messages on the same dispatcher
    ///
    pub fn filter<Predicate>(predicate: Predicate, dispatcher: Arc<dyn Dispatcher>) -> FilterAction<Message>
    where Predicate: 'static+Send+Sync+Fn(&Message) -> bool {
        let otherwise = Arc::new(Action::new(Arc::clone(&dispatcher)));

        Action::with_otherwise(predicate, dispatcher, otherwise)
    }

    ///
    /// Creates a filter action that passes the messages for which `projection` returns a true value
    ///
    pub fn filter_by<Projection, Value>(projection: Projection, dispatcher: Arc<dyn Dispatcher>) -> FilterAction<Message>
    where   Projection: 'static+Send+Sync+Fn(&Message) -> Value,
            Value:      Into<bool> {
        Action::filter(move |message| simple_predicate(&projection(message).into()), dispatcher)
    }
}

impl<Message, Pipeline> Action<Message, Filter<Message, Pipeline>>
where   Message:    'static+Send+Clone,
        Pipeline:   'static+Stage<Message> {
    ///
    /// Creates a filter action that sends the messages that fail the predicate to the specified pipeline
    ///
    pub fn with_otherwise<Predicate>(predicate: Predicate, dispatcher: Arc<dyn Dispatcher>, otherwise: Arc<Pipeline>) -> FilterAction<Message, Pipeline>
    where Predicate: 'static+Send+Sync+Fn(&Message) -> bool {
        Action::with_handler(Filter::new(predicate, otherwise), dispatcher)
    }

    ///
    /// The pipeline that receives the messages that fail the predicate
    ///
    pub fn otherwise(&self) -> &Arc<Pipeline> {
        &self.handler().otherwise
    }

    ///
    /// The number of messages that have been sent to the otherwise pipeline so far
    ///
    pub fn rejected_count(&self) -> u64 {
        self.handler().rejected.load(Ordering::Relaxed)
    }
}
