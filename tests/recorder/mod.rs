#![allow(dead_code)]

use flo_reactive::*;

use std::sync::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

///
/// A signal seen by a recorder
///
#[derive(Debug, Clone, PartialEq)]
pub enum Signal<Message> {
    Next(Message),
    Error(String),
    Complete,
    Flush
}

///
/// Signals recorded by one or more recorders, tagged with the name of the recorder that saw them
///
pub type SignalLog<Message> = Arc<Mutex<Vec<(&'static str, Signal<Message>)>>>;

pub fn signal_log<Message>() -> SignalLog<Message> {
    Arc::new(Mutex::new(vec![]))
}

///
/// Sends log output to stderr (set RUST_LOG to see it)
///
pub fn init_logging() {
    let _ = pretty_env_logger::try_init();
}

///
/// Stage that records every signal it receives
///
pub struct Recorder<Message> {
    name:           &'static str,
    log:            SignalLog<Message>,
    subscribable:   bool,
    prefetch:       Mutex<Option<u64>>,
    subscriptions:  Mutex<Vec<Arc<dyn Subscription>>>
}

impl<Message: Clone> Recorder<Message> {
    pub fn new() -> Arc<Recorder<Message>> {
        Self::shared("recorder", &signal_log())
    }

    pub fn shared(name: &'static str, log: &SignalLog<Message>) -> Arc<Recorder<Message>> {
        Arc::new(Recorder {
            name:           name,
            log:            Arc::clone(log),
            subscribable:   false,
            prefetch:       Mutex::new(None),
            subscriptions:  Mutex::new(vec![])
        })
    }

    pub fn subscribable() -> Arc<Recorder<Message>> {
        Arc::new(Recorder {
            name:           "subscribable",
            log:            signal_log(),
            subscribable:   true,
            prefetch:       Mutex::new(None),
            subscriptions:  Mutex::new(vec![])
        })
    }

    pub fn signals(&self) -> Vec<Signal<Message>> {
        self.log.lock().unwrap().iter()
            .filter(|(name, _)| *name == self.name)
            .map(|(_, signal)| signal.clone())
            .collect()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.signals().into_iter()
            .filter_map(|signal| match signal { Signal::Next(message) => Some(message), _ => None })
            .collect()
    }

    pub fn count_complete(&self) -> usize {
        self.signals().into_iter().filter(|signal| matches!(signal, Signal::Complete)).count()
    }

    pub fn errors(&self) -> Vec<String> {
        self.signals().into_iter()
            .filter_map(|signal| match signal { Signal::Error(error) => Some(error), _ => None })
            .collect()
    }

    pub fn prefetch_size(&self) -> Option<u64> {
        *self.prefetch.lock().unwrap()
    }

    pub fn count_subscriptions(&self) -> usize {
        self.subscriptions.lock().unwrap().len()
    }

    fn record(&self, signal: Signal<Message>) {
        self.log.lock().unwrap().push((self.name, signal));
    }
}

impl<Message: Clone+Send> Subscriber<Message> for Recorder<Message> {
    fn on_next(&self, message: Message)     { self.record(Signal::Next(message)); }
    fn on_error(&self, error: StreamError)  { self.record(Signal::Error(error.to_string())); }
    fn on_complete(&self)                   { self.record(Signal::Complete); }
    fn on_flush(&self)                      { self.record(Signal::Flush); }
}

impl<Message: Clone+Send> Subscribable for Recorder<Message> {
    fn prefetch(&self, batch_size: u64) {
        *self.prefetch.lock().unwrap() = Some(batch_size);
    }

    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        self.subscriptions.lock().unwrap().push(subscription);
    }
}

impl<Message: 'static+Clone+Send> Stage<Message> for Recorder<Message> {
    fn subscribable(self: Arc<Self>) -> Option<Arc<dyn Subscribable>> {
        if self.subscribable {
            Some(self)
        } else {
            None
        }
    }
}

///
/// Subscription that records the requests made against it
///
#[derive(Default)]
pub struct RecordingSubscription {
    pub requests:   Mutex<Vec<u64>>,
    pub cancelled:  AtomicBool
}

impl RecordingSubscription {
    pub fn new() -> Arc<RecordingSubscription> {
        Arc::new(RecordingSubscription::default())
    }

    pub fn requests(&self) -> Vec<u64> {
        self.requests.lock().unwrap().clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Subscription for RecordingSubscription {
    fn request(&self, n: u64) {
        self.requests.lock().unwrap().push(n);
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

///
/// Producer that counts the subscriptions it has been asked to forget
///
pub struct CountingProducer {
    pub id:         ProducerId,
    pub forgotten:  AtomicUsize
}

impl CountingProducer {
    pub fn new() -> Arc<CountingProducer> {
        Arc::new(CountingProducer {
            id:         ProducerId::new(),
            forgotten:  AtomicUsize::new(0)
        })
    }

    pub fn count_forgotten(&self) -> usize {
        self.forgotten.load(Ordering::SeqCst)
    }
}

impl<Message> Producer<Message> for CountingProducer {
    fn producer_id(&self) -> ProducerId {
        self.id
    }

    fn forget_subscription(&self, _subscription: &PushSubscription<Message>) {
        self.forgotten.fetch_add(1, Ordering::SeqCst);
    }
}
