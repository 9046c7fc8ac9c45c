use super::stage::*;
use super::subscriber::*;
use super::stream_error::*;

use futures::prelude::*;
use futures::task::{Context, Poll, Waker};
use smallvec::*;

use std::pin::*;
use std::sync::*;
use std::collections::VecDeque;

///
/// The state shared between a stream subscriber and the stream reading from it
///
struct StreamSubscriberCore<Message> {
    /// Messages that have been received but not yet read from the stream
    waiting: VecDeque<Message>,

    /// The error that ended the stream, if it's not been read yet
    error: Option<StreamError>,

    /// Set once the stream has finished
    closed: bool,

    /// Tasks to wake when there's something to read
    notify_waiting: Vec<Waker>,

    /// The subscription that messages are read from
    subscription: Option<Arc<dyn Subscription>>,

    /// The number of messages to request when first subscribed
    buffer_size: u64
}

///
/// A stage that collects the messages sent to it so they can be read as a futures `Stream`
///
pub struct StreamSubscriber<Message> {
    core: Mutex<StreamSubscriberCore<Message>>
}

///
/// Stream of the messages received by a `StreamSubscriber`
///
/// An error ends the stream after it has been returned. Dropping the stream cancels the
/// subscription it's reading from.
///
pub struct SubscriberStream<Message> {
    subscriber: Arc<StreamSubscriber<Message>>
}

///
/// Creates a subscriber that can be connected to an action, and the stream that reads the messages it receives
///
/// When subscribed, the subscriber requests `buffer_size` messages, then another one each time a
/// message is read from the stream.
///
pub fn subscriber_stream<Message>(buffer_size: u64) -> (Arc<StreamSubscriber<Message>>, SubscriberStream<Message>) {
    let core = StreamSubscriberCore {
        waiting:        VecDeque::new(),
        error:          None,
        closed:         false,
        notify_waiting: vec![],
        subscription:   None,
        buffer_size:    buffer_size
    };

    let subscriber  = Arc::new(StreamSubscriber { core: Mutex::new(core) });
    let stream      = SubscriberStream { subscriber: Arc::clone(&subscriber) };

    (subscriber, stream)
}

impl<Message> StreamSubscriber<Message> {
    fn lock(&self) -> MutexGuard<StreamSubscriberCore<Message>> {
        self.core.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    ///
    /// Updates the core and wakes anything waiting on the stream
    ///
    fn update_and_wake<TFn: FnOnce(&mut StreamSubscriberCore<Message>) -> ()>(&self, update: TFn) {
        let to_notify = {
            let mut core = self.lock();
            update(&mut core);

            core.notify_waiting.drain(..).collect::<SmallVec<[_; 4]>>()
        };

        to_notify.into_iter().for_each(|waker| waker.wake());
    }

    ///
    /// The number of messages that have been received but not yet read
    ///
    pub fn count_waiting(&self) -> usize {
        self.lock().waiting.len()
    }
}

impl<Message: Send> Subscriber<Message> for StreamSubscriber<Message> {
    fn on_next(&self, message: Message) {
        self.update_and_wake(move |core| {
            if !core.closed {
                core.waiting.push_back(message);
            }
        });
    }

    fn on_error(&self, error: StreamError) {
        self.update_and_wake(move |core| {
            if !core.closed {
                core.error  = Some(error);
                core.closed = true;
            }
        });
    }

    fn on_complete(&self) {
        self.update_and_wake(|core| core.closed = true);
    }
}

impl<Message: Send> Subscribable for StreamSubscriber<Message> {
    fn prefetch(&self, batch_size: u64) {
        self.lock().buffer_size = batch_size;
    }

    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        let initial_request = {
            let mut core = self.lock();

            if core.subscription.is_some() {
                None
            } else {
                core.subscription = Some(Arc::clone(&subscription));
                Some(core.buffer_size)
            }
        };

        match initial_request {
            None                => subscription.cancel(),
            Some(0)             => { },
            Some(buffer_size)   => subscription.request(buffer_size)
        }
    }
}

impl<Message: 'static+Send> Stage<Message> for StreamSubscriber<Message> {
    fn subscribable(self: Arc<Self>) -> Option<Arc<dyn Subscribable>> {
        Some(self)
    }
}

impl<Message> Stream for SubscriberStream<Message> {
    type Item = Result<Message, StreamError>;

    fn poll_next(self: Pin<&mut Self>, context: &mut Context) -> Poll<Option<Self::Item>> {
        let (next, subscription) = {
            let mut core = self.subscriber.lock();

            if let Some(message) = core.waiting.pop_front() {
                (Poll::Ready(Some(Ok(message))), core.subscription.clone())
            } else if let Some(error) = core.error.take() {
                (Poll::Ready(Some(Err(error))), None)
            } else if core.closed {
                (Poll::Ready(None), None)
            } else {
                core.notify_waiting.push(context.waker().clone());
                (Poll::Pending, None)
            }
        };

        // Reading a message frees up space for another one
        if let Some(subscription) = subscription {
            subscription.request(1);
        }

        next
    }
}

impl<Message> Drop for SubscriberStream<Message> {
    fn drop(&mut self) {
        let subscription = {
            let mut core = self.subscriber.lock();
            core.closed = true;
            core.subscription.take()
        };

        if let Some(subscription) = subscription {
            subscription.cancel();
        }
    }
}
