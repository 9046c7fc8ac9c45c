use super::stream_error::*;

///
/// The consuming side of a stream
///
/// Signals are pushed to a subscriber by the subscription it is attached to. Implementations
/// must not panic from these callbacks.
///
pub trait Subscriber<Message>: Send+Sync {
    ///
    /// Receives the next message in the stream
    ///
    fn on_next(&self, message: Message);

    ///
    /// The stream has failed
    ///
    fn on_error(&self, error: StreamError);

    ///
    /// The stream has finished and no further messages will be sent
    ///
    fn on_complete(&self);

    ///
    /// A batch has finished: subscribers that buffer their work should process what they have
    ///
    fn on_flush(&self) { }
}

///
/// The link between a subscriber and its source, used to signal demand or to stop the stream
///
pub trait Subscription: Send+Sync {
    ///
    /// Requests that `n` more messages are sent to the subscriber
    ///
    fn request(&self, n: u64);

    ///
    /// Stops the stream: no further messages will be sent once this has returned
    ///
    fn cancel(&self);
}
