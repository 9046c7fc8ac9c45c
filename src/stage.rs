use super::subscriber::*;

use std::sync::*;

///
/// Capability of stages that are driven by an upstream subscription
///
pub trait Subscribable: Send+Sync {
    ///
    /// Sets the number of messages to request from the upstream subscription at a time
    ///
    fn prefetch(&self, batch_size: u64);

    ///
    /// Attaches this stage to its upstream subscription
    ///
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>);
}

///
/// A stage in a pipeline: anything that can receive the signals of a stream
///
pub trait Stage<Message>: Subscriber<Message> {
    ///
    /// Returns this stage as a `Subscribable` if it can accept an upstream subscription
    ///
    /// Stages that are only ever fed directly return `None`.
    ///
    fn subscribable(self: Arc<Self>) -> Option<Arc<dyn Subscribable>> {
        None
    }

    ///
    /// Returns a subscriber that processes the signals for this stage on the calling thread
    ///
    /// Stages that hand their signals to a dispatcher return a subscriber that bypasses it, so a
    /// stage feeding them can order their signals against its own. Stages that already process
    /// signals as they arrive return `None`.
    ///
    fn immediate(self: Arc<Self>) -> Option<Arc<dyn Subscriber<Message>>> {
        None
    }
}
