use ::desync::*;

///
/// Runs the signal processing for a stage
///
/// A dispatcher must run the tasks it is given for any one stage in the order they were
/// dispatched, one at a time.
///
pub trait Dispatcher: Send+Sync {
    ///
    /// Schedules a task to run
    ///
    fn dispatch(&self, task: Box<dyn FnOnce() -> ()+Send>);
}

///
/// Dispatcher that runs tasks immediately on the thread that dispatches them
///
#[derive(Debug, Clone, Copy, Default)]
pub struct SynchronousDispatcher;

impl Dispatcher for SynchronousDispatcher {
    #[inline]
    fn dispatch(&self, task: Box<dyn FnOnce() -> ()+Send>) {
        task()
    }
}

///
/// Dispatcher that queues tasks to run in the background, one after the other
///
/// The last reference to a queue dispatcher should be dropped from outside of the tasks it runs.
///
pub struct QueueDispatcher {
    /// The queue where tasks are run
    queue: Desync<()>
}

impl QueueDispatcher {
    ///
    /// Creates a new queue dispatcher
    ///
    pub fn new() -> QueueDispatcher {
        QueueDispatcher {
            queue: Desync::new(())
        }
    }

    ///
    /// Blocks until every task dispatched so far has finished running
    ///
    pub fn drain(&self) {
        self.queue.sync(|_| ());
    }
}

impl Default for QueueDispatcher {
    fn default() -> Self {
        QueueDispatcher::new()
    }
}

impl Dispatcher for QueueDispatcher {
    fn dispatch(&self, task: Box<dyn FnOnce() -> ()+Send>) {
        self.queue.desync(move |_| task());
    }
}
