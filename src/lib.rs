//!
//! `flo_reactive` provides the demand-tracking side of push-based streams: subscriptions that sit between a producer and
//! a subscriber, and actions that process the signals passing through a pipeline.
//!
//! ## Subscriptions
//!
//! A `PushSubscription` links a producer to one of its subscribers. The subscriber uses it to request more messages or to
//! cancel the stream, and the producer uses it to deliver messages, errors and completion. The subscription guarantees that
//! the subscriber is completed at most once, that nothing is delivered after the stream has terminated and that errors are
//! always seen. Demand is tracked with a counter that saturates rather than overflowing: a request that would take it past
//! the maximum is reported to the subscriber as an error.
//!
//! ## Actions
//!
//! An `Action` is a stage in a pipeline. It receives signals, processes them on its `Dispatcher` and broadcasts the results
//! to its own subscribers. A `FilterAction` splits a stream in two: messages that match its predicate are sent on, and
//! everything else goes to the 'otherwise' pipeline, which also sees every error, completion and flush.
//!
//! ```
//! # extern crate flo_reactive;
//! # extern crate futures;
//! # use flo_reactive::*;
//! # use futures::prelude::*;
//! # use futures::executor;
//! # use std::sync::*;
//! let filter                  = FilterAction::filter(|num: &i32| num % 2 == 0, Arc::new(SynchronousDispatcher));
//! let (evens, even_nums)      = subscriber_stream(10);
//! let (odds, odd_nums)        = subscriber_stream(10);
//!
//! filter.connect(evens);
//! filter.otherwise().connect(odds);
//!
//! for num in 1..=5 {
//!     filter.on_next(num);
//! }
//! filter.on_complete();
//!
//! executor::block_on(async {
//!     let evens = even_nums.map(|num| num.unwrap()).collect::<Vec<_>>().await;
//!     let odds  = odd_nums.map(|num| num.unwrap()).collect::<Vec<_>>().await;
//!
//!     assert!(evens == vec![2, 4]);
//!     assert!(odds == vec![1, 3, 5]);
//! });
//! ```

#![warn(bare_trait_objects)]

extern crate futures;

mod stream_error;
mod demand;
mod demand_policy;
mod subscriber;
mod producer;
mod push_subscription;
mod dispatcher;
mod stage;
mod action;
mod filter_action;
mod stream_subscriber;

pub use self::stream_error::*;
pub use self::demand::*;
pub use self::demand_policy::*;
pub use self::subscriber::*;
pub use self::producer::*;
pub use self::push_subscription::*;
pub use self::dispatcher::*;
pub use self::stage::*;
pub use self::action::*;
pub use self::filter_action::*;
pub use self::stream_subscriber::*;
