use thiserror::Error;

use std::any::Any;
use std::error::Error as StdError;
use std::sync::*;

///
/// Errors that can be signalled through the `on_error` channel of a stream
///
/// Errors are cloneable as a single failure may need to be delivered to more than one
/// downstream (for instance, to both legs of a `FilterAction`)
///
#[derive(Error, Debug, Clone)]
pub enum StreamError {
    /// A request was made for zero elements
    #[error("request for {0} elements is not positive")]
    InvalidDemand(u64),

    /// A request would have taken the pending demand past the largest value that can be tracked
    #[error("{pending} pending requests + {requested} requested overflows the demand counter")]
    DemandOverflow { pending: u64, requested: u64 },

    /// A callback panicked while processing a signal
    #[error("panicked: {0}")]
    Panicked(String),

    /// A stage failed to process a message
    #[error("{0}")]
    Failed(String),

    /// Error raised by a collaborator outside of this crate
    #[error("{0}")]
    Other(Arc<dyn StdError + Send + Sync>),
}

impl StreamError {
    ///
    /// Creates a failure with a description
    ///
    pub fn failed<Description: Into<String>>(description: Description) -> StreamError {
        StreamError::Failed(description.into())
    }

    ///
    /// Wraps an arbitrary error so it can be sent down a stream
    ///
    pub fn other<TError: 'static+StdError+Send+Sync>(error: TError) -> StreamError {
        StreamError::Other(Arc::new(error))
    }

    ///
    /// Converts the payload of a caught panic into a stream error
    ///
    pub (crate) fn from_panic(payload: Box<dyn Any+Send>) -> StreamError {
        let description = if let Some(description) = payload.downcast_ref::<&str>() {
            description.to_string()
        } else if let Some(description) = payload.downcast_ref::<String>() {
            description.clone()
        } else {
            "unknown panic".to_string()
        };

        StreamError::Panicked(description)
    }

    /// True if this error reports a violation of the demand rules
    pub fn is_protocol_violation(&self) -> bool {
        match self {
            StreamError::InvalidDemand(_)       => true,
            StreamError::DemandOverflow { .. }  => true,
            _                                   => false
        }
    }
}
