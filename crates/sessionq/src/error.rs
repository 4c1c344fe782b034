//! Error types for the session scheduler.
//!
//! Only [`Error::ServiceShutdown`] ever reaches a caller of the public API.
//! [`GenerationError`] and [`DeliveryError`] are produced by the external
//! collaborators and are contained inside the worker that observed them.

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the scheduler.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The coordinator has begun shutting down and no longer accepts work.
    #[error("Scheduler is shutting down")]
    ServiceShutdown,

    /// The response generator failed.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// The delivery sink could not reach a destination.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// Raised by a [`ResponseGenerator`](crate::ResponseGenerator) that could not
/// produce a response.
///
/// The message is internal detail: it is logged, never delivered.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
#[error("Generation failed: {message}")]
pub struct GenerationError {
    pub message: String,
}

impl GenerationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Raised by a [`DeliverySink`](crate::DeliverySink) that could not push an
/// event.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum DeliveryError {
    /// No destination with this identifier is known to the sink.
    #[error("Destination {destination} is unreachable")]
    Unreachable { destination: String },

    /// The destination existed but its channel has been closed.
    #[error("Destination {destination} closed its channel")]
    Closed { destination: String },
}

impl DeliveryError {
    pub fn destination(&self) -> &str {
        match self {
            Self::Unreachable { destination } | Self::Closed { destination } => destination,
        }
    }
}
