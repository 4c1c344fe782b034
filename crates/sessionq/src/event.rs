//! Events pushed to a destination through a [`DeliverySink`].
//!
//! [`DeliverySink`]: crate::DeliverySink

use core::fmt;

/// Message delivered in place of internal failure detail.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred while processing your request.";

/// A named event addressed to one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The destination is attached and may now submit prompts.
    Connected { connection_id: String },

    /// Acknowledges that a prompt was accepted for processing.
    PromptReceived { prompt: String },

    /// A generated response together with the prompt it answers.
    ReceiveResponse { prompt: String, response: String },

    /// Confirms that the session's current generation was stopped.
    GenerationStopped,

    /// Processing failed. Carries a generic message only.
    Error { message: String },
}

impl Event {
    /// Builds the error event delivered after a generation failure.
    pub fn generic_error() -> Self {
        Self::Error {
            message: GENERIC_ERROR_MESSAGE.to_string(),
        }
    }

    /// The event name a push channel announces this event under.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "Connected",
            Self::PromptReceived { .. } => "PromptReceived",
            Self::ReceiveResponse { .. } => "ReceiveResponse",
            Self::GenerationStopped => "GenerationStopped",
            Self::Error { .. } => "Error",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
