//! Connection-facing front end of the scheduler.
//!
//! A [`Hub`] speaks the event vocabulary of a chat push channel: it announces
//! connections, acknowledges prompts, confirms stops, and ties a
//! connection's lifetime to its session. Transports call into it and supply a
//! [`DeliverySink`] that can reach their connections.

use crate::{Coordinator, DeliverySink, Event, ResponseGenerator, Result};

/// Transport-agnostic chat hub built on a [`Coordinator`].
///
/// The connection id doubles as session id and destination, so each
/// connection has at most one generation in flight.
pub struct Hub<S, G> {
    coordinator: Coordinator<S, G>,
    response_delay_secs: u64,
}

impl<S, G> Clone for Hub<S, G> {
    fn clone(&self) -> Self {
        Self {
            coordinator: self.coordinator.clone(),
            response_delay_secs: self.response_delay_secs,
        }
    }
}

impl<S, G> Hub<S, G>
where
    S: DeliverySink,
    G: ResponseGenerator,
{
    /// Wraps `coordinator`; prompts are answered after `response_delay_secs`
    /// unless a delay is given explicitly.
    pub const fn new(coordinator: Coordinator<S, G>, response_delay_secs: u64) -> Self {
        Self {
            coordinator,
            response_delay_secs,
        }
    }

    pub const fn coordinator(&self) -> &Coordinator<S, G> {
        &self.coordinator
    }

    pub const fn response_delay_secs(&self) -> u64 {
        self.response_delay_secs
    }

    /// Greets a freshly attached connection with its id.
    pub async fn connect(&self, connection_id: &str) {
        #[cfg(feature = "tracing")]
        tracing::info!(connection_id, "Client connected");

        self.deliver(
            connection_id,
            Event::Connected {
                connection_id: connection_id.to_owned(),
            },
        )
        .await;
    }

    /// Queues `prompt` with the hub's default delay and acknowledges it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ServiceShutdown`](crate::Error::ServiceShutdown) if
    /// the scheduler is shutting down; no acknowledgment is sent in that case.
    pub async fn send_prompt(&self, connection_id: &str, prompt: &str) -> Result<()> {
        self.send_prompt_with_delay(connection_id, prompt, self.response_delay_secs)
            .await
    }

    /// Like [`send_prompt`](Self::send_prompt) with an explicit delay.
    ///
    /// The acknowledgment is sent only once the request is admitted. The
    /// response cannot be delivered before the next scheduler tick, so the
    /// acknowledgment still reaches the connection first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ServiceShutdown`](crate::Error::ServiceShutdown) if
    /// the scheduler is shutting down.
    pub async fn send_prompt_with_delay(
        &self,
        connection_id: &str,
        prompt: &str,
        delay_seconds: u64,
    ) -> Result<()> {
        self.coordinator.enqueue(connection_id, prompt, connection_id, delay_seconds)?;

        #[cfg(feature = "tracing")]
        tracing::info!(connection_id, "Prompt received");

        self.deliver(
            connection_id,
            Event::PromptReceived {
                prompt: prompt.to_owned(),
            },
        )
        .await;
        Ok(())
    }

    /// Stops the connection's current generation and confirms it.
    ///
    /// The confirmation is sent whether or not anything was running. Returns
    /// whether a live request was cancelled.
    pub async fn stop_generation(&self, connection_id: &str) -> bool {
        let cancelled = self.coordinator.cancel(connection_id);
        self.deliver(connection_id, Event::GenerationStopped).await;

        #[cfg(feature = "tracing")]
        tracing::info!(connection_id, cancelled, "Generation stopped");
        cancelled
    }

    /// Releases whatever the connection had in flight. Call when the
    /// connection is gone for good.
    pub fn disconnect(&self, connection_id: &str) -> bool {
        #[cfg(feature = "tracing")]
        tracing::info!(connection_id, "Client disconnected");

        self.coordinator.cancel(connection_id)
    }

    async fn deliver(&self, destination: &str, event: Event) {
        if let Err(_e) = self.coordinator.sink().send(destination, event).await {
            #[cfg(feature = "tracing")]
            tracing::warn!("Failed to notify {destination}: {_e}");
        }
    }
}
