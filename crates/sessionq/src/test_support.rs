//! Sinks and generators shared by the unit tests.

use crate::{DeliveryError, DeliverySink, Event, GenerationError, ResponseGenerator};
use parking_lot::Mutex;
use std::collections::HashSet;

/// Records every delivered event; destinations in `unreachable` fail.
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    events: Mutex<Vec<(String, Event)>>,
    unreachable: Mutex<HashSet<String>>,
}

impl RecordingSink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn make_unreachable(&self, destination: &str) {
        self.unreachable.lock().insert(destination.to_owned());
    }

    pub(crate) fn events(&self) -> Vec<(String, Event)> {
        self.events.lock().clone()
    }

    /// Events delivered to `destination`, oldest first.
    pub(crate) fn events_for(&self, destination: &str) -> Vec<Event> {
        self.events
            .lock()
            .iter()
            .filter(|(d, _)| d == destination)
            .map(|(_, e)| e.clone())
            .collect()
    }

    /// Prompts answered with a success event at `destination`.
    pub(crate) fn responses_for(&self, destination: &str) -> Vec<String> {
        self.events_for(destination)
            .into_iter()
            .filter_map(|e| match e {
                Event::ReceiveResponse { prompt, .. } => Some(prompt),
                _ => None,
            })
            .collect()
    }
}

impl DeliverySink for RecordingSink {
    async fn send(&self, destination: &str, event: Event) -> Result<(), DeliveryError> {
        if self.unreachable.lock().contains(destination) {
            return Err(DeliveryError::Unreachable {
                destination: destination.to_owned(),
            });
        }
        self.events.lock().push((destination.to_owned(), event));
        Ok(())
    }
}

/// Answers every prompt with `"echo: <prompt>"`.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct EchoGenerator;

impl ResponseGenerator for EchoGenerator {
    fn generate(&self, payload: &str) -> Result<String, GenerationError> {
        Ok(format!("echo: {payload}"))
    }
}

/// Fails every prompt containing `"fail"` and panics on `"panic"`.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct FaultyGenerator;

impl ResponseGenerator for FaultyGenerator {
    fn generate(&self, payload: &str) -> Result<String, GenerationError> {
        if payload.contains("panic") {
            panic!("generator exploded on {payload}");
        }
        if payload.contains("fail") {
            return Err(GenerationError::new(format!("model refused {payload}")));
        }
        Ok(format!("ok: {payload}"))
    }
}
