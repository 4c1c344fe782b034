//! Conversions between scheduler events and wire messages.

use crate::proto::{
    Connected, ErrorEvent, GenerationStopped, PromptReceived, ReceiveResponse, ServerEvent,
    server_event,
};
use sessionq::Event;

impl From<Event> for ServerEvent {
    fn from(event: Event) -> Self {
        let event = match event {
            Event::Connected { connection_id } => {
                server_event::Event::Connected(Connected { connection_id })
            }
            Event::PromptReceived { prompt } => {
                server_event::Event::PromptReceived(PromptReceived { prompt })
            }
            Event::ReceiveResponse { prompt, response } => {
                server_event::Event::ReceiveResponse(ReceiveResponse { prompt, response })
            }
            Event::GenerationStopped => {
                server_event::Event::GenerationStopped(GenerationStopped {})
            }
            Event::Error { message } => server_event::Event::Error(ErrorEvent { message }),
        };
        Self { event: Some(event) }
    }
}

/// The channel-vocabulary name of a wire event, or `None` for an empty event.
pub const fn event_name(event: &ServerEvent) -> Option<&'static str> {
    match &event.event {
        Some(server_event::Event::Connected(_)) => Some("Connected"),
        Some(server_event::Event::PromptReceived(_)) => Some("PromptReceived"),
        Some(server_event::Event::ReceiveResponse(_)) => Some("ReceiveResponse"),
        Some(server_event::Event::GenerationStopped(_)) => Some("GenerationStopped"),
        Some(server_event::Event::Error(_)) => Some("Error"),
        None => None,
    }
}
