use crate::server::telemetry::{increment_delivery_failures, increment_events_delivered};
use parking_lot::RwLock;
use portable_atomic::{AtomicU64, Ordering};
use sessionq_tonic_core::{
    proto::ServerEvent,
    sessionq::{DeliveryError, DeliverySink, Event},
};
use core::time::Duration;
use std::collections::HashMap;
use tokio::sync::mpsc::{self, error::SendTimeoutError};
use tonic::Status;

pub type EventSender = mpsc::Sender<Result<ServerEvent, Status>>;
pub type EventReceiver = mpsc::Receiver<Result<ServerEvent, Status>>;

/// Every open subscription, keyed by connection id.
///
/// Each connection owns a bounded channel of `buffer_size` events. Delivery
/// waits up to `delivery_timeout` for room in that channel; a client that
/// stops reading loses the event instead of stalling its sender.
pub struct ConnectionRegistry {
    senders: RwLock<HashMap<String, EventSender>>,
    next_id: AtomicU64,
    buffer_size: usize,
    delivery_timeout: Duration,
}

impl ConnectionRegistry {
    pub fn new(buffer_size: usize, delivery_timeout: Duration) -> Self {
        Self {
            senders: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            buffer_size: buffer_size.max(1),
            delivery_timeout,
        }
    }

    /// Allocates a connection id and its channel.
    pub fn open(&self) -> (String, EventReceiver) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let connection_id = format!("conn-{id:016x}");
        let (tx, rx) = mpsc::channel(self.buffer_size);
        self.senders.write().insert(connection_id.clone(), tx);
        (connection_id, rx)
    }

    /// Forgets a connection. Returns whether it was open.
    pub fn close(&self, connection_id: &str) -> bool {
        self.senders.write().remove(connection_id).is_some()
    }

    /// Drops every sender, ending all response streams. Returns how many
    /// connections were open.
    pub fn close_all(&self) -> usize {
        let mut senders = self.senders.write();
        let open = senders.len();
        senders.clear();
        open
    }

    pub fn contains(&self, connection_id: &str) -> bool {
        self.senders.read().contains_key(connection_id)
    }
}

impl DeliverySink for ConnectionRegistry {
    async fn send(&self, destination: &str, event: Event) -> Result<(), DeliveryError> {
        let sender = self.senders.read().get(destination).cloned();
        let Some(sender) = sender else {
            increment_delivery_failures();
            return Err(DeliveryError::Unreachable {
                destination: destination.to_owned(),
            });
        };

        let name = event.name();
        if let Err(e) = sender
            .send_timeout(Ok(ServerEvent::from(event)), self.delivery_timeout)
            .await
        {
            if matches!(e, SendTimeoutError::Timeout(_)) {
                tracing::warn!(
                    connection_id = destination,
                    event = name,
                    "Connection is not reading, dropping event"
                );
            }
            increment_delivery_failures();
            return Err(DeliveryError::Closed {
                destination: destination.to_owned(),
            });
        }

        tracing::debug!(connection_id = destination, event = name, "Delivered event");
        increment_events_delivered(name);
        Ok(())
    }
}
