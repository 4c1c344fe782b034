use crate::server::{
    connections::registry::{ConnectionRegistry, EventReceiver},
    telemetry::decrement_connections_inflight,
};
use core::{
    pin::Pin,
    task::{Context, Poll},
};
use pin_project_lite::pin_project;
use sessionq_tonic_core::{
    proto::ServerEvent,
    sessionq::{Hub, SimulatedResponder},
};
use std::sync::Arc;
use tokio_stream::{Stream, wrappers::ReceiverStream};
use tonic::Status;

/// The hub as wired into the gRPC server.
pub type SessionHub = Hub<Arc<ConnectionRegistry>, SimulatedResponder>;

/// Tears a connection down when its response stream is dropped, which is how
/// tonic reports that the client went away.
pub struct DisconnectGuard {
    connection_id: String,
    connections: Arc<ConnectionRegistry>,
    hub: SessionHub,
}

impl DisconnectGuard {
    pub const fn new(
        connection_id: String,
        connections: Arc<ConnectionRegistry>,
        hub: SessionHub,
    ) -> Self {
        Self {
            connection_id,
            connections,
            hub,
        }
    }
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        self.connections.close(&self.connection_id);
        self.hub.disconnect(&self.connection_id);
        decrement_connections_inflight();
    }
}

pin_project! {
    /// Event stream of a single subscription.
    pub struct ConnectionStream {
        #[pin]
        inner: ReceiverStream<Result<ServerEvent, Status>>,
        guard: DisconnectGuard,
    }
}

impl core::fmt::Debug for ConnectionStream {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConnectionStream")
            .field("connection_id", &self.guard.connection_id)
            .finish_non_exhaustive()
    }
}

impl ConnectionStream {
    pub fn new(rx: EventReceiver, guard: DisconnectGuard) -> Self {
        Self {
            inner: ReceiverStream::new(rx),
            guard,
        }
    }

    pub fn connection_id(&self) -> &str {
        &self.guard.connection_id
    }
}

impl Stream for ConnectionStream {
    type Item = Result<ServerEvent, Status>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project().inner.poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
