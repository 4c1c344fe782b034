//! gRPC service implementation for the chat hub.
//!
//! This module defines [`HubService`], the concrete implementation of the
//! [`ChatHub`] gRPC service. A client subscribes to receive its events and
//! then addresses prompts and stops to the connection id announced in the
//! first event.
//!
//! ## Responsibilities
//!
//! - Open and tear down connections.
//! - Validate `SendPrompt` and `StopGeneration` requests.
//! - Drain the scheduler and close every stream on shutdown.

use crate::server::{
    config::ServerConfig,
    connections::{
        registry::ConnectionRegistry,
        stream::{ConnectionStream, DisconnectGuard, SessionHub},
    },
    telemetry::{
        increment_connections_inflight, increment_prompts, increment_rpc_errors,
        increment_stop_requests,
    },
};
use sessionq_tonic_core::{
    Error,
    proto::{
        SendPromptReply, SendPromptRequest, StopGenerationReply, StopGenerationRequest,
        SubscribeRequest, chat_hub_server::ChatHub,
    },
    sessionq::{Coordinator, Hub, SimulatedResponder},
};
use std::sync::Arc;
use tonic::{Request, Response, Status};

/// Chat hub exposed over gRPC.
///
/// Connection ids double as session ids, so each subscription has at most one
/// generation in flight. A new prompt supersedes the previous one.
#[derive(Clone)]
pub struct HubService {
    hub: SessionHub,
    connections: Arc<ConnectionRegistry>,
}

impl HubService {
    /// Creates the service and starts its scheduler on the current runtime.
    pub fn new(config: &ServerConfig) -> Self {
        let connections = Arc::new(ConnectionRegistry::new(
            config.event_buffer_size,
            config.delivery_timeout,
        ));
        let coordinator = Coordinator::start(
            config.scheduler(),
            Arc::clone(&connections),
            SimulatedResponder::new(config.response_delay_secs),
        );

        Self {
            hub: Hub::new(coordinator, config.response_delay_secs),
            connections,
        }
    }

    /// Stops the scheduler, then ends every open stream.
    pub async fn shutdown(&self) -> Result<(), Error> {
        self.hub.coordinator().shutdown().await?;

        let closed = self.connections.close_all();
        tracing::info!("Closed {closed} connection(s)");
        Ok(())
    }

    fn ensure_connected(&self, connection_id: &str) -> Result<(), Error> {
        if self.connections.contains(connection_id) {
            Ok(())
        } else {
            Err(Error::UnknownConnection {
                connection_id: connection_id.to_owned(),
            })
        }
    }
}

fn reject(err: Error) -> Status {
    increment_rpc_errors();
    tracing::warn!("Rejected request: {err}");
    err.into()
}

#[tonic::async_trait]
impl ChatHub for HubService {
    type SubscribeStream = ConnectionStream;

    /// Opens a connection and announces its id with `Connected`.
    #[tracing::instrument(skip_all)]
    async fn subscribe(
        &self,
        _req: Request<SubscribeRequest>,
    ) -> Result<Response<Self::SubscribeStream>, Status> {
        if !self.hub.coordinator().is_accepting() {
            return Err(reject(Error::ServiceShutdown));
        }

        let (connection_id, rx) = self.connections.open();
        increment_connections_inflight();
        let stream = ConnectionStream::new(
            rx,
            DisconnectGuard::new(
                connection_id.clone(),
                Arc::clone(&self.connections),
                self.hub.clone(),
            ),
        );

        self.hub.connect(stream.connection_id()).await;
        Ok(Response::new(stream))
    }

    /// Acknowledges the prompt on the connection's stream and schedules its
    /// response.
    #[tracing::instrument(skip_all, fields(connection_id = %req.get_ref().connection_id))]
    async fn send_prompt(
        &self,
        req: Request<SendPromptRequest>,
    ) -> Result<Response<SendPromptReply>, Status> {
        let SendPromptRequest {
            connection_id,
            prompt,
        } = req.into_inner();

        self.ensure_connected(&connection_id).map_err(reject)?;
        if prompt.trim().is_empty() {
            return Err(reject(Error::InvalidRequest {
                reason: "Prompt must not be empty".to_string(),
            }));
        }

        self.hub
            .send_prompt(&connection_id, &prompt)
            .await
            .map_err(|e| reject(e.into()))?;

        increment_prompts();
        Ok(Response::new(SendPromptReply {}))
    }

    /// Stops the connection's current generation and confirms on its stream.
    #[tracing::instrument(skip_all, fields(connection_id = %req.get_ref().connection_id))]
    async fn stop_generation(
        &self,
        req: Request<StopGenerationRequest>,
    ) -> Result<Response<StopGenerationReply>, Status> {
        let connection_id = req.into_inner().connection_id;
        self.ensure_connected(&connection_id).map_err(reject)?;

        increment_stop_requests();
        let cancelled = self.hub.stop_generation(&connection_id).await;
        Ok(Response::new(StopGenerationReply { cancelled }))
    }
}
