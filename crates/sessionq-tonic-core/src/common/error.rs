//! Error types for the chat hub service.
//!
//! This module defines the central `Error` enum returned by the gRPC layer and
//! implements `From<Error>` for `tonic::Status` so each case reaches clients
//! with an appropriate status code.
//!
//! ## Error Cases
//! - `UnknownConnection`: a unary call named a connection that is not
//!   subscribed.
//! - `InvalidRequest`: the request was malformed.
//! - `ServiceShutdown`: the hub is draining and refuses new work.
//! - `ChannelError`: an internal channel between tasks was closed.

use tonic::Status;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the chat hub service.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// No subscription is open under this connection id.
    #[error("Unknown connection: {connection_id}")]
    UnknownConnection { connection_id: String },

    /// The client request was invalid.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,

    /// Internal channel send/receive failure.
    #[error("Channel error: {context}")]
    ChannelError { context: String },
}

impl From<sessionq::Error> for Error {
    fn from(err: sessionq::Error) -> Self {
        match err {
            sessionq::Error::ServiceShutdown => Self::ServiceShutdown,
            sessionq::Error::Delivery(e) => Self::ChannelError {
                context: e.to_string(),
            },
            sessionq::Error::Generation(_) => Self::ChannelError {
                context: "generation failed".to_string(),
            },
        }
    }
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::UnknownConnection { connection_id } => {
                Status::not_found(format!("Unknown connection: {connection_id}"))
            }
            Error::InvalidRequest { reason } => Status::invalid_argument(reason),
            Error::ServiceShutdown => Status::unavailable("Service is shutting down"),
            Error::ChannelError { context } => Status::internal(format!("Channel error: {context}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    #[test]
    fn maps_to_status_codes() {
        let cases = [
            (
                Error::UnknownConnection {
                    connection_id: "c1".into(),
                },
                Code::NotFound,
            ),
            (
                Error::InvalidRequest {
                    reason: "empty".into(),
                },
                Code::InvalidArgument,
            ),
            (Error::ServiceShutdown, Code::Unavailable),
            (
                Error::ChannelError {
                    context: "closed".into(),
                },
                Code::Internal,
            ),
        ];

        for (err, code) in cases {
            assert_eq!(Status::from(err).code(), code);
        }
    }

    #[test]
    fn scheduler_shutdown_becomes_unavailable() {
        let err = Error::from(sessionq::Error::ServiceShutdown);
        assert_eq!(err, Error::ServiceShutdown);
        assert_eq!(Status::from(err).code(), Code::Unavailable);
    }

    #[test]
    fn generation_detail_is_not_exposed() {
        let err = Error::from(sessionq::Error::Generation(
            sessionq::GenerationError::new("secret stack trace"),
        ));
        assert!(!Status::from(err).message().contains("secret"));
    }
}
