//! gRPC service implementation.
//!
//! Translates `ChatHub` calls into hub operations. Validation and status
//! mapping happen here; scheduling and delivery belong to the hub.
//!
//! ## Structure
//!
//! - [`handler`] - gRPC service entry point (`HubService`).

pub mod handler;
