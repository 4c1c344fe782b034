//! Open subscriptions and the event streams that feed them.
//!
//! ## Structure
//!
//! - [`registry`] - connection ids mapped to their outbound channels; the
//!   scheduler's delivery sink.
//! - [`stream`] - the response stream handed to tonic, which disconnects its
//!   connection when dropped.

pub mod registry;
pub mod stream;
