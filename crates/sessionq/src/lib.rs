#![doc = include_str!("../README.md")]

mod config;
mod coordinator;
mod error;
mod event;
mod generator;
mod hub;
mod queue;
mod registry;
mod request;
mod scheduler;
mod sink;
mod worker;

#[cfg(test)]
mod test_support;

pub use crate::config::*;
pub use crate::coordinator::*;
pub use crate::error::*;
pub use crate::event::*;
pub use crate::generator::*;
pub use crate::hub::*;
pub use crate::queue::*;
pub use crate::registry::*;
pub use crate::request::*;
pub use crate::scheduler::SchedulerState;
pub use crate::sink::*;
pub use crate::worker::WorkerOutcome;
