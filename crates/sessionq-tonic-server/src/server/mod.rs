pub mod config;
pub mod connections;
pub mod service;
pub mod telemetry;
