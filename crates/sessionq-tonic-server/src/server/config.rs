use anyhow::bail;
use clap::Parser;
use core::time::Duration;
use sessionq::SchedulerConfig;

/// Runtime configuration for the `sessionq-tonic-server` binary.
///
/// These settings control how often queued prompts are picked up, how long
/// simulated generations take, and how much buffering each connection gets.
/// All values are parsed from CLI arguments or environment variables (a
/// `.env` file is loaded first).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "sessionq-tonic-server",
    version,
    about = "A gRPC chat hub with one cancellable generation per connection"
)]
pub struct CliArgs {
    /// Interval, in milliseconds, at which the scheduler drains queued
    /// prompts.
    ///
    /// Lower values reduce the time between a prompt being accepted and its
    /// worker starting, at the cost of more frequent wakeups.
    ///
    /// Environment variable: `POLL_INTERVAL_MS`
    #[arg(long, env = "POLL_INTERVAL_MS", default_value_t = 100)]
    pub poll_interval_ms: u64,

    /// Simulated processing time, in seconds, before a prompt is answered.
    ///
    /// Environment variable: `RESPONSE_DELAY_SECS`
    #[arg(long, env = "RESPONSE_DELAY_SECS", default_value_t = 10)]
    pub response_delay_secs: u64,

    /// Seconds to wait for in-flight generations to wind down on shutdown.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT_SECS`
    #[arg(long, env = "SHUTDOWN_TIMEOUT_SECS", default_value_t = 3)]
    pub shutdown_timeout_secs: u64,

    /// Number of events buffered per connection before delivery waits on the
    /// client.
    ///
    /// Environment variable: `EVENT_BUFFER_SIZE`
    #[arg(long, env = "EVENT_BUFFER_SIZE", default_value_t = 32)]
    pub event_buffer_size: usize,

    /// Milliseconds a delivery waits for room in a full connection buffer
    /// before the event is dropped.
    ///
    /// Environment variable: `DELIVERY_TIMEOUT_MS`
    #[arg(long, env = "DELIVERY_TIMEOUT_MS", default_value_t = 5_000)]
    pub delivery_timeout_ms: u64,

    /// Address to listen on (TCP or Unix socket path; use --uds for Unix socket).
    ///
    /// Example: "0.0.0.0:50051" or "/tmp/sessionq.sock"
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:50051"))]
    pub server_addr: String,

    /// Listen on a Unix socket instead of TCP. If set, `SERVER_ADDR` must be a file path.
    #[arg(short, long, default_value_t = false)]
    pub uds: bool,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub poll_interval: Duration,
    pub response_delay_secs: u64,
    pub shutdown_timeout: Duration,
    pub event_buffer_size: usize,
    pub delivery_timeout: Duration,
    pub server_addr: String,
    pub uds: bool,
}

impl ServerConfig {
    /// Scheduler tunables derived from this configuration.
    pub const fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            poll_interval: self.poll_interval,
            shutdown_timeout: self.shutdown_timeout,
        }
    }
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.poll_interval_ms == 0 {
            bail!("POLL_INTERVAL_MS must be greater than 0");
        }

        if args.event_buffer_size == 0 {
            bail!("EVENT_BUFFER_SIZE must be greater than 0");
        }

        if args.delivery_timeout_ms == 0 {
            bail!("DELIVERY_TIMEOUT_MS must be greater than 0");
        }

        if args.server_addr.trim().is_empty() {
            bail!("SERVER_ADDR must not be empty");
        }

        Ok(Self {
            poll_interval: Duration::from_millis(args.poll_interval_ms),
            response_delay_secs: args.response_delay_secs,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout_secs),
            event_buffer_size: args.event_buffer_size,
            delivery_timeout: Duration::from_millis(args.delivery_timeout_ms),
            server_addr: args.server_addr,
            uds: args.uds,
        })
    }
}
