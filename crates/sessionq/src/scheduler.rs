//! The background loop that turns queued requests into worker tasks.

use crate::{DeliverySink, ResponseGenerator, coordinator::Shared, worker::process_request};
use core::time::Duration;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;

/// Lifecycle of the scheduler.
///
/// The only transitions are `Running → Draining → Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SchedulerState {
    /// Accepting requests and dispatching them on every tick.
    Running = 0,
    /// Shutdown began: no new requests, in-flight workers are winding down.
    Draining = 1,
    /// Every worker finished or the drain timed out.
    Stopped = 2,
}

impl SchedulerState {
    pub(crate) const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Running,
            1 => Self::Draining,
            _ => Self::Stopped,
        }
    }
}

/// Drains the queue every `poll_interval` until the shutdown token fires.
///
/// Never waits on a worker: each tick only dispatches.
pub(crate) async fn run_scheduler<S, G>(shared: Arc<Shared<S, G>>, poll_interval: Duration)
where
    S: DeliverySink,
    G: ResponseGenerator,
{
    #[cfg(feature = "tracing")]
    tracing::info!("Scheduler started, polling every {poll_interval:?}");

    let mut ticker = tokio::time::interval(poll_interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = shared.shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let _dispatched = dispatch_pending(&shared);
                #[cfg(feature = "tracing")]
                if _dispatched > 0 {
                    tracing::debug!("Dispatched {_dispatched} request(s)");
                }
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::info!("Scheduler stopped polling");
}

/// Takes every queued request and spawns one worker per request, oldest
/// first. Returns the number of workers spawned.
///
/// Handles were registered at enqueue time, so a request that was superseded
/// or cancelled while queued starts with its handle already cancelled.
pub(crate) fn dispatch_pending<S, G>(shared: &Arc<Shared<S, G>>) -> usize
where
    S: DeliverySink,
    G: ResponseGenerator,
{
    let batch = shared.queue.drain();
    let dispatched = batch.len();
    for queued in batch {
        let (request, handle) = queued.into_parts();
        shared
            .tracker
            .spawn(process_request(Arc::clone(shared), request, handle));
    }
    dispatched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        QueuedRequest, SessionRequest,
        test_support::{EchoGenerator, RecordingSink},
    };
    use tokio_util::sync::CancellationToken;

    fn shared() -> Arc<Shared<RecordingSink, EchoGenerator>> {
        Arc::new(Shared::new(
            RecordingSink::new(),
            EchoGenerator,
            CancellationToken::new(),
        ))
    }

    fn push(
        shared: &Shared<RecordingSink, EchoGenerator>,
        session: &str,
        payload: &str,
        destination: &str,
    ) {
        let handle = shared.registry.register(session);
        shared.queue.push(QueuedRequest::new(
            SessionRequest::new(session, payload, destination, 0),
            handle,
        ));
    }

    #[test]
    fn state_round_trips_through_u8() {
        for state in [
            SchedulerState::Running,
            SchedulerState::Draining,
            SchedulerState::Stopped,
        ] {
            assert_eq!(SchedulerState::from_u8(state as u8), state);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dispatch_runs_only_the_newest_request_per_session() {
        let shared = shared();
        push(&shared, "s1", "a", "c1");
        push(&shared, "s1", "b", "c1");
        push(&shared, "s2", "x", "c2");

        assert_eq!(dispatch_pending(&shared), 3);
        assert!(shared.queue.is_empty());

        shared.tracker.close();
        shared.tracker.wait().await;

        assert_eq!(shared.sink.responses_for("c1"), ["b"]);
        assert_eq!(shared.sink.responses_for("c2"), ["x"]);
        assert!(shared.registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn request_cancelled_while_queued_delivers_nothing() {
        let shared = shared();
        push(&shared, "s1", "a", "c1");
        assert!(shared.registry.cancel("s1"));

        assert_eq!(dispatch_pending(&shared), 1);
        shared.tracker.close();
        shared.tracker.wait().await;

        assert!(shared.sink.events().is_empty());
        assert!(shared.registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dispatch_on_empty_queue_spawns_nothing() {
        let shared = shared();
        assert_eq!(dispatch_pending(&shared), 0);
        assert!(shared.tracker.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn loop_exits_on_shutdown() {
        let shared = shared();
        let looper = tokio::spawn(run_scheduler(
            Arc::clone(&shared),
            Duration::from_millis(100),
        ));

        push(&shared, "s1", "a", "c1");
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(shared.sink.responses_for("c1"), ["a"]);

        shared.shutdown.cancel();
        looper.await.unwrap();
    }
}
