//! Public entry point: enqueue, cancel, and lifecycle of the scheduler.

use crate::{
    CancellationRegistry, DeliverySink, Error, QueuedRequest, RequestQueue, ResponseGenerator,
    Result, SchedulerConfig, SchedulerState, SessionRequest, scheduler::run_scheduler,
};
use parking_lot::Mutex;
use portable_atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::{task::JoinHandle, time::timeout};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

/// State shared by the coordinator, the scheduler loop, and every worker.
pub(crate) struct Shared<S, G> {
    pub(crate) registry: CancellationRegistry,
    pub(crate) queue: RequestQueue,
    /// Serializes register-then-push against the shutdown transition, and
    /// keeps the queue in registration order.
    pub(crate) admission: Mutex<()>,
    pub(crate) sink: S,
    pub(crate) generator: G,
    pub(crate) shutdown: CancellationToken,
    pub(crate) tracker: TaskTracker,
    state: AtomicU8,
}

impl<S, G> Shared<S, G> {
    pub(crate) fn new(sink: S, generator: G, shutdown: CancellationToken) -> Self {
        Self {
            registry: CancellationRegistry::new(shutdown.clone()),
            queue: RequestQueue::new(),
            admission: Mutex::new(()),
            sink,
            generator,
            shutdown,
            tracker: TaskTracker::new(),
            state: AtomicU8::new(SchedulerState::Running as u8),
        }
    }

    fn state(&self) -> SchedulerState {
        SchedulerState::from_u8(self.state.load(Ordering::Acquire))
    }
}

/// Per-session request scheduler.
///
/// Guarantees at most one in-flight request per session: enqueueing for a
/// session cancels whatever that session was doing. Requests are processed
/// concurrently, each after its own simulated delay, and every result is
/// delivered through the [`DeliverySink`] to the request's destination.
///
/// The coordinator is an explicitly constructed value. Clones share the same
/// scheduler.
pub struct Coordinator<S, G> {
    shared: Arc<Shared<S, G>>,
    config: SchedulerConfig,
    scheduler: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl<S, G> Clone for Coordinator<S, G> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            config: self.config,
            scheduler: Arc::clone(&self.scheduler),
        }
    }
}

impl<S, G> Coordinator<S, G>
where
    S: DeliverySink,
    G: ResponseGenerator,
{
    /// Spawns the scheduler loop on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(config: SchedulerConfig, sink: S, generator: G) -> Self {
        let shared = Arc::new(Shared::new(sink, generator, CancellationToken::new()));
        let scheduler = tokio::spawn(run_scheduler(Arc::clone(&shared), config.poll_interval));

        Self {
            shared,
            config,
            scheduler: Arc::new(Mutex::new(Some(scheduler))),
        }
    }

    /// Queues a request for `session_id`, first cancelling anything the
    /// session still has queued or running.
    ///
    /// The request's handle is registered immediately, so [`cancel`](Self::cancel)
    /// reaches it before the scheduler has picked it up.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ServiceShutdown`] once [`shutdown`](Self::shutdown)
    /// has begun.
    pub fn enqueue(
        &self,
        session_id: &str,
        payload: &str,
        destination: &str,
        delay_seconds: u64,
    ) -> Result<()> {
        let request = SessionRequest::new(session_id, payload, destination, delay_seconds);
        {
            let _admission = self.shared.admission.lock();
            if self.shared.state() != SchedulerState::Running {
                return Err(Error::ServiceShutdown);
            }
            let handle = self.shared.registry.register(session_id);
            self.shared.queue.push(QueuedRequest::new(request, handle));
        }

        #[cfg(feature = "tracing")]
        tracing::info!(session_id, destination, "Queued request");
        Ok(())
    }

    /// Cancels the session's current request, queued or running, if it has
    /// one. Returns whether a live request was signalled.
    pub fn cancel(&self, session_id: &str) -> bool {
        let cancelled = self.shared.registry.cancel(session_id);

        #[cfg(feature = "tracing")]
        if cancelled {
            tracing::info!(session_id, "Cancelled request");
        }
        cancelled
    }

    /// Stops the scheduler.
    ///
    /// - Refuses new requests and cancels every in-flight worker.
    /// - Waits for the scheduler loop to exit and drops requests that were
    ///   still queued.
    /// - Waits up to `shutdown_timeout` for workers to finish.
    ///
    /// Calling it again after the first call returns immediately.
    pub async fn shutdown(&self) -> Result<()> {
        {
            let _admission = self.shared.admission.lock();
            if self
                .shared
                .state
                .compare_exchange(
                    SchedulerState::Running as u8,
                    SchedulerState::Draining as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_err()
            {
                return Ok(());
            }
        }

        #[cfg(feature = "tracing")]
        tracing::info!(
            "Draining scheduler ({} active sessions)",
            self.shared.registry.len()
        );
        self.shared.shutdown.cancel();

        let scheduler = self.scheduler.lock().take();
        if let Some(scheduler) = scheduler {
            if let Err(_e) = scheduler.await {
                #[cfg(feature = "tracing")]
                tracing::error!("Scheduler loop ended abnormally: {_e}");
            }
        }

        let dropped = self.shared.queue.drain();
        for queued in &dropped {
            self.shared
                .registry
                .remove(queued.request().session_id(), queued.handle());
        }
        let _dropped = dropped.len();
        #[cfg(feature = "tracing")]
        if _dropped > 0 {
            tracing::info!("Dropped {_dropped} queued request(s)");
        }

        self.shared.tracker.close();
        match timeout(self.config.shutdown_timeout, self.shared.tracker.wait()).await {
            Ok(()) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("All workers finished");
            }
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    "Worker drain timed out ({} still running)",
                    self.shared.tracker.len()
                );
            }
        }

        self.shared
            .state
            .store(SchedulerState::Stopped as u8, Ordering::Release);

        #[cfg(feature = "tracing")]
        tracing::info!("Scheduler shutdown complete");
        Ok(())
    }
}

impl<S, G> Coordinator<S, G> {
    pub fn state(&self) -> SchedulerState {
        self.shared.state()
    }

    /// Whether [`enqueue`](Self::enqueue) currently accepts requests.
    pub fn is_accepting(&self) -> bool {
        self.state() == SchedulerState::Running
    }

    /// Number of sessions with a queued or running request.
    pub fn active_sessions(&self) -> usize {
        self.shared.registry.len()
    }

    /// Whether `session_id` has a queued or running request.
    pub fn is_active(&self, session_id: &str) -> bool {
        self.shared.registry.contains(session_id)
    }

    /// Number of requests waiting for the next scheduler tick.
    pub fn pending_requests(&self) -> usize {
        self.shared.queue.len()
    }

    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// The sink results are delivered through.
    pub fn sink(&self) -> &S {
        &self.shared.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Event,
        test_support::{EchoGenerator, RecordingSink},
    };
    use core::time::Duration;

    fn start() -> Coordinator<RecordingSink, EchoGenerator> {
        Coordinator::start(SchedulerConfig::default(), RecordingSink::new(), EchoGenerator)
    }

    #[tokio::test(start_paused = true)]
    async fn enqueue_delivers_to_destination() {
        let coordinator = start();
        coordinator.enqueue("s1", "hello", "c1", 1).unwrap();
        assert_eq!(coordinator.pending_requests(), 1);

        tokio::time::sleep(Duration::from_millis(1_500)).await;

        assert_eq!(
            coordinator.sink().events_for("c1"),
            vec![Event::ReceiveResponse {
                prompt: "hello".into(),
                response: "echo: hello".into()
            }]
        );
        assert_eq!(coordinator.active_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn second_enqueue_supersedes_running_request() {
        let coordinator = start();
        coordinator.enqueue("s1", "a", "c1", 5).unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(coordinator.is_active("s1"));

        coordinator.enqueue("s1", "b", "c1", 5).unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(coordinator.sink().responses_for("c1"), ["b"]);
        assert_eq!(coordinator.active_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_idle_session_is_noop() {
        let coordinator = start();
        assert!(!coordinator.cancel("nobody"));
        assert_eq!(coordinator.active_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_mid_delay_frees_session() {
        let coordinator = start();
        coordinator.enqueue("s1", "a", "c1", 5).unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(coordinator.cancel("s1"));
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(!coordinator.is_active("s1"));
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(coordinator.sink().events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_before_dispatch_suppresses_request() {
        let coordinator = start();
        coordinator.enqueue("s1", "a", "c1", 5).unwrap();
        assert_eq!(coordinator.pending_requests(), 1);

        assert!(coordinator.cancel("s1"));
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(coordinator.sink().events().is_empty());
        assert_eq!(coordinator.active_sessions(), 0);
        assert_eq!(coordinator.pending_requests(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_then_enqueue_before_dispatch_runs_newest() {
        let coordinator = start();
        coordinator.enqueue("s1", "a", "c1", 1).unwrap();
        assert!(coordinator.cancel("s1"));
        coordinator.enqueue("s1", "b", "c1", 1).unwrap();

        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(coordinator.sink().responses_for("c1"), ["b"]);
        assert_eq!(coordinator.active_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_workers_and_refuses_work() {
        let coordinator = start();
        coordinator.enqueue("s1", "a", "c1", 30).unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(coordinator.active_sessions(), 1);

        coordinator.shutdown().await.unwrap();

        assert_eq!(coordinator.state(), SchedulerState::Stopped);
        assert_eq!(coordinator.active_sessions(), 0);
        assert!(coordinator.sink().events().is_empty());
        assert_eq!(
            coordinator.enqueue("s1", "b", "c1", 0),
            Err(Error::ServiceShutdown)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_drops_queued_requests() {
        let coordinator = Coordinator::start(
            SchedulerConfig::default().with_poll_interval(Duration::from_secs(60)),
            RecordingSink::new(),
            EchoGenerator,
        );
        // Let the first (immediate) tick pass on an empty queue.
        tokio::time::sleep(Duration::from_millis(1)).await;

        coordinator.enqueue("s1", "never", "c1", 0).unwrap();
        assert!(coordinator.is_active("s1"));
        coordinator.shutdown().await.unwrap();

        assert_eq!(coordinator.pending_requests(), 0);
        assert_eq!(coordinator.active_sessions(), 0);
        assert!(coordinator.sink().events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_twice_is_harmless() {
        let coordinator = start();
        coordinator.shutdown().await.unwrap();
        coordinator.clone().shutdown().await.unwrap();
        assert_eq!(coordinator.state(), SchedulerState::Stopped);
        assert!(!coordinator.is_accepting());
    }
}
