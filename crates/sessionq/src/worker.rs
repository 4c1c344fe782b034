//! Execution of a single dequeued request.

use crate::{
    CancelHandle, CancellationRegistry, DeliverySink, Event, GenerationError, ResponseGenerator,
    SessionRequest, coordinator::Shared,
};
use core::panic::AssertUnwindSafe;
use std::sync::Arc;

/// How a worker's execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// The response was delivered.
    Delivered,
    /// Cancelled during the delay; nothing was delivered.
    Cancelled,
    /// A newer request took over the session before delivery; nothing was
    /// delivered.
    Superseded,
    /// Generation failed and the generic error event was delivered.
    Failed,
    /// The destination could not be reached.
    Undeliverable,
}

/// Removes the worker's registry entry on every exit path, unwinding
/// included.
struct Registration<'a> {
    registry: &'a CancellationRegistry,
    session_id: &'a str,
    handle: &'a CancelHandle,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.registry.remove(self.session_id, self.handle);
    }
}

/// Runs `request` to completion under `handle`, which was registered for the
/// request's session when it was enqueued.
///
/// The delay is the only point at which the worker waits on cancellation.
/// Once a response is computed it is delivered unless the handle was
/// cancelled or the session was handed to a newer request in the meantime.
#[cfg_attr(feature = "tracing", tracing::instrument(
    name = "worker",
    skip_all,
    fields(session_id = request.session_id(), destination = request.destination(), registration = handle.id())
))]
pub(crate) async fn process_request<S, G>(
    shared: Arc<Shared<S, G>>,
    request: SessionRequest,
    handle: CancelHandle,
) -> WorkerOutcome
where
    S: DeliverySink,
    G: ResponseGenerator,
{
    let _registration = Registration {
        registry: &shared.registry,
        session_id: request.session_id(),
        handle: &handle,
    };

    #[cfg(feature = "tracing")]
    tracing::info!(
        "Processing prompt, responding in {} seconds",
        request.delay_seconds()
    );

    tokio::select! {
        biased;
        () = handle.cancelled() => {
            #[cfg(feature = "tracing")]
            tracing::info!("Request cancelled");
            return WorkerOutcome::Cancelled;
        }
        () = tokio::time::sleep(request.delay()) => {}
    }

    let (event, outcome) = match generate(&shared.generator, request.payload()) {
        Ok(response) => (
            Event::ReceiveResponse {
                prompt: request.payload().to_owned(),
                response,
            },
            WorkerOutcome::Delivered,
        ),
        Err(_e) => {
            #[cfg(feature = "tracing")]
            tracing::error!("Error processing request: {_e}");
            (Event::generic_error(), WorkerOutcome::Failed)
        }
    };

    if !shared.registry.is_current(request.session_id(), &handle) {
        #[cfg(feature = "tracing")]
        tracing::debug!("Session moved to a newer request, dropping result");
        return WorkerOutcome::Superseded;
    }
    if handle.is_cancelled() {
        #[cfg(feature = "tracing")]
        tracing::info!("Request cancelled before delivery");
        return WorkerOutcome::Cancelled;
    }

    match shared.sink.send(request.destination(), event).await {
        Ok(()) => {
            #[cfg(feature = "tracing")]
            tracing::info!(
                "Response sent after {} ms",
                request.age().as_millis()
            );
            outcome
        }
        Err(_e) => {
            #[cfg(feature = "tracing")]
            tracing::warn!("Delivery failed: {_e}");
            WorkerOutcome::Undeliverable
        }
    }
}

/// Calls the generator, converting a panic into a [`GenerationError`].
fn generate<G>(generator: &G, payload: &str) -> Result<String, GenerationError>
where
    G: ResponseGenerator,
{
    std::panic::catch_unwind(AssertUnwindSafe(|| generator.generate(payload))).unwrap_or_else(
        |panic| {
            let detail = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_owned())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_owned());
            Err(GenerationError::new(format!("generator panicked: {detail}")))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        GENERIC_ERROR_MESSAGE,
        test_support::{EchoGenerator, FaultyGenerator, RecordingSink},
    };
    use core::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn shared<G: ResponseGenerator>(generator: G) -> Arc<Shared<RecordingSink, G>> {
        Arc::new(Shared::new(
            RecordingSink::new(),
            generator,
            CancellationToken::new(),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn delivers_after_delay_and_deregisters() {
        let shared = shared(EchoGenerator);
        let handle = shared.registry.register("s1");
        let request = SessionRequest::new("s1", "hello", "c1", 5);

        let outcome = process_request(Arc::clone(&shared), request, handle).await;

        assert_eq!(outcome, WorkerOutcome::Delivered);
        assert_eq!(
            shared.sink.events_for("c1"),
            vec![Event::ReceiveResponse {
                prompt: "hello".into(),
                response: "echo: hello".into()
            }]
        );
        assert!(shared.registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_delay_delivers_immediately() {
        let shared = shared(EchoGenerator);
        let handle = shared.registry.register("s1");
        let request = SessionRequest::new("s1", "now", "c1", 0);

        let outcome = process_request(Arc::clone(&shared), request, handle).await;
        assert_eq!(outcome, WorkerOutcome::Delivered);
        assert_eq!(shared.sink.responses_for("c1"), ["now"]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_delay_delivers_nothing() {
        let shared = shared(EchoGenerator);
        let handle = shared.registry.register("s1");
        let request = SessionRequest::new("s1", "slow", "c1", 60);

        let worker = tokio::spawn(process_request(Arc::clone(&shared), request, handle));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(shared.registry.cancel("s1"));

        assert_eq!(worker.await.unwrap(), WorkerOutcome::Cancelled);
        assert!(shared.sink.events().is_empty());
        assert!(shared.registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_worker_leaves_successor_registered() {
        let shared = shared(EchoGenerator);
        let first = shared.registry.register("s1");
        let second = shared.registry.register("s1");

        let outcome = process_request(
            Arc::clone(&shared),
            SessionRequest::new("s1", "a", "c1", 5),
            first,
        )
        .await;

        assert_eq!(outcome, WorkerOutcome::Cancelled);
        assert!(shared.registry.is_current("s1", &second));
        assert!(shared.sink.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn generation_failure_sends_generic_error() {
        let shared = shared(FaultyGenerator);
        let handle = shared.registry.register("s1");

        let outcome = process_request(
            Arc::clone(&shared),
            SessionRequest::new("s1", "please fail", "c1", 0),
            handle,
        )
        .await;

        assert_eq!(outcome, WorkerOutcome::Failed);
        assert_eq!(
            shared.sink.events_for("c1"),
            vec![Event::Error {
                message: GENERIC_ERROR_MESSAGE.into()
            }]
        );
        assert!(shared.registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn generator_panic_is_contained() {
        let shared = shared(FaultyGenerator);
        let handle = shared.registry.register("s1");

        let outcome = process_request(
            Arc::clone(&shared),
            SessionRequest::new("s1", "panic now", "c1", 0),
            handle,
        )
        .await;

        assert_eq!(outcome, WorkerOutcome::Failed);
        assert_eq!(shared.sink.events_for("c1"), vec![Event::generic_error()]);
        assert!(shared.registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_destination_is_swallowed() {
        let shared = shared(EchoGenerator);
        shared.sink.make_unreachable("gone");
        let handle = shared.registry.register("s1");

        let outcome = process_request(
            Arc::clone(&shared),
            SessionRequest::new("s1", "hello", "gone", 0),
            handle,
        )
        .await;

        assert_eq!(outcome, WorkerOutcome::Undeliverable);
        assert!(shared.registry.is_empty());
    }

    /// Cancels the scheduler's shutdown token from inside generation.
    struct CancelsWhileGenerating(CancellationToken);

    impl ResponseGenerator for CancelsWhileGenerating {
        fn generate(&self, payload: &str) -> Result<String, GenerationError> {
            self.0.cancel();
            Ok(payload.to_owned())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_after_generation_drops_result() {
        let shutdown = CancellationToken::new();
        let shared = Arc::new(Shared::new(
            RecordingSink::new(),
            CancelsWhileGenerating(shutdown.clone()),
            shutdown,
        ));
        let handle = shared.registry.register("s1");

        let outcome = process_request(
            Arc::clone(&shared),
            SessionRequest::new("s1", "hello", "c1", 0),
            handle,
        )
        .await;

        assert_eq!(outcome, WorkerOutcome::Cancelled);
        assert!(shared.sink.events().is_empty());
        assert!(shared.registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_token_cancels_worker() {
        let shutdown = CancellationToken::new();
        let shared = Arc::new(Shared::new(
            RecordingSink::new(),
            EchoGenerator,
            shutdown.clone(),
        ));
        let handle = shared.registry.register("s1");

        let worker = tokio::spawn(process_request(
            Arc::clone(&shared),
            SessionRequest::new("s1", "hello", "c1", 30),
            handle,
        ));
        tokio::time::sleep(Duration::from_secs(1)).await;
        shutdown.cancel();

        assert_eq!(worker.await.unwrap(), WorkerOutcome::Cancelled);
        assert!(shared.sink.events().is_empty());
    }
}
