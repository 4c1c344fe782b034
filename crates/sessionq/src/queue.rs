use crate::{CancelHandle, SessionRequest};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// A request paired with the handle registered for it when it was enqueued.
///
/// Registering at enqueue time means a cancel reaches the request while it is
/// still waiting for the scheduler, not only once a worker holds it.
#[derive(Debug)]
pub struct QueuedRequest {
    request: SessionRequest,
    handle: CancelHandle,
}

impl QueuedRequest {
    pub const fn new(request: SessionRequest, handle: CancelHandle) -> Self {
        Self { request, handle }
    }

    pub const fn request(&self) -> &SessionRequest {
        &self.request
    }

    pub const fn handle(&self) -> &CancelHandle {
        &self.handle
    }

    pub fn into_parts(self) -> (SessionRequest, CancelHandle) {
        (self.request, self.handle)
    }
}

/// Unbounded FIFO of requests waiting for the scheduler loop.
///
/// Producers never block. The queue neither prioritizes nor deduplicates: a
/// superseded request stays queued with its handle already cancelled, and its
/// worker exits without delivering.
#[derive(Debug, Default)]
pub struct RequestQueue {
    pending: Mutex<VecDeque<QueuedRequest>>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `queued` to the back of the queue.
    pub fn push(&self, queued: QueuedRequest) {
        self.pending.lock().push_back(queued);
    }

    /// Takes every queued request, oldest first.
    pub fn drain(&self) -> Vec<QueuedRequest> {
        let mut pending = self.pending.lock();
        if pending.is_empty() {
            return Vec::new();
        }
        Vec::from(core::mem::take(&mut *pending))
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}
