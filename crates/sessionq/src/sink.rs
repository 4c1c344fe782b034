use crate::{DeliveryError, Event};
use core::future::Future;
use std::sync::Arc;

/// Pushes named events to a single destination.
///
/// Implementations own the transport. A sink must report an unknown or closed
/// destination through [`DeliveryError`] rather than panicking; the scheduler
/// logs and drops such failures without retrying.
pub trait DeliverySink: Send + Sync + 'static {
    /// Sends `event` to `destination`.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] if the destination cannot be reached.
    fn send(
        &self,
        destination: &str,
        event: Event,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

impl<S> DeliverySink for Arc<S>
where
    S: DeliverySink,
{
    fn send(
        &self,
        destination: &str,
        event: Event,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send {
        (**self).send(destination, event)
    }
}
