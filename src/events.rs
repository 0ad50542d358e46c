//! Observer and publisher seams towards collaborators.
//!
//! The logger core emits typed events to registered observers and hands
//! finished datapoints to an optional publisher. Observers are notified
//! synchronously, in registration order, after the core's own state mutation
//! has completed. Publishing is fire-and-forget: a failing publisher is
//! logged at this boundary and never aborts the assembly path.

use crate::config::SessionConfig;
use crate::datapoint::Datapoint;

/// Events emitted by the logger core.
#[derive(Debug, Clone)]
pub enum LoggerEvent {
    /// A new collection session started.
    Started,
    /// The active configuration changed.
    ConfigurationChanged(SessionConfig),
    /// A datapoint was assembled and appended to the history.
    DatapointReady(Datapoint),
}

/// Receives logger events.
///
/// Any `Fn(&LoggerEvent)` closure implements this trait.
pub trait LoggerObserver: Send + Sync {
    /// Handle one event. Called synchronously from the logger.
    fn on_event(&self, event: &LoggerEvent);
}

impl<F> LoggerObserver for F
where
    F: Fn(&LoggerEvent) + Send + Sync,
{
    fn on_event(&self, event: &LoggerEvent) {
        self(event)
    }
}

/// Transmits finished datapoints to interested subscribers.
///
/// Implementations wrap whatever transport the deployment uses (a message
/// bus, a GUI channel, stdout). Delivery is best-effort from the logger's
/// perspective.
pub trait DatapointPublisher: Send + Sync {
    /// Publish one datapoint.
    fn publish(&self, datapoint: &Datapoint) -> anyhow::Result<()>;
}
