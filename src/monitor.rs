//! Lag detection for update delivery.
//!
//! `LagMonitor` is an external safeguard around a [`DataLogger`]: delivery
//! paths call [`touch`](LagMonitor::touch) whenever an update arrives, and a
//! background task pauses the logger once no update has been seen for the
//! configured threshold. The next delivery resumes it. The logger core
//! itself knows nothing about lag; this collaborator only uses its public
//! `pause` entry point.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::logger::DataLogger;

/// Default stall threshold before the measurement is paused.
pub const DEFAULT_STALL_THRESHOLD: Duration = Duration::from_secs(5);

/// Watchdog that pauses a logger when update delivery stalls.
pub struct LagMonitor {
    inner: Arc<Inner>,
    task: JoinHandle<()>,
}

struct Inner {
    logger: DataLogger,
    last_seen: Mutex<Instant>,
    stalled: AtomicBool,
}

impl LagMonitor {
    /// Start a monitor with the default 5 s threshold.
    ///
    /// Must be called within a tokio runtime.
    pub fn new(logger: DataLogger) -> Self {
        Self::with_threshold(logger, DEFAULT_STALL_THRESHOLD)
    }

    /// Start a monitor with a custom stall threshold.
    pub fn with_threshold(logger: DataLogger, threshold: Duration) -> Self {
        let inner = Arc::new(Inner {
            logger,
            last_seen: Mutex::new(Instant::now()),
            stalled: AtomicBool::new(false),
        });
        let watchdog = Arc::clone(&inner);
        let task = tokio::spawn(async move {
            // Check a few times per threshold so stalls are caught promptly.
            let mut ticker = tokio::time::interval(threshold / 4);
            loop {
                ticker.tick().await;
                let last_seen = *watchdog
                    .last_seen
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                if last_seen.elapsed() > threshold
                    && !watchdog.stalled.swap(true, Ordering::SeqCst)
                {
                    warn!(?threshold, "update delivery stalled, pausing measurement");
                    watchdog.logger.pause(true);
                }
            }
        });
        Self { inner, task }
    }

    /// Record one update delivery, resuming the logger after a stall.
    pub fn touch(&self) {
        *self
            .inner
            .last_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Instant::now();
        if self.inner.stalled.swap(false, Ordering::SeqCst) {
            info!("update delivery recovered, resuming measurement");
            self.inner.logger.pause(false);
        }
    }

    /// Whether the monitor currently considers delivery stalled.
    pub fn is_stalled(&self) -> bool {
        self.inner.stalled.load(Ordering::SeqCst)
    }
}

impl Drop for LagMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::trigger::TriggerType;

    fn collecting_logger() -> DataLogger {
        let logger = DataLogger::new();
        logger
            .start_collecting(SessionConfig {
                variables: vec!["x".into()],
                trigger_type: TriggerType::Variable,
                trigger_variable: "x".into(),
                ..SessionConfig::default()
            })
            .unwrap();
        logger
    }

    #[tokio::test(start_paused = true)]
    async fn stall_pauses_and_recovery_resumes() {
        let logger = collecting_logger();
        let monitor = LagMonitor::with_threshold(logger.clone(), Duration::from_secs(1));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(monitor.is_stalled());
        assert_eq!(logger.get_configuration().trigger_type, TriggerType::None);

        monitor.touch();
        assert!(!monitor.is_stalled());
        assert_eq!(
            logger.get_configuration().trigger_type,
            TriggerType::Variable
        );
    }

    #[tokio::test(start_paused = true)]
    async fn steady_delivery_never_pauses() {
        let logger = collecting_logger();
        let monitor = LagMonitor::with_threshold(logger.clone(), Duration::from_secs(1));

        for _ in 0..10 {
            tokio::time::sleep(Duration::from_millis(400)).await;
            monitor.touch();
        }
        assert!(!monitor.is_stalled());
        assert_eq!(
            logger.get_configuration().trigger_type,
            TriggerType::Variable
        );
    }
}
