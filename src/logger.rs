//! The data logger core.
//!
//! `DataLogger` owns the per-variable buffers and the history for one
//! collection session. External update deliveries, timer ticks and runtime
//! mutators are all serialized through one mutation lock, so a datapoint is
//! always assembled from either all or none of a given update's effects.
//! Collaborators are notified after the lock is released.
//!
//! A session runs from one `start_collecting` call to the next: the history
//! and buffers are recreated for the new variable set, the session clock
//! restarts and the trigger is re-armed. Pausing is a sub-state that keeps
//! the previous trigger so resuming restores it exactly.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::buffer::{ValuingMode, VariableBuffer};
use crate::config::{validate_interval, SessionConfig};
use crate::datapoint::{assemble, Datapoint};
use crate::error::Result;
use crate::events::{DatapointPublisher, LoggerEvent, LoggerObserver};
use crate::history::{HistoryStore, XySeries};
use crate::storage::{self, LogMeta, LogRecord};
use crate::trigger::TriggerType;

/// The data logger core orchestrator.
///
/// Cloning is cheap and shares all state, so the same logger can be handed
/// to an update source, a timer and a remote-control frontend.
#[derive(Clone, Default)]
pub struct DataLogger {
    shared: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    observers: Mutex<Vec<Box<dyn LoggerObserver>>>,
    publisher: Mutex<Option<Box<dyn DatapointPublisher>>>,
}

#[derive(Default)]
struct State {
    config: SessionConfig,
    buffers: HashMap<String, VariableBuffer>,
    history: HistoryStore,
    collecting: bool,
    session_start: Option<DateTime<Utc>>,
    session_clock: Option<Instant>,
    previous_trigger: Option<TriggerType>,
    last_datapoint: Option<Datapoint>,
    data_length_limit: usize,
    timer: Option<JoinHandle<()>>,
    timer_epoch: u64,
}

fn lock_state(shared: &Shared) -> MutexGuard<'_, State> {
    shared.state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DataLogger {
    /// Create an idle logger with no active session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. Observers are notified synchronously, in
    /// registration order, after each state mutation completes.
    pub fn add_observer(&self, observer: impl LoggerObserver + 'static) {
        self.shared
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(observer));
    }

    /// Install the publisher finished datapoints are handed to.
    pub fn set_publisher(&self, publisher: impl DatapointPublisher + 'static) {
        *self
            .shared
            .publisher
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Box::new(publisher));
    }

    /// Bound the in-memory history to `limit` datapoints; 0 disables cutting.
    pub fn set_data_length_limit(&self, limit: usize) {
        lock_state(&self.shared).data_length_limit = limit;
    }

    /// Start a new collection session.
    ///
    /// Replaces the active configuration, resets history and buffers for the
    /// new variable set, restarts the session clock and re-arms the trigger.
    /// An invalid configuration is rejected before any state is touched, so
    /// a running session survives a failed call unchanged.
    pub fn start_collecting(&self, config: SessionConfig) -> Result<()> {
        config.validate()?;
        {
            let mut state = lock_state(&self.shared);
            cancel_timer(&mut state);
            state.buffers = config
                .variables
                .iter()
                .map(|name| (name.clone(), VariableBuffer::new()))
                .collect();
            state.history = HistoryStore::new(&config.variables);
            state.config = config.clone();
            state.session_start = Some(Utc::now());
            state.session_clock = Some(Instant::now());
            state.previous_trigger = None;
            state.last_datapoint = None;
            state.collecting = true;
            if state.config.trigger_type == TriggerType::Timer {
                arm_timer(&self.shared, &mut state);
            }
        }
        info!(
            variables = config.variables.len(),
            trigger = %config.trigger_type,
            "collection started"
        );
        notify(&self.shared, &LoggerEvent::ConfigurationChanged(config));
        notify(&self.shared, &LoggerEvent::Started);
        Ok(())
    }

    /// Stop the active session, cancelling any armed timer.
    pub fn stop(&self) {
        let mut state = lock_state(&self.shared);
        cancel_timer(&mut state);
        state.collecting = false;
        state.previous_trigger = None;
    }

    /// Route one external variable update into the logger.
    ///
    /// The value is accumulated if the variable is tracked; in variable
    /// trigger mode a matching variable name triggers datapoint assembly
    /// synchronously, first arrival included.
    pub fn handle_update(&self, variable: &str, value: Option<f64>) {
        let datapoint = {
            let mut state = lock_state(&self.shared);
            if !state.collecting {
                return;
            }
            match state.buffers.get_mut(variable) {
                Some(buffer) => buffer.accumulate(value),
                None => debug!(variable, "got value for an untracked variable"),
            }
            if state.config.trigger_type == TriggerType::Variable
                && state.config.trigger_variable == variable
            {
                Some(make_datapoint(&mut state))
            } else {
                None
            }
        };
        if let Some(datapoint) = datapoint {
            deliver(&self.shared, datapoint);
        }
    }

    /// Timer tick entry point.
    ///
    /// May be driven by an external scheduler instead of the internal timer
    /// task; ticks are ignored unless a session with a timer trigger is
    /// active, so a stale scheduler can never emit while paused.
    pub fn on_timer_tick(&self) {
        tick(&self.shared, None);
    }

    /// Pause or resume the measurement. Idempotent in both directions.
    ///
    /// Pausing stores the configured trigger and switches to
    /// [`TriggerType::None`]; resuming restores the stored trigger,
    /// restarting the timer if needed.
    pub fn pause(&self, enabled: bool) {
        let mut state = lock_state(&self.shared);
        if enabled {
            if state.previous_trigger.is_none() {
                state.previous_trigger = Some(state.config.trigger_type);
                state.config.trigger_type = TriggerType::None;
                cancel_timer(&mut state);
                info!("measurement paused");
            }
        } else if let Some(previous) = state.previous_trigger.take() {
            cancel_timer(&mut state);
            state.config.trigger_type = previous;
            if previous == TriggerType::Timer && state.collecting {
                arm_timer(&self.shared, &mut state);
            }
            info!("measurement resumed");
        }
    }

    /// Switch the trigger type at runtime, keeping the session's history.
    ///
    /// For a timer trigger the configured interval is validated first; on
    /// rejection the previous trigger state is preserved.
    pub fn set_trigger_type(&self, trigger_type: TriggerType) -> Result<()> {
        let config = {
            let mut state = lock_state(&self.shared);
            if trigger_type == TriggerType::Timer {
                validate_interval(state.config.trigger_timeout)?;
            }
            cancel_timer(&mut state);
            state.config.trigger_type = trigger_type;
            if trigger_type == TriggerType::Timer && state.collecting {
                arm_timer(&self.shared, &mut state);
            }
            state.config.clone()
        };
        notify(&self.shared, &LoggerEvent::ConfigurationChanged(config));
        Ok(())
    }

    /// Change the timer interval, rescheduling a running timer without
    /// losing the armed state. Rejected intervals leave the timer untouched.
    pub fn set_trigger_interval(&self, seconds: f64) -> Result<()> {
        validate_interval(seconds)?;
        let config = {
            let mut state = lock_state(&self.shared);
            state.config.trigger_timeout = seconds;
            if state.config.trigger_type == TriggerType::Timer && state.collecting {
                cancel_timer(&mut state);
                arm_timer(&self.shared, &mut state);
            }
            state.config.clone()
        };
        notify(&self.shared, &LoggerEvent::ConfigurationChanged(config));
        Ok(())
    }

    /// Change the trigger variable; takes effect on the next arrival.
    pub fn set_trigger_variable(&self, variable: &str) {
        let config = {
            let mut state = lock_state(&self.shared);
            state.config.trigger_variable = variable.to_string();
            state.config.clone()
        };
        notify(&self.shared, &LoggerEvent::ConfigurationChanged(config));
    }

    /// Change the value reduction applied at the next datapoint.
    pub fn set_valuing_mode(&self, mode: ValuingMode) {
        let config = {
            let mut state = lock_state(&self.shared);
            state.config.valuing_mode = mode;
            state.config.clone()
        };
        notify(&self.shared, &LoggerEvent::ConfigurationChanged(config));
    }

    /// The currently active configuration.
    pub fn get_configuration(&self) -> SessionConfig {
        lock_state(&self.shared).config.clone()
    }

    /// Number of datapoints recorded in the current session.
    pub fn get_list_length(&self) -> usize {
        lock_state(&self.shared).history.len()
    }

    /// Whether a session is active (paused counts as active).
    pub fn is_collecting(&self) -> bool {
        lock_state(&self.shared).collecting
    }

    /// The most recently assembled datapoint, if any.
    pub fn last_datapoint(&self) -> Option<Datapoint> {
        lock_state(&self.shared).last_datapoint.clone()
    }

    /// Tracked variable names in declaration order.
    pub fn data_keys(&self) -> Vec<String> {
        lock_state(&self.shared)
            .history
            .keys()
            .map(str::to_string)
            .collect()
    }

    /// A slice of one variable's history; see [`HistoryStore::get`].
    pub fn get_data(
        &self,
        key: &str,
        start: Option<isize>,
        stop: Option<isize>,
    ) -> Result<Vec<f64>> {
        lock_state(&self.shared).history.get(key, start, stop)
    }

    /// Aligned history slices for plotting; see [`HistoryStore::get_xy`].
    pub fn get_xy_data(
        &self,
        y_key: &str,
        x_key: Option<&str>,
        start: Option<isize>,
        stop: Option<isize>,
    ) -> Result<XySeries> {
        lock_state(&self.shared).history.get_xy(y_key, x_key, start, stop)
    }

    /// Save the collected data to a timestamped JSON file in `directory`.
    ///
    /// The file carries the header text, all per-variable sequences, the
    /// units and the active configuration, so it can be reloaded into an
    /// identical history. Returns the written path.
    pub fn save_data(
        &self,
        directory: impl AsRef<Path>,
        header: &str,
        suffix: &str,
        user: serde_json::Value,
    ) -> Result<PathBuf> {
        let record = {
            let state = lock_state(&self.shared);
            let meta = LogMeta {
                units: state.config.units.clone(),
                started: state.session_start.unwrap_or_else(Utc::now),
                configuration: state.config.clone(),
                user,
            };
            LogRecord::from_history(header, &state.history, meta)
        };
        storage::save_record(directory, suffix, &record)
    }
}

/// Assemble a datapoint from the current buffers and append it to history.
/// Must be called with the state lock held.
fn make_datapoint(state: &mut State) -> Datapoint {
    let elapsed = state
        .session_clock
        .map_or(0.0, |clock| clock.elapsed().as_secs_f64());
    let config = &state.config;
    let datapoint = assemble(
        &config.variables,
        &mut state.buffers,
        config.valuing_mode,
        config.value_repeating,
        elapsed,
    );
    state.history.append(&datapoint);
    let limit = state.data_length_limit;
    if state.history.truncate_if_needed(limit) {
        debug!(limit, "history cut to length limit");
    }
    state.last_datapoint = Some(datapoint.clone());
    datapoint
}

/// Handle a timer tick. `epoch` is `Some` for the internal timer task and
/// guards against ticks from a cancelled timer racing the cancellation.
fn tick(shared: &Shared, epoch: Option<u64>) {
    let datapoint = {
        let mut state = lock_state(shared);
        if epoch.is_some_and(|epoch| epoch != state.timer_epoch) {
            return; // stale tick from a replaced timer
        }
        if !state.collecting || state.config.trigger_type != TriggerType::Timer {
            return;
        }
        make_datapoint(&mut state)
    };
    deliver(shared, datapoint);
}

/// Publish a finished datapoint and notify observers.
fn deliver(shared: &Shared, datapoint: Datapoint) {
    {
        let publisher = shared
            .publisher
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(publisher) = publisher.as_ref() {
            if let Err(error) = publisher.publish(&datapoint) {
                warn!(%error, "datapoint publication failed");
            }
        }
    }
    notify(shared, &LoggerEvent::DatapointReady(datapoint));
}

fn notify(shared: &Shared, event: &LoggerEvent) {
    let observers = shared
        .observers
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    for observer in observers.iter() {
        observer.on_event(event);
    }
}

/// Spawn the interval task driving timer ticks. Must be called with the
/// state lock held and a validated interval in the configuration.
fn arm_timer(shared: &Arc<Shared>, state: &mut State) {
    state.timer_epoch += 1;
    let epoch = state.timer_epoch;
    let interval = Duration::from_secs_f64(state.config.trigger_timeout);
    let runtime = match tokio::runtime::Handle::try_current() {
        Ok(runtime) => runtime,
        Err(_) => {
            warn!("no async runtime: timer ticks must be driven via on_timer_tick");
            return;
        }
    };
    let shared = Arc::clone(shared);
    state.timer = Some(runtime.spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await; // completes immediately, the next tick waits
        loop {
            ticker.tick().await;
            tick(&shared, Some(epoch));
        }
    }));
}

/// Cancel a running timer. The epoch bump invalidates any tick already in
/// flight, so nothing fires against reset state after this returns.
fn cancel_timer(state: &mut State) {
    state.timer_epoch += 1;
    if let Some(timer) = state.timer.take() {
        timer.abort();
    }
}
