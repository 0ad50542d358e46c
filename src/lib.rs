//! # daqlog
//!
//! A triggered data-logging core for laboratory data acquisition. The logger
//! receives asynchronous variable updates, aggregates them between triggers,
//! assembles timestamped datapoints and keeps a bounded in-memory history.
//!
//! ## Crate Structure
//!
//! - **`buffer`**: per-variable accumulation buffers and the `ValuingMode`
//!   reduction (last value vs. running average).
//! - **`trigger`**: the `TriggerType` variants that decide when a datapoint
//!   is emitted (paused, fixed timer interval, arrival of one variable).
//! - **`datapoint`**: the assembled `Datapoint` snapshot and its derived
//!   time bookkeeping.
//! - **`history`**: the `HistoryStore` of emitted values, with slicing for
//!   plotting frontends and length-bounded truncation.
//! - **`logger`**: the `DataLogger` orchestrator tying the above together
//!   behind a single mutation lock.
//! - **`events`**: observer and publisher seams towards collaborators
//!   (GUI frontends, network publishers).
//! - **`config`**: the `SessionConfig` describing one collection session,
//!   plus settings loading for the demo binary.
//! - **`storage`**: saving and loading collected data as JSON files.
//! - **`monitor`**: an optional watchdog that pauses the logger when update
//!   delivery stalls.
//! - **`error`**: the crate-wide `LoggerError` type.

pub mod buffer;
pub mod config;
pub mod datapoint;
pub mod error;
pub mod events;
pub mod history;
pub mod logger;
pub mod monitor;
pub mod storage;
pub mod trigger;
