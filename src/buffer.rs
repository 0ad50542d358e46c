//! Per-variable accumulation buffers.
//!
//! Between two datapoints every tracked variable collects its raw values in
//! a `VariableBuffer`. At trigger time the buffer is reduced to one value
//! according to the session's `ValuingMode` and then cleared for the next
//! cycle. Missing deliveries are represented as NaN throughout, so reduction
//! never fails.

use serde::{Deserialize, Serialize};

/// Reduction applied to the raw values accumulated since the last datapoint.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValuingMode {
    /// Use the most recently received raw value.
    #[default]
    Last,
    /// Use the arithmetic mean of all numeric values received.
    Average,
}

/// Raw values received for one variable since the last emitted datapoint.
#[derive(Debug, Default, Clone)]
pub struct VariableBuffer {
    values: Vec<f64>,
    /// Result of the most recent reduction, kept for value repeating.
    last_reduced: Option<f64>,
}

impl VariableBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw value. A missing value is stored as NaN.
    pub fn accumulate(&mut self, value: Option<f64>) {
        self.values.push(value.unwrap_or(f64::NAN));
    }

    /// Number of raw values currently buffered.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no raw value has been buffered since the last reset.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Reduce the buffered values to a single one.
    ///
    /// `Last` yields the most recently appended value, `Average` the mean of
    /// all numeric values with NaN entries ignored. An empty buffer, or an
    /// average over NaN values only, reduces to NaN. The result is remembered
    /// so that a later [`reset`](Self::reset) can re-seed the buffer with it.
    pub fn reduce(&mut self, mode: ValuingMode) -> f64 {
        let value = match mode {
            ValuingMode::Last => self.values.last().copied().unwrap_or(f64::NAN),
            ValuingMode::Average => {
                let mut sum = 0.0;
                let mut count = 0_usize;
                for value in &self.values {
                    if !value.is_nan() {
                        sum += value;
                        count += 1;
                    }
                }
                if count == 0 {
                    f64::NAN
                } else {
                    sum / count as f64
                }
            }
        };
        self.last_reduced = Some(value);
        value
    }

    /// Clear the buffer for the next cycle.
    ///
    /// With `repeat_last` the buffer is seeded with the value of the last
    /// reduction, so a trigger without any new data yields the previous value
    /// again. Without it the buffer is left empty and the next reduction
    /// yields NaN.
    pub fn reset(&mut self, repeat_last: bool) {
        self.values.clear();
        if repeat_last {
            if let Some(last) = self.last_reduced {
                self.values.push(last);
            }
        }
    }
}
