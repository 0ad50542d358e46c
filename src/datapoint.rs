//! Datapoint assembly.
//!
//! A datapoint is one timestamped snapshot across all tracked variables. The
//! assembler reduces every variable buffer, fills the derived time fields and
//! resets the buffers for the next cycle in the same logical step. Callers
//! hold the mutation lock around it, so no concurrently delivered update can
//! be half-counted.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::buffer::{ValuingMode, VariableBuffer};

/// Reserved variable name filled with elapsed seconds since session start.
pub const TIME_KEY: &str = "time";

/// Reserved variable name filled with elapsed hours since session start.
pub const TIME_H_KEY: &str = "time_h";

/// One fully assembled snapshot across all tracked variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Datapoint {
    /// Wall-clock instant at which the datapoint was assembled.
    pub timestamp: DateTime<Utc>,
    /// Reduced value per tracked variable. Variables without any received
    /// value carry NaN.
    pub values: HashMap<String, f64>,
}

impl Datapoint {
    /// The reduced value of one variable, if it is part of this datapoint.
    pub fn get(&self, variable: &str) -> Option<f64> {
        self.values.get(variable).copied()
    }
}

/// Assemble one datapoint from the current buffers.
///
/// For every tracked variable the buffer is reduced and then reset per the
/// repeating flag. The reserved `time`/`time_h` variables are filled from
/// `elapsed_seconds` instead of buffered data.
pub(crate) fn assemble(
    variables: &[String],
    buffers: &mut HashMap<String, VariableBuffer>,
    mode: ValuingMode,
    repeating: bool,
    elapsed_seconds: f64,
) -> Datapoint {
    let mut values = HashMap::with_capacity(variables.len());
    for name in variables {
        let value = match name.as_str() {
            TIME_KEY => elapsed_seconds,
            TIME_H_KEY => elapsed_seconds / 3600.0,
            _ => match buffers.get_mut(name) {
                Some(buffer) => {
                    let value = buffer.reduce(mode);
                    buffer.reset(repeating);
                    value
                }
                None => f64::NAN,
            },
        };
        values.insert(name.clone(), value);
    }
    Datapoint {
        timestamp: Utc::now(),
        values,
    }
}
