//! Session configuration and settings loading.
//!
//! `SessionConfig` is the explicit description of one collection session:
//! which variables are tracked, how their raw values are reduced and what
//! triggers a datapoint. It is passed into the logger on
//! `start_collecting` and handed back by `get_configuration`, so no ambient
//! global state is involved.
//!
//! The demo binary additionally loads a `Settings` struct from a TOML file.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::buffer::ValuingMode;
use crate::error::{LoggerError, Result};
use crate::trigger::TriggerType;

/// Complete configuration of one collection session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Tracked variables in declaration order.
    pub variables: Vec<String>,
    /// Unit strings per variable, where known.
    #[serde(default)]
    pub units: HashMap<String, String>,
    /// What causes a new datapoint.
    pub trigger_type: TriggerType,
    /// Interval for timer triggering, in seconds.
    pub trigger_timeout: f64,
    /// Variable whose arrival triggers a datapoint in variable mode.
    #[serde(default)]
    pub trigger_variable: String,
    /// Reduction applied to buffered raw values.
    pub valuing_mode: ValuingMode,
    /// Carry the previous value forward when no new raw value arrived.
    pub value_repeating: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            variables: Vec::new(),
            units: HashMap::new(),
            trigger_type: TriggerType::None,
            trigger_timeout: 1.0,
            trigger_variable: String::new(),
            valuing_mode: ValuingMode::Last,
            value_repeating: false,
        }
    }
}

impl SessionConfig {
    /// Check that this configuration can start a session.
    pub fn validate(&self) -> Result<()> {
        if self.variables.is_empty() {
            return Err(LoggerError::NoVariables);
        }
        if self.trigger_type == TriggerType::Timer {
            validate_interval(self.trigger_timeout)?;
        }
        if self.trigger_type == TriggerType::Variable && self.trigger_variable.is_empty() {
            return Err(LoggerError::NoTriggerVariable);
        }
        Ok(())
    }
}

/// Check that a timer interval is usable: finite and strictly positive.
pub fn validate_interval(seconds: f64) -> Result<()> {
    if seconds.is_finite() && seconds > 0.0 {
        Ok(())
    } else {
        Err(LoggerError::InvalidInterval(seconds.to_string()))
    }
}

/// Parse a variables declaration such as `"time:s, SERVER.pub.var, .var2:W"`.
///
/// Entries are separated by commas or whitespace; `name:unit` attaches a
/// unit string to the variable. A leading dot inherits the dotted namespace
/// of the preceding variable, so `SERVER.pub.var, .var2` declares
/// `SERVER.pub.var2`; if the preceding variable has no namespace the name is
/// kept literally. Returns the ordered variable list and the units map.
pub fn parse_variables(text: &str) -> (Vec<String>, HashMap<String, String>) {
    let cleaned = text.replace(": ", ":").replace(',', " ");
    let mut variables: Vec<String> = Vec::new();
    let mut units = HashMap::new();
    for raw in cleaned.split_whitespace() {
        let (name, unit) = match raw.split_once(':') {
            Some((name, unit)) => (name.to_string(), Some(unit.to_string())),
            None => (raw.to_string(), None),
        };
        let name = if name.starts_with('.') {
            match variables.last().and_then(|prev| prev.rsplit_once('.')) {
                Some((namespace, _)) => format!("{namespace}{name}"),
                None => name,
            }
        } else {
            name
        };
        if let Some(unit) = unit {
            units.insert(name.clone(), unit);
        }
        variables.push(name);
    }
    (variables, units)
}

/// Settings for the demo binary, loaded from a TOML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Log level filter, e.g. `"info"` or `"daqlog=debug"`.
    pub log_level: String,
    /// Directory data files are saved into.
    pub save_path: String,
    /// Logger session settings.
    pub logger: LoggerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            save_path: ".".to_string(),
            logger: LoggerSettings::default(),
        }
    }
}

/// The logger part of the demo binary settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggerSettings {
    /// Variables declaration, `name:unit` entries separated by commas.
    pub variables: String,
    /// What causes a new datapoint.
    pub trigger_type: TriggerType,
    /// Timer interval as a humantime string, e.g. `"500ms"`.
    #[serde(with = "humantime_serde")]
    pub trigger_interval: Duration,
    /// Trigger variable for variable mode.
    pub trigger_variable: String,
    /// Reduction applied to buffered raw values.
    pub valuing_mode: ValuingMode,
    /// Carry the previous value forward when no new raw value arrived.
    pub value_repeating: bool,
    /// History bound in datapoints; 0 disables cutting.
    pub data_length_limit: usize,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            variables: "time:s, noise, sine".to_string(),
            trigger_type: TriggerType::Timer,
            trigger_interval: Duration::from_millis(500),
            trigger_variable: "sine".to_string(),
            valuing_mode: ValuingMode::Last,
            value_repeating: false,
            data_length_limit: 0,
        }
    }
}

impl Settings {
    /// Load settings from the named file, falling back to defaults when no
    /// name is given.
    pub fn load(config_name: Option<&str>) -> Result<Self> {
        match config_name {
            Some(name) => {
                let settings = config::Config::builder()
                    .add_source(config::File::with_name(name))
                    .build()?;
                Ok(settings.try_deserialize()?)
            }
            None => Ok(Self::default()),
        }
    }
}

impl LoggerSettings {
    /// Turn these settings into a session configuration.
    pub fn to_session_config(&self) -> SessionConfig {
        let (variables, units) = parse_variables(&self.variables);
        SessionConfig {
            variables,
            units,
            trigger_type: self.trigger_type,
            trigger_timeout: self.trigger_interval.as_secs_f64(),
            trigger_variable: self.trigger_variable.clone(),
            valuing_mode: self.valuing_mode,
            value_repeating: self.value_repeating,
        }
    }
}
