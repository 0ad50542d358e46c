//! Trigger variants controlling when a datapoint is emitted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LoggerError;

/// What causes a new datapoint to be assembled.
///
/// This is the single source of truth for the trigger state; pausing stores
/// the previous variant so that resuming restores it exactly.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerType {
    /// Suppress datapoint emission entirely (paused).
    #[default]
    None,
    /// Emit at a fixed wall-clock interval.
    Timer,
    /// Emit whenever the configured trigger variable receives a value.
    Variable,
}

impl TriggerType {
    /// The lowercase wire name of this variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerType::None => "none",
            TriggerType::Timer => "timer",
            TriggerType::Variable => "variable",
        }
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerType {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(TriggerType::None),
            "timer" => Ok(TriggerType::Timer),
            "variable" => Ok(TriggerType::Variable),
            other => Err(LoggerError::UnknownTriggerType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip() {
        for trigger in [TriggerType::None, TriggerType::Timer, TriggerType::Variable] {
            let parsed: TriggerType = trigger.as_str().parse().unwrap();
            assert_eq!(parsed, trigger);
        }
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&TriggerType::Variable).unwrap();
        assert_eq!(json, "\"variable\"");
        let parsed: TriggerType = serde_json::from_str("\"timer\"").unwrap();
        assert_eq!(parsed, TriggerType::Timer);
    }

    #[test]
    fn unknown_name_is_rejected() {
        let result = "sometimes".parse::<TriggerType>();
        assert!(matches!(result, Err(LoggerError::UnknownTriggerType(_))));
    }
}
