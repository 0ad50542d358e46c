//! Saving and loading collected data.
//!
//! A saved log is one JSON array `[header, data, meta]`: the free-text
//! header, an object of per-variable sequences in first-registered order and
//! a metadata object carrying units, the session start and the active
//! configuration. Non-finite values are stored as `null` and come back as
//! NaN, so a reloaded file reconstructs the original sequences exactly.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::SessionConfig;
use crate::error::{LoggerError, Result};
use crate::history::HistoryStore;

/// Metadata stored alongside the data sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMeta {
    /// Unit strings per variable.
    #[serde(default)]
    pub units: HashMap<String, String>,
    /// Wall-clock start of the session.
    pub started: DateTime<Utc>,
    /// The session configuration active at save time.
    pub configuration: SessionConfig,
    /// Free-form user metadata.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub user: Value,
}

/// A saved log: header text, per-variable sequences and metadata.
///
/// Serializes as the JSON array `[header, data, meta]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord(String, Map<String, Value>, LogMeta);

impl LogRecord {
    /// Build a record from a history snapshot.
    pub fn from_history(header: &str, history: &HistoryStore, meta: LogMeta) -> Self {
        let mut data = Map::new();
        for (name, values) in history.iter() {
            let sequence = values.iter().map(|value| Value::from(*value)).collect();
            data.insert(name.to_string(), Value::Array(sequence));
        }
        Self(header.to_string(), data, meta)
    }

    /// The header text.
    pub fn header(&self) -> &str {
        &self.0
    }

    /// The metadata object.
    pub fn meta(&self) -> &LogMeta {
        &self.2
    }

    /// The per-variable sequences in stored order, with `null` entries
    /// restored as NaN.
    pub fn sequences(&self) -> Result<Vec<(String, Vec<f64>)>> {
        let mut sequences = Vec::with_capacity(self.1.len());
        for (name, value) in &self.1 {
            let entries = value.as_array().ok_or_else(|| {
                LoggerError::MalformedFile(format!("sequence '{name}' is not an array"))
            })?;
            let mut values = Vec::with_capacity(entries.len());
            for entry in entries {
                match entry {
                    Value::Null => values.push(f64::NAN),
                    Value::Number(number) => values.push(number.as_f64().unwrap_or(f64::NAN)),
                    other => {
                        return Err(LoggerError::MalformedFile(format!(
                            "sequence '{name}' holds a non-numeric entry: {other}"
                        )))
                    }
                }
            }
            sequences.push((name.clone(), values));
        }
        Ok(sequences)
    }

    /// Rebuild the history this record was taken from.
    pub fn history(&self) -> Result<HistoryStore> {
        HistoryStore::from_sequences(self.sequences()?)
    }
}

/// Write a record to `path` as JSON.
pub fn write_record(path: impl AsRef<Path>, record: &LogRecord) -> Result<()> {
    let file = File::create(path.as_ref())?;
    serde_json::to_writer(BufWriter::new(file), record)?;
    Ok(())
}

/// Read a record back from `path`.
pub fn read_record(path: impl AsRef<Path>) -> Result<LogRecord> {
    let file = File::open(path.as_ref())?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Save a record into `directory` under a timestamped file name, creating
/// the directory if needed. Returns the written path.
pub fn save_record(
    directory: impl AsRef<Path>,
    suffix: &str,
    record: &LogRecord,
) -> Result<PathBuf> {
    let directory = directory.as_ref();
    if !directory.exists() {
        fs::create_dir_all(directory)?;
    }
    let file_name = format!("{}{}.json", Utc::now().format("%Y_%m_%dT%H_%M_%S"), suffix);
    let path = directory.join(file_name);
    write_record(&path, record)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datapoint::Datapoint;

    fn sample_history() -> HistoryStore {
        let mut history =
            HistoryStore::new(&["time".to_string(), "power".to_string()]);
        for i in 0..3 {
            history.append(&Datapoint {
                timestamp: Utc::now(),
                values: [
                    ("time".to_string(), i as f64),
                    ("power".to_string(), 10.0 * i as f64),
                ]
                .into_iter()
                .collect(),
            });
        }
        history
    }

    fn sample_meta() -> LogMeta {
        LogMeta {
            units: [("time".to_string(), "s".to_string())].into_iter().collect(),
            started: Utc::now(),
            configuration: SessionConfig::default(),
            user: Value::Null,
        }
    }

    #[test]
    fn serializes_as_header_data_meta_array() {
        let record = LogRecord::from_history("run 1", &sample_history(), sample_meta());
        let json: Value = serde_json::from_str(&serde_json::to_string(&record).unwrap()).unwrap();
        let parts = json.as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "run 1");
        assert!(parts[1].get("time").is_some());
        assert!(parts[2].get("configuration").is_some());
    }

    #[test]
    fn data_keys_keep_registration_order() {
        let record = LogRecord::from_history("", &sample_history(), sample_meta());
        let seqs = record.sequences().unwrap();
        let keys: Vec<&String> = seqs.iter().map(|(k, _)| k).collect();
        let reparsed: LogRecord =
            serde_json::from_str(&serde_json::to_string(&record).unwrap()).unwrap();
        let keys_after: Vec<String> = reparsed
            .sequences()
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys_after, keys.iter().map(|k| k.to_string()).collect::<Vec<_>>());
    }

    #[test]
    fn nan_round_trips_through_null() {
        let mut history = HistoryStore::new(&["x".to_string()]);
        history.append(&Datapoint {
            timestamp: Utc::now(),
            values: [("x".to_string(), f64::NAN)].into_iter().collect(),
        });
        let record = LogRecord::from_history("", &history, sample_meta());
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("null"));
        let reparsed: LogRecord = serde_json::from_str(&json).unwrap();
        let sequences = reparsed.sequences().unwrap();
        assert!(sequences[0].1[0].is_nan());
    }

    #[test]
    fn save_and_read_record() {
        let dir = tempfile::tempdir().unwrap();
        let record = LogRecord::from_history("header", &sample_history(), sample_meta());
        let path = save_record(dir.path(), "_test", &record).unwrap();
        assert!(path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with("_test.json")));
        let loaded = read_record(&path).unwrap();
        assert_eq!(loaded, record);
    }
}
