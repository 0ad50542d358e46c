//! In-memory history of emitted datapoints.
//!
//! The `HistoryStore` keeps one ordered sequence of reduced values per
//! tracked variable. Index `i` across all sequences corresponds to the
//! `i`-th datapoint; after every append all sequences have equal length,
//! with NaN placeholders for variables a datapoint did not carry. An
//! optional length bound drops the oldest entries once the configured
//! margin past the bound is exceeded.

use std::collections::HashMap;

use crate::datapoint::Datapoint;
use crate::error::{LoggerError, Result};

/// Hysteresis margin for truncation: sequences are only cut once they exceed
/// the limit by this factor, then cut back to exactly the limit.
pub const CUT_MARGIN: f64 = 1.1;

/// Per-variable sequences of emitted values, in first-registered order.
#[derive(Debug, Default, Clone)]
pub struct HistoryStore {
    order: Vec<String>,
    lists: HashMap<String, Vec<f64>>,
}

/// Aligned slices for plotting, as produced by [`HistoryStore::get_xy`].
#[derive(Debug, Clone, PartialEq)]
pub struct XySeries {
    /// The x sequence, absent when the caller implies an index-based axis.
    pub x: Option<Vec<f64>>,
    /// The y sequence.
    pub y: Vec<f64>,
}

impl HistoryStore {
    /// Create a store with one empty sequence per variable.
    ///
    /// Duplicate names are registered once, keeping the first position.
    pub fn new(variables: &[String]) -> Self {
        let mut store = Self::default();
        for name in variables {
            if !store.lists.contains_key(name) {
                store.order.push(name.clone());
                store.lists.insert(name.clone(), Vec::new());
            }
        }
        store
    }

    /// Rebuild a store from named sequences, e.g. a loaded file.
    ///
    /// All sequences must have equal length.
    pub fn from_sequences(sequences: Vec<(String, Vec<f64>)>) -> Result<Self> {
        let mut store = Self::default();
        let mut expected: Option<usize> = None;
        for (name, values) in sequences {
            match expected {
                None => expected = Some(values.len()),
                Some(len) if len != values.len() => {
                    return Err(LoggerError::MalformedFile(format!(
                        "sequence '{name}' has length {}, expected {len}",
                        values.len()
                    )))
                }
                Some(_) => {}
            }
            if store.lists.insert(name.clone(), values).is_none() {
                store.order.push(name);
            }
        }
        Ok(store)
    }

    /// Tracked variable names in first-registered order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Number of datapoints recorded so far.
    pub fn len(&self) -> usize {
        self.order
            .first()
            .and_then(|key| self.lists.get(key))
            .map_or(0, Vec::len)
    }

    /// Whether no datapoint has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append one datapoint, keeping all sequences at equal length.
    ///
    /// A variable missing from the datapoint is recorded as NaN so the
    /// alignment invariant holds for any input.
    pub fn append(&mut self, datapoint: &Datapoint) {
        for name in &self.order {
            let value = datapoint.get(name).unwrap_or(f64::NAN);
            if let Some(list) = self.lists.get_mut(name) {
                list.push(value);
            }
        }
    }

    /// A slice of one variable's sequence.
    ///
    /// `start` and `stop` follow negative-index slice semantics: `-200`
    /// addresses the 200th entry from the end, `None` extends to the
    /// respective boundary.
    pub fn get(&self, key: &str, start: Option<isize>, stop: Option<isize>) -> Result<Vec<f64>> {
        let list = self
            .lists
            .get(key)
            .ok_or_else(|| LoggerError::UnknownVariable(key.to_string()))?;
        let (begin, end) = resolve_slice(list.len(), start, stop);
        Ok(list[begin..end].to_vec())
    }

    /// Aligned slices of a y sequence and an optional x sequence.
    pub fn get_xy(
        &self,
        y_key: &str,
        x_key: Option<&str>,
        start: Option<isize>,
        stop: Option<isize>,
    ) -> Result<XySeries> {
        let y = self.get(y_key, start, stop)?;
        let x = match x_key {
            Some(key) => Some(self.get(key, start, stop)?),
            None => None,
        };
        Ok(XySeries { x, y })
    }

    /// Cut all sequences to the last `limit` entries once any sequence
    /// exceeds `limit * CUT_MARGIN`. Returns whether a cut happened.
    ///
    /// A limit of zero disables cutting.
    pub fn truncate_if_needed(&mut self, limit: usize) -> bool {
        self.truncate_with_margin(limit, CUT_MARGIN)
    }

    /// Like [`truncate_if_needed`](Self::truncate_if_needed) with an explicit
    /// margin factor.
    pub fn truncate_with_margin(&mut self, limit: usize, margin: f64) -> bool {
        if limit == 0 || (self.len() as f64) <= limit as f64 * margin {
            return false;
        }
        for list in self.lists.values_mut() {
            let excess = list.len().saturating_sub(limit);
            list.drain(..excess);
        }
        true
    }

    /// Iterate over `(variable, sequence)` pairs in first-registered order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.order.iter().filter_map(|name| {
            self.lists
                .get(name)
                .map(|list| (name.as_str(), list.as_slice()))
        })
    }
}

/// Resolve `start`/`stop` into a concrete `begin..end` range over `len`
/// entries, clamped so the range is always valid.
fn resolve_slice(len: usize, start: Option<isize>, stop: Option<isize>) -> (usize, usize) {
    let resolve = |index: isize| -> usize {
        if index < 0 {
            len.saturating_sub(index.unsigned_abs())
        } else {
            (index as usize).min(len)
        }
    };
    let begin = start.map_or(0, resolve);
    let end = stop.map_or(len, resolve);
    (begin, end.max(begin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn datapoint(values: &[(&str, f64)]) -> Datapoint {
        Datapoint {
            timestamp: Utc::now(),
            values: values
                .iter()
                .map(|(name, value)| (name.to_string(), *value))
                .collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn keys_keep_registration_order() {
        let store = HistoryStore::new(&names(&["time", "b", "a"]));
        let keys: Vec<&str> = store.keys().collect();
        assert_eq!(keys, ["time", "b", "a"]);
    }

    #[test]
    fn append_keeps_sequences_aligned() {
        let mut store = HistoryStore::new(&names(&["x", "y"]));
        store.append(&datapoint(&[("x", 1.0), ("y", 2.0)]));
        store.append(&datapoint(&[("x", 3.0)])); // y missing
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("x", None, None).unwrap(), [1.0, 3.0]);
        let y = store.get("y", None, None).unwrap();
        assert_eq!(y[0], 2.0);
        assert!(y[1].is_nan());
    }

    #[test]
    fn negative_start_selects_tail() {
        let mut store = HistoryStore::new(&names(&["x"]));
        for i in 0..10 {
            store.append(&datapoint(&[("x", i as f64)]));
        }
        assert_eq!(store.get("x", Some(-3), None).unwrap(), [7.0, 8.0, 9.0]);
        assert_eq!(store.get("x", Some(1), Some(4)).unwrap(), [1.0, 2.0, 3.0]);
        assert_eq!(store.get("x", Some(-2), Some(-1)).unwrap(), [8.0]);
        // Out-of-range slices clamp instead of failing.
        assert_eq!(store.get("x", Some(-200), None).unwrap().len(), 10);
        assert!(store.get("x", Some(8), Some(2)).unwrap().is_empty());
    }

    #[test]
    fn unknown_key_is_an_error() {
        let store = HistoryStore::new(&names(&["x"]));
        assert!(matches!(
            store.get("missing", None, None),
            Err(LoggerError::UnknownVariable(_))
        ));
    }

    #[test]
    fn get_xy_returns_aligned_slices() {
        let mut store = HistoryStore::new(&names(&["x", "y"]));
        for i in 0..5 {
            store.append(&datapoint(&[("x", i as f64), ("y", (i * i) as f64)]));
        }
        let series = store.get_xy("y", Some("x"), Some(1), Some(4)).unwrap();
        assert_eq!(series.x.as_deref(), Some([1.0, 2.0, 3.0].as_slice()));
        assert_eq!(series.y, [1.0, 4.0, 9.0]);

        let y_only = store.get_xy("y", None, None, None).unwrap();
        assert!(y_only.x.is_none());
        assert_eq!(y_only.y.len(), 5);
    }

    #[test]
    fn truncation_waits_for_margin_then_cuts_to_limit() {
        let mut store = HistoryStore::new(&names(&["x"]));
        for i in 0..110 {
            store.append(&datapoint(&[("x", i as f64)]));
        }
        assert!(!store.truncate_if_needed(100));
        assert_eq!(store.len(), 110);

        store.append(&datapoint(&[("x", 110.0)]));
        assert!(store.truncate_if_needed(100));
        assert_eq!(store.len(), 100);
        // The oldest entries are gone, the newest survive.
        assert_eq!(store.get("x", Some(0), Some(1)).unwrap(), [11.0]);
        assert_eq!(store.get("x", Some(-1), None).unwrap(), [110.0]);
    }

    #[test]
    fn zero_limit_disables_truncation() {
        let mut store = HistoryStore::new(&names(&["x"]));
        for i in 0..50 {
            store.append(&datapoint(&[("x", i as f64)]));
        }
        assert!(!store.truncate_if_needed(0));
        assert_eq!(store.len(), 50);
    }

    #[test]
    fn from_sequences_rejects_unequal_lengths() {
        let result = HistoryStore::from_sequences(vec![
            ("x".into(), vec![1.0, 2.0]),
            ("y".into(), vec![1.0]),
        ]);
        assert!(matches!(result, Err(LoggerError::MalformedFile(_))));
    }
}
