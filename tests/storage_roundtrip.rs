//! Round-trip of collected data through the on-disk format.

use daqlog::buffer::ValuingMode;
use daqlog::config::{parse_variables, SessionConfig};
use daqlog::logger::DataLogger;
use daqlog::storage;
use daqlog::trigger::TriggerType;

fn collect_some_data(logger: &DataLogger) -> SessionConfig {
    let (variables, units) = parse_variables("time:s, x:V, y");
    let config = SessionConfig {
        variables,
        units,
        trigger_type: TriggerType::Variable,
        trigger_variable: "x".to_string(),
        valuing_mode: ValuingMode::Last,
        value_repeating: false,
        ..SessionConfig::default()
    };
    logger.start_collecting(config.clone()).unwrap();

    for i in 0..5 {
        logger.handle_update("y", Some(2.0 * i as f64));
        logger.handle_update("x", Some(i as f64)); // triggers
    }
    // One cycle without y, recorded as NaN.
    logger.handle_update("x", Some(99.0));
    config
}

#[test]
fn saved_data_reloads_into_identical_sequences() {
    let dir = tempfile::tempdir().unwrap();
    let logger = DataLogger::new();
    let config = collect_some_data(&logger);

    let path = logger
        .save_data(dir.path(), "calibration run\nwith two lines", "_auto", serde_json::Value::Null)
        .unwrap();

    let record = storage::read_record(&path).unwrap();
    assert_eq!(record.header(), "calibration run\nwith two lines");
    assert_eq!(record.meta().configuration, config);
    assert_eq!(
        record.meta().units.get("x").map(String::as_str),
        Some("V")
    );

    let history = record.history().unwrap();
    let keys: Vec<&str> = history.keys().collect();
    assert_eq!(keys, ["time", "x", "y"]);

    for key in ["time", "x", "y"] {
        let original = logger.get_data(key, None, None).unwrap();
        let loaded = history.get(key, None, None).unwrap();
        assert_eq!(original.len(), loaded.len(), "length of '{key}'");
        for (a, b) in original.iter().zip(&loaded) {
            assert!(
                (a.is_nan() && b.is_nan()) || a == b,
                "'{key}' mismatch: {a} vs {b}"
            );
        }
    }

    // The NaN for the silent y cycle survived the round trip.
    let y = history.get("y", Some(-1), None).unwrap();
    assert!(y[0].is_nan());
}

#[test]
fn user_metadata_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let logger = DataLogger::new();
    collect_some_data(&logger);

    let user = serde_json::json!({"sample": "B-17", "operator": "night shift"});
    let path = logger
        .save_data(dir.path(), "", "", user.clone())
        .unwrap();
    let record = storage::read_record(&path).unwrap();
    assert_eq!(record.meta().user, user);
}
