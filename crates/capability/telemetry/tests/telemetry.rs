use mavbridge_telemetry::{
    metrics, new_session_id, record_decode_error, record_deliveries, TelemetryMetrics,
};

#[test]
fn session_ids_are_unique() {
    let first = new_session_id();
    let second = new_session_id();
    assert!(!first.is_empty());
    assert_ne!(first, second);
}

#[test]
fn counters_accumulate() {
    let before = metrics().snapshot();
    record_deliveries(3);
    record_decode_error();
    let after = metrics().snapshot();
    assert!(after.deliveries >= before.deliveries + 3);
    assert!(after.decode_errors > before.decode_errors);
}

#[test]
fn fresh_metrics_start_at_zero() {
    let snapshot = TelemetryMetrics::new().snapshot();
    assert_eq!(snapshot.messages_received, 0);
    assert_eq!(snapshot.subscribers_pruned, 0);
}
