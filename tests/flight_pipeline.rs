// End-to-end pipeline coverage: JSON-lines log bytes -> record store ->
// anomaly findings -> chat context digest.

use std::sync::Arc;

use flight_log_analyzer::anomaly::{detect_anomalies, AnomalyKind};
use flight_log_analyzer::chat_agent::ChatAgent;
use flight_log_analyzer::completion::StaticCompletion;
use flight_log_analyzer::decoders::JsonLinesDecoder;
use flight_log_analyzer::flight_context::summarize;
use flight_log_analyzer::ingest::{IngestError, LogIngestor};
use flight_log_analyzer::message_types::MessageType;
use flight_log_analyzer::session::SessionStore;

fn sample_log() -> Vec<u8> {
    let lines = [
        r#"{"mavpackettype": "GPS", "timestamp": 100.0, "fix_type": 3, "lat": 47.39774, "lng": 8.54559}"#,
        r#"{"mavpackettype": "GPS", "timestamp": 101.0, "fix_type": 2, "lat": 47.39775, "lng": 8.54560}"#,
        r#"{"mavpackettype": "ATT", "timestamp": 100.2, "roll": 1.5, "pitch": 0.5, "alt": 12.0}"#,
        r#"{"mavpackettype": "ATT", "timestamp": 100.4, "roll": 55.0, "pitch": 2.0, "alt": 48.5}"#,
        r#"{"mavpackettype": "BAT", "timestamp": 100.5, "volt": 11.8, "curr": 9.1}"#,
        r#"{"mavpackettype": "BAT", "timestamp": 101.5, "volt": 10.1, "curr": 14.3}"#,
        r#"{"mavpackettype": "RCIN", "timestamp": 100.6, "rssi": 88}"#,
        r#"{"mavpackettype": "RCIN", "timestamp": 101.6, "rssi": 35}"#,
        r#"{"mavpackettype": "EV", "timestamp": 100.0, "id": 10}"#,
        r#"{"mavpackettype": "IMU3", "timestamp": 100.0, "gyr_x": 0.01}"#,
        "definitely not a frame",
    ];
    lines.join("\n").into_bytes()
}

fn ingestor() -> LogIngestor {
    LogIngestor::new(Arc::new(JsonLinesDecoder::new()))
}

#[test]
fn ingest_buckets_records_by_type() {
    let report = ingestor().ingest(&sample_log()).unwrap();

    assert_eq!(report.stats.classified, 9);
    assert_eq!(report.store.total_records(), 9);
    assert_eq!(report.stats.frame_errors, 1);
    assert_eq!(report.stats.unknown, 1);
    assert!(report.stats.unknown_types.contains("IMU3"));

    assert_eq!(report.store.count(MessageType::Gps), 2);
    assert_eq!(report.store.count(MessageType::Att), 2);
    assert_eq!(report.store.count(MessageType::Bat), 2);
    assert_eq!(report.store.count(MessageType::Rcin), 2);
    assert_eq!(report.store.count(MessageType::Ev), 1);

    let gps = report.store.records(MessageType::Gps);
    assert_eq!(gps[0].timestamp, 100.0);
    assert_eq!(gps[0].num("lat"), Some(47.39774));
}

#[test]
fn ingest_rejects_contentless_logs() {
    assert!(matches!(
        ingestor().ingest(b""),
        Err(IngestError::Decode(_))
    ));

    // Syntactically decodable, but nothing classifiable.
    let junk = br#"{"mavpackettype": "IMU3", "timestamp": 1.0}"#;
    assert!(matches!(
        ingestor().ingest(junk),
        Err(IngestError::EmptyLog)
    ));
}

#[test]
fn anomaly_rules_fire_on_the_sample_flight() {
    let report = ingestor().ingest(&sample_log()).unwrap();
    let findings = detect_anomalies(&report.store);

    let kinds: Vec<AnomalyKind> = findings.iter().map(|f| f.kind).collect();
    assert_eq!(
        kinds,
        vec![
            AnomalyKind::SuddenAttitudeChange,
            AnomalyKind::GpsSignalLoss,
            AnomalyKind::LowBattery,
            AnomalyKind::RcSignalWeak,
        ]
    );

    // Findings carry the triggering record's timestamp.
    assert_eq!(findings[0].timestamp, 100.4);
    assert_eq!(findings[1].timestamp, 101.0);
}

#[test]
fn digest_summarizes_the_sample_flight() {
    let report = ingestor().ingest(&sample_log()).unwrap();
    let digest = summarize(&report.store);

    assert_eq!(
        digest,
        "Flight duration: 1.0 seconds\n\
         GPS points: 2\n\
         Altitude range: 12.0m to 48.5m\n\
         Battery voltage range: 10.1V to 11.8V\n\
         Number of events: 1"
    );
}

#[test]
fn trim_drops_early_records_and_is_idempotent() {
    let report = ingestor().ingest(&sample_log()).unwrap();
    let mut store = report.store;

    let removed = store.trim_before(101.0);
    let removed_total: usize = removed.iter().map(|(_, n)| n).sum();
    assert_eq!(removed_total, 6);
    assert_eq!(store.count(MessageType::Gps), 1);

    assert!(store.trim_before(101.0).is_empty());
}

#[tokio::test]
async fn uploaded_flight_is_queryable_through_the_agent() {
    let report = ingestor().ingest(&sample_log()).unwrap();

    let agent = ChatAgent::new(
        SessionStore::new(16),
        Arc::new(StaticCompletion::replying(
            "The attitude spike at t=100.4 looks like a control issue.",
        )),
    );
    agent.set_flight_data("flight-1", report.store).await;

    let reply = agent
        .process_message("anything odd in this flight?", Some("flight-1"))
        .await;
    assert!(reply.contains("attitude spike"));

    // The stored data also answers the anomaly endpoint's query path.
    let store = agent.flight_data("flight-1").await.unwrap();
    assert_eq!(detect_anomalies(&store).len(), 4);
    assert!(agent.flight_data("flight-2").await.is_none());
}
