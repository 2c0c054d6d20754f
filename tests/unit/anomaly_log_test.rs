use std::sync::Arc;

use admission_guard::config::GuardConfig;
use admission_guard::core::{Anomaly, AnomalySink, FileAnomalyLog, ManualClock};
use admission_guard::events::EventBroadcaster;
use admission_guard::service::AdmissionGate;

use crate::test_utils::{at, eventually, ScriptedResolver};

#[tokio::test]
async fn gate_appends_anomalies_to_log_file() {
    let path = std::env::temp_dir().join(format!("guard-{}.log", uuid::Uuid::new_v4()));
    let config = GuardConfig {
        request_limit: 2,
        ..GuardConfig::default()
    };
    let gate = AdmissionGate::new(
        config,
        Arc::new(ScriptedResolver::new(&[])),
        Arc::new(FileAnomalyLog::new(&path)),
        EventBroadcaster::default(),
        Arc::new(ManualClock::new(at(0))),
    );

    for _ in 0..3 {
        gate.process_request("127.0.0.1").await;
    }

    let check = path.clone();
    eventually(|| {
        std::fs::read_to_string(&check)
            .map(|contents| contents.lines().count() == 1)
            .unwrap_or(false)
    })
    .await;

    let contents = std::fs::read_to_string(&path).unwrap();
    let logged: Anomaly = serde_json::from_str(contents.trim()).unwrap();
    assert_eq!(logged, gate.anomalies().await[0]);
    assert_eq!(logged.country, "Local Network");
    assert_eq!(logged.timestamp, at(0).timestamp());

    std::fs::remove_file(&path).unwrap();
}

#[tokio::test]
async fn log_file_accumulates_lines() {
    let path = std::env::temp_dir().join(format!("guard-{}.log", uuid::Uuid::new_v4()));
    let log = FileAnomalyLog::new(&path);

    for key in ["a", "b", "a"] {
        let anomaly = Anomaly {
            key: key.to_string(),
            count: 3,
            country: "Unknown".to_string(),
            timestamp: 1,
        };
        tokio_test::assert_ok!(log.append(&anomaly).await);
    }

    let contents = std::fs::read_to_string(log.path()).unwrap();
    assert_eq!(contents.lines().count(), 3);
    std::fs::remove_file(&path).unwrap();
}

