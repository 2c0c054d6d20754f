use std::sync::Arc;

use admission_guard::events::GuardEvent;
use admission_guard::service::AdmissionDecision;

use crate::test_utils::{at, eventually, next_event, random_ip, Harness, RecordingSink, ScriptedResolver};

fn admitted_count(decision: &AdmissionDecision) -> usize {
    match decision {
        AdmissionDecision::Admitted(snapshot) => snapshot.count,
        AdmissionDecision::Blocked => panic!("request unexpectedly blocked"),
    }
}

#[tokio::test]
async fn overflow_is_detected_and_key_auto_blocked() {
    let h = Harness::new(3, true);

    for (t, expected) in [(0, 1), (1, 2), (2, 3)] {
        h.clock.set(at(t));
        let decision = h.gate.process_request("A").await;
        assert_eq!(admitted_count(&decision), expected);
        assert!(h.gate.anomalies().await.is_empty());
    }

    h.clock.set(at(3));
    let decision = h.gate.process_request("A").await;
    let anomaly = match decision {
        AdmissionDecision::Admitted(snapshot) => snapshot.anomaly.expect("anomaly at count 4"),
        AdmissionDecision::Blocked => panic!("fourth request should still be admitted"),
    };
    assert_eq!(anomaly.key, "A");
    assert_eq!(anomaly.count, 4);
    assert_eq!(anomaly.timestamp, at(3).timestamp());
    assert!(h.gate.is_blocked("A").await);

    h.clock.set(at(4));
    assert_eq!(h.gate.process_request("A").await, AdmissionDecision::Blocked);
    assert_eq!(h.gate.ledger().count("A", at(4)).await, 4);
    assert_eq!(h.gate.anomalies().await.len(), 1);
}

#[tokio::test]
async fn keys_at_or_below_limit_are_never_flagged() {
    let h = Harness::new(20, true);
    let key = random_ip();

    for _ in 0..20 {
        assert!(h.gate.process_request(&key).await.is_admitted());
    }

    assert!(h.gate.anomalies().await.is_empty());
    assert!(!h.gate.is_blocked(&key).await);
}

#[test]
fn random_keys_avoid_local_ranges() {
    for _ in 0..1000 {
        let key = random_ip();
        assert!(!admission_guard::core::is_local_key(&key), "{}", key);
    }
}

#[tokio::test]
async fn alternating_offenders_are_each_recorded() {
    let h = Harness::new(3, false);

    for _ in 0..4 {
        h.gate.process_request("A").await;
    }
    for _ in 0..4 {
        h.gate.process_request("B").await;
    }
    h.gate.process_request("A").await;

    let keys: Vec<String> = h.gate.anomalies().await.into_iter().map(|a| a.key).collect();
    assert_eq!(keys, vec!["A", "B", "A"]);
}

#[tokio::test]
async fn sustained_offender_produces_single_anomaly() {
    let h = Harness::new(3, false);

    for _ in 0..10 {
        assert!(h.gate.process_request("A").await.is_admitted());
    }

    let anomalies = h.gate.anomalies().await;
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].count, 4);
}

#[tokio::test]
async fn auto_block_disabled_keeps_admitting() {
    let h = Harness::new(1, false);

    for _ in 0..5 {
        assert!(h.gate.process_request("A").await.is_admitted());
    }
    assert!(!h.gate.is_blocked("A").await);
    assert_eq!(h.gate.anomalies().await.len(), 1);
}

#[tokio::test]
async fn sliding_window_drops_old_requests() {
    let h = Harness::new(100, true);

    for t in [0, 1, 2] {
        h.clock.set(at(t));
        h.gate.process_request("A").await;
    }

    h.clock.advance(chrono::Duration::seconds(9));
    let decision = h.gate.process_request("A").await;
    // t=0 and t=1 are a full window old; t=2 and t=11 remain
    assert_eq!(admitted_count(&decision), 2);
}

#[tokio::test]
async fn block_unblock_cycle_leaves_history_untouched() {
    let h = Harness::new(3, true);

    for _ in 0..4 {
        h.gate.process_request("A").await;
    }
    assert!(h.gate.is_blocked("A").await);

    for _ in 0..5 {
        assert_eq!(h.gate.process_request("A").await, AdmissionDecision::Blocked);
    }
    assert_eq!(h.gate.ledger().count("A", at(0)).await, 4);

    assert!(h.gate.manual_unblock("A").await);
    assert!(!h.gate.manual_unblock("A").await);

    let decision = h.gate.process_request("A").await;
    assert_eq!(admitted_count(&decision), 5);
    // The previous global anomaly is still A, so this overflow is suppressed
    assert_eq!(h.gate.anomalies().await.len(), 1);
    assert!(!h.gate.is_blocked("A").await);
}

#[tokio::test]
async fn events_follow_request_order() {
    let h = Harness::new(1, true);
    let mut rx = h.subscribe();

    h.gate.process_request("127.0.0.1").await;
    match next_event(&mut rx).await {
        GuardEvent::TrafficUpdate { key, count, country, .. } => {
            assert_eq!(key, "127.0.0.1");
            assert_eq!(count, 1);
            assert_eq!(country, "Local Network");
        }
        other => panic!("unexpected event {:?}", other),
    }

    h.gate.process_request("127.0.0.1").await;
    let names: Vec<&str> = vec![
        next_event(&mut rx).await.name(),
        next_event(&mut rx).await.name(),
        next_event(&mut rx).await.name(),
    ];
    assert_eq!(names, vec!["traffic_update", "ddos_alert", "ip_blocked"]);

    assert_eq!(h.gate.process_request("127.0.0.1").await, AdmissionDecision::Blocked);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn manual_block_and_unblock_emit_transitions() {
    let h = Harness::new(20, true);
    let mut rx = h.subscribe();

    assert!(h.gate.manual_block("198.51.100.7").await);
    assert!(!h.gate.manual_block("198.51.100.7").await);
    assert_eq!(
        next_event(&mut rx).await,
        GuardEvent::IpBlocked { key: "198.51.100.7".into() }
    );
    assert_eq!(h.gate.process_request("198.51.100.7").await, AdmissionDecision::Blocked);
    assert_eq!(h.gate.ledger().tracked_keys().await, 0);

    assert!(h.gate.manual_unblock("198.51.100.7").await);
    assert_eq!(
        next_event(&mut rx).await,
        GuardEvent::IpUnblocked { key: "198.51.100.7".into() }
    );
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn new_observer_receives_blocklist_snapshot() {
    let h = Harness::new(20, true);
    h.gate.manual_block("b").await;
    h.gate.manual_block("a").await;

    let (snapshot, mut rx) = h.gate.attach_observer().await;
    assert_eq!(
        snapshot,
        GuardEvent::UpdateBlockedList { blocked: vec!["a".into(), "b".into()] }
    );

    h.gate.manual_unblock("a").await;
    assert_eq!(next_event(&mut rx).await, GuardEvent::IpUnblocked { key: "a".into() });
}

#[tokio::test]
async fn anomalies_are_persisted_in_background() {
    let h = Harness::new(2, false);

    for _ in 0..3 {
        h.gate.process_request("A").await;
    }
    for _ in 0..3 {
        h.gate.process_request("B").await;
    }

    let sink = h.sink.clone();
    eventually(|| sink.written().len() == 2).await;
    let mut keys: Vec<String> = sink.written().into_iter().map(|a| a.key).collect();
    keys.sort();
    assert_eq!(keys, vec!["A", "B"]);
}

#[test_log::test(tokio::test)]
async fn persistence_failure_does_not_affect_admission() {
    let h = Harness::with(1, true, ScriptedResolver::new(&[]), RecordingSink::failing());

    assert!(h.gate.process_request("A").await.is_admitted());
    assert!(h.gate.process_request("A").await.is_admitted());
    assert!(h.gate.is_blocked("A").await);
    assert!(h.gate.process_request("B").await.is_admitted());
    assert_eq!(h.gate.anomalies().await.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_are_all_counted() {
    let h = Harness::new(1000, true);
    let gate = Arc::new(h.gate);

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.process_request("10.0.0.42").await })
        })
        .collect();

    let mut counts = Vec::new();
    for handle in handles {
        let decision = handle.await.unwrap();
        counts.push(admitted_count(&decision));
    }
    counts.sort();

    assert_eq!(counts, (1..=50).collect::<Vec<_>>());
    assert_eq!(gate.ledger().count("10.0.0.42", at(0)).await, 50);
}
