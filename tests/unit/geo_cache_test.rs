use std::time::Duration;

use admission_guard::core::{GeoStatus, LOCAL_NETWORK, RESOLVING_DISPLAY};
use admission_guard::events::GuardEvent;
use admission_guard::service::AdmissionDecision;

use crate::test_utils::{eventually, wait_for, Harness, RecordingSink, ScriptedResolver};

fn country_of(decision: &AdmissionDecision) -> String {
    match decision {
        AdmissionDecision::Admitted(snapshot) => snapshot.country.clone(),
        AdmissionDecision::Blocked => panic!("request unexpectedly blocked"),
    }
}

#[tokio::test]
async fn loopback_resolves_locally_without_lookup() {
    let h = Harness::new(20, true);

    assert_eq!(h.gate.geo().status("127.0.0.1").await, GeoStatus::Unresolved);
    let decision = h.gate.process_request("127.0.0.1").await;

    assert_eq!(country_of(&decision), LOCAL_NETWORK);
    assert_eq!(
        h.gate.geo().status("127.0.0.1").await,
        GeoStatus::Resolved(LOCAL_NETWORK.to_string())
    );

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(h.resolver.calls(), 0);
}

#[tokio::test]
async fn concurrent_requests_share_one_lookup() {
    let h = Harness::with(
        20,
        true,
        ScriptedResolver::gated(&[("8.8.8.8", "United States")]),
        RecordingSink::default(),
    );
    let mut rx = h.subscribe();

    for _ in 0..5 {
        let decision = h.gate.process_request("8.8.8.8").await;
        assert_eq!(country_of(&decision), RESOLVING_DISPLAY);
    }

    let resolver = h.resolver.clone();
    eventually(|| resolver.calls() == 1).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(h.resolver.calls(), 1);
    assert_eq!(h.gate.geo().status("8.8.8.8").await, GeoStatus::Resolving);

    h.resolver.release(1);
    let event = wait_for(&mut rx, |event| {
        matches!(event, GuardEvent::TrafficUpdate { country, .. } if country == "United States")
    })
    .await;
    match event {
        // Count captured when the lookup was scheduled
        GuardEvent::TrafficUpdate { count, .. } => assert_eq!(count, 1),
        other => panic!("unexpected event {:?}", other),
    }

    assert_eq!(
        h.gate.geo().status("8.8.8.8").await,
        GeoStatus::Resolved("United States".to_string())
    );
    let decision = h.gate.process_request("8.8.8.8").await;
    assert_eq!(country_of(&decision), "United States");
    assert_eq!(h.resolver.calls(), 1);
}

#[tokio::test]
async fn failed_lookup_degrades_to_unknown_once() {
    let h = Harness::new(20, true);
    let mut rx = h.subscribe();

    h.gate.process_request("203.0.113.50").await;
    wait_for(&mut rx, |event| {
        matches!(event, GuardEvent::TrafficUpdate { country, .. } if country == "Unknown")
    })
    .await;

    assert_eq!(
        h.gate.geo().status("203.0.113.50").await,
        GeoStatus::Resolved("Unknown".to_string())
    );

    let decision = h.gate.process_request("203.0.113.50").await;
    assert_eq!(country_of(&decision), "Unknown");
    assert_eq!(h.resolver.calls(), 1);
}

#[tokio::test]
async fn pending_lookup_does_not_stall_other_keys() {
    let h = Harness::with(
        20,
        true,
        ScriptedResolver::gated(&[("8.8.4.4", "United States")]),
        RecordingSink::default(),
    );

    h.gate.process_request("8.8.4.4").await;
    let decision = tokio::time::timeout(
        Duration::from_millis(500),
        h.gate.process_request("192.168.0.10"),
    )
    .await
    .expect("request path waited on a geolocation lookup");

    assert_eq!(country_of(&decision), LOCAL_NETWORK);
}
