use super::*;

use std::sync::Arc;

fn recorder() -> (Arc<Mutex<Vec<(String, RefreshOutcome)>>>, impl Fn(&str) -> Subscriber) {
    let log: Arc<Mutex<Vec<(String, RefreshOutcome)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    let make = move |label: &str| -> Subscriber {
        let sink = sink.clone();
        let label = label.to_owned();
        Box::new(move |outcome| sink.lock().unwrap().push((label, outcome)))
    };
    (log, make)
}

#[test]
fn first_join_leads_and_sets_flag() {
    let gate = RefreshGate::new();
    assert!(!gate.is_refreshing());
    let ticket = gate.join();
    assert!(matches!(ticket, Ticket::Lead(_)));
    assert!(gate.is_refreshing());
}

#[test]
fn try_lead_refuses_while_refreshing() {
    let gate = RefreshGate::new();
    let lease = gate.try_lead().unwrap();
    assert!(gate.try_lead().is_none());
    lease.finish(Ok("T".to_owned()));
    assert!(!gate.is_refreshing());
    assert!(gate.try_lead().is_some());
}

#[test]
fn subscriber_without_refresh_takes_the_lease() {
    let gate = RefreshGate::new();
    let (log, make) = recorder();

    let lease = gate.lead_or_subscribe(make("A")).unwrap();
    assert!(gate.is_refreshing());
    lease.finish(Ok("T".to_owned()));

    assert!(log.lock().unwrap().is_empty());
    assert!(!gate.is_refreshing());
}

#[test]
fn subscribers_fire_in_enqueue_order_with_same_token() {
    let gate = RefreshGate::new();
    let (log, make) = recorder();
    let lease = gate.try_lead().unwrap();

    for label in ["A", "B", "C"] {
        assert!(gate.lead_or_subscribe(make(label)).is_none());
    }
    assert!(log.lock().unwrap().is_empty());

    lease.finish(Ok("T".to_owned()));

    let fired = log.lock().unwrap().clone();
    let labels: Vec<&str> = fired.iter().map(|(label, _)| label.as_str()).collect();
    assert_eq!(labels, ["A", "B", "C"]);
    assert!(fired.iter().all(|(_, outcome)| outcome.as_deref() == Ok("T")));
}

#[test]
fn queue_is_discarded_after_draining() {
    let gate = RefreshGate::new();
    let (log, make) = recorder();

    let lease = gate.try_lead().unwrap();
    assert!(gate.lead_or_subscribe(make("first-cycle")).is_none());
    lease.finish(Ok("T1".to_owned()));

    let lease = gate.try_lead().unwrap();
    assert!(gate.lead_or_subscribe(make("second-cycle")).is_none());
    lease.finish(Ok("T2".to_owned()));

    let fired = log.lock().unwrap().clone();
    assert_eq!(fired.len(), 2);
    assert_eq!(fired[0], ("first-cycle".to_owned(), Ok("T1".to_owned())));
    assert_eq!(fired[1], ("second-cycle".to_owned(), Ok("T2".to_owned())));
}

#[test]
fn failed_refresh_wakes_subscribers_with_error() {
    let gate = RefreshGate::new();
    let (log, make) = recorder();
    let lease = gate.try_lead().unwrap();
    assert!(gate.lead_or_subscribe(make("A")).is_none());

    lease.finish(Err("refresh rejected".to_owned()));

    let fired = log.lock().unwrap().clone();
    assert_eq!(fired, vec![("A".to_owned(), Err("refresh rejected".to_owned()))]);
    assert!(!gate.is_refreshing());
}

#[test]
fn dropped_lease_releases_gate_with_cancellation() {
    let gate = RefreshGate::new();
    let (log, make) = recorder();
    {
        let _lease = gate.try_lead().unwrap();
        assert!(gate.lead_or_subscribe(make("A")).is_none());
    }
    assert!(!gate.is_refreshing());
    let fired = log.lock().unwrap().clone();
    assert_eq!(fired, vec![("A".to_owned(), Err(CANCELLED.to_owned()))]);
}

#[tokio::test]
async fn joined_waiters_receive_leader_outcome() {
    let gate = RefreshGate::new();
    let Ticket::Lead(lease) = gate.join() else { panic!("first join should lead") };
    let Ticket::Wait(a) = gate.join() else { panic!("second join should wait") };
    let Ticket::Wait(b) = gate.join() else { panic!("third join should wait") };

    lease.finish(Ok("T3".to_owned()));

    assert_eq!(wait_for(a).await, Ok("T3".to_owned()));
    assert_eq!(wait_for(b).await, Ok("T3".to_owned()));
}

#[tokio::test]
async fn joined_waiters_and_callbacks_share_one_queue() {
    let gate = RefreshGate::new();
    let (log, make) = recorder();
    let Ticket::Lead(lease) = gate.join() else { panic!("first join should lead") };
    assert!(gate.lead_or_subscribe(make("A")).is_none());
    let Ticket::Wait(waiter) = gate.join() else { panic!("join should wait behind the lease") };
    assert!(gate.lead_or_subscribe(make("C")).is_none());

    lease.finish(Ok("T4".to_owned()));

    assert_eq!(wait_for(waiter).await, Ok("T4".to_owned()));
    let labels: Vec<String> = log.lock().unwrap().iter().map(|(label, _)| label.clone()).collect();
    assert_eq!(labels, ["A", "C"]);
    assert!(!gate.is_refreshing());
}
