use std::sync::Barrier;
use std::thread;

use deploy_console::models::deployment::{DeploymentStatus, PrStatus, SubmissionReceipt};
use deploy_console::status::reconcile::{
    statuses_from_poll, statuses_from_push, Outcome, Reconciler, StatusSource,
};
use deploy_console::status::tracker::{ChannelState, TrackerShared};
use openapi_client::models::StatusPushMessage;

use DeploymentStatus::*;

fn shared() -> TrackerShared {
    TrackerShared::new(
        SubmissionReceipt {
            pr_reference: "https://git/pr/42".to_string(),
            tracking_id: "abc".to_string(),
        },
        Pending,
    )
}

#[test]
fn test_out_of_order_arrival_keeps_latest_stage() {
    let mut reconciler = Reconciler::new(Pending);
    assert_eq!(reconciler.apply_all([Merged, Approved, Pending]), Some(Merged));
    assert_eq!(reconciler.status(), Merged);
}

#[test]
fn test_every_permutation_converges() {
    let orders = [
        [Approved, Merged, Synced],
        [Synced, Merged, Approved],
        [Merged, Synced, Approved],
        [Approved, Synced, Merged],
    ];
    for order in orders {
        let mut reconciler = Reconciler::new(Pending);
        reconciler.apply_all(order);
        assert_eq!(reconciler.status(), Synced, "order {:?}", order);
    }
}

#[test]
fn test_duplicates_are_idempotent() {
    let mut reconciler = Reconciler::new(Pending);
    assert_eq!(reconciler.apply(Approved), Outcome::Advanced(Approved));
    assert_eq!(reconciler.apply(Approved), Outcome::Duplicate);
    assert_eq!(reconciler.apply_all([Approved, Approved]), None);
    assert_eq!(reconciler.status(), Approved);
}

#[test]
fn test_rejection_from_any_stage_is_final() {
    for held in [Pending, Approved, Merged] {
        let mut reconciler = Reconciler::new(held);
        assert_eq!(reconciler.apply(Rejected), Outcome::Advanced(Rejected));
        assert_eq!(reconciler.apply(Synced), Outcome::Stale);
        assert_eq!(reconciler.apply(Approved), Outcome::Stale);
        assert_eq!(reconciler.status(), Rejected);
    }
}

#[test]
fn test_push_and_poll_agree_on_mapping() {
    let push = StatusPushMessage {
        merged: Some(true),
        deploy_status: Some("deployed".to_string()),
        ..Default::default()
    };
    let pr = PrStatus {
        merged: true,
        status: None,
    };
    assert_eq!(statuses_from_push(&push), vec![Merged, Synced]);
    assert_eq!(statuses_from_poll(Some(&pr), Some("deployed")), vec![Merged, Synced]);
}

#[test]
fn test_tracker_notifies_only_on_change() {
    let shared = shared();
    let mut rx = shared.subscribe_status();

    assert_eq!(shared.observe(vec![Pending], StatusSource::Poll), None);
    assert!(!rx.has_changed().unwrap());

    assert_eq!(shared.observe(vec![Approved], StatusSource::Push), Some(Approved));
    assert!(rx.has_changed().unwrap());
    assert_eq!(*rx.borrow_and_update(), Approved);

    // Same stage from the other source
    assert_eq!(shared.observe(vec![Approved], StatusSource::Poll), None);
    assert!(!rx.has_changed().unwrap());

    // Late earlier stage
    assert_eq!(shared.observe(vec![Pending], StatusSource::Poll), None);
    assert!(!rx.has_changed().unwrap());
    assert_eq!(shared.status(), Approved);
}

#[test]
fn test_tracker_batch_publishes_last_change_once() {
    let shared = shared();
    let mut rx = shared.subscribe_status();

    shared.observe(vec![Merged, Approved, Pending], StatusSource::Push);
    assert!(rx.has_changed().unwrap());
    assert_eq!(*rx.borrow_and_update(), Merged);
    assert!(!rx.has_changed().unwrap());
    assert!(!shared.is_final());

    shared.observe(vec![Synced], StatusSource::Poll);
    assert!(shared.is_final());
}

#[test]
fn test_channel_state_changes_are_deduplicated() {
    let shared = shared();
    let mut rx = shared.subscribe_channel();
    assert_eq!(shared.channel_state(), ChannelState::Disconnected);

    shared.set_channel_state(ChannelState::Disconnected);
    assert!(!rx.has_changed().unwrap());

    shared.set_channel_state(ChannelState::Connecting);
    assert!(rx.has_changed().unwrap());
    assert_eq!(*rx.borrow_and_update(), ChannelState::Connecting);
}

#[test]
fn test_concurrent_observations_never_publish_backwards() {
    for _ in 0..2000 {
        let shared = shared();
        let barrier = Barrier::new(2);

        thread::scope(|scope| {
            scope.spawn(|| {
                barrier.wait();
                shared.observe(vec![Approved], StatusSource::Push);
            });
            scope.spawn(|| {
                barrier.wait();
                shared.observe(vec![Synced], StatusSource::Poll);
            });
        });

        assert_eq!(shared.status(), Synced);
        assert!(shared.is_final());
    }
}
