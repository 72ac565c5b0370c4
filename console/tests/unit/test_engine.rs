mod fakes;

use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;

use deploy_console::errors::ChannelError;
use deploy_console::models::deployment::{DeploymentStatus, PrStatus};
use deploy_console::pipeline::{Pipeline, PushChannel};
use deploy_console::status::engine::StatusEngine;
use deploy_console::status::tracker::ChannelState;

use fakes::{eventually, fast_options, push_message, receipt, FakePipeline, FakePush};

async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(2), future)
        .await
        .expect("timed out")
}

fn engine(pipeline: &Arc<FakePipeline>, push: &Arc<FakePush>) -> StatusEngine {
    StatusEngine::new(
        pipeline.clone() as Arc<dyn Pipeline>,
        push.clone() as Arc<dyn PushChannel>,
        fast_options(),
    )
}

#[tokio::test]
async fn test_status_survives_channel_close() {
    let pipeline = Arc::new(FakePipeline::new());
    let push = Arc::new(FakePush::new());
    let server = push.connection();
    let engine = engine(&pipeline, &push);

    let mut sub = engine.subscribe(&receipt());
    assert_eq!(sub.status(), DeploymentStatus::Pending);
    within(sub.wait_for_channel(ChannelState::Connected)).await;

    server.send(Ok(push_message("approved"))).unwrap();
    within(sub.wait_for(|s| s == DeploymentStatus::Approved)).await;

    // Server closes the channel; later handshakes are refused
    drop(server);
    assert!(eventually(|| push.open_count() >= 2).await);
    assert_eq!(sub.status(), DeploymentStatus::Approved);
    assert_ne!(sub.channel_state(), ChannelState::Connected);
}

#[tokio::test]
async fn test_poll_fallback_when_push_unavailable() {
    let pipeline = Arc::new(FakePipeline::new());
    let push = Arc::new(FakePush::new());
    let engine = engine(&pipeline, &push);

    let mut sub = engine.subscribe(&receipt());
    pipeline.set_deploy_status("merged");

    within(sub.wait_for(|s| s == DeploymentStatus::Merged)).await;
    assert!(eventually(|| push.open_count() >= 2).await);
}

#[tokio::test]
async fn test_poll_only_engine() {
    let pipeline = Arc::new(FakePipeline::new());
    *pipeline.pr_status.lock().unwrap() = Some(PrStatus {
        merged: true,
        status: Some("closed".to_string()),
    });
    let engine = StatusEngine::poll_only(pipeline.clone() as Arc<dyn Pipeline>, fast_options());

    let mut sub = engine.subscribe(&receipt());
    let status = within(sub.wait_for(|s| s.is_final())).await;
    assert_eq!(status, Some(DeploymentStatus::Rejected));
    assert_eq!(sub.channel_state(), ChannelState::Disconnected);
}

#[tokio::test]
async fn test_handshake_timeout_retries() {
    let pipeline = Arc::new(FakePipeline::new());
    let push = Arc::new(FakePush::new());
    push.hang.store(true, Ordering::SeqCst);
    let engine = engine(&pipeline, &push);

    let sub = engine.subscribe(&receipt());
    assert!(eventually(|| push.open_count() >= 2).await);
    assert_eq!(sub.status(), DeploymentStatus::Pending);
    assert_ne!(sub.channel_state(), ChannelState::Connected);
}

#[tokio::test]
async fn test_malformed_message_keeps_connection() {
    let pipeline = Arc::new(FakePipeline::new());
    let push = Arc::new(FakePush::new());
    let server = push.connection();
    let engine = engine(&pipeline, &push);

    let mut sub = engine.subscribe(&receipt());
    within(sub.wait_for_channel(ChannelState::Connected)).await;

    server
        .send(Err(ChannelError::Malformed("not json".to_string())))
        .unwrap();
    server.send(Ok(push_message("approved"))).unwrap();

    within(sub.wait_for(|s| s == DeploymentStatus::Approved)).await;
    assert_eq!(push.open_count(), 1);
    assert_eq!(sub.channel_state(), ChannelState::Connected);
}

#[tokio::test]
async fn test_observers_notified_only_on_change() {
    let pipeline = Arc::new(FakePipeline::new());
    let push = Arc::new(FakePush::new());
    let server = push.connection();
    let engine = engine(&pipeline, &push);

    let mut sub = engine.subscribe(&receipt());
    within(sub.wait_for_channel(ChannelState::Connected)).await;

    server.send(Ok(push_message("approved"))).unwrap();
    within(sub.wait_for(|s| s == DeploymentStatus::Approved)).await;

    server.send(Ok(push_message("approved"))).unwrap();
    server.send(Ok(push_message("pending"))).unwrap();
    server.send(Ok(push_message("merged"))).unwrap();
    assert_eq!(within(sub.changed()).await, Some(DeploymentStatus::Merged));

    server.send(Ok(push_message("approved"))).unwrap();
    let quiet = tokio::time::timeout(Duration::from_millis(100), sub.changed()).await;
    assert!(quiet.is_err());
    assert_eq!(sub.status(), DeploymentStatus::Merged);
}

#[tokio::test]
async fn test_updates_stream_follows_to_final() {
    let pipeline = Arc::new(FakePipeline::new());
    let push = Arc::new(FakePush::new());
    let server = push.connection();
    let engine = engine(&pipeline, &push);

    let mut sub = engine.subscribe(&receipt());
    let mut updates = sub.updates();
    within(sub.wait_for_channel(ChannelState::Connected)).await;

    server.send(Ok(push_message("synced"))).unwrap();
    assert_eq!(within(updates.next()).await, Some(DeploymentStatus::Synced));

    // Final status stops both workers
    within(sub.wait_for_channel(ChannelState::Disconnected)).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    let polls = pipeline.polls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(pipeline.polls.load(Ordering::SeqCst), polls);
    assert_eq!(push.open_count(), 1);
}

#[tokio::test]
async fn test_observers_end_at_final_status() {
    let pipeline = Arc::new(FakePipeline::new());
    let push = Arc::new(FakePush::new());
    let server = push.connection();
    let engine = engine(&pipeline, &push);

    let mut sub = engine.subscribe(&receipt());
    let mut updates = sub.updates();
    within(sub.wait_for_channel(ChannelState::Connected)).await;

    server.send(Ok(push_message("approved"))).unwrap();
    assert_eq!(within(updates.next()).await, Some(DeploymentStatus::Approved));
    server.send(Ok(push_message("synced"))).unwrap();
    assert_eq!(within(updates.next()).await, Some(DeploymentStatus::Synced));
    within(sub.wait_for_channel(ChannelState::Disconnected)).await;

    // The tracker is still attached, yet both observers end
    assert!(engine.is_tracking("abc"));
    assert_eq!(within(updates.next()).await, None);
    assert_eq!(within(sub.changed()).await, Some(DeploymentStatus::Synced));
    assert_eq!(within(sub.changed()).await, None);
    assert_eq!(within(sub.updates().next()).await, None);
}

#[tokio::test]
async fn test_single_tracker_per_deployment() {
    let pipeline = Arc::new(FakePipeline::new());
    let push = Arc::new(FakePush::new());
    let _server = push.connection();
    let engine = engine(&pipeline, &push);

    let first = engine.subscribe(&receipt());
    let second = engine.subscribe_from(&receipt(), DeploymentStatus::Approved);
    assert_eq!(engine.tracked_count(), 1);
    assert_eq!(second.status(), DeploymentStatus::Pending);

    assert!(eventually(|| first.channel_state() == ChannelState::Connected).await);
    assert_eq!(push.open_count(), 1);

    drop(first);
    assert!(engine.is_tracking("abc"));
    drop(second);
    assert!(!engine.is_tracking("abc"));
}

#[tokio::test]
async fn test_detach_releases_tracker() {
    let pipeline = Arc::new(FakePipeline::new());
    let push = Arc::new(FakePush::new());
    let server = push.connection();
    let engine = engine(&pipeline, &push);

    let mut sub = engine.subscribe(&receipt());
    within(sub.wait_for_channel(ChannelState::Connected)).await;
    assert_eq!(engine.status("abc"), Some(DeploymentStatus::Pending));

    drop(sub);
    assert_eq!(engine.tracked_count(), 0);
    assert_eq!(engine.status("abc"), None);

    // The relay dropped its end of the stream
    assert!(eventually(|| server.is_closed()).await);

    let opens = push.open_count();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(push.open_count(), opens);
}

#[tokio::test]
async fn test_shutdown_ends_subscriptions() {
    let pipeline = Arc::new(FakePipeline::new());
    let push = Arc::new(FakePush::new());
    let _server = push.connection();
    let engine = engine(&pipeline, &push);

    let mut sub = engine.subscribe(&receipt());
    within(sub.wait_for_channel(ChannelState::Connected)).await;

    engine.shutdown();
    assert_eq!(engine.tracked_count(), 0);
    assert_eq!(within(sub.changed()).await, None);
}
