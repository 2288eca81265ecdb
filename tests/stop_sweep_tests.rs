// Stop sweep tests
//
// Paused records are only stopped once their successor is on screen.
// Run with: cargo test --test stop_sweep_tests

mod common;

use activity_stack::{ActivityState, ManagerConfig, WindowFacet};
use common::{Call, RecordingHost, bring_up, launch_running, manager, manager_with, request};
use serde_json::json;

#[tokio::test]
async fn test_stop_waits_for_successor_window() {
    let host = RecordingHost::new();
    let m = manager(&host);

    let a = launch_running(&m, request("com.example", ".Main")).await;
    assert!(m.record(a).await.unwrap().idle);

    let b = m.launch(request("com.example", ".Second")).await;
    m.activity_paused(a).await;
    let waiting = m.record(a).await.unwrap();
    assert_eq!(waiting.state, ActivityState::Paused);
    assert!(waiting.waiting_visible);
    assert_eq!(m.stats().await.waiting_visible, 1);

    m.activity_resumed(b).await;
    m.activity_idle(b).await;
    // `b` is idle but not drawn yet: `a` stays paused.
    assert_eq!(m.record(a).await.unwrap().state, ActivityState::Paused);
    assert_eq!(host.count(|c| matches!(c, Call::Stop(_))), 0);

    m.windows_visible(b).await;
    assert!(!m.record(a).await.unwrap().waiting_visible);
    assert_eq!(m.stats().await.waiting_visible, 0);
    assert_eq!(m.stats().await.pending_messages, 1);

    assert_eq!(m.dispatch_pending_messages().await, 1);
    assert_eq!(m.record(a).await.unwrap().state, ActivityState::Stopping);
    assert_eq!(host.count(|c| *c == Call::Stop(a)), 1);
    assert!(host.calls().contains(&Call::Hide(a)));

    m.activity_stopped(a, Some(json!({ "scroll": 42 }))).await;
    let stopped = m.record(a).await.unwrap();
    assert_eq!(stopped.state, ActivityState::Stopped);
    assert!(stopped.stopped);
    assert!(stopped.have_state);

    // Sweeping again finds nothing left to stop.
    m.activity_idle(b).await;
    assert_eq!(m.dispatch_pending_messages().await, 0);
    assert_eq!(host.count(|c| *c == Call::Stop(a)), 1);
}

#[tokio::test]
async fn test_visible_without_idle_posts_nothing() {
    let host = RecordingHost::new();
    let m = manager(&host);
    let a = launch_running(&m, request("com.example", ".Main")).await;

    let b = m.launch(request("com.example", ".Second")).await;
    m.activity_paused(a).await;
    m.activity_resumed(b).await;
    m.windows_visible(b).await;

    // Not idle yet: nothing posted, `a` still waiting.
    assert_eq!(m.stats().await.pending_messages, 0);
    assert!(m.record(a).await.unwrap().waiting_visible);

    // The idle report sweeps now that `b` is drawn.
    m.activity_idle(b).await;
    assert_eq!(m.record(a).await.unwrap().state, ActivityState::Stopping);
}

#[tokio::test]
async fn test_launch_timing_recorded_once() {
    let host = RecordingHost::new();
    let m = manager(&host);

    let a = m.launch(request("com.example", ".Main")).await;
    m.activity_resumed(a).await;

    let first = m.windows_visible(a).await;
    assert!(first.is_some());
    let second = m.windows_visible(a).await;
    assert!(second.is_none());

    let record = m.record(a).await.unwrap();
    assert_eq!(record.launch_timing, first);
    assert_eq!(record.window, WindowFacet::Shown);
    assert_eq!(m.stats().await.launches_reported, 1);
}

#[tokio::test]
async fn test_launch_timing_without_reporting() {
    let host = RecordingHost::new();
    let m = manager_with(&host, ManagerConfig::new().report_launch_times(false));

    let a = launch_running(&m, request("com.example", ".Main")).await;
    assert!(m.record(a).await.unwrap().launch_timing.is_some());
}

#[tokio::test]
async fn test_windows_gone_on_destroyed_record_is_noop() {
    let host = RecordingHost::new();
    let m = manager(&host);
    let a = launch_running(&m, request("com.example", ".Main")).await;

    m.finish(a, None).await;
    m.activity_destroyed(a).await;
    let before = m.stats().await;

    m.windows_gone(a).await;
    assert!(m.windows_visible(a).await.is_none());
    assert_eq!(m.stats().await, before);
}

#[tokio::test]
async fn test_windows_gone_clears_drawn_flag() {
    let host = RecordingHost::new();
    let m = manager(&host);
    let a = launch_running(&m, request("com.example", ".Main")).await;
    assert!(m.record(a).await.unwrap().now_visible);

    m.windows_gone(a).await;
    let record = m.record(a).await.unwrap();
    assert!(!record.now_visible);
    assert!(record.visible);
    assert_eq!(record.window, WindowFacet::Requested);
}

#[tokio::test]
async fn test_detached_host_completes_synchronously() {
    let host = RecordingHost::new();
    let m = manager(&host);
    let a = launch_running(&m, request("com.example", ".Main")).await;
    let b = m.launch(request("com.example.other", ".Main")).await;
    m.activity_paused(a).await;
    bring_up(&m, b).await;

    host.detach("com.example");
    m.dispatch_pending_messages().await;

    let stopped = m.record(a).await.unwrap();
    assert_eq!(stopped.state, ActivityState::Stopped);
    assert!(!stopped.have_state);
    assert_eq!(host.count(|c| matches!(c, Call::Stop(_))), 0);
}

#[tokio::test]
async fn test_detached_finish_is_parked_until_idle() {
    let host = RecordingHost::new();
    let m = manager(&host);
    let a = launch_running(&m, request("com.example", ".Main")).await;
    let b = m.launch(request("com.example.other", ".Main")).await;
    m.activity_paused(a).await;
    bring_up(&m, b).await;

    host.detach("com.example");
    assert!(m.finish(a, None).await);
    assert_eq!(host.count(|c| matches!(c, Call::Destroy(_))), 0);
    assert_eq!(m.stats().await.finishing, 1);

    m.activity_idle(b).await;
    assert!(m.record(a).await.is_none());
    assert_eq!(m.stats().await.finishing, 0);
}

#[tokio::test]
async fn test_orphaned_finishing_record_reaped_on_idle() {
    let host = RecordingHost::new();
    let m = manager(&host);
    let a = launch_running(&m, request("com.example", ".Main")).await;
    let b = m.launch(request("com.example.other", ".Main")).await;
    m.activity_paused(a).await;
    bring_up(&m, b).await;

    assert!(m.finish(a, None).await);
    assert_eq!(host.count(|c| *c == Call::Destroy(a)), 1);
    assert_eq!(m.stats().await.finishing, 0);

    // The process goes away without acknowledging the destroy.
    host.detach("com.example");
    m.activity_idle(b).await;
    assert!(m.record(a).await.is_none());
    assert_eq!(m.stats().await.activities, 1);
}

#[tokio::test]
async fn test_teardown_drops_queued_messages() {
    let host = RecordingHost::new();
    let m = manager(&host);
    let a = launch_running(&m, request("com.example", ".Main")).await;
    let b = m.launch(request("com.example", ".Second")).await;
    m.activity_paused(a).await;
    bring_up(&m, b).await;
    assert_eq!(m.stats().await.pending_messages, 1);

    assert_eq!(m.teardown().await, 1);
    let stats = m.stats().await;
    assert_eq!(stats.pending_messages, 0);
    assert_eq!(stats.activities, 0);
    assert_eq!(stats.tasks, 0);
    assert_eq!(m.dispatch_pending_messages().await, 0);
    assert_eq!(host.count(|c| matches!(c, Call::Stop(_))), 0);
}

#[tokio::test]
async fn test_messages_coalesce_when_full() {
    let host = RecordingHost::new();
    let m = manager_with(&host, ManagerConfig::new().max_pending_messages(1));

    let mut prev = launch_running(&m, request("com.example", ".Main")).await;
    for i in 0..3 {
        let next = m
            .launch(request("com.example", &format!(".Screen{}", i)))
            .await;
        m.activity_paused(prev).await;
        bring_up(&m, next).await;
        prev = next;
    }

    let stats = m.stats().await;
    assert_eq!(stats.pending_messages, 1);
    assert_eq!(stats.coalesced_messages, 2);

    assert_eq!(m.dispatch_pending_messages().await, 1);
    assert_eq!(host.count(|c| matches!(c, Call::Stop(_))), 3);
}
