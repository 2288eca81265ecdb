// Concurrency tests
//
// Many tasks drive one manager at once; the single lock keeps the
// one-resumed-record guarantee.
// Run with: cargo test --test concurrency_tests

mod common;

use activity_stack::{ActivityState, spawn_message_pump};
use common::{RecordingHost, launch_running, manager, request};
use std::time::Duration;

#[tokio::test]
async fn test_concurrent_launches_keep_single_resumed() {
    let host = RecordingHost::new();
    let m = manager(&host);
    launch_running(&m, request("com.example", ".Main")).await;

    let mut handles = vec![];
    for task_id in 0..8 {
        let m = m.clone();
        handles.push(tokio::spawn(async move {
            let mut launched = vec![];
            for i in 0..5 {
                let token = m
                    .launch(request("com.example", &format!(".T{}S{}", task_id, i)))
                    .await;
                launched.push(token);

                let dump = m.dump().await;
                let resumed = dump
                    .tasks
                    .iter()
                    .flat_map(|t| t.activities.iter())
                    .filter(|a| a.state == ActivityState::Resumed)
                    .count();
                assert!(resumed <= 1, "task {} saw {} resumed", task_id, resumed);
            }
            launched
        }));
    }

    let mut all = vec![];
    for handle in handles {
        all.extend(handle.await.unwrap());
    }
    assert_eq!(all.len(), 40);
    assert_eq!(m.stats().await.activities, 41);
}

#[tokio::test]
async fn test_concurrent_finish_destroys_once() {
    let host = RecordingHost::new();
    let m = manager(&host);
    let a = launch_running(&m, request("com.example", ".Main")).await;

    let mut handles = vec![];
    for _ in 0..16 {
        let m = m.clone();
        handles.push(tokio::spawn(async move { m.finish(a, None).await }));
    }

    let mut finished = 0;
    for handle in handles {
        if handle.await.unwrap() {
            finished += 1;
        }
    }
    assert_eq!(finished, 1);
    assert_eq!(
        host.count(|c| matches!(c, common::Call::Destroy(t) if *t == a)),
        1
    );
}

#[tokio::test]
async fn test_pump_dispatches_posted_messages() {
    let host = RecordingHost::new();
    let m = manager(&host);
    let pump = spawn_message_pump(m.clone());

    let a = launch_running(&m, request("com.example", ".Main")).await;
    let b = m.launch(request("com.example", ".Second")).await;
    m.activity_paused(a).await;
    common::bring_up(&m, b).await;

    let mut stopped = false;
    for _ in 0..200 {
        if m.record(a).await.unwrap().state == ActivityState::Stopping {
            stopped = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(stopped, "pump never ran the stop sweep");
    assert_eq!(m.stats().await.pending_messages, 0);

    let handled = pump.stop().await.unwrap();
    assert_eq!(handled, 1);
}
