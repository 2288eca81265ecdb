// Loopback host tests
//
// End-to-end runs where the in-process host acknowledges everything.
// Run with: cargo test --test loopback_tests

use activity_stack::host::{LoopbackDriver, LoopbackHost};
use activity_stack::{
    ActivityInfo, ActivityManager, ActivityState, ActivityToken, ApplicationInfo, ComponentName,
    Intent, LaunchRequest, ManagerConfig, flags, spawn_message_pump,
};
use std::future::Future;
use std::time::Duration;

fn launch_request(package: &str, class: &str) -> LaunchRequest {
    let info = ActivityInfo::new(ApplicationInfo::new(package, 10_001), class);
    let component = ComponentName::new(package, class);
    LaunchRequest::new(
        Intent::new().component(component).add_flags(flags::NEW_TASK),
        info,
    )
}

async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..400 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}

async fn state_of(manager: &ActivityManager, token: ActivityToken) -> Option<ActivityState> {
    manager.record(token).await.map(|r| r.state)
}

#[tokio::test]
async fn test_loopback_launch_and_stop() {
    let (host, events) = LoopbackHost::new();
    let manager =
        ActivityManager::new(ManagerConfig::default(), host.clone(), host.clone()).unwrap();
    let m = &manager;
    let driver = LoopbackDriver::spawn(m.clone(), events);
    let pump = spawn_message_pump(m.clone());

    let home = m.launch(launch_request("com.example.launcher", ".Home")).await;
    assert!(eventually(move || async move { m.resumed_activity().await == Some(home) }).await);

    let mail = m.launch(launch_request("com.example.mail", ".Inbox")).await;
    assert!(eventually(move || async move { m.resumed_activity().await == Some(mail) }).await);
    assert!(
        eventually(move || async move { state_of(m, home).await == Some(ActivityState::Stopped) }).await
    );

    let stopped = m.record(home).await.unwrap();
    assert!(stopped.have_state);
    assert!(!stopped.now_visible);

    let tasks = m.tasks().await;
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].root().unwrap().token, mail);

    pump.stop().await.unwrap();
    driver.stop().await.unwrap();
}

#[tokio::test]
async fn test_loopback_finish_returns_to_previous() {
    let (host, events) = LoopbackHost::new();
    let manager =
        ActivityManager::new(ManagerConfig::default(), host.clone(), host.clone()).unwrap();
    let m = &manager;
    let driver = LoopbackDriver::spawn(m.clone(), events);
    let pump = spawn_message_pump(m.clone());

    let home = m.launch(launch_request("com.example.launcher", ".Home")).await;
    let mail = m.launch(launch_request("com.example.mail", ".Inbox")).await;
    assert!(
        eventually(move || async move { state_of(m, home).await == Some(ActivityState::Stopped) }).await
    );

    assert!(m.finish(mail, None).await);
    assert!(eventually(move || async move { m.record(mail).await.is_none() }).await);
    assert!(eventually(move || async move { m.resumed_activity().await == Some(home) }).await);
    assert_eq!(m.tasks().await.len(), 1);

    pump.stop().await.unwrap();
    driver.stop().await.unwrap();
}

#[tokio::test]
async fn test_loopback_unavailable_process() {
    let (host, events) = LoopbackHost::new();
    host.mark_unavailable("com.example.broken");
    let manager =
        ActivityManager::new(ManagerConfig::default(), host.clone(), host.clone()).unwrap();
    let m = &manager;
    let driver = LoopbackDriver::spawn(m.clone(), events);

    let home = m.launch(launch_request("com.example.launcher", ".Home")).await;
    assert!(eventually(move || async move { m.resumed_activity().await == Some(home) }).await);

    let broken = m.launch(launch_request("com.example.broken", ".Main")).await;
    assert!(eventually(move || async move { m.resumed_activity().await == Some(home) }).await);
    // Reaped by the idle sweep that follows home's resume.
    assert!(eventually(move || async move { m.record(broken).await.is_none() }).await);

    driver.stop().await.unwrap();
}
