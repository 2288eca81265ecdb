use super::{ProcessHost, UnresponsiveReport, WindowHost};
use crate::core::{Intent, LifecycleError, Result};
use crate::manager::ActivityManager;
use crate::record::{ActivityHandle, PendingResult};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{Level, event};

/// Notification sent by the manager to the loopback host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Attach(ActivityHandle),
    Resume(ActivityHandle),
    Pause(ActivityHandle),
    Stop(ActivityHandle),
    Destroy(ActivityHandle),
    Results(ActivityHandle, Vec<PendingResult>),
    NewIntents(ActivityHandle, Vec<Intent>),
    Show(ActivityHandle),
    Hide(ActivityHandle),
    PauseKeys(ActivityHandle),
    ResumeKeys(ActivityHandle),
    NotResponding(UnresponsiveReport),
}

/// In-process host: every process starts instantly and every window draws.
///
/// Notifications are queued on a channel; `LoopbackDriver` answers them
/// with the matching acknowledgements from another task.
pub struct LoopbackHost {
    events: mpsc::UnboundedSender<HostEvent>,
    attached: Mutex<HashSet<String>>,
    unavailable: Mutex<HashSet<String>>,
}

impl LoopbackHost {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<HostEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let host = Arc::new(Self {
            events: tx,
            attached: Mutex::new(HashSet::new()),
            unavailable: Mutex::new(HashSet::new()),
        });
        (host, rx)
    }

    /// Refuse to start `process_name` from now on.
    pub fn mark_unavailable(&self, process_name: &str) {
        lock(&self.unavailable).insert(process_name.to_string());
        lock(&self.attached).remove(process_name);
    }

    /// Forget a running process, as if it had died.
    pub fn detach(&self, process_name: &str) {
        lock(&self.attached).remove(process_name);
    }

    fn send(&self, event: HostEvent) {
        if self.events.send(event).is_err() {
            event!(Level::WARN, "loopback driver gone, notification dropped");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ProcessHost for LoopbackHost {
    fn attach(&self, activity: &ActivityHandle) -> Result<()> {
        if lock(&self.unavailable).contains(&activity.process_name) {
            return Err(LifecycleError::HostUnavailable(activity.process_name.clone()));
        }
        lock(&self.attached).insert(activity.process_name.clone());
        self.send(HostEvent::Attach(activity.clone()));
        Ok(())
    }

    fn is_attached(&self, process_name: &str) -> bool {
        lock(&self.attached).contains(process_name)
    }

    fn schedule_resume(&self, activity: &ActivityHandle) {
        self.send(HostEvent::Resume(activity.clone()));
    }

    fn schedule_pause(&self, activity: &ActivityHandle) {
        self.send(HostEvent::Pause(activity.clone()));
    }

    fn schedule_stop(&self, activity: &ActivityHandle) {
        self.send(HostEvent::Stop(activity.clone()));
    }

    fn schedule_destroy(&self, activity: &ActivityHandle) {
        self.send(HostEvent::Destroy(activity.clone()));
    }

    fn deliver_results(&self, activity: &ActivityHandle, results: Vec<PendingResult>) {
        self.send(HostEvent::Results(activity.clone(), results));
    }

    fn deliver_new_intents(&self, activity: &ActivityHandle, intents: Vec<Intent>) {
        self.send(HostEvent::NewIntents(activity.clone(), intents));
    }

    fn app_not_responding(&self, report: &UnresponsiveReport) {
        self.send(HostEvent::NotResponding(report.clone()));
    }
}

impl WindowHost for LoopbackHost {
    fn show(&self, activity: &ActivityHandle) {
        self.send(HostEvent::Show(activity.clone()));
    }

    fn hide(&self, activity: &ActivityHandle) {
        self.send(HostEvent::Hide(activity.clone()));
    }

    fn pause_key_dispatching(&self, activity: &ActivityHandle) {
        self.send(HostEvent::PauseKeys(activity.clone()));
    }

    fn resume_key_dispatching(&self, activity: &ActivityHandle) {
        self.send(HostEvent::ResumeKeys(activity.clone()));
    }
}

/// Background task acknowledging loopback notifications.
pub struct LoopbackDriver {
    stop_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<usize>>,
}

impl LoopbackDriver {
    pub fn spawn(manager: ActivityManager, mut events: mpsc::UnboundedReceiver<HostEvent>) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let join_handle = tokio::spawn(async move {
            let mut handled = 0;
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    next = events.recv() => match next {
                        Some(host_event) => {
                            acknowledge(&manager, host_event).await;
                            handled += 1;
                        }
                        None => break,
                    },
                }
            }
            handled
        });

        Self {
            stop_tx: Some(stop_tx),
            join_handle: Some(join_handle),
        }
    }

    /// Signals the driver to stop and waits for it. Returns how many events it answered.
    pub async fn stop(mut self) -> Result<usize> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        match self.join_handle.take() {
            Some(join_handle) => join_handle.await.map_err(|err| {
                LifecycleError::WorkerJoin(format!("loopback driver join: {}", err))
            }),
            None => Ok(0),
        }
    }
}

impl Drop for LoopbackDriver {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(join_handle) = self.join_handle.take() {
            join_handle.abort();
        }
    }
}

async fn acknowledge(manager: &ActivityManager, host_event: HostEvent) {
    match host_event {
        HostEvent::Attach(handle) | HostEvent::Resume(handle) => {
            manager.activity_resumed(handle.token).await;
            manager.activity_idle(handle.token).await;
        }
        HostEvent::Pause(handle) => manager.activity_paused(handle.token).await,
        HostEvent::Stop(handle) => {
            let saved = serde_json::json!({ "component": handle.component.to_string() });
            manager.activity_stopped(handle.token, Some(saved)).await;
        }
        HostEvent::Destroy(handle) => manager.activity_destroyed(handle.token).await,
        HostEvent::Show(handle) => {
            manager.windows_visible(handle.token).await;
        }
        HostEvent::Hide(handle) => manager.windows_gone(handle.token).await,
        HostEvent::Results(handle, results) => {
            event!(Level::DEBUG, token = %handle.token, count = results.len(), "results delivered");
        }
        HostEvent::NewIntents(handle, intents) => {
            event!(Level::DEBUG, token = %handle.token, count = intents.len(), "new intents delivered");
        }
        HostEvent::PauseKeys(_) | HostEvent::ResumeKeys(_) => {}
        HostEvent::NotResponding(report) => {
            event!(Level::WARN, culprit = %report.culprit, process = %report.process_name, "host notified of unresponsive activity");
        }
    }
}
