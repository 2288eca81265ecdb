#![allow(dead_code)]

use activity_stack::{
    ActivityHandle, ActivityInfo, ActivityManager, ActivityToken, ApplicationInfo, ComponentName,
    Intent, LaunchRequest, LifecycleError, ManagerConfig, PendingResult, ProcessHost, Result,
    UnresponsiveReport, WindowHost,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Every notification the stack sent, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Attach(ActivityToken),
    Resume(ActivityToken),
    Pause(ActivityToken),
    Stop(ActivityToken),
    Destroy(ActivityToken),
    Results(ActivityToken, Vec<PendingResult>),
    NewIntents(ActivityToken, Vec<Intent>),
    Show(ActivityToken),
    Hide(ActivityToken),
    PauseKeys(ActivityToken),
    ResumeKeys(ActivityToken),
    NotResponding(UnresponsiveReport),
}

/// Host that records notifications and never acknowledges on its own;
/// tests drive the acknowledgements by hand.
#[derive(Default)]
pub struct RecordingHost {
    calls: Mutex<Vec<Call>>,
    attached: Mutex<HashSet<String>>,
    failing: Mutex<HashSet<String>>,
    debugging: Mutex<HashSet<String>>,
    instrumented: Mutex<HashSet<String>>,
}

impl RecordingHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn fail_process(&self, process: &str) {
        self.failing.lock().unwrap().insert(process.to_string());
    }

    pub fn detach(&self, process: &str) {
        self.attached.lock().unwrap().remove(process);
    }

    pub fn set_debugging(&self, process: &str) {
        self.debugging.lock().unwrap().insert(process.to_string());
    }

    pub fn set_instrumented(&self, process: &str) {
        self.instrumented.lock().unwrap().insert(process.to_string());
    }

    fn push(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl ProcessHost for RecordingHost {
    fn attach(&self, activity: &ActivityHandle) -> Result<()> {
        if self.failing.lock().unwrap().contains(&activity.process_name) {
            return Err(LifecycleError::HostUnavailable(activity.process_name.clone()));
        }
        self.attached
            .lock()
            .unwrap()
            .insert(activity.process_name.clone());
        self.push(Call::Attach(activity.token));
        Ok(())
    }

    fn is_attached(&self, process_name: &str) -> bool {
        self.attached.lock().unwrap().contains(process_name)
    }

    fn schedule_resume(&self, activity: &ActivityHandle) {
        self.push(Call::Resume(activity.token));
    }

    fn schedule_pause(&self, activity: &ActivityHandle) {
        self.push(Call::Pause(activity.token));
    }

    fn schedule_stop(&self, activity: &ActivityHandle) {
        self.push(Call::Stop(activity.token));
    }

    fn schedule_destroy(&self, activity: &ActivityHandle) {
        self.push(Call::Destroy(activity.token));
    }

    fn deliver_results(&self, activity: &ActivityHandle, results: Vec<PendingResult>) {
        self.push(Call::Results(activity.token, results));
    }

    fn deliver_new_intents(&self, activity: &ActivityHandle, intents: Vec<Intent>) {
        self.push(Call::NewIntents(activity.token, intents));
    }

    fn is_debugging(&self, process_name: &str) -> bool {
        self.debugging.lock().unwrap().contains(process_name)
    }

    fn is_instrumented(&self, process_name: &str) -> bool {
        self.instrumented.lock().unwrap().contains(process_name)
    }

    fn app_not_responding(&self, report: &UnresponsiveReport) {
        self.push(Call::NotResponding(report.clone()));
    }
}

impl WindowHost for RecordingHost {
    fn show(&self, activity: &ActivityHandle) {
        self.push(Call::Show(activity.token));
    }

    fn hide(&self, activity: &ActivityHandle) {
        self.push(Call::Hide(activity.token));
    }

    fn pause_key_dispatching(&self, activity: &ActivityHandle) {
        self.push(Call::PauseKeys(activity.token));
    }

    fn resume_key_dispatching(&self, activity: &ActivityHandle) {
        self.push(Call::ResumeKeys(activity.token));
    }
}

pub fn manager(host: &Arc<RecordingHost>) -> ActivityManager {
    manager_with(host, ManagerConfig::default())
}

pub fn manager_with(host: &Arc<RecordingHost>, config: ManagerConfig) -> ActivityManager {
    ActivityManager::new(config, host.clone(), host.clone()).unwrap()
}

pub fn info(package: &str, class: &str) -> ActivityInfo {
    ActivityInfo::new(ApplicationInfo::new(package, 10_001), class)
}

pub fn request(package: &str, class: &str) -> LaunchRequest {
    request_with(info(package, class))
}

pub fn request_with(info: ActivityInfo) -> LaunchRequest {
    let component = ComponentName::new(&info.package_name, &info.name);
    LaunchRequest::new(Intent::new().component(component), info)
}

pub fn home_request() -> LaunchRequest {
    let info = info("com.example.launcher", ".Home");
    let component = ComponentName::new("com.example.launcher", ".Home");
    LaunchRequest::new(Intent::home().component(component), info)
}

/// Acknowledge the resume the stack is waiting on, report idle and draw the window.
pub async fn bring_up(manager: &ActivityManager, token: ActivityToken) {
    manager.activity_resumed(token).await;
    manager.activity_idle(token).await;
    manager.windows_visible(token).await;
}

/// Launch and fully bring up a record.
pub async fn launch_running(manager: &ActivityManager, request: LaunchRequest) -> ActivityToken {
    let token = manager.launch(request).await;
    bring_up(manager, token).await;
    token
}
