use super::{ActivityState, PendingResult, WindowFacet};
use crate::core::intent::{ACTION_MAIN, CATEGORY_HOME, flags};
use crate::core::{
    ActivityInfo, ActivityToken, ComponentName, Intent, LaunchMode, LifecycleError, Result,
    StackId, TaskId, ThemeKind,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Identity of the process that asked for a launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerInfo {
    pub uid: u32,
    pub process_name: String,
}

impl CallerInfo {
    pub fn new(uid: u32, process_name: &str) -> Self {
        Self {
            uid,
            process_name: process_name.to_string(),
        }
    }
}

/// A resolved launch request.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub intent: Intent,
    pub info: ActivityInfo,
    pub caller: Option<CallerInfo>,
    pub result_to: Option<ActivityToken>,
    pub result_who: Option<String>,
    pub request_code: i32,
    pub component_specified: bool,
}

impl LaunchRequest {
    pub fn new(intent: Intent, info: ActivityInfo) -> Self {
        Self {
            intent,
            info,
            caller: None,
            result_to: None,
            result_who: None,
            request_code: -1,
            component_specified: false,
        }
    }

    pub fn caller(mut self, caller: CallerInfo) -> Self {
        self.caller = Some(caller);
        self
    }

    /// Ask for a result to be returned to `result_to` when the launched record finishes.
    pub fn for_result(
        mut self,
        result_to: ActivityToken,
        result_who: Option<&str>,
        request_code: i32,
    ) -> Self {
        self.result_to = Some(result_to);
        self.result_who = result_who.map(str::to_string);
        self.request_code = request_code;
        self
    }

    pub fn component_specified(mut self, specified: bool) -> Self {
        self.component_specified = specified;
        self
    }
}

/// Addressable handle given to collaborators.
///
/// Carries only what a host needs to route a notification; lifecycle state
/// stays inside the stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActivityHandle {
    pub token: ActivityToken,
    pub process_name: String,
    pub component: ComponentName,
}

/// Launch duration reported the first time the window is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchTiming {
    pub this_ms: u64,
    pub total_ms: u64,
}

/// An entry in the history stack, representing one activity instance.
#[derive(Debug)]
pub struct ActivityRecord {
    token: ActivityToken,
    stack_id: StackId,
    info: ActivityInfo,
    launched_from_uid: u32,
    intent: Intent,
    real_activity: ComponentName,
    short_component_name: String,
    package_name: String,
    process_name: String,
    task_affinity: Option<String>,
    launch_mode: LaunchMode,
    state_not_needed: bool,
    fullscreen: bool,
    component_specified: bool,
    is_home_activity: bool,
    base_dir: String,
    res_dir: String,
    data_dir: String,
    label: Option<String>,
    label_res: u32,
    result_who: Option<String>,
    request_code: i32,
    created_at: DateTime<Utc>,

    pub(crate) result_to: Option<ActivityToken>,
    pub(crate) state: ActivityState,
    pub(crate) task: Option<TaskId>,
    pub(crate) window: WindowFacet,
    pub(crate) waiting_visible: bool,
    pub(crate) idle: bool,
    pub(crate) launch_failed: bool,
    pub(crate) have_state: bool,
    pub(crate) saved_state: Option<serde_json::Value>,
    pub(crate) results: Vec<PendingResult>,
    pub(crate) new_intents: Vec<Intent>,
    /// Process the record has been attached to, once a host accepted it.
    pub(crate) app: Option<String>,
    pub(crate) launch_time: Option<Instant>,
    pub(crate) start_time: Option<Instant>,
    pub(crate) launch_timing: Option<LaunchTiming>,
    pub(crate) front_of_task: bool,
    pub(crate) in_history: bool,
    pub(crate) keys_paused: bool,
}

impl ActivityRecord {
    /// Build a record in INITIALIZING from a resolved request.
    ///
    /// `resolver_components` lists package or class names that identify the
    /// platform's disambiguation activity; such a component is never home.
    pub fn new(stack_id: StackId, request: LaunchRequest, resolver_components: &[String]) -> Self {
        let LaunchRequest {
            mut intent,
            mut info,
            caller,
            result_to,
            result_who,
            request_code,
            component_specified,
        } = request;

        let launched_from_uid = caller.as_ref().map(|c| c.uid).unwrap_or(0);
        let intent_component = intent
            .component
            .clone()
            .unwrap_or_else(|| ComponentName::new(&info.package_name, &info.name));
        intent.component = Some(intent_component.clone());

        let real_activity = match &info.target_activity {
            Some(target) if !info.launch_mode.ignores_alias() => {
                ComponentName::new(&info.package_name, target)
            }
            _ => intent_component.clone(),
        };

        let process_name = match &caller {
            Some(caller) if info.flags.multiprocess && info.application.uid == caller.uid => {
                caller.process_name.clone()
            }
            _ => info
                .process_name
                .get_or_insert_with(|| info.package_name.clone())
                .clone(),
        };

        if info.flags.exclude_from_recents {
            intent.flags |= flags::EXCLUDE_FROM_RECENTS;
        }

        let (label, label_res) = if info.label.is_none() && info.label_res == 0 {
            (info.application.label.clone(), info.application.label_res)
        } else {
            (info.label.clone(), info.label_res)
        };

        let is_home_activity = (!component_specified || launched_from_uid == 0)
            && looks_like_home(&intent)
            && !is_resolver(&real_activity, resolver_components);

        Self {
            token: ActivityToken::new(),
            stack_id,
            launched_from_uid,
            short_component_name: intent_component.flatten_to_short_string(),
            real_activity,
            package_name: info.application.package_name.clone(),
            process_name,
            task_affinity: info.task_affinity.clone(),
            launch_mode: info.launch_mode,
            state_not_needed: info.flags.state_not_needed,
            fullscreen: info.theme != ThemeKind::Dialog,
            component_specified,
            is_home_activity,
            base_dir: info.application.source_dir.clone(),
            res_dir: info.application.public_source_dir.clone(),
            data_dir: info.application.data_dir.clone(),
            label,
            label_res,
            result_who,
            request_code,
            created_at: Utc::now(),
            info,
            intent,
            result_to,
            state: ActivityState::Initializing,
            task: None,
            window: WindowFacet::Requested,
            waiting_visible: false,
            idle: false,
            launch_failed: false,
            have_state: false,
            saved_state: None,
            results: Vec::new(),
            new_intents: Vec::new(),
            app: None,
            launch_time: None,
            start_time: None,
            launch_timing: None,
            front_of_task: false,
            in_history: false,
            keys_paused: false,
        }
    }

    pub fn token(&self) -> ActivityToken {
        self.token
    }

    pub fn stack_id(&self) -> StackId {
        self.stack_id
    }

    pub fn info(&self) -> &ActivityInfo {
        &self.info
    }

    pub fn intent(&self) -> &Intent {
        &self.intent
    }

    pub fn launched_from_uid(&self) -> u32 {
        self.launched_from_uid
    }

    pub fn real_activity(&self) -> &ComponentName {
        &self.real_activity
    }

    pub fn short_component_name(&self) -> &str {
        &self.short_component_name
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    pub fn task_affinity(&self) -> Option<&str> {
        self.task_affinity.as_deref()
    }

    pub fn launch_mode(&self) -> LaunchMode {
        self.launch_mode
    }

    pub fn state_not_needed(&self) -> bool {
        self.state_not_needed
    }

    pub fn fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn component_specified(&self) -> bool {
        self.component_specified
    }

    pub fn is_home_activity(&self) -> bool {
        self.is_home_activity
    }

    pub fn base_dir(&self) -> &str {
        &self.base_dir
    }

    pub fn res_dir(&self) -> &str {
        &self.res_dir
    }

    pub fn data_dir(&self) -> &str {
        &self.data_dir
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn label_res(&self) -> u32 {
        self.label_res
    }

    pub fn result_to(&self) -> Option<ActivityToken> {
        self.result_to
    }

    pub fn result_who(&self) -> Option<&str> {
        self.result_who.as_deref()
    }

    pub fn request_code(&self) -> i32 {
        self.request_code
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn state(&self) -> ActivityState {
        self.state
    }

    pub fn task(&self) -> Option<TaskId> {
        self.task
    }

    pub fn window(&self) -> WindowFacet {
        self.window
    }

    pub fn visible(&self) -> bool {
        self.window.is_requested()
    }

    pub fn now_visible(&self) -> bool {
        self.window.is_drawn()
    }

    pub fn waiting_visible(&self) -> bool {
        self.waiting_visible
    }

    pub fn idle(&self) -> bool {
        self.idle
    }

    pub fn stopped(&self) -> bool {
        self.state == ActivityState::Stopped
    }

    pub fn finishing(&self) -> bool {
        self.state.is_finishing()
    }

    pub fn launch_failed(&self) -> bool {
        self.launch_failed
    }

    pub fn have_state(&self) -> bool {
        self.have_state
    }

    pub fn saved_state(&self) -> Option<&serde_json::Value> {
        self.saved_state.as_ref()
    }

    pub fn pending_results(&self) -> &[PendingResult] {
        &self.results
    }

    pub fn pending_new_intents(&self) -> &[Intent] {
        &self.new_intents
    }

    pub fn app(&self) -> Option<&str> {
        self.app.as_deref()
    }

    pub fn launch_timing(&self) -> Option<LaunchTiming> {
        self.launch_timing
    }

    pub fn front_of_task(&self) -> bool {
        self.front_of_task
    }

    pub fn in_history(&self) -> bool {
        self.in_history
    }

    pub fn keys_paused(&self) -> bool {
        self.keys_paused
    }

    pub fn handle(&self) -> ActivityHandle {
        ActivityHandle {
            token: self.token,
            process_name: self.process_name.clone(),
            component: self.real_activity.clone(),
        }
    }

    /// Move to `next`, returning the previous state.
    ///
    /// # Errors
    /// Returns `InvalidTransition` if the edge is not part of the lifecycle.
    pub fn transition(&mut self, next: ActivityState) -> Result<ActivityState> {
        if !self.state.can_transition_to(next) {
            return Err(LifecycleError::InvalidTransition {
                token: self.token,
                from: self.state,
                to: next,
            });
        }
        let prev = self.state;
        self.state = next;
        Ok(prev)
    }

    pub fn add_result_locked(
        &mut self,
        from: Option<ActivityToken>,
        result_who: Option<String>,
        request_code: i32,
        result_code: i32,
        data: Option<Intent>,
    ) {
        self.results.push(PendingResult::new(
            from,
            result_who,
            request_code,
            result_code,
            data,
        ));
    }

    /// Remove every pending result matching the key; returns how many went.
    pub fn remove_results_locked(
        &mut self,
        from: Option<ActivityToken>,
        result_who: Option<&str>,
        request_code: i32,
    ) -> usize {
        let before = self.results.len();
        self.results
            .retain(|r| !r.matches(from, result_who, request_code));
        before - self.results.len()
    }

    pub fn add_new_intent_locked(&mut self, intent: Intent) {
        self.new_intents.push(intent);
    }

    pub(crate) fn take_results(&mut self) -> Vec<PendingResult> {
        std::mem::take(&mut self.results)
    }

    pub(crate) fn take_new_intents(&mut self) -> Vec<Intent> {
        std::mem::take(&mut self.new_intents)
    }

    /// Returns true if this call flipped the guard.
    pub fn pause_key_dispatching_locked(&mut self) -> bool {
        if self.keys_paused {
            return false;
        }
        self.keys_paused = true;
        true
    }

    /// Returns true if this call flipped the guard.
    pub fn resume_key_dispatching_locked(&mut self) -> bool {
        if !self.keys_paused {
            return false;
        }
        self.keys_paused = false;
        true
    }

    /// Visible, becoming visible, pausing or resumed.
    pub fn is_interesting_to_user_locked(&self) -> bool {
        self.visible()
            || self.now_visible()
            || matches!(self.state, ActivityState::Pausing | ActivityState::Resumed)
    }

    /// Record the first draw after a launch. Returns None once already reported.
    pub(crate) fn take_launch_timing(
        &mut self,
        now: Instant,
        initial_start: Option<Instant>,
    ) -> Option<LaunchTiming> {
        let launched = self.launch_time.take()?;
        let this_time = now.saturating_duration_since(launched);
        let total_time = initial_start
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or(this_time);
        let timing = LaunchTiming {
            this_ms: as_millis(this_time),
            total_ms: as_millis(total_time),
        };
        self.launch_timing = Some(timing);
        Some(timing)
    }

    pub fn snapshot(&self) -> ActivitySnapshot {
        ActivitySnapshot {
            token: self.token,
            component: self.short_component_name.clone(),
            process_name: self.process_name.clone(),
            state: self.state,
            task: self.task,
            window: self.window,
            visible: self.visible(),
            now_visible: self.now_visible(),
            waiting_visible: self.waiting_visible,
            idle: self.idle,
            stopped: self.stopped(),
            finishing: self.finishing(),
            launch_failed: self.launch_failed,
            have_state: self.have_state,
            front_of_task: self.front_of_task,
            in_history: self.in_history,
            keys_paused: self.keys_paused,
            is_home_activity: self.is_home_activity,
            pending_results: self.results.len(),
            pending_new_intents: self.new_intents.len(),
            launch_timing: self.launch_timing,
            created_at: self.created_at,
        }
    }
}

impl std::fmt::Display for ActivityRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HistoryRecord{{{} {}}}", self.package_name, self.short_component_name)
    }
}

/// Point-in-time copy of a record, safe to hand out of the lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySnapshot {
    pub token: ActivityToken,
    pub component: String,
    pub process_name: String,
    pub state: ActivityState,
    pub task: Option<TaskId>,
    pub window: WindowFacet,
    pub visible: bool,
    pub now_visible: bool,
    pub waiting_visible: bool,
    pub idle: bool,
    pub stopped: bool,
    pub finishing: bool,
    pub launch_failed: bool,
    pub have_state: bool,
    pub front_of_task: bool,
    pub in_history: bool,
    pub keys_paused: bool,
    pub is_home_activity: bool,
    pub pending_results: usize,
    pub pending_new_intents: usize,
    pub launch_timing: Option<LaunchTiming>,
    pub created_at: DateTime<Utc>,
}

fn looks_like_home(intent: &Intent) -> bool {
    intent.action.as_deref() == Some(ACTION_MAIN)
        && intent.has_category(CATEGORY_HOME)
        && intent.categories.len() == 1
        && intent.data.is_none()
        && intent.mime_type.is_none()
        && intent.has_flag(flags::NEW_TASK)
}

fn is_resolver(component: &ComponentName, resolver_components: &[String]) -> bool {
    resolver_components
        .iter()
        .any(|r| *r == component.package || *r == component.class)
}

fn as_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
