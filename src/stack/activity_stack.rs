// ============================================================================
// Activity Stack
// ============================================================================
//
// Owns every record of one stack, the tasks they live in (recency order,
// frontmost last) and the pointers to the resumed / pausing / resuming
// records. All methods assume the manager lock is held: `&mut self` is the
// lock.
//
// Transition handlers live in `transitions.rs`, the stop sweep, visibility
// callbacks and deferred messages in `sweep.rs`.
//
// ============================================================================

use super::{MessageQueue, StackSnapshot, StackStats, TaskRecord, TaskSnapshot};
use crate::core::{ActivityToken, Intent, LaunchMode, StackId, TaskId, flags};
use crate::host::Collaborators;
use crate::manager::ManagerConfig;
use crate::record::{
    ActivityRecord, ActivitySnapshot, ActivityState, Delivery, PendingResult, RESULT_CANCELED,
};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct ActivityStack {
    pub(super) id: StackId,
    pub(super) records: HashMap<ActivityToken, ActivityRecord>,
    /// Recency order: the last task is in front.
    pub(super) tasks: Vec<TaskRecord>,
    pub(super) next_task_id: u32,
    pub(super) resumed: Option<ActivityToken>,
    pub(super) pausing: Option<ActivityToken>,
    /// Record whose resume has been requested from its host but not acknowledged.
    pub(super) resuming: Option<ActivityToken>,
    pub(super) waiting_visible: Vec<ActivityToken>,
    /// Paused records waiting to be stopped, least recently used first.
    pub(super) stopping: Vec<ActivityToken>,
    /// Finishing records with no host to destroy them; reaped on the next idle sweep.
    pub(super) finishing: Vec<ActivityToken>,
    pub(super) initial_start_time: Option<Instant>,
    pub(super) messages: MessageQueue,
    pub(super) launches_reported: u64,
    pub(super) report_launch_times: bool,
}

impl ActivityStack {
    pub fn new(id: StackId, config: &ManagerConfig) -> Self {
        Self {
            id,
            records: HashMap::new(),
            tasks: Vec::new(),
            next_task_id: 1,
            resumed: None,
            pausing: None,
            resuming: None,
            waiting_visible: Vec::new(),
            stopping: Vec::new(),
            finishing: Vec::new(),
            initial_start_time: None,
            messages: MessageQueue::new(config.max_pending_messages),
            launches_reported: 0,
            report_launch_times: config.report_launch_times,
        }
    }

    pub fn id(&self) -> StackId {
        self.id
    }

    pub fn record(&self, token: ActivityToken) -> Option<&ActivityRecord> {
        self.records.get(&token)
    }

    pub fn resumed_activity(&self) -> Option<ActivityToken> {
        self.resumed
    }

    pub fn pausing_activity(&self) -> Option<ActivityToken> {
        self.pausing
    }

    pub fn resuming_activity(&self) -> Option<ActivityToken> {
        self.resuming
    }

    pub fn waiting_visible_activities(&self) -> &[ActivityToken] {
        &self.waiting_visible
    }

    pub fn stopping_activities(&self) -> &[ActivityToken] {
        &self.stopping
    }

    pub fn tasks(&self) -> &[TaskRecord] {
        &self.tasks
    }

    pub fn pending_messages(&self) -> usize {
        self.messages.len()
    }

    /// Number of records currently RESUMED. Never more than one.
    pub fn resumed_count(&self) -> usize {
        self.records
            .values()
            .filter(|r| r.state() == ActivityState::Resumed)
            .count()
    }

    /// Frontmost record that is not finishing.
    pub fn top_running_activity(&self) -> Option<ActivityToken> {
        self.tasks.iter().rev().find_map(|task| {
            task.activities()
                .iter()
                .rev()
                .copied()
                .find(|t| self.records.get(t).is_some_and(|r| !r.finishing()))
        })
    }

    pub(super) fn set_state_locked(&mut self, token: ActivityToken, next: ActivityState) -> bool {
        let Some(record) = self.records.get_mut(&token) else {
            return false;
        };
        match record.transition(next) {
            Ok(prev) => {
                debug!(
                    token = %token,
                    component = record.short_component_name(),
                    from = %prev,
                    to = %next,
                    "activity state change"
                );
                debug_assert!(self.resumed_count() <= 1, "more than one resumed activity");
                true
            }
            Err(err) => {
                warn!(error = %err, "ignoring illegal activity transition");
                false
            }
        }
    }

    pub(super) fn host_attached(&self, token: ActivityToken, hosts: &Collaborators) -> bool {
        self.records
            .get(&token)
            .and_then(|r| r.app())
            .is_some_and(|process| hosts.process.is_attached(process))
    }

    // ------------------------------------------------------------------------
    // Launch and task placement
    // ------------------------------------------------------------------------

    /// Insert a freshly built record, or hand its intent to an instance the
    /// launch mode says to reuse. Returns the record that now serves the launch.
    pub fn start_activity_locked(
        &mut self,
        record: ActivityRecord,
        hosts: &Collaborators,
    ) -> ActivityToken {
        if let Some(existing) = self.find_reusable_locked(&record) {
            self.reuse_activity_locked(existing, record, hosts);
            return existing;
        }

        let token = record.token();
        let task_id = self.select_task_locked(&record);
        info!(
            token = %token,
            component = record.short_component_name(),
            task = %task_id,
            home = record.is_home_activity(),
            "starting activity"
        );

        self.records.insert(token, record);
        self.add_to_task_locked(task_id, token);
        self.set_state_locked(token, ActivityState::Launching);
        self.resume_top_activity_locked(hosts);
        token
    }

    fn find_reusable_locked(&self, record: &ActivityRecord) -> Option<ActivityToken> {
        let real = record.real_activity();
        match record.launch_mode() {
            LaunchMode::SingleInstance => self.tasks.iter().rev().find_map(|task| {
                task.root()
                    .filter(|root| self.is_live_instance_of(*root, record))
            }),
            LaunchMode::SingleTask => {
                let task_id = self.find_task_by_affinity(record.task_affinity())?;
                let task = self.task(task_id)?;
                task.activities()
                    .iter()
                    .copied()
                    .find(|t| self.is_live_instance_of(*t, record))
            }
            mode => {
                let single_top =
                    mode == LaunchMode::SingleTop || record.intent().has_flag(flags::SINGLE_TOP);
                if !single_top {
                    return None;
                }
                let top = self.top_running_activity()?;
                let top_record = self.records.get(&top)?;
                (top_record.real_activity() == real).then_some(top)
            }
        }
    }

    fn is_live_instance_of(&self, token: ActivityToken, record: &ActivityRecord) -> bool {
        self.records
            .get(&token)
            .is_some_and(|r| !r.finishing() && r.real_activity() == record.real_activity())
    }

    fn reuse_activity_locked(
        &mut self,
        existing: ActivityToken,
        request: ActivityRecord,
        hosts: &Collaborators,
    ) {
        info!(
            token = %existing,
            component = request.short_component_name(),
            mode = ?request.launch_mode(),
            "reusing existing activity"
        );

        if request.launch_mode() == LaunchMode::SingleTask {
            let above = self
                .records
                .get(&existing)
                .and_then(|r| r.task())
                .and_then(|id| self.task(id))
                .map(|task| task.above(existing))
                .unwrap_or_default();
            for token in above {
                self.finish_activity_inner(token, None, hosts);
            }
        }

        // The reused instance cannot answer a result request made for the new launch.
        if let Some(dest) = request.result_to() {
            let result = PendingResult::new(
                None,
                request.result_who().map(str::to_string),
                request.request_code(),
                RESULT_CANCELED,
                None,
            );
            self.deliver_results_locked(dest, vec![result], hosts);
        }

        if let Some(task_id) = self.records.get(&existing).and_then(|r| r.task()) {
            self.move_task_to_front_locked(task_id);
        }
        self.add_new_intent_locked(existing, request.intent().clone(), hosts);
        self.resume_top_activity_locked(hosts);
    }

    fn select_task_locked(&mut self, record: &ActivityRecord) -> TaskId {
        let affinity = record.task_affinity();
        let reuse_affinity = match record.launch_mode() {
            LaunchMode::SingleInstance => None,
            LaunchMode::SingleTask => self.find_task_by_affinity(affinity),
            LaunchMode::Multiple | LaunchMode::SingleTop => {
                if record.intent().has_flag(flags::NEW_TASK) {
                    self.find_task_by_affinity(affinity)
                } else {
                    self.source_task(record)
                        .or_else(|| self.find_task_by_affinity(affinity))
                }
            }
        };
        match reuse_affinity {
            Some(task_id) => task_id,
            None => self.create_task_locked(affinity.map(str::to_string)),
        }
    }

    /// Task of whoever launched `record`: the result target, else the front record.
    fn source_task(&self, record: &ActivityRecord) -> Option<TaskId> {
        let source = record
            .result_to()
            .filter(|t| self.records.get(t).is_some_and(|r| r.in_history()))
            .or_else(|| self.top_running_activity())?;
        let source = self.records.get(&source)?;
        if source.launch_mode() == LaunchMode::SingleInstance {
            return None;
        }
        source.task()
    }

    fn find_task_by_affinity(&self, affinity: Option<&str>) -> Option<TaskId> {
        let affinity = affinity?;
        self.tasks
            .iter()
            .rev()
            .filter(|task| task.affinity() == Some(affinity))
            .find(|task| {
                task.root()
                    .and_then(|root| self.records.get(&root))
                    .is_some_and(|r| r.launch_mode() != LaunchMode::SingleInstance)
            })
            .map(|task| task.id())
    }

    pub(super) fn task(&self, id: TaskId) -> Option<&TaskRecord> {
        self.tasks.iter().find(|t| t.id() == id)
    }

    fn create_task_locked(&mut self, affinity: Option<String>) -> TaskId {
        let id = TaskId(self.next_task_id);
        self.next_task_id += 1;
        self.tasks.push(TaskRecord::new(id, affinity));
        id
    }

    fn add_to_task_locked(&mut self, task_id: TaskId, token: ActivityToken) {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id() == task_id) else {
            return;
        };
        let became_root = task.push(token);
        if let Some(record) = self.records.get_mut(&token) {
            record.task = Some(task_id);
            record.in_history = true;
            record.front_of_task = became_root;
            if became_root {
                task.set_excluded_from_recents(
                    record.intent().has_flag(flags::EXCLUDE_FROM_RECENTS),
                );
            }
        }
        self.move_task_to_front_locked(task_id);
    }

    pub(super) fn move_task_to_front_locked(&mut self, task_id: TaskId) {
        if let Some(index) = self.tasks.iter().position(|t| t.id() == task_id) {
            let task = self.tasks.remove(index);
            self.tasks.push(task);
        }
    }

    /// Take a record out of its task; an emptied task is dropped and a new
    /// root is marked front-of-task.
    pub(super) fn remove_from_history_locked(&mut self, token: ActivityToken) {
        let Some(record) = self.records.get_mut(&token) else {
            return;
        };
        let Some(task_id) = record.task.take() else {
            return;
        };
        record.in_history = false;
        record.front_of_task = false;

        let Some(index) = self.tasks.iter().position(|t| t.id() == task_id) else {
            return;
        };
        self.tasks[index].remove(token);
        match self.tasks[index].root() {
            Some(root) => {
                if let Some(root_record) = self.records.get_mut(&root) {
                    root_record.front_of_task = true;
                }
            }
            None => {
                self.tasks.remove(index);
                debug!(task = %task_id, "task emptied and removed");
            }
        }
    }

    // ------------------------------------------------------------------------
    // Results and new intents
    // ------------------------------------------------------------------------

    /// Hand results to `dest`: straight to its host when it is resumed,
    /// otherwise queued until its next resume.
    pub fn deliver_results_locked(
        &mut self,
        dest: ActivityToken,
        results: Vec<PendingResult>,
        hosts: &Collaborators,
    ) -> Delivery {
        let attached = self.host_attached(dest, hosts);
        let Some(record) = self.records.get_mut(&dest) else {
            warn!(dest = %dest, count = results.len(), "dropping results for unknown activity");
            return Delivery::Dropped;
        };
        if record.state().is_terminal() {
            warn!(dest = %dest, count = results.len(), "dropping results for destroyed activity");
            return Delivery::Dropped;
        }
        if record.state() == ActivityState::Resumed && attached {
            hosts.process.deliver_results(&record.handle(), results);
            return Delivery::Delivered;
        }
        for r in results {
            record.add_result_locked(r.from, r.result_who, r.request_code, r.result_code, r.data);
        }
        Delivery::Deferred
    }

    pub fn remove_results_locked(
        &mut self,
        dest: ActivityToken,
        from: Option<ActivityToken>,
        result_who: Option<&str>,
        request_code: i32,
    ) -> usize {
        self.records
            .get_mut(&dest)
            .map(|r| r.remove_results_locked(from, result_who, request_code))
            .unwrap_or(0)
    }

    pub fn add_new_intent_locked(
        &mut self,
        token: ActivityToken,
        intent: Intent,
        hosts: &Collaborators,
    ) -> Delivery {
        let attached = self.host_attached(token, hosts);
        let Some(record) = self.records.get_mut(&token) else {
            warn!(token = %token, "dropping new intent for unknown activity");
            return Delivery::Dropped;
        };
        if record.finishing() {
            warn!(token = %token, "dropping new intent for finishing activity");
            return Delivery::Dropped;
        }
        if record.state() == ActivityState::Resumed && attached {
            hosts.process.deliver_new_intents(&record.handle(), vec![intent]);
            return Delivery::Delivered;
        }
        record.add_new_intent_locked(intent);
        Delivery::Deferred
    }

    // ------------------------------------------------------------------------
    // Key dispatch
    // ------------------------------------------------------------------------

    pub fn pause_key_dispatching_locked(
        &mut self,
        token: ActivityToken,
        hosts: &Collaborators,
    ) -> bool {
        let Some(record) = self.records.get_mut(&token) else {
            return false;
        };
        let flipped = record.pause_key_dispatching_locked();
        if flipped {
            hosts.window.pause_key_dispatching(&record.handle());
        }
        flipped
    }

    pub fn resume_key_dispatching_locked(
        &mut self,
        token: ActivityToken,
        hosts: &Collaborators,
    ) -> bool {
        let Some(record) = self.records.get_mut(&token) else {
            return false;
        };
        let flipped = record.resume_key_dispatching_locked();
        if flipped {
            hosts.window.resume_key_dispatching(&record.handle());
        }
        flipped
    }

    // ------------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------------

    pub fn task_snapshots(&self) -> Vec<TaskSnapshot> {
        self.tasks
            .iter()
            .rev()
            .map(|task| TaskSnapshot {
                id: task.id(),
                affinity: task.affinity().map(str::to_string),
                excluded_from_recents: task.excluded_from_recents(),
                activities: task
                    .activities()
                    .iter()
                    .filter_map(|t| self.records.get(t))
                    .map(ActivityRecord::snapshot)
                    .collect(),
            })
            .collect()
    }

    pub fn recent_tasks(&self) -> Vec<TaskSnapshot> {
        self.task_snapshots()
            .into_iter()
            .filter(|task| !task.excluded_from_recents)
            .collect()
    }

    pub fn activity_snapshot(&self, token: ActivityToken) -> Option<ActivitySnapshot> {
        self.records.get(&token).map(ActivityRecord::snapshot)
    }

    pub fn stats(&self) -> StackStats {
        StackStats {
            stack: self.id,
            tasks: self.tasks.len(),
            activities: self.records.len(),
            resumed: self.resumed,
            pausing: self.pausing,
            waiting_visible: self.waiting_visible.len(),
            stopping: self.stopping.len(),
            finishing: self.finishing.len(),
            pending_messages: self.messages.len(),
            coalesced_messages: self.messages.coalesced(),
            launches_reported: self.launches_reported,
        }
    }

    pub fn snapshot(&self) -> StackSnapshot {
        StackSnapshot {
            stack: self.id,
            resumed: self.resumed,
            pausing: self.pausing,
            tasks: self.task_snapshots(),
            stats: self.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ActivityInfo, ApplicationInfo, ComponentName, Result};
    use crate::host::{ProcessHost, WindowHost};
    use crate::record::{ActivityHandle, LaunchRequest};
    use std::sync::Arc;

    /// Accepts every launch but never reports a process as attached.
    struct DetachedHost;

    impl ProcessHost for DetachedHost {
        fn attach(&self, _activity: &ActivityHandle) -> Result<()> {
            Ok(())
        }
        fn is_attached(&self, _process_name: &str) -> bool {
            false
        }
        fn schedule_resume(&self, _activity: &ActivityHandle) {}
        fn schedule_pause(&self, _activity: &ActivityHandle) {}
        fn schedule_stop(&self, _activity: &ActivityHandle) {}
        fn schedule_destroy(&self, _activity: &ActivityHandle) {}
        fn deliver_results(&self, _activity: &ActivityHandle, _results: Vec<PendingResult>) {}
        fn deliver_new_intents(&self, _activity: &ActivityHandle, _intents: Vec<Intent>) {}
    }

    impl WindowHost for DetachedHost {
        fn show(&self, _activity: &ActivityHandle) {}
        fn hide(&self, _activity: &ActivityHandle) {}
        fn pause_key_dispatching(&self, _activity: &ActivityHandle) {}
        fn resume_key_dispatching(&self, _activity: &ActivityHandle) {}
    }

    fn hosts() -> Collaborators {
        let host = Arc::new(DetachedHost);
        Collaborators::new(host.clone(), host)
    }

    fn record(stack: &ActivityStack, class: &str) -> ActivityRecord {
        let info = ActivityInfo::new(ApplicationInfo::new("com.example", 10_001), class);
        let intent = Intent::new().component(ComponentName::new("com.example", class));
        ActivityRecord::new(stack.id(), LaunchRequest::new(intent, info), &[])
    }

    #[test]
    fn test_pause_completes_without_host() {
        let hosts = hosts();
        let mut stack = ActivityStack::new(StackId::MAIN, &ManagerConfig::default());

        let a = stack.start_activity_locked(record(&stack, ".A"), &hosts);
        assert_eq!(stack.resuming_activity(), Some(a));
        stack.activity_resumed_locked(a, &hosts);
        assert_eq!(stack.resumed_activity(), Some(a));

        let b = stack.start_activity_locked(record(&stack, ".B"), &hosts);
        assert_eq!(stack.record(a).unwrap().state(), ActivityState::Paused);
        assert_eq!(stack.stopping_activities(), &[a]);
        assert_eq!(stack.waiting_visible_activities(), &[a]);
        assert_eq!(stack.resuming_activity(), Some(b));
        assert_eq!(stack.pausing_activity(), None);
        assert_eq!(stack.top_running_activity(), Some(b));
    }

    #[test]
    fn test_finished_records_parked_until_idle() {
        let hosts = hosts();
        let mut stack = ActivityStack::new(StackId::MAIN, &ManagerConfig::default());

        let a = stack.start_activity_locked(record(&stack, ".A"), &hosts);
        stack.activity_resumed_locked(a, &hosts);
        assert!(stack.finish_activity_locked(a, None, &hosts));
        assert!(!stack.finish_activity_locked(a, None, &hosts));
        assert_eq!(stack.stats().finishing, 1);
        assert!(stack.tasks().is_empty());

        stack.activity_idle_locked(a, &hosts);
        assert!(stack.record(a).is_none());
        assert_eq!(stack.resumed_count(), 0);
    }

    #[test]
    fn test_tasks_are_reused_by_source() {
        let hosts = hosts();
        let mut stack = ActivityStack::new(StackId::MAIN, &ManagerConfig::default());

        let a = stack.start_activity_locked(record(&stack, ".A"), &hosts);
        let b = stack.start_activity_locked(record(&stack, ".B"), &hosts);

        assert_eq!(stack.tasks().len(), 1);
        assert_eq!(stack.tasks()[0].activities(), &[a, b]);
        assert!(stack.record(a).unwrap().front_of_task());
        assert_eq!(stack.task_snapshots()[0].id, TaskId(1));
    }
}
