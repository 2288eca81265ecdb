// ============================================================================
// Lifecycle Coordinator
// ============================================================================
//
// `ActivityManager` is the only entry point. Every operation takes the one
// manager lock, runs the synchronous stack logic to completion and returns.
// Collaborator notifications happen under that lock; their
// acknowledgements come back later as separate calls.
//
// ============================================================================

use super::ManagerConfig;
use crate::core::{ActivityToken, Intent, Result, StackId};
use crate::host::{Collaborators, ProcessHost, UnresponsiveReport, WindowHost};
use crate::record::{
    ActivityRecord, ActivityResult, ActivitySnapshot, Delivery, LaunchRequest, LaunchTiming,
    PendingResult,
};
use crate::stack::{ActivityStack, StackSnapshot, StackStats, TaskSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tracing::{Level, event, info_span};

/// Lifecycle coordinator handle. Cheap to clone; clones share one stack.
#[derive(Clone)]
pub struct ActivityManager {
    stack: Arc<Mutex<ActivityStack>>,
    hosts: Collaborators,
    config: Arc<ManagerConfig>,
    wakeup: Arc<Notify>,
}

impl ActivityManager {
    /// # Errors
    /// Returns `InvalidConfig` if the configuration does not validate.
    pub fn new(
        config: ManagerConfig,
        process: Arc<dyn ProcessHost>,
        window: Arc<dyn WindowHost>,
    ) -> Result<Self> {
        config.validate()?;
        let stack = ActivityStack::new(StackId::MAIN, &config);
        event!(
            Level::INFO,
            stack = %StackId::MAIN,
            key_dispatch_timeout_ms = config.key_dispatch_timeout_ms,
            "activity manager started"
        );
        Ok(Self {
            stack: Arc::new(Mutex::new(stack)),
            hosts: Collaborators::new(process, window),
            config: Arc::new(config),
            wakeup: Arc::new(Notify::new()),
        })
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub(crate) fn stack(&self) -> Arc<Mutex<ActivityStack>> {
        Arc::clone(&self.stack)
    }

    pub(crate) fn wakeup(&self) -> Arc<Notify> {
        Arc::clone(&self.wakeup)
    }

    fn wake_if_pending(&self, stack: &ActivityStack) {
        if stack.pending_messages() > 0 {
            self.wakeup.notify_one();
        }
    }

    // ------------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------------

    /// Launch an activity. Returns the token of the record now serving the
    /// request: a new one, or an existing instance its launch mode reuses.
    ///
    /// A process that cannot be started leaves the new record FINISHING
    /// with `launch_failed` set until the next idle sweep reaps it.
    pub async fn launch(&self, request: LaunchRequest) -> ActivityToken {
        let mut stack = self.stack.lock().await;
        let record = ActivityRecord::new(stack.id(), request, &self.config.resolver_components);
        let span = info_span!(
            "manager.launch",
            token = %record.token(),
            component = record.short_component_name()
        );
        let _enter = span.enter();

        let token = stack.start_activity_locked(record, &self.hosts);
        self.wake_if_pending(&stack);
        token
    }

    /// Finish `token`. Returns false if it is unknown or already finishing.
    pub async fn finish(&self, token: ActivityToken, result: Option<ActivityResult>) -> bool {
        let mut stack = self.stack.lock().await;
        let span = info_span!("manager.finish", token = %token);
        let _enter = span.enter();

        let finished = stack.finish_activity_locked(token, result, &self.hosts);
        if !finished {
            event!(Level::DEBUG, "finish ignored");
        }
        self.wake_if_pending(&stack);
        finished
    }

    /// Hand results to `token`, or queue them until its next resume.
    pub async fn deliver_result(
        &self,
        token: ActivityToken,
        results: Vec<PendingResult>,
    ) -> Delivery {
        let mut stack = self.stack.lock().await;
        let span = info_span!("manager.deliver_result", token = %token, count = results.len());
        let _enter = span.enter();

        stack.deliver_results_locked(token, results, &self.hosts)
    }

    /// Remove pending results of `token` matching the key. Returns how many went.
    pub async fn remove_results(
        &self,
        token: ActivityToken,
        from: Option<ActivityToken>,
        result_who: Option<&str>,
        request_code: i32,
    ) -> usize {
        let mut stack = self.stack.lock().await;
        stack.remove_results_locked(token, from, result_who, request_code)
    }

    pub async fn add_new_intent(&self, token: ActivityToken, intent: Intent) -> Delivery {
        let mut stack = self.stack.lock().await;
        let span = info_span!("manager.new_intent", token = %token);
        let _enter = span.enter();

        stack.add_new_intent_locked(token, intent, &self.hosts)
    }

    /// Returns true if the guard flipped and the window host was told.
    pub async fn pause_key_dispatching(&self, token: ActivityToken) -> bool {
        let mut stack = self.stack.lock().await;
        stack.pause_key_dispatching_locked(token, &self.hosts)
    }

    pub async fn resume_key_dispatching(&self, token: ActivityToken) -> bool {
        let mut stack = self.stack.lock().await;
        stack.resume_key_dispatching_locked(token, &self.hosts)
    }

    /// Key dispatch to `token` timed out. Returns the report handed to the
    /// process host, or None when nothing should be reported.
    pub async fn key_dispatching_timed_out(
        &self,
        token: ActivityToken,
    ) -> Option<UnresponsiveReport> {
        let stack = self.stack.lock().await;
        let span = info_span!("manager.key_dispatching_timed_out", token = %token);
        let _enter = span.enter();

        stack.key_dispatching_timed_out_locked(token, &self.hosts)
    }

    pub async fn key_dispatching_timeout(&self, token: ActivityToken) -> Duration {
        let stack = self.stack.lock().await;
        stack.key_dispatching_timeout_locked(token, &self.hosts, &self.config)
    }

    // ------------------------------------------------------------------------
    // Collaborator acknowledgements
    // ------------------------------------------------------------------------

    pub async fn activity_resumed(&self, token: ActivityToken) {
        let mut stack = self.stack.lock().await;
        let span = info_span!("manager.activity_resumed", token = %token);
        let _enter = span.enter();

        stack.activity_resumed_locked(token, &self.hosts);
        self.wake_if_pending(&stack);
    }

    pub async fn activity_paused(&self, token: ActivityToken) {
        let mut stack = self.stack.lock().await;
        let span = info_span!("manager.activity_paused", token = %token);
        let _enter = span.enter();

        stack.activity_paused_locked(token, &self.hosts);
        self.wake_if_pending(&stack);
    }

    pub async fn activity_idle(&self, token: ActivityToken) {
        let mut stack = self.stack.lock().await;
        let span = info_span!("manager.activity_idle", token = %token);
        let _enter = span.enter();

        stack.activity_idle_locked(token, &self.hosts);
        self.wake_if_pending(&stack);
    }

    pub async fn activity_stopped(
        &self,
        token: ActivityToken,
        saved_state: Option<serde_json::Value>,
    ) {
        let mut stack = self.stack.lock().await;
        let span = info_span!("manager.activity_stopped", token = %token);
        let _enter = span.enter();

        stack.activity_stopped_ack_locked(token, saved_state, &self.hosts);
        self.wake_if_pending(&stack);
    }

    pub async fn activity_destroyed(&self, token: ActivityToken) {
        let mut stack = self.stack.lock().await;
        let span = info_span!("manager.activity_destroyed", token = %token);
        let _enter = span.enter();

        stack.activity_destroyed_locked(token);
    }

    /// Window of `token` was drawn. Returns the launch timing the first time.
    pub async fn windows_visible(&self, token: ActivityToken) -> Option<LaunchTiming> {
        let mut stack = self.stack.lock().await;
        let span = info_span!("manager.windows_visible", token = %token);
        let _enter = span.enter();

        let timing = stack.windows_visible_locked(token);
        self.wake_if_pending(&stack);
        timing
    }

    pub async fn windows_gone(&self, token: ActivityToken) {
        let mut stack = self.stack.lock().await;
        stack.windows_gone_locked(token);
    }

    // ------------------------------------------------------------------------
    // Deferred messages
    // ------------------------------------------------------------------------

    /// Handle queued stack messages now. Returns how many were handled.
    pub async fn dispatch_pending_messages(&self) -> usize {
        let mut stack = self.stack.lock().await;
        let handled = stack.dispatch_messages_locked(&self.hosts);
        if handled > 0 {
            event!(Level::DEBUG, handled, "dispatched stack messages");
        }
        handled
    }

    /// Drop every record and queued message.
    pub async fn teardown(&self) -> usize {
        let mut stack = self.stack.lock().await;
        stack.teardown_locked()
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub async fn record(&self, token: ActivityToken) -> Option<ActivitySnapshot> {
        self.stack.lock().await.activity_snapshot(token)
    }

    pub async fn is_interesting_to_user(&self, token: ActivityToken) -> bool {
        self.stack
            .lock()
            .await
            .record(token)
            .is_some_and(ActivityRecord::is_interesting_to_user_locked)
    }

    pub async fn resumed_activity(&self) -> Option<ActivityToken> {
        self.stack.lock().await.resumed_activity()
    }

    pub async fn top_activity(&self) -> Option<ActivityToken> {
        self.stack.lock().await.top_running_activity()
    }

    /// Tasks, front first.
    pub async fn tasks(&self) -> Vec<TaskSnapshot> {
        self.stack.lock().await.task_snapshots()
    }

    /// Tasks not excluded from recents, front first.
    pub async fn recent_tasks(&self) -> Vec<TaskSnapshot> {
        self.stack.lock().await.recent_tasks()
    }

    pub async fn stats(&self) -> StackStats {
        self.stack.lock().await.stats()
    }

    pub async fn dump(&self) -> StackSnapshot {
        self.stack.lock().await.snapshot()
    }
}
