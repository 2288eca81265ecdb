// ============================================================================
// Lifecycle Transitions
// ============================================================================
//
// Every request to a host is followed, some time later, by an
// acknowledgement. An acknowledgement is honoured only while the stack is
// still waiting for it (`resuming` / `pausing` / the record's own state);
// anything else is a stale callback and is ignored.
//
// A record whose process is not attached needs no round trip: pause and
// stop complete synchronously.
//
// ============================================================================

use super::ActivityStack;
use crate::core::ActivityToken;
use crate::host::Collaborators;
use crate::record::{ActivityResult, ActivityState, PendingResult};
use std::time::Instant;
use tracing::{debug, info, warn};

impl ActivityStack {
    /// Bring the top running record to RESUMED, pausing whatever is resumed first.
    pub fn resume_top_activity_locked(&mut self, hosts: &Collaborators) {
        loop {
            let Some(next) = self.top_running_activity() else {
                debug!(stack = %self.id, "no activity to resume");
                return;
            };
            if self.resumed == Some(next) || self.resuming.is_some() || self.pausing.is_some() {
                return;
            }
            if let Some(prev) = self.resumed {
                self.start_pausing_locked(prev, hosts);
                return;
            }
            if self.records.get(&next).map(|r| r.state()) == Some(ActivityState::Stopping) {
                if self.host_attached(next, hosts) {
                    debug!(token = %next, "top activity still stopping, resume deferred");
                    return;
                }
                self.activity_stopped_locked(next, None);
                continue;
            }
            if self.realize_activity_locked(next, hosts) {
                return;
            }
            // `next` failed to launch and is finishing; try whatever is beneath it.
        }
    }

    /// Ask the host to resume `token`, attaching its process first if needed.
    /// Returns false if the process could not be started.
    fn realize_activity_locked(&mut self, token: ActivityToken, hosts: &Collaborators) -> bool {
        let attached = self.host_attached(token, hosts);
        let initial_start = self.initial_start_time;
        let Some(record) = self.records.get_mut(&token) else {
            return false;
        };
        let handle = record.handle();

        if record.state() == ActivityState::Launching && record.launch_time.is_none() {
            let now = Instant::now();
            record.launch_time = Some(now);
            if initial_start.is_none() {
                self.initial_start_time = Some(now);
            }
        }

        if !attached {
            if let Err(err) = hosts.process.attach(&handle) {
                warn!(
                    token = %token,
                    process = %handle.process_name,
                    error = %err,
                    "process could not be started, finishing activity"
                );
                record.launch_failed = true;
                self.finish_activity_inner(token, None, hosts);
                return false;
            }
            record.app = Some(handle.process_name.clone());
        } else {
            hosts.process.schedule_resume(&handle);
        }

        record.window = record.window.request_show();
        hosts.window.show(&handle);
        self.resuming = Some(token);
        debug!(token = %token, attached, "resume requested");
        true
    }

    /// Host acknowledged that `token` is now in the foreground.
    pub fn activity_resumed_locked(&mut self, token: ActivityToken, hosts: &Collaborators) {
        if self.resuming != Some(token) {
            debug!(token = %token, "ignoring stale resume acknowledgement");
            return;
        }
        self.resuming = None;
        if !self.set_state_locked(token, ActivityState::Resumed) {
            return;
        }
        self.resumed = Some(token);
        self.stopping.retain(|t| *t != token);
        self.waiting_visible.retain(|t| *t != token);

        let Some(record) = self.records.get_mut(&token) else {
            return;
        };
        record.waiting_visible = false;
        record.idle = false;
        record.start_time = Some(Instant::now());
        let handle = record.handle();
        let results = record.take_results();
        let intents = record.take_new_intents();
        let keys_resumed = record.resume_key_dispatching_locked();

        if !results.is_empty() {
            hosts.process.deliver_results(&handle, results);
        }
        if !intents.is_empty() {
            hosts.process.deliver_new_intents(&handle, intents);
        }
        if keys_resumed {
            hosts.window.resume_key_dispatching(&handle);
        }

        // Something else was launched on top while this one was coming up.
        if self.top_running_activity() != Some(token) {
            self.resume_top_activity_locked(hosts);
        }
    }

    pub(super) fn start_pausing_locked(&mut self, token: ActivityToken, hosts: &Collaborators) {
        if self.pausing.is_some() {
            return;
        }
        if !self.set_state_locked(token, ActivityState::Pausing) {
            return;
        }
        if self.resumed == Some(token) {
            self.resumed = None;
        }
        self.pausing = Some(token);

        let attached = self.host_attached(token, hosts);
        let Some(record) = self.records.get_mut(&token) else {
            return;
        };
        let handle = record.handle();
        if record.pause_key_dispatching_locked() {
            hosts.window.pause_key_dispatching(&handle);
        }

        if attached {
            hosts.process.schedule_pause(&handle);
        } else {
            debug!(token = %token, "no attached host, completing pause");
            self.activity_paused_locked(token, hosts);
        }
    }

    /// Host acknowledged that `token` finished pausing.
    pub fn activity_paused_locked(&mut self, token: ActivityToken, hosts: &Collaborators) {
        if self.pausing != Some(token) {
            debug!(token = %token, "ignoring stale pause acknowledgement");
            return;
        }
        self.pausing = None;
        if !self.set_state_locked(token, ActivityState::Paused) {
            return;
        }

        let next = self.top_running_activity();
        if next != Some(token) {
            if !self.stopping.contains(&token) {
                self.stopping.push(token);
            }
            let next_drawn = next
                .and_then(|t| self.records.get(&t))
                .is_none_or(|r| r.now_visible());
            if !next_drawn {
                if let Some(record) = self.records.get_mut(&token) {
                    record.waiting_visible = true;
                }
                if !self.waiting_visible.contains(&token) {
                    self.waiting_visible.push(token);
                }
            }
        }

        self.resume_top_activity_locked(hosts);
        self.process_stopping_activities_locked(false, hosts);
    }

    pub(super) fn stop_activity_locked(&mut self, token: ActivityToken, hosts: &Collaborators) {
        if !self.set_state_locked(token, ActivityState::Stopping) {
            return;
        }
        let attached = self.host_attached(token, hosts);
        let Some(record) = self.records.get_mut(&token) else {
            return;
        };
        record.window = record.window.request_hide();
        let handle = record.handle();
        hosts.window.hide(&handle);

        if attached {
            hosts.process.schedule_stop(&handle);
        } else {
            self.activity_stopped_locked(token, None);
        }
    }

    /// Host acknowledged the stop; `saved_state` is kept for a later re-creation.
    /// A stopped record that became the top again is resumed.
    pub fn activity_stopped_ack_locked(
        &mut self,
        token: ActivityToken,
        saved_state: Option<serde_json::Value>,
        hosts: &Collaborators,
    ) {
        self.activity_stopped_locked(token, saved_state);
        if self.resumed.is_none() && self.top_running_activity() == Some(token) {
            self.resume_top_activity_locked(hosts);
        }
    }

    pub(super) fn activity_stopped_locked(
        &mut self,
        token: ActivityToken,
        saved_state: Option<serde_json::Value>,
    ) {
        if self
            .records
            .get(&token)
            .is_none_or(|r| r.state() != ActivityState::Stopping)
        {
            debug!(token = %token, "ignoring stale stop acknowledgement");
            return;
        }
        self.set_state_locked(token, ActivityState::Stopped);
        if let (Some(record), Some(state)) = (self.records.get_mut(&token), saved_state) {
            record.saved_state = Some(state);
            record.have_state = true;
        }
    }

    /// Request that `token` finish, handing `result` to whoever asked for it.
    /// Returns false if the record is unknown or already finishing.
    pub fn finish_activity_locked(
        &mut self,
        token: ActivityToken,
        result: Option<ActivityResult>,
        hosts: &Collaborators,
    ) -> bool {
        let finished = self.finish_activity_inner(token, result, hosts);
        if finished {
            self.resume_top_activity_locked(hosts);
        }
        finished
    }

    pub(super) fn finish_activity_inner(
        &mut self,
        token: ActivityToken,
        result: Option<ActivityResult>,
        hosts: &Collaborators,
    ) -> bool {
        let attached = self.host_attached(token, hosts);
        let Some(record) = self.records.get_mut(&token) else {
            return false;
        };
        if record.finishing() {
            debug!(token = %token, "already finishing");
            return false;
        }

        let result_to = record.result_to.take();
        let result_who = record.result_who().map(str::to_string);
        let request_code = record.request_code();
        let dropped_intents = record.take_new_intents();
        if !dropped_intents.is_empty() {
            warn!(
                token = %token,
                count = dropped_intents.len(),
                "dropping undelivered intents of finishing activity"
            );
        }
        let keys_paused = record.pause_key_dispatching_locked();
        let was_shown = record.window.is_requested() || record.window.is_drawn();
        record.window = record.window.request_hide();
        record.waiting_visible = false;
        let handle = record.handle();
        let has_app = record.app.is_some();

        self.set_state_locked(token, ActivityState::Finishing);
        info!(token = %token, component = %handle.component, "finishing activity");

        if let Some(dest) = result_to {
            let result = result.unwrap_or_else(ActivityResult::canceled);
            let pending = PendingResult::new(
                Some(token),
                result_who,
                request_code,
                result.result_code,
                result.data,
            );
            self.deliver_results_locked(dest, vec![pending], hosts);
        }

        if keys_paused {
            hosts.window.pause_key_dispatching(&handle);
        }
        if was_shown {
            hosts.window.hide(&handle);
        }

        if self.resumed == Some(token) {
            self.resumed = None;
        }
        if self.pausing == Some(token) {
            self.pausing = None;
        }
        if self.resuming == Some(token) {
            self.resuming = None;
        }
        self.stopping.retain(|t| *t != token);
        self.waiting_visible.retain(|t| *t != token);
        self.remove_from_history_locked(token);

        if has_app && attached {
            hosts.process.schedule_destroy(&handle);
        } else if !self.finishing.contains(&token) {
            self.finishing.push(token);
        }
        true
    }

    /// Host acknowledged the destroy; the record leaves the stack for good.
    pub fn activity_destroyed_locked(&mut self, token: ActivityToken) {
        if self
            .records
            .get(&token)
            .is_none_or(|r| r.state() != ActivityState::Finishing)
        {
            debug!(token = %token, "ignoring stale destroy acknowledgement");
            return;
        }
        self.destroy_activity_locked(token);
    }

    pub(super) fn destroy_activity_locked(&mut self, token: ActivityToken) {
        self.set_state_locked(token, ActivityState::Destroyed);
        self.finishing.retain(|t| *t != token);
        if let Some(record) = self.records.remove(&token) {
            if !record.pending_results().is_empty() {
                warn!(
                    token = %token,
                    count = record.pending_results().len(),
                    "dropping undelivered results of destroyed activity"
                );
            }
            debug!(token = %token, launch_failed = record.launch_failed(), "activity destroyed");
        }
    }
}
