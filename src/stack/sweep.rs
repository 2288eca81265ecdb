// ============================================================================
// Stop Sweep, Visibility and Deferred Messages
// ============================================================================
//
// Paused records are not stopped the moment they pause: the record that
// replaced them must be on screen first, otherwise the user would see
// nothing at all. The sweep runs when the foreground reports idle and when
// the last window a paused record was waiting on has been drawn.
//
// ============================================================================

use super::{ActivityStack, StackMessage};
use crate::core::ActivityToken;
use crate::host::{Collaborators, UnresponsiveReport};
use crate::manager::ManagerConfig;
use crate::record::{ActivityState, LaunchTiming};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

impl ActivityStack {
    /// Foreground record reported idle.
    pub fn activity_idle_locked(&mut self, token: ActivityToken, hosts: &Collaborators) {
        match self.records.get_mut(&token) {
            Some(record) if !record.finishing() => record.idle = true,
            _ => debug!(token = %token, "idle report for unknown or finishing activity"),
        }
        self.process_stopping_activities_locked(true, hosts);
    }

    /// Stop every paused record that is safe to stop and reap parked
    /// finishing records. Returns how many stops were started.
    ///
    /// Idempotent: a record leaves the stopping list once it is stopped.
    pub fn process_stopping_activities_locked(
        &mut self,
        idle_fired: bool,
        hosts: &Collaborators,
    ) -> usize {
        let front_drawn = self
            .resuming
            .or(self.resumed)
            .and_then(|t| self.records.get(&t))
            .is_none_or(|r| r.now_visible());

        let mut stopped = 0;
        for token in self.stopping.clone() {
            let Some(record) = self.records.get_mut(&token) else {
                self.stopping.retain(|t| *t != token);
                continue;
            };
            if record.state() != ActivityState::Paused {
                self.stopping.retain(|t| *t != token);
                continue;
            }
            if self.resuming == Some(token) {
                continue;
            }
            if (record.waiting_visible || self.resuming.is_some()) && !front_drawn {
                continue;
            }
            if record.is_interesting_to_user_locked() && !idle_fired {
                continue;
            }
            record.waiting_visible = false;
            self.waiting_visible.retain(|t| *t != token);
            self.stopping.retain(|t| *t != token);
            self.stop_activity_locked(token, hosts);
            stopped += 1;
        }

        if idle_fired {
            let orphaned: Vec<_> = self
                .records
                .values()
                .filter(|r| r.state() == ActivityState::Finishing)
                .map(|r| r.token())
                .filter(|t| !self.finishing.contains(t) && !self.host_attached(*t, hosts))
                .collect();
            for token in std::mem::take(&mut self.finishing).into_iter().chain(orphaned) {
                self.destroy_activity_locked(token);
            }
        }

        if stopped > 0 {
            debug!(stack = %self.id, stopped, "stop sweep");
        }
        stopped
    }

    /// Window of `token` has been drawn.
    pub fn windows_visible_locked(&mut self, token: ActivityToken) -> Option<LaunchTiming> {
        let now = Instant::now();
        let initial_start = self.initial_start_time;
        let report_launch_times = self.report_launch_times;
        let Some(record) = self.records.get_mut(&token) else {
            debug!(token = %token, "visibility report for unknown activity");
            return None;
        };
        if record.state().is_terminal() {
            return None;
        }

        let timing = record.take_launch_timing(now, initial_start);
        if let Some(timing) = timing {
            if report_launch_times {
                info!(
                    component = record.short_component_name(),
                    this_ms = timing.this_ms,
                    total_ms = timing.total_ms,
                    "displayed"
                );
            }
        }
        record.start_time = None;
        if timing.is_some() {
            self.launches_reported += 1;
            self.initial_start_time = None;
        }

        if record.now_visible() {
            return timing;
        }
        record.window = record.window.drawn();
        let idle = record.idle;

        if idle && !self.waiting_visible.is_empty() {
            for waiting in self.waiting_visible.drain(..) {
                if let Some(r) = self.records.get_mut(&waiting) {
                    r.waiting_visible = false;
                }
            }
            self.post_message_locked(StackMessage::IdleNow);
        }
        timing
    }

    /// Window of `token` is no longer on screen.
    pub fn windows_gone_locked(&mut self, token: ActivityToken) {
        match self.records.get_mut(&token) {
            Some(record) if !record.state().is_terminal() => record.window = record.window.gone(),
            _ => debug!(token = %token, "gone report for unknown activity"),
        }
    }

    pub(super) fn post_message_locked(&mut self, message: StackMessage) {
        if !self.messages.post(message) {
            debug!(stack = %self.id, ?message, "message coalesced");
        }
    }

    /// Handle every queued message in order. Returns how many were handled.
    pub fn dispatch_messages_locked(&mut self, hosts: &Collaborators) -> usize {
        let mut handled = 0;
        while let Some(message) = self.messages.pop() {
            match message {
                StackMessage::IdleNow => {
                    self.process_stopping_activities_locked(true, hosts);
                }
            }
            handled += 1;
        }
        handled
    }

    // ------------------------------------------------------------------------
    // Key dispatch timeouts
    // ------------------------------------------------------------------------

    /// Record the user is actually waiting on when `token` stops consuming keys.
    pub fn waiting_history_record_locked(&self, token: ActivityToken) -> Option<ActivityToken> {
        let record = self.records.get(&token)?;
        if record.waiting_visible {
            Some(self.resumed.or(self.pausing).unwrap_or(token))
        } else {
            Some(token)
        }
    }

    pub fn key_dispatching_timed_out_locked(
        &self,
        token: ActivityToken,
        hosts: &Collaborators,
    ) -> Option<UnresponsiveReport> {
        let culprit = self.waiting_history_record_locked(token)?;
        let record = self.records.get(&culprit)?;
        let process_name = record.app()?;

        if hosts.process.is_debugging(process_name) {
            debug!(process = process_name, "key dispatch timeout ignored while debugging");
            return None;
        }
        if hosts.process.is_instrumented(process_name) {
            debug!(process = process_name, "key dispatch timeout ignored under instrumentation");
            return None;
        }

        let report = UnresponsiveReport {
            reported_by: token,
            culprit,
            process_name: process_name.to_string(),
            reason: format!("keyDispatchingTimedOut: {}", record.short_component_name()),
        };
        warn!(
            reported_by = %token,
            culprit = %culprit,
            process = process_name,
            "activity not responding"
        );
        hosts.process.app_not_responding(&report);
        Some(report)
    }

    pub fn key_dispatching_timeout_locked(
        &self,
        token: ActivityToken,
        hosts: &Collaborators,
        config: &ManagerConfig,
    ) -> Duration {
        let instrumented = self
            .waiting_history_record_locked(token)
            .and_then(|t| self.records.get(&t))
            .is_some_and(|r| {
                hosts
                    .process
                    .is_instrumented(r.app().unwrap_or(r.process_name()))
            });
        if instrumented {
            config.instrumentation_key_dispatch_timeout_duration()
        } else {
            config.key_dispatch_timeout_duration()
        }
    }

    /// Drop all records, tasks and queued messages. Returns how many messages were discarded.
    pub fn teardown_locked(&mut self) -> usize {
        let dropped = self.messages.clear();
        if dropped > 0 {
            warn!(stack = %self.id, dropped, "discarding queued stack messages");
        }
        self.records.clear();
        self.tasks.clear();
        self.resumed = None;
        self.pausing = None;
        self.resuming = None;
        self.waiting_visible.clear();
        self.stopping.clear();
        self.finishing.clear();
        self.initial_start_time = None;
        info!(stack = %self.id, "stack torn down");
        dropped
    }
}
