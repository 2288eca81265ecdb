// ============================================================================
// Collaborator Boundaries
// ============================================================================
//
// The lifecycle core never spawns processes or draws windows itself. It
// issues fire-and-forget notifications through these traits while holding
// the manager lock; acknowledgements come back later as separate calls on
// `ActivityManager`.
//
// Implementations must not call back into the manager synchronously from
// inside a notification: the lock is held.
//
// ============================================================================

pub mod loopback;

use crate::core::{ActivityToken, Intent, Result};
use crate::record::{ActivityHandle, PendingResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use loopback::{HostEvent, LoopbackDriver, LoopbackHost};

/// Process-host collaborator.
pub trait ProcessHost: Send + Sync {
    /// Start (or reuse) the process for `activity` and launch it there.
    ///
    /// `Err` means the process cannot be started at all. `Ok` means the
    /// launch is underway; the host later acknowledges with `activity_resumed`.
    fn attach(&self, activity: &ActivityHandle) -> Result<()>;

    /// Is the process attached and responsive?
    fn is_attached(&self, process_name: &str) -> bool;

    fn schedule_resume(&self, activity: &ActivityHandle);

    fn schedule_pause(&self, activity: &ActivityHandle);

    fn schedule_stop(&self, activity: &ActivityHandle);

    fn schedule_destroy(&self, activity: &ActivityHandle);

    fn deliver_results(&self, activity: &ActivityHandle, results: Vec<PendingResult>);

    fn deliver_new_intents(&self, activity: &ActivityHandle, intents: Vec<Intent>);

    /// The process is being debugged; unresponsiveness is expected.
    fn is_debugging(&self, _process_name: &str) -> bool {
        false
    }

    /// The process runs under instrumentation.
    fn is_instrumented(&self, _process_name: &str) -> bool {
        false
    }

    /// Remedial action (restart, kill, dialog) is up to the host.
    fn app_not_responding(&self, _report: &UnresponsiveReport) {}
}

/// Window collaborator.
pub trait WindowHost: Send + Sync {
    fn show(&self, activity: &ActivityHandle);

    fn hide(&self, activity: &ActivityHandle);

    fn pause_key_dispatching(&self, activity: &ActivityHandle);

    fn resume_key_dispatching(&self, activity: &ActivityHandle);
}

/// Both collaborators, handed by reference into every locked stack operation.
#[derive(Clone)]
pub struct Collaborators {
    pub process: Arc<dyn ProcessHost>,
    pub window: Arc<dyn WindowHost>,
}

impl Collaborators {
    pub fn new(process: Arc<dyn ProcessHost>, window: Arc<dyn WindowHost>) -> Self {
        Self { process, window }
    }
}

/// Which record and process an unresponsive-host timeout points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresponsiveReport {
    /// Record whose key dispatch timed out.
    pub reported_by: ActivityToken,
    /// Record actually being waited on.
    pub culprit: ActivityToken,
    pub process_name: String,
    pub reason: String,
}
