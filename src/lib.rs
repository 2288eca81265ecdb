// ============================================================================
// Activity Stack Library
// ============================================================================
//
// Lifecycle state machine for application activities: launching, pausing,
// stopping and finishing records inside ordered tasks, with exactly one
// record in the foreground at a time.
//
// Process and window management stay outside: the stack talks to them
// through the `ProcessHost` / `WindowHost` traits and waits for their
// acknowledgements.
//
// ============================================================================

pub mod core;
pub mod host;
pub mod manager;
pub mod record;
pub mod stack;

pub use crate::core::{
    ActivityFlags, ActivityInfo, ActivityToken, ApplicationInfo, ComponentName, Intent,
    LaunchMode, LifecycleError, Result, StackId, TaskId, ThemeKind, flags,
};
pub use host::{Collaborators, ProcessHost, UnresponsiveReport, WindowHost};
pub use manager::{ActivityManager, ManagerConfig, MessagePump, spawn_message_pump};
pub use record::{
    ActivityHandle, ActivityResult, ActivitySnapshot, ActivityState, CallerInfo, Delivery,
    LaunchRequest, LaunchTiming, PendingResult, RESULT_CANCELED, RESULT_OK, WindowFacet,
};
pub use stack::{StackSnapshot, StackStats, TaskSnapshot};
