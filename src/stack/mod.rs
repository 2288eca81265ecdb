// ============================================================================
// Activity Stack Module
// ============================================================================
//
// Tasks, the history of records inside them, and the lifecycle machinery
// that moves one record at a time into the foreground.
//
// ============================================================================

pub mod activity_stack;
pub mod messages;
pub mod snapshot;
pub mod sweep;
pub mod task;
pub mod transitions;

pub use activity_stack::ActivityStack;
pub use messages::{MessageQueue, StackMessage};
pub use snapshot::{StackSnapshot, StackStats, TaskSnapshot};
pub use task::TaskRecord;
