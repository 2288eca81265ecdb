// ============================================================================
// Activity Records
// ============================================================================
//
// One record per launched activity instance: immutable launch identity plus
// the mutable lifecycle state driven by the stack.
//
// ============================================================================

pub mod activity;
pub mod result;
pub mod state;

pub use activity::{
    ActivityHandle, ActivityRecord, ActivitySnapshot, CallerInfo, LaunchRequest, LaunchTiming,
};
pub use result::{ActivityResult, Delivery, PendingResult, RESULT_CANCELED, RESULT_OK};
pub use state::{ActivityState, WindowFacet};
