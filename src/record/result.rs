use crate::core::{ActivityToken, Intent};
use serde::{Deserialize, Serialize};

pub const RESULT_CANCELED: i32 = 0;
pub const RESULT_OK: i32 = -1;

/// A result waiting to be handed to the record that asked for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingResult {
    /// Record that produced the result, if it was an activity.
    pub from: Option<ActivityToken>,
    /// Caller-supplied correlation token.
    pub result_who: Option<String>,
    pub request_code: i32,
    pub result_code: i32,
    pub data: Option<Intent>,
}

impl PendingResult {
    pub fn new(
        from: Option<ActivityToken>,
        result_who: Option<String>,
        request_code: i32,
        result_code: i32,
        data: Option<Intent>,
    ) -> Self {
        Self {
            from,
            result_who,
            request_code,
            result_code,
            data,
        }
    }

    /// Same source, same correlation token (None only matches None), same request code.
    pub fn matches(
        &self,
        from: Option<ActivityToken>,
        result_who: Option<&str>,
        request_code: i32,
    ) -> bool {
        self.from == from
            && self.result_who.as_deref() == result_who
            && self.request_code == request_code
    }
}

/// Result code and payload returned by a finishing activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityResult {
    pub result_code: i32,
    pub data: Option<Intent>,
}

impl ActivityResult {
    pub fn ok(data: Option<Intent>) -> Self {
        Self {
            result_code: RESULT_OK,
            data,
        }
    }

    pub fn canceled() -> Self {
        Self {
            result_code: RESULT_CANCELED,
            data: None,
        }
    }
}

/// Outcome of handing a result or intent to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delivery {
    /// Sent to the host process right away.
    Delivered,
    /// Queued on the record until its next resume.
    Deferred,
    /// Destination gone or finishing; payload discarded.
    Dropped,
}
