use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identity of one activity instance.
///
/// Collaborators address activities through this token; it carries no
/// lifecycle state of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActivityToken(Uuid);

impl ActivityToken {
    pub fn new() -> Self {
        ActivityToken(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ActivityToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActivityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First block of the uuid is enough to tell records apart in logs.
        let simple = self.0.simple().to_string();
        write!(f, "act_{}", &simple[..8])
    }
}

/// Task identifier, unique within one stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub u32);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task_{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StackId(pub u32);

impl StackId {
    pub const MAIN: StackId = StackId(0);
}

impl fmt::Display for StackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stack_{}", self.0)
    }
}
