use crate::core::{ActivityToken, StackId, TaskId};
use crate::record::ActivitySnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task and its records, root first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub affinity: Option<String>,
    pub excluded_from_recents: bool,
    pub activities: Vec<ActivitySnapshot>,
}

impl TaskSnapshot {
    pub fn root(&self) -> Option<&ActivitySnapshot> {
        self.activities.first()
    }

    pub fn top(&self) -> Option<&ActivitySnapshot> {
        self.activities.last()
    }
}

/// Counters describing one stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackStats {
    pub stack: StackId,
    pub tasks: usize,
    pub activities: usize,
    pub resumed: Option<ActivityToken>,
    pub pausing: Option<ActivityToken>,
    pub waiting_visible: usize,
    pub stopping: usize,
    pub finishing: usize,
    pub pending_messages: usize,
    pub coalesced_messages: u64,
    pub launches_reported: u64,
}

impl fmt::Display for StackStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stack {}:", self.stack)?;
        writeln!(f, "  Tasks: {}", self.tasks)?;
        writeln!(f, "  Activities: {}", self.activities)?;
        match self.resumed {
            Some(token) => writeln!(f, "  Resumed: {}", token)?,
            None => writeln!(f, "  Resumed: none")?,
        }
        if let Some(token) = self.pausing {
            writeln!(f, "  Pausing: {}", token)?;
        }
        writeln!(f, "  Waiting visible: {}", self.waiting_visible)?;
        writeln!(f, "  Stopping: {}", self.stopping)?;
        writeln!(f, "  Finishing: {}", self.finishing)?;
        writeln!(
            f,
            "  Messages: {} pending ({} coalesced)",
            self.pending_messages, self.coalesced_messages
        )?;
        write!(f, "  Launches reported: {}", self.launches_reported)
    }
}

/// Full dump of a stack: tasks front first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackSnapshot {
    pub stack: StackId,
    pub resumed: Option<ActivityToken>,
    pub pausing: Option<ActivityToken>,
    pub tasks: Vec<TaskSnapshot>,
    pub stats: StackStats,
}

impl StackSnapshot {
    pub fn activity(&self, token: ActivityToken) -> Option<&ActivitySnapshot> {
        self.tasks
            .iter()
            .flat_map(|t| t.activities.iter())
            .find(|a| a.token == token)
    }
}
