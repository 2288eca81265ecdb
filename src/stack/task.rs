use crate::core::{ActivityToken, TaskId};

/// Ordered group of activities sharing a back stack.
///
/// `activities[0]` is the root (front of task), the last entry is frontmost.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    id: TaskId,
    affinity: Option<String>,
    activities: Vec<ActivityToken>,
    excluded_from_recents: bool,
}

impl TaskRecord {
    pub fn new(id: TaskId, affinity: Option<String>) -> Self {
        Self {
            id,
            affinity,
            activities: Vec::new(),
            excluded_from_recents: false,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn affinity(&self) -> Option<&str> {
        self.affinity.as_deref()
    }

    pub fn activities(&self) -> &[ActivityToken] {
        &self.activities
    }

    pub fn root(&self) -> Option<ActivityToken> {
        self.activities.first().copied()
    }

    pub fn top(&self) -> Option<ActivityToken> {
        self.activities.last().copied()
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    pub fn contains(&self, token: ActivityToken) -> bool {
        self.activities.contains(&token)
    }

    pub fn position(&self, token: ActivityToken) -> Option<usize> {
        self.activities.iter().position(|t| *t == token)
    }

    pub fn excluded_from_recents(&self) -> bool {
        self.excluded_from_recents
    }

    pub(crate) fn set_excluded_from_recents(&mut self, excluded: bool) {
        self.excluded_from_recents = excluded;
    }

    /// Append on top. Returns true if the record became the root.
    pub fn push(&mut self, token: ActivityToken) -> bool {
        self.activities.push(token);
        self.activities.len() == 1
    }

    /// Remove a record. Returns true if it was present.
    pub fn remove(&mut self, token: ActivityToken) -> bool {
        match self.position(token) {
            Some(index) => {
                self.activities.remove(index);
                true
            }
            None => false,
        }
    }

    /// Records stacked above `token`, frontmost first.
    pub fn above(&self, token: ActivityToken) -> Vec<ActivityToken> {
        match self.position(token) {
            Some(index) => self.activities[index + 1..].iter().rev().copied().collect(),
            None => Vec::new(),
        }
    }
}
