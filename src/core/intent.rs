use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub const ACTION_MAIN: &str = "android.intent.action.MAIN";
pub const CATEGORY_HOME: &str = "android.intent.category.HOME";
pub const CATEGORY_LAUNCHER: &str = "android.intent.category.LAUNCHER";

/// Intent flags understood by the lifecycle core.
pub mod flags {
    pub const NEW_TASK: u32 = 0x1000_0000;
    pub const SINGLE_TOP: u32 = 0x2000_0000;
    pub const EXCLUDE_FROM_RECENTS: u32 = 0x0080_0000;
}

/// Fully qualified component: owning package plus class name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentName {
    pub package: String,
    pub class: String,
}

impl ComponentName {
    /// Build a component; a class starting with `.` is relative to the package.
    pub fn new(package: impl Into<String>, class: impl Into<String>) -> Self {
        let package = package.into();
        let class = class.into();
        let class = if class.starts_with('.') {
            format!("{}{}", package, class)
        } else {
            class
        };
        Self { package, class }
    }

    /// Parse `package/class` or `package/.Class`.
    pub fn unflatten(s: &str) -> Option<Self> {
        let (package, class) = s.split_once('/')?;
        if package.is_empty() || class.is_empty() {
            return None;
        }
        Some(Self::new(package, class))
    }

    /// `package/.Class` when the class lives inside the package, else `package/class`.
    pub fn flatten_to_short_string(&self) -> String {
        match self.class.strip_prefix(&self.package) {
            Some(rest) if rest.starts_with('.') => format!("{}/{}", self.package, rest),
            _ => format!("{}/{}", self.package, self.class),
        }
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.flatten_to_short_string())
    }
}

/// A launch request payload, already resolved to a component upstream.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Intent {
    pub action: Option<String>,
    pub categories: BTreeSet<String>,
    pub data: Option<String>,
    pub mime_type: Option<String>,
    pub flags: u32,
    pub component: Option<ComponentName>,
    pub extras: BTreeMap<String, String>,
}

impl Intent {
    pub fn new() -> Self {
        Self::default()
    }

    /// The canonical home intent: MAIN + HOME, new task.
    pub fn home() -> Self {
        Self::new()
            .action(ACTION_MAIN)
            .category(CATEGORY_HOME)
            .add_flags(flags::NEW_TASK)
    }

    pub fn action(mut self, action: &str) -> Self {
        self.action = Some(action.to_string());
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.categories.insert(category.to_string());
        self
    }

    pub fn data(mut self, data: &str) -> Self {
        self.data = Some(data.to_string());
        self
    }

    pub fn mime_type(mut self, mime_type: &str) -> Self {
        self.mime_type = Some(mime_type.to_string());
        self
    }

    pub fn component(mut self, component: ComponentName) -> Self {
        self.component = Some(component);
        self
    }

    pub fn extra(mut self, key: &str, value: &str) -> Self {
        self.extras.insert(key.to_string(), value.to_string());
        self
    }

    pub fn add_flags(mut self, flags: u32) -> Self {
        self.flags |= flags;
        self
    }

    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.contains(category)
    }
}
