// ============================================================================
// Resolved Activity Descriptor
// ============================================================================
//
// What the package resolver hands to the lifecycle core once an intent has
// been mapped to a concrete component. Nothing here is looked up lazily:
// a launch never touches package metadata beyond this descriptor.
//
// ============================================================================

use serde::{Deserialize, Serialize};

/// Activity launch mode attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LaunchMode {
    /// A new instance every launch.
    #[default]
    Multiple,
    /// Reuse the instance already at the top, delivering a new intent.
    SingleTop,
    /// At most one instance, living in its affinity task.
    SingleTask,
    /// At most one instance, alone in its own task.
    SingleInstance,
}

impl LaunchMode {
    /// Modes for which an alias descriptor still resolves to the intent's component.
    pub fn ignores_alias(&self) -> bool {
        matches!(self, LaunchMode::Multiple | LaunchMode::SingleTop)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ThemeKind {
    #[default]
    Default,
    Dialog,
}

/// Descriptor flags (subset of the manifest attributes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActivityFlags {
    pub multiprocess: bool,
    pub state_not_needed: bool,
    pub exclude_from_recents: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApplicationInfo {
    pub package_name: String,
    pub uid: u32,
    pub source_dir: String,
    pub public_source_dir: String,
    pub data_dir: String,
    pub label: Option<String>,
    pub label_res: u32,
}

impl ApplicationInfo {
    pub fn new(package_name: &str, uid: u32) -> Self {
        Self {
            package_name: package_name.to_string(),
            uid,
            source_dir: format!("/data/app/{}.apk", package_name),
            public_source_dir: format!("/data/app/{}.apk", package_name),
            data_dir: format!("/data/data/{}", package_name),
            label: None,
            label_res: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActivityInfo {
    /// Fully qualified class name.
    pub name: String,
    pub package_name: String,
    /// Real activity class when this descriptor is an alias.
    pub target_activity: Option<String>,
    pub process_name: Option<String>,
    pub task_affinity: Option<String>,
    pub launch_mode: LaunchMode,
    pub flags: ActivityFlags,
    pub theme: ThemeKind,
    pub label: Option<String>,
    pub label_res: u32,
    pub application: ApplicationInfo,
}

impl ActivityInfo {
    /// Descriptor with the usual defaults: affinity and process named after the package.
    pub fn new(application: ApplicationInfo, name: &str) -> Self {
        let package_name = application.package_name.clone();
        let name = if name.starts_with('.') {
            format!("{}{}", package_name, name)
        } else {
            name.to_string()
        };
        Self {
            name,
            task_affinity: Some(package_name.clone()),
            package_name,
            application,
            ..Self::default()
        }
    }

    pub fn launch_mode(mut self, mode: LaunchMode) -> Self {
        self.launch_mode = mode;
        self
    }

    pub fn target_activity(mut self, target: &str) -> Self {
        self.target_activity = Some(target.to_string());
        self
    }

    pub fn process_name(mut self, process: &str) -> Self {
        self.process_name = Some(process.to_string());
        self
    }

    pub fn task_affinity(mut self, affinity: &str) -> Self {
        self.task_affinity = Some(affinity.to_string());
        self
    }

    pub fn flags(mut self, flags: ActivityFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn theme(mut self, theme: ThemeKind) -> Self {
        self.theme = theme;
        self
    }
}
