pub mod descriptor;
pub mod error;
pub mod intent;
pub mod types;

pub use descriptor::{ActivityFlags, ActivityInfo, ApplicationInfo, LaunchMode, ThemeKind};
pub use error::{LifecycleError, Result};
pub use intent::{ComponentName, Intent, flags};
pub use types::{ActivityToken, StackId, TaskId};
