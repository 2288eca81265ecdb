// ============================================================================
// Activity Manager
// ============================================================================

pub mod config;
pub mod coordinator;
pub mod pump;

pub use config::ManagerConfig;
pub use coordinator::ActivityManager;
pub use pump::{MessagePump, spawn_message_pump};
