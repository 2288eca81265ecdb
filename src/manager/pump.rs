use super::ActivityManager;
use crate::core::{LifecycleError, Result};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{Level, event};

/// Background task that handles deferred stack messages as they are posted.
pub struct MessagePump {
    stop_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<usize>>,
}

impl MessagePump {
    /// Signals the pump to stop and waits for it. Returns how many messages it handled.
    pub async fn stop(mut self) -> Result<usize> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        match self.join_handle.take() {
            Some(join_handle) => join_handle
                .await
                .map_err(|err| LifecycleError::WorkerJoin(format!("message pump join: {}", err))),
            None => Ok(0),
        }
    }
}

impl Drop for MessagePump {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(join_handle) = self.join_handle.take() {
            join_handle.abort();
        }
    }
}

/// Spawns the pump on the current tokio runtime.
pub fn spawn_message_pump(manager: ActivityManager) -> MessagePump {
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
    let wakeup = manager.wakeup();

    let join_handle = tokio::spawn(async move {
        let mut handled = 0;
        loop {
            tokio::select! {
                _ = &mut stop_rx => {
                    break;
                }
                _ = wakeup.notified() => {
                    handled += manager.dispatch_pending_messages().await;
                }
            }
        }
        event!(Level::DEBUG, handled, "message pump stopped");
        handled
    });

    MessagePump {
        stop_tx: Some(stop_tx),
        join_handle: Some(join_handle),
    }
}
