use facesync_core::runner::{self, Action, Outcome};
use facesync_core::sync::SyncError;
use facesync_core::Config;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Snapshot of the engine's run history.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineStatus {
    pub runs: u64,
    pub failures: u64,
    pub last_action: Option<&'static str>,
    pub last_error: Option<String>,
}

/// Messages sent from D-Bus handlers to the engine thread.
enum EngineRequest {
    Run {
        action: Action,
        reply: oneshot::Sender<Result<Outcome, EngineError>>,
    },
    Status {
        reply: oneshot::Sender<EngineStatus>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Queue a synchronization run and wait for its outcome.
    pub async fn run(&self, action: Action) -> Result<Outcome, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Run {
                action,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    pub async fn status(&self) -> Result<EngineStatus, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Status { reply: reply_tx })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }
}

/// Spawn the engine on a dedicated OS thread.
///
/// Requests are handled one at a time, so at most one run writes to the
/// stores. Each run opens its own connections and closes them when done.
pub fn spawn_engine(config: Config, dry_run: bool) -> Result<EngineHandle, EngineError> {
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(4);

    std::thread::Builder::new()
        .name("facesync-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            let mut status = EngineStatus::default();
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Run { action, reply } => {
                        let result = runner::run(&config, action, dry_run);
                        status.runs += 1;
                        status.last_action = Some(action.name());
                        match &result {
                            Ok(_) => status.last_error = None,
                            Err(e) => {
                                tracing::error!(action = action.name(), error = %e, "run failed");
                                status.failures += 1;
                                status.last_error = Some(e.to_string());
                            }
                        }
                        let _ = reply.send(result.map_err(EngineError::from));
                    }
                    EngineRequest::Status { reply } => {
                        let _ = reply.send(status.clone());
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })?;

    Ok(EngineHandle { tx })
}
