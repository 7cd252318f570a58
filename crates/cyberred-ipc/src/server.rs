//! Unix-socket server: singleton PID file, stale-socket detection, one
//! task per connection. Grounded on spec.md §4.N and
//! `original_source/src/cyberred/daemon/ipc.py`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::BufReader;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::codec::{decode_request, read_line, write_event, write_response};
use crate::error::IpcError;
use crate::handler::{CommandHandler, HandlerOutcome};
use crate::types::{Command, IpcRequest, IpcResponse};

const STREAM_CHANNEL_CAPACITY: usize = 256;

pub struct IpcServer {
    socket_path: PathBuf,
    pid_path: PathBuf,
    handler: Arc<dyn CommandHandler>,
}

impl IpcServer {
    pub fn new(socket_path: PathBuf, pid_path: PathBuf, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            socket_path,
            pid_path,
            handler,
        }
    }

    /// Binds the socket, enforcing the singleton guarantee: a stale socket
    /// (nothing answering a connect attempt) is unlinked and replaced; a
    /// live one means another daemon instance owns it.
    pub async fn bind(&self) -> Result<UnixListener, IpcError> {
        if self.socket_path.exists() {
            match UnixStream::connect(&self.socket_path).await {
                Ok(_) => {
                    let pid = read_pid(&self.pid_path).unwrap_or(0);
                    return Err(IpcError::AlreadyRunning(pid));
                }
                Err(err)
                    if err.kind() == std::io::ErrorKind::ConnectionRefused
                        || err.kind() == std::io::ErrorKind::NotFound =>
                {
                    warn!(path = %self.socket_path.display(), "removing stale socket");
                    let _ = std::fs::remove_file(&self.socket_path);
                }
                Err(err) => return Err(err.into()),
            }
        }

        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let listener = UnixListener::bind(&self.socket_path)?;
        set_socket_permissions(&self.socket_path)?;
        std::fs::write(&self.pid_path, std::process::id().to_string())?;
        info!(path = %self.socket_path.display(), "ipc server bound");
        Ok(listener)
    }

    /// Accepts connections until `shutdown` resolves, then stops accepting
    /// new ones. In-flight connections finish on their own.
    pub async fn serve(&self, listener: UnixListener, shutdown: impl std::future::Future<Output = ()>) {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => {
                            let handler = Arc::clone(&self.handler);
                            tokio::spawn(async move {
                                if let Err(err) = handle_connection(stream, handler).await {
                                    debug!(error = %err, "ipc connection ended with error");
                                }
                            });
                        }
                        Err(err) => error!(error = %err, "accept failed"),
                    }
                }
                _ = &mut shutdown => {
                    info!("ipc server shutting down");
                    break;
                }
            }
        }
    }

    /// Removes the socket and PID file. Called on graceful shutdown.
    pub fn cleanup(&self) {
        let _ = std::fs::remove_file(&self.socket_path);
        let _ = std::fs::remove_file(&self.pid_path);
    }
}

#[cfg(unix)]
fn set_socket_permissions(path: &Path) -> Result<(), IpcError> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(0o600);
    std::fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn set_socket_permissions(_path: &Path) -> Result<(), IpcError> {
    Ok(())
}

fn read_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

async fn handle_connection(
    stream: UnixStream,
    handler: Arc<dyn CommandHandler>,
) -> Result<(), IpcError> {
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let writer = Arc::new(Mutex::new(write_half));

    loop {
        let line = match read_line(&mut reader).await {
            Ok(Some(line)) => line,
            Ok(None) => return Ok(()),
            Err(err) => {
                let response = IpcResponse::error("", format!("protocol error: {err}"));
                let mut guard = writer.lock().await;
                let _ = write_response(&mut *guard, &response).await;
                return Err(err);
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match decode_request(&line) {
            Ok(request) => dispatch(request, &handler, &writer).await,
            Err(err) => IpcResponse::error("", err.to_string()),
        };

        let mut guard = writer.lock().await;
        write_response(&mut *guard, &response).await?;
    }
}

async fn dispatch(
    request: IpcRequest,
    handler: &Arc<dyn CommandHandler>,
    writer: &Arc<Mutex<tokio::net::unix::OwnedWriteHalf>>,
) -> IpcResponse {
    let Some(command) = Command::parse(&request.command) else {
        return IpcResponse::error(
            request.request_id,
            format!("unknown command '{}'", request.command),
        );
    };

    match command {
        Command::EngagementAttach => attach(request, handler, writer).await,
        Command::EngagementDetach => detach(request, handler).await,
        _ => match handler.handle(command, request.params).await {
            HandlerOutcome::Ok(data) => IpcResponse::ok(request.request_id, data),
            HandlerOutcome::Error(message) => IpcResponse::error(request.request_id, message),
        },
    }
}

async fn attach(
    request: IpcRequest,
    handler: &Arc<dyn CommandHandler>,
    writer: &Arc<Mutex<tokio::net::unix::OwnedWriteHalf>>,
) -> IpcResponse {
    let Some(engagement_id) = request
        .params
        .get("engagement_id")
        .and_then(Value::as_str)
        .map(str::to_string)
    else {
        return IpcResponse::error(request.request_id, "attach requires engagement_id");
    };

    let (tx, mut rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
    match handler.attach(&engagement_id, tx).await {
        Ok(result) => {
            let writer = Arc::clone(writer);
            tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    let mut guard = writer.lock().await;
                    if write_event(&mut *guard, &event).await.is_err() {
                        break;
                    }
                }
            });
            IpcResponse::ok(
                request.request_id,
                json!({
                    "subscription_id": result.subscription_id,
                    "state": result.state,
                    "agent_count": result.agent_count,
                    "finding_count": result.finding_count,
                }),
            )
        }
        Err(message) => IpcResponse::error(request.request_id, message),
    }
}

async fn detach(request: IpcRequest, handler: &Arc<dyn CommandHandler>) -> IpcResponse {
    let Some(subscription_id) = request
        .params
        .get("subscription_id")
        .and_then(Value::as_str)
    else {
        return IpcResponse::error(request.request_id, "detach requires subscription_id");
    };

    match handler.detach(subscription_id).await {
        Ok(()) => IpcResponse::ok(request.request_id, json!({})),
        Err(message) => IpcResponse::error(request.request_id, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::AttachResult;
    use crate::types::StreamEvent;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::tempdir;
    use tokio::io::AsyncWriteExt as _;

    struct FakeHandler {
        detached: AtomicBool,
    }

    #[async_trait::async_trait]
    impl CommandHandler for FakeHandler {
        async fn handle(&self, command: Command, _params: Value) -> HandlerOutcome {
            match command {
                Command::SessionsList => HandlerOutcome::Ok(json!({"engagements": []})),
                Command::DaemonStop => HandlerOutcome::Ok(json!({})),
                _ => HandlerOutcome::Error("not implemented in test fake".to_string()),
            }
        }

        async fn attach(
            &self,
            engagement_id: &str,
            sink: mpsc::Sender<StreamEvent>,
        ) -> Result<AttachResult, String> {
            if engagement_id == "missing" {
                return Err("no such engagement".to_string());
            }
            tokio::spawn(async move {
                let _ = sink
                    .send(StreamEvent {
                        event_type: crate::types::StreamEventType::Heartbeat,
                        data: json!({}),
                        timestamp: "2026-07-26T00:00:00Z".to_string(),
                    })
                    .await;
            });
            Ok(AttachResult {
                subscription_id: "sub-1".to_string(),
                state: "RUNNING".to_string(),
                agent_count: 0,
                finding_count: 0,
            })
        }

        async fn detach(&self, _subscription_id: &str) -> Result<(), String> {
            self.detached.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn bind_removes_stale_socket() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("daemon.sock");
        let pid_path = dir.path().join("daemon.pid");
        std::fs::write(&socket_path, b"").unwrap();

        let handler = Arc::new(FakeHandler {
            detached: AtomicBool::new(false),
        });
        let server = IpcServer::new(socket_path.clone(), pid_path.clone(), handler);
        let listener = server.bind().await.unwrap();
        drop(listener);
        assert!(pid_path.exists());
    }

    #[tokio::test]
    async fn dispatch_unknown_command_errors() {
        let handler: Arc<dyn CommandHandler> = Arc::new(FakeHandler {
            detached: AtomicBool::new(false),
        });
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("d.sock");
        let listener = UnixListener::bind(&socket_path).unwrap();

        let server_task = {
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                let (stream, _) = listener.accept().await.unwrap();
                let _ = handle_connection(stream, handler).await;
            })
        };

        let mut client = UnixStream::connect(&socket_path).await.unwrap();
        client
            .write_all(b"{\"command\":\"bogus\",\"params\":{},\"request_id\":\"r1\"}\n")
            .await
            .unwrap();

        let mut reader = BufReader::new(&mut client);
        let line = read_line(&mut reader).await.unwrap().unwrap();
        let response: IpcResponse = serde_json::from_str(&line).unwrap();
        assert_eq!(response.request_id, "r1");
        assert!(response.error.is_some());

        drop(client);
        let _ = server_task.await;
    }
}
