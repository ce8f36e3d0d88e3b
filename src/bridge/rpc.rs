//! JSON-RPC client for the page server
//!
//! The server is a child process speaking JSON-RPC 2.0 on stdin/stdout,
//! one message per line. Every call is bounded by a deadline; a call that
//! outlives it fails with [`SessionError::Timeout`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, ChildStdout};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

use super::SessionError;

/// Error codes the page server uses for conditions the engine treats specially
pub const CODE_STALE_ELEMENT: i32 = -32010;
pub const CODE_NOT_INTERACTABLE: i32 = -32011;
pub const CODE_NAVIGATING: i32 = -32012;
pub const CODE_TIMEOUT: i32 = -32013;

/// Upper bound for a single call; browser launch and navigation dominate
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Debug, Serialize)]
struct Request<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: &'a Value,
}

#[derive(Debug, Deserialize)]
struct Response {
    id: u64,
    #[serde(flatten)]
    outcome: Outcome,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Outcome {
    Failure { error: RpcError },
    Success { result: Value },
}

/// Error object carried by a failed response
#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl From<RpcError> for SessionError {
    fn from(err: RpcError) -> Self {
        match err.code {
            CODE_STALE_ELEMENT => SessionError::StaleElement(err.message),
            CODE_NOT_INTERACTABLE => SessionError::NotInteractable(err.message),
            CODE_NAVIGATING => SessionError::NavigationInProgress,
            CODE_TIMEOUT => SessionError::Timeout,
            code => SessionError::ServerError(format!("[{}] {}", code, err.message)),
        }
    }
}

type Reply = oneshot::Sender<Result<Value, SessionError>>;

struct Call {
    id: u64,
    line: String,
    reply: Reply,
}

/// Handle for issuing calls to one page server
#[derive(Clone)]
pub struct RpcClient {
    calls: mpsc::Sender<Call>,
    next_id: std::sync::Arc<AtomicU64>,
    call_timeout: Duration,
}

impl RpcClient {
    /// Start the I/O task over a spawned server's pipes
    pub fn connect(stdin: ChildStdin, stdout: ChildStdout) -> Self {
        let (calls, queue) = mpsc::channel(64);
        tokio::spawn(pump(queue, stdin, stdout));
        Self {
            calls,
            next_id: std::sync::Arc::new(AtomicU64::new(1)),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Issue `method` and wait for its result
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, SessionError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let line = encode(id, method, &params)?;
        let (reply, response) = oneshot::channel();

        trace!(id, method, "rpc call");
        self.calls
            .send(Call { id, line, reply })
            .await
            .map_err(|_| SessionError::Disconnected)?;

        match tokio::time::timeout(self.call_timeout, response).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(SessionError::Disconnected),
            Err(_) => {
                warn!(method, "No reply within {:?}", self.call_timeout);
                Err(SessionError::Timeout)
            }
        }
    }
}

fn encode(id: u64, method: &str, params: &Value) -> Result<String, SessionError> {
    let request = Request {
        jsonrpc: "2.0",
        id,
        method,
        params,
    };
    Ok(serde_json::to_string(&request)? + "\n")
}

fn decode(line: &str) -> Option<(u64, Result<Value, SessionError>)> {
    let response: Response = serde_json::from_str(line).ok()?;
    let result = match response.outcome {
        Outcome::Failure { error } => Err(error.into()),
        Outcome::Success { result } => Ok(result),
    };
    Some((response.id, result))
}

/// Writes queued calls, routes replies by id. Outstanding calls fail with
/// `Disconnected` once either pipe closes.
async fn pump(mut queue: mpsc::Receiver<Call>, mut stdin: ChildStdin, stdout: ChildStdout) {
    let mut reader = BufReader::new(stdout);
    let mut pending: HashMap<u64, Reply> = HashMap::new();
    let mut line = String::new();

    loop {
        tokio::select! {
            call = queue.recv() => {
                let Some(call) = call else { break };
                if stdin.write_all(call.line.as_bytes()).await.is_err() {
                    let _ = call.reply.send(Err(SessionError::Disconnected));
                    break;
                }
                pending.insert(call.id, call.reply);
            }

            read = reader.read_line(&mut line) => {
                match read {
                    Ok(0) => break,
                    Ok(_) => {
                        match decode(&line) {
                            Some((id, result)) => {
                                if let Some(reply) = pending.remove(&id) {
                                    let _ = reply.send(result);
                                }
                            }
                            None => debug!("Ignoring server output: {}", line.trim_end()),
                        }
                        line.clear();
                    }
                    Err(e) => {
                        warn!("Page server stream failed: {}", e);
                        break;
                    }
                }
            }
        }
    }

    for (_, reply) in pending.drain() {
        let _ = reply.send(Err(SessionError::Disconnected));
    }
}
