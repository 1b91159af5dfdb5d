// MIT License - Copyright (c) 2026 Peter Wright
// Command/response correlation over per-command panel connections

use std::collections::HashMap;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{timeout, timeout_at, Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::{BridgeConfig, LateReplyPolicy};
use crate::error::{BridgeError, Result};
use crate::event::ascii_lossy;
use crate::protocol::{
    CommandEncoder, CommandKind, CommandMessage, CommandOutcome, CommandRequest,
    TextCommandEncoder,
};
use crate::publisher::Publisher;

/// Command id used when an inbound message carries none.
pub const UNKNOWN_COMMAND_ID: &str = "unknown";

/// Pending command ids mapped to the sender their terminal outcome goes to.
/// Removing an entry is the one place a terminal outcome is decided.
type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<CommandOutcome>>>>;

/// Runs bus commands against the panel, one fresh TCP connection per
/// command, and publishes exactly one terminal outcome per command id.
#[derive(Clone)]
pub struct CommandCorrelator {
    pending: PendingMap,
    encoder: Arc<dyn CommandEncoder>,
    publisher: Publisher,
    panel_addr: String,
    command_timeout: Duration,
    session_window: Duration,
    late_reply: LateReplyPolicy,
}

impl CommandCorrelator {
    pub fn new(config: &BridgeConfig, publisher: Publisher) -> Self {
        let encoder = Arc::new(TextCommandEncoder::new(config.default_password.clone()));
        Self::with_encoder(config, publisher, encoder)
    }

    /// Use a different wire encoding for commands.
    pub fn with_encoder(
        config: &BridgeConfig,
        publisher: Publisher,
        encoder: Arc<dyn CommandEncoder>,
    ) -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            encoder,
            publisher,
            panel_addr: config.panel_addr(),
            command_timeout: config.command_timeout(),
            session_window: config.session_window(),
            late_reply: config.late_reply,
        }
    }

    /// Number of commands still waiting for a terminal outcome.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    pub async fn is_pending(&self, id: &str) -> bool {
        self.pending.lock().await.contains_key(id)
    }

    /// Handle a raw payload from the commands topic.
    ///
    /// Returns immediately; the command runs on its own task.
    pub fn handle_payload(&self, payload: &[u8]) {
        let mut msg = match CommandMessage::parse(payload) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Failed to parse command: {e}");
                self.publisher.publish_outcome(&CommandOutcome::error(
                    UNKNOWN_COMMAND_ID,
                    "Invalid command JSON",
                ));
                return;
            }
        };

        let (id, command) = match (msg.id.take(), msg.command.take()) {
            (Some(id), Some(command)) => (id, command),
            (id, _) => {
                warn!("Command is missing required fields");
                let id = id.unwrap_or_else(|| UNKNOWN_COMMAND_ID.to_string());
                self.publisher.publish_outcome(&CommandOutcome::error(
                    id,
                    "Missing required fields: id and command",
                ));
                return;
            }
        };

        info!("Command received: {command} (id {id})");
        let checked = command
            .parse::<CommandKind>()
            .and_then(|kind| msg.decode_parameters().map(|parameters| (kind, parameters)));
        match checked {
            Ok((kind, parameters)) => {
                self.submit(CommandRequest::new(id, kind, parameters, self.command_timeout));
            }
            Err(e) => {
                let this = self.clone();
                tokio::spawn(async move {
                    this.reject(id, &command, e).await;
                });
            }
        }
    }

    /// Run a request on its own task.
    pub fn submit(&self, request: CommandRequest) -> JoinHandle<Option<CommandOutcome>> {
        let this = self.clone();
        tokio::spawn(async move { this.execute(request).await })
    }

    /// Run one command to its terminal outcome and publish it.
    ///
    /// Returns `None` when a command with the same id is already in flight;
    /// nothing is published for the duplicate.
    pub async fn execute(&self, request: CommandRequest) -> Option<CommandOutcome> {
        let CommandRequest {
            id,
            kind,
            parameters,
            deadline,
        } = request;

        let rx = match self.register(&id).await {
            Ok(rx) => rx,
            Err(e) => {
                warn!("Ignoring command: {e}");
                return None;
            }
        };

        // Encode before connecting: a command that cannot be built never
        // opens a panel connection.
        match self.encoder.encode(kind, &parameters) {
            Ok(command) => {
                let this = self.clone();
                let session_id = id.clone();
                tokio::spawn(async move {
                    this.run_session(session_id, kind, command).await;
                });
            }
            Err(e) => {
                error!("Failed to build command {kind} ({id}): {e}");
                let outcome =
                    CommandOutcome::error(&id, format!("Failed to build command {kind}: {e}"));
                self.finish(&id, outcome).await;
            }
        }

        Some(self.await_outcome(&id, kind.as_str(), deadline, rx).await)
    }

    /// Publish a terminal ERROR for a command that failed validation.
    async fn reject(&self, id: String, command: &str, error: BridgeError) -> Option<CommandOutcome> {
        let rx = match self.register(&id).await {
            Ok(rx) => rx,
            Err(e) => {
                warn!("Ignoring command: {e}");
                return None;
            }
        };
        warn!("Rejecting command {command} ({id}): {error}");
        self.finish(&id, CommandOutcome::error(&id, error.to_string()))
            .await;
        let deadline = Instant::now() + self.command_timeout;
        Some(self.await_outcome(&id, command, deadline, rx).await)
    }

    async fn register(&self, id: &str) -> Result<oneshot::Receiver<CommandOutcome>> {
        let mut pending = self.pending.lock().await;
        if pending.contains_key(id) {
            return Err(BridgeError::DuplicateCommand { id: id.to_string() });
        }
        let (tx, rx) = oneshot::channel();
        pending.insert(id.to_string(), tx);
        Ok(rx)
    }

    /// Try to make `outcome` the terminal outcome for `id`. Returns false if
    /// another path already resolved or retired the command.
    async fn resolve(&self, id: &str, outcome: CommandOutcome) -> bool {
        let mut pending = self.pending.lock().await;
        match pending.remove(id) {
            Some(sender) => {
                // Sent under the lock so the timeout path sees either the
                // entry or the delivered outcome.
                let _ = sender.send(outcome);
                true
            }
            None => false,
        }
    }

    /// Resolve from the connection side, applying the late-reply policy.
    async fn finish(&self, id: &str, outcome: CommandOutcome) {
        if !self.resolve(id, outcome).await {
            match self.late_reply {
                LateReplyPolicy::Discard => {}
                LateReplyPolicy::Log => {
                    debug!("Discarding late result for command {id}: already resolved");
                }
            }
        }
    }

    /// Wait for the connection to resolve the command or for the deadline,
    /// whichever comes first, then publish the terminal outcome.
    async fn await_outcome(
        &self,
        id: &str,
        label: &str,
        deadline: Instant,
        mut rx: oneshot::Receiver<CommandOutcome>,
    ) -> CommandOutcome {
        let timed_out = || {
            CommandOutcome::error(
                id,
                BridgeError::CommandTimeout {
                    command: label.to_string(),
                }
                .to_string(),
            )
        };

        let outcome = match timeout_at(deadline, &mut rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => {
                self.pending.lock().await.remove(id);
                CommandOutcome::error(id, "Command abandoned")
            }
            Err(_) => {
                let retired = self.pending.lock().await.remove(id).is_some();
                if retired {
                    warn!("Command {label} ({id}) timed out");
                    timed_out()
                } else {
                    // The connection resolved it while the deadline fired.
                    rx.try_recv().unwrap_or_else(|_| timed_out())
                }
            }
        };

        self.publisher.publish_outcome(&outcome);
        outcome
    }

    /// Connection side of one command: connect, write, publish SENT, capture
    /// the first reply. The socket is closed when this returns, at the latest
    /// one session window after connecting.
    async fn run_session(self, id: String, kind: CommandKind, command: Vec<u8>) {
        info!("Connecting to panel {} for command {kind} ({id})", self.panel_addr);

        let mut stream =
            match timeout(self.session_window, TcpStream::connect(self.panel_addr.as_str())).await {
                Ok(Ok(stream)) => stream,
                Ok(Err(e)) => {
                    error!("Connection to panel failed for command {kind} ({id}): {e}");
                    let outcome = CommandOutcome::error(&id, format!("Connection error: {e}"));
                    self.finish(&id, outcome).await;
                    return;
                }
                Err(_) => {
                    error!("Connection to panel timed out for command {kind} ({id})");
                    let outcome = CommandOutcome::error(&id, BridgeError::ConnectTimeout.to_string());
                    self.finish(&id, outcome).await;
                    return;
                }
            };
        let close_at = Instant::now() + self.session_window;

        debug!(
            "Sending {kind}: HEX {} ASCII {:?}",
            hex::encode(&command),
            ascii_lossy(&command)
        );
        if let Err(e) = stream.write_all(&command).await {
            error!("Failed to write command {kind} ({id}): {e}");
            let outcome = CommandOutcome::error(&id, format!("Write error: {e}"));
            self.finish(&id, outcome).await;
            return;
        }

        {
            // Held across the publish so a terminal outcome cannot be
            // decided and published in between.
            let pending = self.pending.lock().await;
            if pending.contains_key(&id) {
                info!("Command {kind} ({id}) sent to panel");
                self.publisher.publish_outcome(&CommandOutcome::sent(&id, kind));
            }
        }

        let mut buf = vec![0u8; 4096];
        match timeout_at(close_at, stream.read(&mut buf)).await {
            Ok(Ok(0)) => {
                debug!("Panel closed connection for command {kind} ({id}) without replying");
            }
            Ok(Ok(n)) => {
                let reply = &buf[..n];
                debug!(
                    "Reply to {kind} ({id}): HEX {} ASCII {:?}",
                    hex::encode(reply),
                    ascii_lossy(reply)
                );
                self.finish(&id, CommandOutcome::response(&id, kind, reply))
                    .await;
            }
            Ok(Err(e)) => {
                error!("Connection error for command {kind} ({id}): {e}");
                let outcome = CommandOutcome::error(&id, format!("Connection error: {e}"));
                self.finish(&id, outcome).await;
            }
            Err(_) => {
                debug!("Closing connection for command {kind} ({id}) after session window");
            }
        }
    }
}
