// MIT License - Copyright (c) 2026 Peter Wright
// Event and command-outcome publishing

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, warn};

use crate::config::Topics;
use crate::error::{BridgeError, Result};
use crate::event::AlarmEvent;
use crate::protocol::CommandOutcome;

/// A serialized payload bound for one bus topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub payload: String,
}

/// Hands serialized events and outcomes to the bus transport.
///
/// Publishing is best-effort: if the transport is not draining the queue the
/// message is dropped and logged, never retried or buffered further.
#[derive(Debug, Clone)]
pub struct Publisher {
    tx: mpsc::Sender<BusMessage>,
    topics: Arc<Topics>,
}

impl Publisher {
    pub fn new(tx: mpsc::Sender<BusMessage>, topics: Topics) -> Self {
        Self {
            tx,
            topics: Arc::new(topics),
        }
    }

    /// Create a publisher and the receiving end the transport drains.
    pub fn channel(topics: Topics, capacity: usize) -> (Self, mpsc::Receiver<BusMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx, topics), rx)
    }

    /// Queue a payload for publication on `topic`.
    pub fn publish(&self, topic: &str, payload: String) -> Result<()> {
        let msg = BusMessage {
            topic: topic.to_string(),
            payload,
        };
        self.tx.try_send(msg).map_err(|e| {
            if let TrySendError::Full(_) = e {
                debug!("Publish queue full");
            }
            BridgeError::BusUnavailable
        })
    }

    /// Publish a decoded panel event on the events topic.
    pub fn publish_event(&self, event: &AlarmEvent) {
        debug!("Publishing {} event", event.kind);
        self.publish_json(&self.topics.events, event);
    }

    /// Publish a command outcome on the responses topic.
    pub fn publish_outcome(&self, outcome: &CommandOutcome) {
        debug!(
            "Publishing outcome {:?} for command {}",
            outcome.status, outcome.command_id
        );
        self.publish_json(&self.topics.responses, outcome);
    }

    fn publish_json(&self, topic: &str, payload: &impl Serialize) {
        match serde_json::to_string(payload) {
            Ok(json) => {
                if let Err(e) = self.publish(topic, json) {
                    warn!("Dropped message for {topic}: {e}");
                }
            }
            Err(e) => error!("Failed to serialize payload for {topic}: {e}"),
        }
    }
}
