// MIT License - Copyright (c) 2026 Peter Wright
// Bridge configuration

use serde::Deserialize;
use tokio::time::Duration;

use crate::constants::DEFAULT_PASSWORD;

/// What to do with a panel reply that arrives after its command already
/// has a terminal outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LateReplyPolicy {
    /// Drop without a trace.
    #[default]
    Discard,
    /// Drop, but note it in the debug log.
    Log,
}

/// Bus topic names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    /// Decoded panel events are published here.
    pub events: String,
    /// Commands are received here.
    pub commands: String,
    /// Command outcomes are published here.
    pub responses: String,
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            events: "alarm/events".to_string(),
            commands: "alarm/commands".to_string(),
            responses: "alarm/command_responses".to_string(),
        }
    }
}

/// Configuration for the bridge core. Immutable once built.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Port the panel connects to (default: 9999)
    pub listening_port: u16,
    /// Panel address for outbound commands
    pub panel_host: String,
    /// Panel command port (default: 9080)
    pub panel_port: u16,
    /// Password used when a command carries none (default: 3574)
    pub default_password: String,
    /// Deadline for a command, measured from when it was received
    pub command_timeout_ms: u64,
    /// How long a command connection stays open after connecting
    pub session_window_ms: u64,
    pub late_reply: LateReplyPolicy,
    pub topics: Topics,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            listening_port: 9999,
            panel_host: "192.168.6.131".to_string(),
            panel_port: 9080,
            default_password: DEFAULT_PASSWORD.to_string(),
            command_timeout_ms: 10000,
            session_window_ms: 10000,
            late_reply: LateReplyPolicy::Discard,
            topics: Topics::default(),
        }
    }
}

impl BridgeConfig {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }

    /// `host:port` of the panel command endpoint.
    pub fn panel_addr(&self) -> String {
        format!("{}:{}", self.panel_host, self.panel_port)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn session_window(&self) -> Duration {
        Duration::from_millis(self.session_window_ms)
    }
}

/// Builder for BridgeConfig.
#[derive(Debug, Clone, Default)]
pub struct BridgeConfigBuilder {
    config: BridgeConfig,
}

impl BridgeConfigBuilder {
    pub fn listening_port(mut self, port: u16) -> Self {
        self.config.listening_port = port;
        self
    }

    pub fn panel_host(mut self, host: impl Into<String>) -> Self {
        self.config.panel_host = host.into();
        self
    }

    pub fn panel_port(mut self, port: u16) -> Self {
        self.config.panel_port = port;
        self
    }

    pub fn default_password(mut self, password: impl Into<String>) -> Self {
        self.config.default_password = password.into();
        self
    }

    pub fn command_timeout_ms(mut self, ms: u64) -> Self {
        self.config.command_timeout_ms = ms;
        self
    }

    pub fn session_window_ms(mut self, ms: u64) -> Self {
        self.config.session_window_ms = ms;
        self
    }

    pub fn late_reply(mut self, policy: LateReplyPolicy) -> Self {
        self.config.late_reply = policy;
        self
    }

    pub fn events_topic(mut self, topic: impl Into<String>) -> Self {
        self.config.topics.events = topic.into();
        self
    }

    pub fn commands_topic(mut self, topic: impl Into<String>) -> Self {
        self.config.topics.commands = topic.into();
        self
    }

    pub fn responses_topic(mut self, topic: impl Into<String>) -> Self {
        self.config.topics.responses = topic.into();
        self
    }

    pub fn build(self) -> BridgeConfig {
        self.config
    }
}
