// MIT License - Copyright (c) 2026 Peter Wright
// Bus-originated commands and their outcomes

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::{Duration, Instant};

use crate::constants::DEFAULT_PASSWORD;
use crate::error::{BridgeError, Result};
use crate::event::{now_timestamp, RawData};

/// Commands accepted on the commands topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKind {
    Arm,
    Disarm,
    ArmTotal,
    ArmPartial,
    InhibitZone,
    UninhibitZone,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arm => "ARM",
            Self::Disarm => "DISARM",
            Self::ArmTotal => "ARM_TOTAL",
            Self::ArmPartial => "ARM_PARTIAL",
            Self::InhibitZone => "INHIBIT_ZONE",
            Self::UninhibitZone => "UNINHIBIT_ZONE",
        }
    }

    /// Whether the command targets a single zone.
    pub fn requires_zone(&self) -> bool {
        matches!(self, Self::InhibitZone | Self::UninhibitZone)
    }
}

impl FromStr for CommandKind {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ARM" => Ok(Self::Arm),
            "DISARM" => Ok(Self::Disarm),
            "ARM_TOTAL" => Ok(Self::ArmTotal),
            "ARM_PARTIAL" => Ok(Self::ArmPartial),
            "INHIBIT_ZONE" => Ok(Self::InhibitZone),
            "UNINHIBIT_ZONE" => Ok(Self::UninhibitZone),
            other => Err(BridgeError::UnknownCommand {
                command: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CommandParameters {
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub zone: Option<u32>,
}

/// Inbound command as published on the commands topic.
///
/// Only a JSON syntax error fails `parse`. Missing or mistyped fields are
/// left for the caller so the ERROR outcome can still carry the command id.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandMessage {
    pub id: Option<String>,
    pub command: Option<String>,
    /// Raw `parameters` value, checked by [`CommandMessage::decode_parameters`].
    pub parameters: Option<Value>,
    pub timestamp: Option<String>,
}

impl CommandMessage {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(payload)?;
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        Ok(Self {
            id: text("id"),
            command: text("command"),
            parameters: value.get("parameters").filter(|p| !p.is_null()).cloned(),
            timestamp: text("timestamp"),
        })
    }

    /// Typed parameters; absent parameters decode to the defaults.
    pub fn decode_parameters(&self) -> Result<CommandParameters> {
        match &self.parameters {
            None => Ok(CommandParameters::default()),
            Some(value) => CommandParameters::deserialize(value)
                .map_err(|e| BridgeError::InvalidParameters(e.to_string())),
        }
    }
}

/// A validated command, consumed once by the correlator.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub id: String,
    pub kind: CommandKind,
    pub parameters: CommandParameters,
    /// Point after which the request is retired with a timeout.
    pub deadline: Instant,
}

impl CommandRequest {
    /// Create a request whose deadline runs from now.
    pub fn new(
        id: impl Into<String>,
        kind: CommandKind,
        parameters: CommandParameters,
        timeout: Duration,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            parameters,
            deadline: Instant::now() + timeout,
        }
    }
}

/// Turns a command into the bytes written to the panel.
///
/// The panel's real command format is unconfirmed, so the encoding is kept
/// behind this trait.
pub trait CommandEncoder: Send + Sync {
    fn encode(&self, kind: CommandKind, parameters: &CommandParameters) -> Result<Vec<u8>>;
}

/// Textual `<KIND>:<params>\n` encoding.
///
/// Zone commands encode as `<KIND>:<zone>:<password>\n`, the rest as
/// `<KIND>:<password>\n`.
#[derive(Debug, Clone)]
pub struct TextCommandEncoder {
    default_password: String,
}

impl TextCommandEncoder {
    pub fn new(default_password: impl Into<String>) -> Self {
        Self {
            default_password: default_password.into(),
        }
    }
}

impl Default for TextCommandEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_PASSWORD)
    }
}

impl CommandEncoder for TextCommandEncoder {
    fn encode(&self, kind: CommandKind, parameters: &CommandParameters) -> Result<Vec<u8>> {
        let password = parameters
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.default_password);

        let line = if kind.requires_zone() {
            let zone = parameters.zone.ok_or_else(|| BridgeError::MissingZone {
                command: kind.as_str().to_string(),
            })?;
            format!("{kind}:{zone}:{password}\n")
        } else {
            format!("{kind}:{password}\n")
        };
        Ok(line.into_bytes())
    }
}

/// Status of a command outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeStatus {
    /// Command written to the panel. Not terminal.
    Sent,
    /// Panel replied. Terminal.
    Response,
    /// Build, transport or timeout failure. Terminal.
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseData {
    pub command_type: CommandKind,
    pub response: RawData,
}

/// Published on the command-responses topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutcome {
    pub command_id: String,
    pub status: OutcomeStatus,
    pub message: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl CommandOutcome {
    pub fn sent(command_id: impl Into<String>, kind: CommandKind) -> Self {
        Self {
            command_id: command_id.into(),
            status: OutcomeStatus::Sent,
            message: format!("Command {kind} sent to panel"),
            timestamp: now_timestamp(),
            data: None,
        }
    }

    pub fn response(command_id: impl Into<String>, kind: CommandKind, reply: &[u8]) -> Self {
        Self {
            command_id: command_id.into(),
            status: OutcomeStatus::Response,
            message: format!("Panel response to {kind}"),
            timestamp: now_timestamp(),
            data: Some(ResponseData {
                command_type: kind,
                response: RawData::from_bytes(reply),
            }),
        }
    }

    pub fn error(command_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            command_id: command_id.into(),
            status: OutcomeStatus::Error,
            message: message.into(),
            timestamp: now_timestamp(),
            data: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != OutcomeStatus::Sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(password: Option<&str>, zone: Option<u32>) -> CommandParameters {
        CommandParameters {
            password: password.map(str::to_string),
            zone,
        }
    }

    #[test]
    fn test_command_kind_round_trip_names() {
        for name in ["ARM", "DISARM", "ARM_TOTAL", "ARM_PARTIAL", "INHIBIT_ZONE", "UNINHIBIT_ZONE"] {
            let kind: CommandKind = name.parse().unwrap();
            assert_eq!(kind.as_str(), name);
            assert_eq!(serde_json::to_value(kind).unwrap(), name);
        }
    }

    #[test]
    fn test_unknown_command_kind() {
        let err = "PANIC".parse::<CommandKind>().unwrap_err();
        assert!(matches!(err, BridgeError::UnknownCommand { ref command } if command == "PANIC"));
        assert!("arm".parse::<CommandKind>().is_err());
    }

    #[test]
    fn test_text_encoding() {
        let enc = TextCommandEncoder::default();
        assert_eq!(enc.encode(CommandKind::Arm, &params(Some("1234"), None)).unwrap(), b"ARM:1234\n");
        assert_eq!(
            enc.encode(CommandKind::ArmPartial, &params(Some("1234"), None)).unwrap(),
            b"ARM_PARTIAL:1234\n"
        );
        assert_eq!(
            enc.encode(CommandKind::InhibitZone, &params(Some("1234"), Some(7))).unwrap(),
            b"INHIBIT_ZONE:7:1234\n"
        );
    }

    #[test]
    fn test_default_password() {
        let enc = TextCommandEncoder::default();
        assert_eq!(enc.encode(CommandKind::Disarm, &params(None, None)).unwrap(), b"DISARM:3574\n");
        assert_eq!(enc.encode(CommandKind::Disarm, &params(Some(""), None)).unwrap(), b"DISARM:3574\n");

        let enc = TextCommandEncoder::new("0000");
        assert_eq!(
            enc.encode(CommandKind::UninhibitZone, &params(None, Some(2))).unwrap(),
            b"UNINHIBIT_ZONE:2:0000\n"
        );
    }

    #[test]
    fn test_zone_commands_require_zone() {
        let enc = TextCommandEncoder::default();
        for kind in [CommandKind::InhibitZone, CommandKind::UninhibitZone] {
            let err = enc.encode(kind, &params(Some("1234"), None)).unwrap_err();
            assert!(matches!(err, BridgeError::MissingZone { .. }));
        }
        // Zone is ignored for partition-wide commands
        assert_eq!(enc.encode(CommandKind::ArmTotal, &params(None, Some(3))).unwrap(), b"ARM_TOTAL:3574\n");
    }

    #[test]
    fn test_parse_command_message() {
        let msg = CommandMessage::parse(
            br#"{"id":"c-1","command":"INHIBIT_ZONE","parameters":{"zone":7,"password":"3574"},"timestamp":"2026-01-01T00:00:00.000Z"}"#,
        )
        .unwrap();
        assert_eq!(msg.id.as_deref(), Some("c-1"));
        assert_eq!(msg.command.as_deref(), Some("INHIBIT_ZONE"));
        assert_eq!(msg.decode_parameters().unwrap(), params(Some("3574"), Some(7)));
        assert_eq!(msg.timestamp.as_deref(), Some("2026-01-01T00:00:00.000Z"));

        let msg = CommandMessage::parse(br#"{"command":"ARM"}"#).unwrap();
        assert!(msg.id.is_none());
        assert!(msg.parameters.is_none());
        assert_eq!(msg.decode_parameters().unwrap(), CommandParameters::default());

        let msg = CommandMessage::parse(br#"{"id":"c-2","command":"ARM","parameters":null}"#).unwrap();
        assert_eq!(msg.decode_parameters().unwrap(), CommandParameters::default());

        assert!(matches!(
            CommandMessage::parse(b"not json"),
            Err(BridgeError::InvalidCommandMessage(_))
        ));
    }

    #[test]
    fn test_bad_parameters_keep_the_id() {
        let payloads: [&[u8]; 4] = [
            br#"{"id":"abc-123","command":"INHIBIT_ZONE","parameters":{"zone":"7","password":"1234"}}"#,
            br#"{"id":"abc-456","command":"ARM","parameters":{"zone":-1}}"#,
            br#"{"id":"abc-789","command":"ARM","parameters":{"password":1234}}"#,
            br#"{"id":"abc-000","command":"ARM","parameters":"oops"}"#,
        ];
        for payload in payloads {
            let msg = CommandMessage::parse(payload).unwrap();
            assert!(msg.id.as_deref().is_some_and(|id| id.starts_with("abc-")));
            let err = msg.decode_parameters().unwrap_err();
            assert!(matches!(err, BridgeError::InvalidParameters(_)), "{err}");
        }
    }

    #[test]
    fn test_mistyped_id_counts_as_missing() {
        let msg = CommandMessage::parse(br#"{"id":42,"command":"ARM"}"#).unwrap();
        assert!(msg.id.is_none());
        assert_eq!(msg.command.as_deref(), Some("ARM"));
        // Valid JSON that is not an object has no fields at all
        let msg = CommandMessage::parse(b"[1, 2]").unwrap();
        assert!(msg.id.is_none() && msg.command.is_none());
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(CommandOutcome::sent("c-1", CommandKind::Arm)).unwrap();
        assert_eq!(json["status"], "SENT");
        assert_eq!(json["message"], "Command ARM sent to panel");
        assert!(json.get("data").is_none());

        let json =
            serde_json::to_value(CommandOutcome::response("c-2", CommandKind::Disarm, b"OK\r")).unwrap();
        assert_eq!(json["command_id"], "c-2");
        assert_eq!(json["status"], "RESPONSE");
        assert_eq!(json["data"]["command_type"], "DISARM");
        assert_eq!(json["data"]["response"]["hex"], "4f4b0d");
        assert_eq!(json["data"]["response"]["ascii"], "OK\r");
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!CommandOutcome::sent("a", CommandKind::Arm).is_terminal());
        assert!(CommandOutcome::response("a", CommandKind::Arm, b"").is_terminal());
        assert!(CommandOutcome::error("a", "boom").is_terminal());
    }
}
