// MIT License - Copyright (c) 2026 Peter Wright
// Error types

use std::fmt;

/// Broad failure classes. Each one is handled at the boundary of the unit of
/// work that produced it (one panel connection or one command).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed, short or unrecognised frame. Degrades to the standard ack.
    ProtocolDecodeFailure,
    /// Bad command kind or missing parameter. Reported as an ERROR outcome.
    CommandBuildFailure,
    /// TCP or bus failure. Reported as an ERROR outcome, or logged and dropped.
    TransportFailure,
    /// No panel reply before the request deadline.
    CorrelationTimeout,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ProtocolDecodeFailure => "protocol decode failure",
            Self::CommandBuildFailure => "command build failure",
            Self::TransportFailure => "transport failure",
            Self::CorrelationTimeout => "correlation timeout",
        };
        f.write_str(s)
    }
}

/// All errors that can occur in the alarm bridge library.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame too short: {len} bytes (need {min})")]
    FrameTooShort { len: usize, min: usize },

    #[error("Non-ASCII data in {field} field")]
    NonAsciiField { field: &'static str },

    #[error("Unknown command: {command}")]
    UnknownCommand { command: String },

    #[error("Zone not specified for {command}")]
    MissingZone { command: String },

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Invalid command message: {0}")]
    InvalidCommandMessage(#[from] serde_json::Error),

    #[error("Timeout waiting for panel response to {command}")]
    CommandTimeout { command: String },

    #[error("Command {id} is already in flight")]
    DuplicateCommand { id: String },

    #[error("Bus not connected")]
    BusUnavailable,

    #[error("Connection to panel timed out")]
    ConnectTimeout,
}

impl BridgeError {
    /// Which failure class this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            BridgeError::FrameTooShort { .. } | BridgeError::NonAsciiField { .. } => {
                ErrorCategory::ProtocolDecodeFailure
            }
            BridgeError::UnknownCommand { .. }
            | BridgeError::MissingZone { .. }
            | BridgeError::InvalidParameters(_)
            | BridgeError::InvalidCommandMessage(_)
            | BridgeError::DuplicateCommand { .. } => ErrorCategory::CommandBuildFailure,
            BridgeError::Io(_) | BridgeError::BusUnavailable | BridgeError::ConnectTimeout => {
                ErrorCategory::TransportFailure
            }
            BridgeError::CommandTimeout { .. } => ErrorCategory::CorrelationTimeout,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            BridgeError::FrameTooShort { len: 3, min: 15 }.category(),
            ErrorCategory::ProtocolDecodeFailure
        );
        assert_eq!(
            BridgeError::MissingZone { command: "INHIBIT_ZONE".into() }.category(),
            ErrorCategory::CommandBuildFailure
        );
        assert_eq!(
            BridgeError::InvalidParameters("zone".into()).category(),
            ErrorCategory::CommandBuildFailure
        );
        assert_eq!(
            BridgeError::Io(std::io::Error::from(std::io::ErrorKind::ConnectionRefused)).category(),
            ErrorCategory::TransportFailure
        );
        assert_eq!(
            BridgeError::CommandTimeout { command: "ARM".into() }.category(),
            ErrorCategory::CorrelationTimeout
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(
            BridgeError::UnknownCommand { command: "SELF_DESTRUCT".into() }.to_string(),
            "Unknown command: SELF_DESTRUCT"
        );
        assert_eq!(
            BridgeError::CommandTimeout { command: "DISARM".into() }.to_string(),
            "Timeout waiting for panel response to DISARM"
        );
    }
}
