// MIT License - Copyright (c) 2026 Peter Wright
// Alarm events decoded from panel frames

use std::fmt;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

/// Semantic kind of a panel event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Identification,
    Arm,
    Disarm,
    AlarmTrigger,
    AlarmRestore,
    AcFault,
    AcRestore,
    /// Event code not present in the code table. Still published.
    Unknown,
}

impl EventKind {
    /// The wire string used in the `type` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identification => "IDENTIFICATION",
            Self::Arm => "ARM",
            Self::Disarm => "DISARM",
            Self::AlarmTrigger => "ALARM_TRIGGER",
            Self::AlarmRestore => "ALARM_RESTORE",
            Self::AcFault => "AC_FAULT",
            Self::AcRestore => "AC_RESTORE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hex and ASCII renderings of the bytes that produced an event or reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawData {
    pub hex: String,
    pub ascii: String,
}

impl RawData {
    pub fn from_bytes(data: &[u8]) -> Self {
        Self {
            hex: hex::encode(data),
            ascii: ascii_lossy(data),
        }
    }
}

/// Render bytes as 7-bit ASCII; the high bit is dropped.
pub fn ascii_lossy(data: &[u8]) -> String {
    data.iter().map(|b| (b & 0x7f) as char).collect()
}

/// Current time as an RFC 3339 UTC string with millisecond precision.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A decoded panel event, serialized as published on the events topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlarmEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualifier_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_user: Option<String>,
    pub message: String,
    pub timestamp: String,
    #[serde(rename = "raw_data")]
    pub raw: RawData,
}

impl AlarmEvent {
    /// Event for an identification frame; it carries only the raw bytes.
    pub fn identification(data: &[u8]) -> Self {
        Self {
            kind: EventKind::Identification,
            event_code: None,
            account_code: None,
            qualifier_code: None,
            zone_user: None,
            message: "Panel identification".to_string(),
            timestamp: now_timestamp(),
            raw: RawData::from_bytes(data),
        }
    }

    /// The zone/user field decoded from hex, if present and valid.
    pub fn zone(&self) -> Option<u32> {
        self.zone_user
            .as_deref()
            .and_then(|z| u32::from_str_radix(z, 16).ok())
    }
}
