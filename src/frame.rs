// MIT License - Copyright (c) 2026 Peter Wright
// Frame classification and event extraction

use std::net::SocketAddr;

use tracing::{debug, warn};

use crate::constants::{
    event_kind_for_code, ACCOUNT_CODE, EVENT_CODE, EVENT_START_BYTE, IDENTIFICATION_BYTE,
    MIN_EVENT_FRAME_LEN, QUALIFIER_CODE, ZONE_USER,
};
use crate::error::{BridgeError, Result};
use crate::event::{now_timestamp, AlarmEvent, EventKind, RawData};

/// One chunk of bytes as delivered by a single read on a panel connection.
#[derive(Debug, Clone, Copy)]
pub struct RawFrame<'a> {
    pub peer: SocketAddr,
    pub data: &'a [u8],
}

/// Classification of a raw frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Panel identification (first byte `!`).
    Identification,
    /// A `$`-prefixed event frame with its decoded fields.
    Event(AlarmEvent),
    /// Anything else, including short or malformed event frames.
    Unmatched,
}

/// Classify a frame. Never fails: decode faults degrade to `Unmatched`.
pub fn decode(frame: &RawFrame<'_>) -> Frame {
    match frame.data.first() {
        Some(&IDENTIFICATION_BYTE) => Frame::Identification,
        Some(&EVENT_START_BYTE) if frame.data.len() >= MIN_EVENT_FRAME_LEN => {
            match parse_event(frame.data) {
                Ok(event) => Frame::Event(event),
                Err(e) => {
                    warn!("Undecodable event frame from {}: {e}", frame.peer);
                    Frame::Unmatched
                }
            }
        }
        _ => {
            debug!("Unmatched frame from {} ({} bytes)", frame.peer, frame.data.len());
            Frame::Unmatched
        }
    }
}

/// Extract the fixed-offset fields of a `$AAAAEEEEQQZZZ...` event frame.
pub fn parse_event(data: &[u8]) -> Result<AlarmEvent> {
    if data.len() < MIN_EVENT_FRAME_LEN {
        return Err(BridgeError::FrameTooShort {
            len: data.len(),
            min: MIN_EVENT_FRAME_LEN,
        });
    }

    let account_code = field(data, ACCOUNT_CODE, "account_code")?;
    let event_code = field(data, EVENT_CODE, "event_code")?;
    let qualifier_code = field(data, QUALIFIER_CODE, "qualifier_code")?;
    let zone_user = field(data, ZONE_USER, "zone_user")?;

    let (kind, message) = match event_kind_for_code(&event_code) {
        Some(kind) => (kind, event_message(kind, &event_code, &zone_user)),
        None => (EventKind::Unknown, format!("Unknown event: {event_code}")),
    };

    Ok(AlarmEvent {
        kind,
        event_code: Some(event_code),
        account_code: Some(account_code),
        qualifier_code: Some(qualifier_code),
        zone_user: Some(zone_user),
        message,
        timestamp: now_timestamp(),
        raw: RawData::from_bytes(data),
    })
}

fn field(data: &[u8], range: std::ops::Range<usize>, name: &'static str) -> Result<String> {
    let bytes = data
        .get(range)
        .ok_or(BridgeError::FrameTooShort {
            len: data.len(),
            min: MIN_EVENT_FRAME_LEN,
        })?;
    if !bytes.is_ascii() {
        return Err(BridgeError::NonAsciiField { field: name });
    }
    Ok(bytes.iter().map(|&b| b as char).collect())
}

/// Human-readable summary of an event.
pub fn event_message(kind: EventKind, event_code: &str, zone_user: &str) -> String {
    let zone = match u32::from_str_radix(zone_user, 16) {
        Ok(z) => z.to_string(),
        Err(_) => zone_user.to_string(),
    };
    match kind {
        EventKind::Arm => format!("System armed - code: {event_code}, zone/user: {zone}"),
        EventKind::Disarm => format!("System disarmed - code: {event_code}, zone/user: {zone}"),
        EventKind::AlarmTrigger => format!("Alarm triggered - zone: {zone}"),
        EventKind::AlarmRestore => format!("Alarm restored - zone: {zone}"),
        EventKind::AcFault => format!("AC power failure - code: {event_code}"),
        EventKind::AcRestore => format!("AC power restored - code: {event_code}"),
        EventKind::Identification | EventKind::Unknown => {
            format!("Event {kind} - code: {event_code}, zone/user: {zone}")
        }
    }
}
