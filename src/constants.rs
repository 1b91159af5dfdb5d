// MIT License - Copyright (c) 2026 Peter Wright
// Protocol constants for the panel-facing TCP link

use crate::event::EventKind;

/// First byte of a panel identification frame (`!`).
pub const IDENTIFICATION_BYTE: u8 = 0x21;
/// First byte of a panel event frame (`$`).
pub const EVENT_START_BYTE: u8 = 0x24;

/// Reply to an identification frame (`+`).
pub const IDENTIFICATION_ACK: [u8; 1] = [0x2b];
/// Reply to every other frame, recognised or not (`@` ENQ).
pub const STANDARD_ACK: [u8; 2] = [0x40, 0x05];

/// Shortest buffer that is treated as an event frame.
pub const MIN_EVENT_FRAME_LEN: usize = 15;

/// Field offsets inside an event frame, `$AAAAEEEEQQZZZ...`.
/// Half-open byte ranges over the frame (index 0 is the `$`).
pub const ACCOUNT_CODE: std::ops::Range<usize> = 1..5;
pub const EVENT_CODE: std::ops::Range<usize> = 5..9;
pub const QUALIFIER_CODE: std::ops::Range<usize> = 9..11;
pub const ZONE_USER: std::ops::Range<usize> = 11..14;

/// Password used when a command arrives without one.
pub const DEFAULT_PASSWORD: &str = "3574";

/// Event code table: 4-digit code → semantic event kind.
///
/// The arm/disarm entries cover the single-partition and the per-group
/// variants the panel reports; both are treated as synonyms.
pub const EVENT_CODES: &[(&str, EventKind)] = &[
    // Arm
    ("3441", EventKind::Arm),
    ("3401", EventKind::Arm),
    ("3407", EventKind::Arm),
    ("3409", EventKind::Arm),
    // Disarm
    ("1441", EventKind::Disarm),
    ("1401", EventKind::Disarm),
    ("1407", EventKind::Disarm),
    ("1409", EventKind::Disarm),
    // Burglary alarm / restore
    ("1130", EventKind::AlarmTrigger),
    ("3130", EventKind::AlarmRestore),
    // Mains power
    ("1301", EventKind::AcFault),
    ("3301", EventKind::AcRestore),
];

/// Look up an event code. Codes missing from the table are not an error.
pub fn event_kind_for_code(code: &str) -> Option<EventKind> {
    EVENT_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, kind)| *kind)
}
