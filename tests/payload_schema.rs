// Schema validation tests for the MQTT wire format
//
// Literal instances are built with json! independent of the Rust structs;
// the remaining tests validate what the library itself serializes.

use alarm_bridge::{decode, AlarmEvent, CommandKind, CommandOutcome, Frame, RawFrame};
use serde_json::json;

fn load_schema(name: &str) -> serde_json::Value {
    let path = format!("{}/schemas/mqtt/{name}", env!("CARGO_MANIFEST_DIR"));
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read schema {path}: {e}"));
    serde_json::from_str(&text).unwrap_or_else(|e| panic!("Failed to parse schema {path}: {e}"))
}

fn build_validator(schema_name: &str) -> jsonschema::Validator {
    let schema = load_schema(schema_name);
    jsonschema::validator_for(&schema)
        .unwrap_or_else(|e| panic!("Failed to compile schema {schema_name}: {e}"))
}

fn validate(schema_name: &str, instance: &serde_json::Value) {
    let validator = build_validator(schema_name);
    let errors: Vec<_> = validator.iter_errors(instance).collect();
    if !errors.is_empty() {
        let msgs: Vec<String> = errors.iter().map(|e| format!("  - {e}")).collect();
        panic!(
            "Schema validation failed for {schema_name}:\n{}\nInstance: {}",
            msgs.join("\n"),
            serde_json::to_string_pretty(instance).unwrap()
        );
    }
}

fn validate_fails(schema_name: &str, instance: &serde_json::Value) {
    let validator = build_validator(schema_name);
    assert!(
        !validator.is_valid(instance),
        "Expected schema validation to fail for {schema_name}, but it passed.\nInstance: {}",
        serde_json::to_string_pretty(instance).unwrap()
    );
}

fn decoded_event(data: &[u8]) -> AlarmEvent {
    let frame = RawFrame {
        peer: "192.168.6.131:40000".parse().unwrap(),
        data,
    };
    match decode(&frame) {
        Frame::Event(event) => event,
        other => panic!("Expected an event frame, got {other:?}"),
    }
}

// =========================================================================
// Events
// =========================================================================

#[test]
fn event_valid() {
    validate(
        "event.schema.json",
        &json!({
            "type": "ALARM_TRIGGER",
            "account_code": "0001",
            "event_code": "1130",
            "qualifier_code": "00",
            "zone_user": "005",
            "message": "Alarm triggered - zone: 5",
            "timestamp": "2026-10-16T09:30:00.123Z",
            "raw_data": { "hex": "2430303031313133303030303035", "ascii": "$0001113000005" }
        }),
    );
}

#[test]
fn event_identification_valid() {
    validate(
        "event.schema.json",
        &json!({
            "type": "IDENTIFICATION",
            "message": "Panel identification",
            "timestamp": "2026-10-16T09:30:00.123Z",
            "raw_data": { "hex": "21", "ascii": "!" }
        }),
    );
}

#[test]
fn event_identification_with_codes_fails() {
    validate_fails(
        "event.schema.json",
        &json!({
            "type": "IDENTIFICATION",
            "event_code": "1130",
            "message": "Panel identification",
            "timestamp": "2026-10-16T09:30:00.123Z",
            "raw_data": { "hex": "21", "ascii": "!" }
        }),
    );
}

#[test]
fn event_missing_codes_fails() {
    validate_fails(
        "event.schema.json",
        &json!({
            "type": "ARM",
            "message": "System armed",
            "timestamp": "2026-10-16T09:30:00.123Z",
            "raw_data": { "hex": "24", "ascii": "$" }
        }),
    );
}

#[test]
fn event_wrong_type_fails() {
    validate_fails(
        "event.schema.json",
        &json!({
            "type": "FIRE",
            "message": "x",
            "timestamp": "2026-10-16T09:30:00.123Z",
            "raw_data": { "hex": "21", "ascii": "!" }
        }),
    );
}

#[test]
fn event_serialized_by_library() {
    let frames: [&[u8]; 4] = [
        b"$00011407010008.",
        b"$00013441010003A",
        b"$000111300000500",
        b"$00019999000001Z",
    ];
    for data in frames {
        let event = decoded_event(data);
        validate("event.schema.json", &serde_json::to_value(&event).unwrap());
    }
    let ident = AlarmEvent::identification(&[0x21]);
    validate("event.schema.json", &serde_json::to_value(&ident).unwrap());
}

// =========================================================================
// Commands
// =========================================================================

#[test]
fn command_valid() {
    validate(
        "command.schema.json",
        &json!({
            "id": "c-42",
            "command": "ARM_TOTAL",
            "parameters": { "password": "1234" },
            "timestamp": "2026-10-16T09:30:00.000Z"
        }),
    );
}

#[test]
fn command_zone_valid() {
    validate(
        "command.schema.json",
        &json!({
            "id": "c-43",
            "command": "INHIBIT_ZONE",
            "parameters": { "zone": 7 }
        }),
    );
}

#[test]
fn command_zone_missing_fails() {
    validate_fails(
        "command.schema.json",
        &json!({
            "id": "c-44",
            "command": "UNINHIBIT_ZONE",
            "parameters": { "password": "1234" }
        }),
    );
}

#[test]
fn command_missing_id_fails() {
    validate_fails("command.schema.json", &json!({ "command": "ARM" }));
}

// =========================================================================
// Command responses
// =========================================================================

#[test]
fn response_valid() {
    validate(
        "command_response.schema.json",
        &json!({
            "command_id": "c-42",
            "status": "RESPONSE",
            "message": "Panel response to ARM_TOTAL",
            "timestamp": "2026-10-16T09:30:00.456Z",
            "data": {
                "command_type": "ARM_TOTAL",
                "response": { "hex": "064f4b", "ascii": "\u{6}OK" }
            }
        }),
    );
}

#[test]
fn response_without_data_fails() {
    validate_fails(
        "command_response.schema.json",
        &json!({
            "command_id": "c-42",
            "status": "RESPONSE",
            "message": "Panel response to ARM",
            "timestamp": "2026-10-16T09:30:00.456Z"
        }),
    );
}

#[test]
fn error_with_data_fails() {
    validate_fails(
        "command_response.schema.json",
        &json!({
            "command_id": "c-42",
            "status": "ERROR",
            "message": "boom",
            "timestamp": "2026-10-16T09:30:00.456Z",
            "data": {
                "command_type": "ARM",
                "response": { "hex": "", "ascii": "" }
            }
        }),
    );
}

#[test]
fn outcomes_serialized_by_library() {
    let outcomes = [
        CommandOutcome::sent("c-1", CommandKind::Arm),
        CommandOutcome::response("c-1", CommandKind::InhibitZone, &[0x06, 0xff]),
        CommandOutcome::error("unknown", "Invalid command JSON"),
    ];
    let reply = serde_json::to_value(&outcomes[1]).unwrap();
    assert_eq!(reply["data"]["response"]["ascii"], "\u{6}\u{7f}");
    for outcome in &outcomes {
        validate(
            "command_response.schema.json",
            &serde_json::to_value(outcome).unwrap(),
        );
    }
}
