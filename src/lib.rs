// MIT License - Copyright (c) 2026 Peter Wright
// Alarm panel TCP protocol bridge
//
//! # alarm-bridge
//!
//! Bridges an alarm control panel's TCP event protocol to a message bus.
//!
//! The panel connects in and pushes frames: a one-byte identification frame
//! (`0x21`) and `$`-prefixed event reports. Each frame is acknowledged on the
//! same connection and decoded events are handed to a [`Publisher`].
//! Commands travel the other way: each one opens a fresh connection to the
//! panel, and the [`CommandCorrelator`] publishes exactly one terminal
//! outcome per command id (a reply, an error, or a timeout).
//!
//! The library does not talk to a broker itself. The [`Publisher`] feeds a
//! channel of [`BusMessage`]s which the binary drains into MQTT.
//!
//! ## Quick Start
//!
//! ```no_run
//! use alarm_bridge::{BridgeConfig, CommandCorrelator, PanelListener, Publisher};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = BridgeConfig::builder()
//!         .listening_port(9999)
//!         .panel_host("192.168.0.100")
//!         .build();
//!
//!     let (publisher, mut outbound) = Publisher::channel(config.topics.clone(), 256);
//!     let correlator = CommandCorrelator::new(&config, publisher.clone());
//!
//!     let listener = PanelListener::bind(config.listening_port, publisher).await?;
//!     tokio::spawn(listener.run());
//!
//!     correlator.handle_payload(br#"{"id":"c-1","command":"ARM","parameters":{}}"#);
//!
//!     while let Some(msg) = outbound.recv().await {
//!         println!("{}: {}", msg.topic, msg.payload);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod frame;
pub mod protocol;
pub mod publisher;
pub mod transport;

// Re-exports for convenience
pub use config::{BridgeConfig, BridgeConfigBuilder, LateReplyPolicy, Topics};
pub use error::{BridgeError, ErrorCategory, Result};
pub use event::{AlarmEvent, EventKind, RawData};
pub use frame::{decode, Frame, RawFrame};
pub use protocol::{
    CommandEncoder, CommandKind, CommandMessage, CommandOutcome, CommandParameters,
    CommandRequest, OutcomeStatus, ResponseData, TextCommandEncoder,
};
pub use publisher::{BusMessage, Publisher};
pub use transport::{CommandCorrelator, PanelListener};
