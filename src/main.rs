// MIT License - Copyright (c) 2026 Peter Wright
// MQTT bridge

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde::Deserialize;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

use alarm_bridge::constants::DEFAULT_PASSWORD;
use alarm_bridge::{
    BridgeConfig, BusMessage, CommandCorrelator, LateReplyPolicy, PanelListener, Publisher,
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "alarm2mqtt")]
#[command(about = "Bridge between an alarm panel's TCP protocol and MQTT")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Config {
    #[serde(default)]
    listener: ListenerToml,
    #[serde(default)]
    panel: PanelToml,
    mqtt: MqttToml,
}

#[derive(Debug, Deserialize)]
struct ListenerToml {
    #[serde(default = "default_listening_port")]
    port: u16,
}

impl Default for ListenerToml {
    fn default() -> Self {
        Self {
            port: default_listening_port(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PanelToml {
    #[serde(default = "default_panel_host")]
    host: String,
    #[serde(default = "default_panel_port")]
    port: u16,
    #[serde(default = "default_password")]
    default_password: String,
    #[serde(default = "default_command_timeout")]
    command_timeout_ms: u64,
    #[serde(default = "default_session_window")]
    session_window_ms: u64,
    #[serde(default)]
    late_reply: LateReplyPolicy,
}

impl Default for PanelToml {
    fn default() -> Self {
        Self {
            host: default_panel_host(),
            port: default_panel_port(),
            default_password: default_password(),
            command_timeout_ms: default_command_timeout(),
            session_window_ms: default_session_window(),
            late_reply: LateReplyPolicy::default(),
        }
    }
}

fn default_listening_port() -> u16 {
    9999
}
fn default_panel_host() -> String {
    "192.168.6.131".to_string()
}
fn default_panel_port() -> u16 {
    9080
}
fn default_password() -> String {
    DEFAULT_PASSWORD.to_string()
}
fn default_command_timeout() -> u64 {
    10000
}
fn default_session_window() -> u64 {
    10000
}

#[derive(Debug, Deserialize)]
struct MqttToml {
    url: String,
    #[serde(default = "default_client_id")]
    client_id: String,
    #[serde(default = "default_events_topic")]
    events_topic: String,
    #[serde(default = "default_commands_topic")]
    commands_topic: String,
    #[serde(default = "default_responses_topic")]
    responses_topic: String,
}

fn default_client_id() -> String {
    "alarm-bridge".to_string()
}
fn default_events_topic() -> String {
    "alarm/events".to_string()
}
fn default_commands_topic() -> String {
    "alarm/commands".to_string()
}
fn default_responses_topic() -> String {
    "alarm/command_responses".to_string()
}

fn build_bridge_config(config: &Config) -> BridgeConfig {
    BridgeConfig::builder()
        .listening_port(config.listener.port)
        .panel_host(&config.panel.host)
        .panel_port(config.panel.port)
        .default_password(&config.panel.default_password)
        .command_timeout_ms(config.panel.command_timeout_ms)
        .session_window_ms(config.panel.session_window_ms)
        .late_reply(config.panel.late_reply)
        .events_topic(&config.mqtt.events_topic)
        .commands_topic(&config.mqtt.commands_topic)
        .responses_topic(&config.mqtt.responses_topic)
        .build()
}

// ---------------------------------------------------------------------------
// MQTT glue
// ---------------------------------------------------------------------------

/// Drain the library's outbound queue into MQTT. Messages produced while the
/// broker is unreachable are dropped, not buffered.
async fn run_publish_pump(
    client: AsyncClient,
    connected: Arc<AtomicBool>,
    mut rx: mpsc::Receiver<BusMessage>,
) {
    while let Some(msg) = rx.recv().await {
        if !connected.load(Ordering::Acquire) {
            warn!("MQTT not connected, dropping message for {}", msg.topic);
            continue;
        }
        debug!("Publishing to {}: {}", msg.topic, msg.payload);
        if let Err(e) = client
            .publish(&msg.topic, QoS::AtLeastOnce, false, msg.payload)
            .await
        {
            error!("Failed to publish to {}: {e}", msg.topic);
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity (e.g. RUST_LOG=debug or RUST_LOG=alarm_bridge=debug).
    // Default: info.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // systemd journal already adds timestamps, so omit them when running under systemd
    if std::env::var_os("JOURNAL_STREAM").is_some() {
        tracing_subscriber::fmt().without_time().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let cli = Cli::parse();

    let config_text =
        std::fs::read_to_string(&cli.config).context("Failed to read config file")?;
    let config: Config = toml::from_str(&config_text).context("Failed to parse config file")?;
    let bridge_config = build_bridge_config(&config);
    let (mqtt_host, mqtt_port) = parse_mqtt_url(&config.mqtt.url)?;

    let mut sigterm = signal(SignalKind::terminate())?;

    // Set up MQTT
    let mut mqtt_opts = MqttOptions::new(&config.mqtt.client_id, &mqtt_host, mqtt_port);
    mqtt_opts.set_keep_alive(Duration::from_secs(30));
    let (client, mut eventloop) = AsyncClient::new(mqtt_opts, 256);
    let connected = Arc::new(AtomicBool::new(false));

    let (publisher, outbound) = Publisher::channel(bridge_config.topics.clone(), 256);
    let correlator = CommandCorrelator::new(&bridge_config, publisher.clone());

    let listener = PanelListener::bind(bridge_config.listening_port, publisher)
        .await
        .context("Failed to bind panel listener")?;

    // Task 1: panel listener
    let listener_handle = tokio::spawn(listener.run());

    // Task 2: outbound publish pump
    let pump_handle = tokio::spawn(run_publish_pump(
        client.clone(),
        Arc::clone(&connected),
        outbound,
    ));

    // Task 3: MQTT event loop (receives commands)
    let client_cmds = client.clone();
    let connected_cmds = Arc::clone(&connected);
    let sub_topic = bridge_config.topics.commands.clone();
    info!("Connecting to MQTT broker at {mqtt_host}:{mqtt_port}");
    let mqtt_handle = tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    // rumqttc does not resubscribe after a reconnect
                    info!("MQTT: connected, subscribing to {sub_topic}");
                    connected_cmds.store(true, Ordering::Release);
                    if let Err(e) = client_cmds.subscribe(&sub_topic, QoS::AtLeastOnce).await {
                        error!("Failed to subscribe to {sub_topic}: {e}");
                    }
                }
                Ok(Event::Incoming(Packet::Publish(msg))) => {
                    if msg.topic == sub_topic {
                        debug!(
                            "MQTT command received: {}",
                            String::from_utf8_lossy(&msg.payload)
                        );
                        correlator.handle_payload(&msg.payload);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    connected_cmds.store(false, Ordering::Release);
                    error!("MQTT event loop error: {e}");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    });

    info!("Alarm bridge running. Send SIGINT/SIGTERM to stop.");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down...");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
        }
    }

    listener_handle.abort();
    mqtt_handle.abort();
    pump_handle.abort();
    if let Err(e) = client.try_disconnect() {
        debug!("MQTT disconnect: {e}");
    }

    info!("Shutdown complete");
    Ok(())
}

/// Parse an MQTT URL like "mqtt://host:port" into (host, port).
fn parse_mqtt_url(url: &str) -> Result<(String, u16)> {
    let stripped = url
        .strip_prefix("mqtt://")
        .or_else(|| url.strip_prefix("tcp://"))
        .unwrap_or(url);

    let (host, port_str) = stripped
        .rsplit_once(':')
        .context("MQTT URL must be in format mqtt://host:port")?;

    let port: u16 = port_str.parse().context("Invalid MQTT port number")?;

    Ok((host.to_string(), port))
}
