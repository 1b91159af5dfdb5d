// MIT License - Copyright (c) 2026 Peter Wright
// Panel-facing TCP listener and per-connection session handling

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::{debug, error, info, warn};

use crate::constants::{IDENTIFICATION_ACK, STANDARD_ACK};
use crate::error::{BridgeError, Result};
use crate::event::{ascii_lossy, AlarmEvent};
use crate::frame::{decode, Frame, RawFrame};
use crate::publisher::Publisher;

/// Accepts panel connections and runs one session task per connection.
pub struct PanelListener {
    listener: TcpListener,
    publisher: Publisher,
}

impl PanelListener {
    /// Listen on all interfaces on `port`.
    pub async fn bind(port: u16, publisher: Publisher) -> Result<Self> {
        Self::bind_addr(("0.0.0.0", port), publisher).await
    }

    pub async fn bind_addr(addr: impl ToSocketAddrs, publisher: Publisher) -> Result<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            error!("Failed to bind panel listener: {}", e);
            BridgeError::Io(e)
        })?;
        info!("Panel listener on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            publisher,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the task is dropped. A failed accept or a
    /// failed session never stops the listener.
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    info!("Panel connected from {}", peer);
                    let publisher = self.publisher.clone();
                    tokio::spawn(async move {
                        run_session(stream, peer, publisher).await;
                    });
                }
                Err(e) => {
                    warn!("Failed to accept panel connection: {}", e);
                }
            }
        }
    }
}

/// Serve one panel connection: each read is one frame, acknowledged before
/// the next read, in arrival order.
pub async fn run_session(mut stream: TcpStream, peer: SocketAddr, publisher: Publisher) {
    let mut buf = vec![0u8; 4096];

    loop {
        match stream.read(&mut buf).await {
            Ok(0) => {
                debug!("Panel {} closed the connection", peer);
                break;
            }
            Ok(n) => {
                let frame = RawFrame {
                    peer,
                    data: &buf[..n],
                };
                let (ack, event) = respond(&frame);

                if let Err(e) = stream.write_all(ack).await {
                    error!("Failed to acknowledge frame from {}: {}", peer, e);
                    break;
                }

                if let Some(event) = event {
                    info!("{} from {}: {}", event.kind, peer, event.message);
                    publisher.publish_event(&event);
                }
            }
            Err(e) => {
                error!("Read error on panel connection {}: {}", peer, e);
                break;
            }
        }
    }

    info!("Panel connection {} closed", peer);
}

/// Decide the acknowledgement and the event to publish for one frame.
pub fn respond(frame: &RawFrame<'_>) -> (&'static [u8], Option<AlarmEvent>) {
    debug!(
        "Received from {}: HEX {} ASCII {:?}",
        frame.peer,
        hex::encode(frame.data),
        ascii_lossy(frame.data)
    );

    let decoded = decode(frame);
    let ack = acknowledgement(&decoded);
    let event = match decoded {
        Frame::Identification => {
            debug!("Identification frame from {}", frame.peer);
            Some(AlarmEvent::identification(frame.data))
        }
        Frame::Event(event) => Some(event),
        Frame::Unmatched => None,
    };
    (ack, event)
}

/// The acknowledgement bytes for a classified frame.
pub fn acknowledgement(frame: &Frame) -> &'static [u8] {
    match frame {
        Frame::Identification => &IDENTIFICATION_ACK,
        Frame::Event(_) | Frame::Unmatched => &STANDARD_ACK,
    }
}
