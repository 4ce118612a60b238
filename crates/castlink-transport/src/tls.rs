//! TLS transport implementation
//!
//! Owns one encrypted socket to one receiver. Frames are length-prefixed on
//! the wire; encoding/decoding is delegated to the core codec. Receivers use
//! self-signed certificates, so certificate and hostname validation are
//! disabled on the connector — a deliberate protocol exception, not an
//! oversight.

use bytes::{Bytes, BytesMut};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, info, warn};

use castlink_core::codec;
use castlink_core::Envelope;

use crate::error::{Result, TransportError};
use crate::traits::{TransportEvent, TransportReceiver, TransportSender, TransportState};

/// Default channel buffer for outgoing frames
const OUTGOING_BUFFER_SIZE: usize = 64;

/// Default channel buffer for inbound events
const INCOMING_BUFFER_SIZE: usize = 256;

/// TLS transport configuration
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Socket connect + handshake deadline
    pub connect_timeout: Duration,
    /// TCP keep-alive interval in seconds (0 = disabled)
    pub keepalive_secs: u64,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            keepalive_secs: 30,
        }
    }
}

/// TLS transport factory
pub struct CastTransport {
    config: TlsConfig,
}

impl CastTransport {
    pub fn new() -> Self {
        Self {
            config: TlsConfig::default(),
        }
    }

    pub fn with_config(config: TlsConfig) -> Self {
        Self { config }
    }

    /// Connect to a receiver and start the read loop.
    ///
    /// On success the returned receiver yields [`TransportEvent::Connected`]
    /// followed by decoded messages, ending with exactly one
    /// [`TransportEvent::Closed`].
    pub async fn connect(&self, host: &str, port: u16) -> Result<(TlsSender, TlsReceiver)> {
        let addr = format!("{host}:{port}");
        info!("connecting to {}", addr);

        let state = Arc::new(RwLock::new(TransportState::Connecting));

        let stream = tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        if self.config.keepalive_secs > 0 {
            let socket = socket2::SockRef::from(&stream);
            let keepalive = socket2::TcpKeepalive::new()
                .with_time(Duration::from_secs(self.config.keepalive_secs));
            let _ = socket.set_tcp_keepalive(&keepalive);
        }

        // Receivers present self-signed certificates for their own address
        let connector = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()?;
        let connector = tokio_native_tls::TlsConnector::from(connector);

        let tls_stream = tokio::time::timeout(self.config.connect_timeout, connector.connect(host, stream))
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(|e| TransportError::Tls(e.to_string()))?;

        *state.write() = TransportState::Connected;
        info!("connected to {}", addr);

        let (outgoing_tx, outgoing_rx) = mpsc::channel::<Bytes>(OUTGOING_BUFFER_SIZE);
        let (incoming_tx, incoming_rx) = mpsc::channel::<TransportEvent>(INCOMING_BUFFER_SIZE);
        let shutdown = Arc::new(Notify::new());

        let _ = incoming_tx.send(TransportEvent::Connected).await;

        let sender = TlsSender {
            tx: outgoing_tx,
            state: state.clone(),
            shutdown: shutdown.clone(),
        };
        let receiver = TlsReceiver { rx: incoming_rx };

        tokio::spawn(run_io_loop(tls_stream, outgoing_rx, incoming_tx, state, shutdown));

        Ok((sender, receiver))
    }
}

impl Default for CastTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Socket io loop: serializes writes, decodes inbound frames, and delivers
/// the terminal `Closed` event exactly once on every exit path.
async fn run_io_loop(
    stream: tokio_native_tls::TlsStream<TcpStream>,
    mut outgoing_rx: mpsc::Receiver<Bytes>,
    incoming_tx: mpsc::Sender<TransportEvent>,
    state: Arc<RwLock<TransportState>>,
    shutdown: Arc<Notify>,
) {
    let (mut reader, mut writer) = tokio::io::split(stream);
    let mut read_buf = BytesMut::with_capacity(8192);

    let reason: Option<String> = 'io: loop {
        tokio::select! {
            _ = shutdown.notified() => {
                break 'io None;
            }

            maybe_frame = outgoing_rx.recv() => {
                match maybe_frame {
                    Some(frame) => {
                        if let Err(e) = writer.write_all(&frame).await {
                            break 'io Some(format!("write error: {e}"));
                        }
                    }
                    // All senders dropped: local teardown
                    None => break 'io None,
                }
            }

            result = reader.read_buf(&mut read_buf) => {
                match result {
                    Ok(0) => {
                        if read_buf.is_empty() {
                            break 'io Some("connection closed by peer".to_string());
                        }
                        break 'io Some("connection closed mid-frame".to_string());
                    }
                    Ok(_) => {
                        loop {
                            match codec::decode(&mut read_buf) {
                                Ok(Some(envelope)) => {
                                    if incoming_tx.send(TransportEvent::Message(envelope)).await.is_err() {
                                        // Event consumer went away
                                        break 'io None;
                                    }
                                }
                                Ok(None) => break,
                                Err(e) => break 'io Some(format!("framing error: {e}")),
                            }
                        }
                    }
                    Err(e) => break 'io Some(format!("read error: {e}")),
                }
            }
        }
    };

    match &reason {
        Some(r) => {
            warn!("transport failed: {}", r);
            *state.write() = TransportState::Failed;
        }
        None => {
            debug!("transport closed");
            *state.write() = TransportState::Idle;
        }
    }

    let _ = writer.shutdown().await;
    let _ = incoming_tx.send(TransportEvent::Closed { reason }).await;
}

/// Write half of a TLS connection
pub struct TlsSender {
    tx: mpsc::Sender<Bytes>,
    state: Arc<RwLock<TransportState>>,
    shutdown: Arc<Notify>,
}

#[async_trait::async_trait]
impl TransportSender for TlsSender {
    async fn send(&self, envelope: Envelope) -> Result<()> {
        if *self.state.read() != TransportState::Connected {
            return Err(TransportError::NotConnected);
        }

        let frame = codec::encode(&envelope)?;
        self.tx
            .send(frame)
            .await
            .map_err(|_| TransportError::SendFailed("channel closed".into()))
    }

    fn state(&self) -> TransportState {
        *self.state.read()
    }

    fn disconnect(&self) {
        let mut state = self.state.write();
        if matches!(*state, TransportState::Connecting | TransportState::Connected) {
            *state = TransportState::Disconnecting;
            self.shutdown.notify_one();
        }
    }
}

/// Read half of a TLS connection
pub struct TlsReceiver {
    rx: mpsc::Receiver<TransportEvent>,
}

#[async_trait::async_trait]
impl TransportReceiver for TlsReceiver {
    async fn recv(&mut self) -> Option<TransportEvent> {
        self.rx.recv().await
    }
}
