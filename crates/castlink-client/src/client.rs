//! Session facade
//!
//! One [`CastClient`] drives one receiver over one transport and one
//! dispatcher. The connection state machine is
//! `Disconnected → Connecting → Connected → Disconnected`; after the
//! connection ends (for any reason) the client is terminal and a fresh one
//! is required per attempt. Reconnection is always caller-driven — there is
//! no hidden retry.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use castlink_core::payload::{AppAvailability, CastApp, CastMediaStatus, CastStatus, MediaInfo};
use castlink_core::RECEIVER_ID;
use castlink_discovery::CastDevice;
use castlink_transport::{
    CastTransport, TlsConfig, TlsSender, TransportEvent, TransportReceiver, TransportSender,
};

use crate::channels::{ConnectionChannel, HeartbeatChannel, MediaChannel, ReceiverChannel};
use crate::dispatcher::RequestDispatcher;
use crate::error::{ClientError, Result};
use crate::ClientEvent;

/// Client configuration.
///
/// The heartbeat interval/timeout are tunables, not protocol requirements;
/// liveness loss always surfaces as [`ClientError::HeartbeatTimeout`] and is
/// never retried internally.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub heartbeat_interval: Duration,
    pub heartbeat_timeout: Duration,
    pub transport: TlsConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(5),
            heartbeat_timeout: Duration::from_secs(10),
            transport: TlsConfig::default(),
        }
    }
}

/// Client connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Per-connection wiring: the transport write half, the dispatcher, and the
/// built-in channels
#[derive(Clone)]
struct Session {
    sender: Arc<TlsSender>,
    dispatcher: Arc<RequestDispatcher>,
    connection: Arc<ConnectionChannel>,
    heartbeat: Arc<HeartbeatChannel>,
    receiver: Arc<ReceiverChannel>,
    media: Arc<MediaChannel>,
}

/// Client for one Cast receiver
pub struct CastClient {
    device: CastDevice,
    config: ClientConfig,
    state: Arc<RwLock<ConnectionState>>,
    session: RwLock<Option<Session>>,
    connected_app: RwLock<Option<CastApp>>,
    events_tx: mpsc::UnboundedSender<ClientEvent>,
    ended: Arc<AtomicBool>,
}

impl CastClient {
    /// Create a client for `device` and the receiver for its events
    pub fn new(device: CastDevice) -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        Self::with_config(device, ClientConfig::default())
    }

    pub fn with_config(
        device: CastDevice,
        config: ClientConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let client = Self {
            device,
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            session: RwLock::new(None),
            connected_app: RwLock::new(None),
            events_tx,
            ended: Arc::new(AtomicBool::new(false)),
        };

        (client, events_rx)
    }

    pub fn device(&self) -> &CastDevice {
        &self.device
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// The app most recently joined via [`connect_to_app`](Self::connect_to_app)
    /// or [`load`](Self::load), while connected
    pub fn connected_app(&self) -> Option<CastApp> {
        if self.state() != ConnectionState::Connected {
            return None;
        }
        self.connected_app.read().clone()
    }

    /// Most recently observed receiver status
    pub fn latest_status(&self) -> Option<CastStatus> {
        self.session.read().as_ref()?.receiver.last_status()
    }

    /// Open the transport, perform the virtual-connection handshake, and
    /// start the heartbeat loop. Valid only from `Disconnected` on a client
    /// that has never been connected; [`ClientEvent::Connected`] is emitted
    /// only after the handshake send succeeds.
    pub async fn connect(&self) -> Result<()> {
        {
            let mut state = self.state.write();
            if self.ended.load(Ordering::SeqCst) {
                return Err(ClientError::ConnectionClosed);
            }
            if *state != ConnectionState::Disconnected {
                return Err(ClientError::AlreadyConnected);
            }
            *state = ConnectionState::Connecting;
        }

        info!("connecting to {}", self.device);

        let transport = CastTransport::with_config(self.config.transport.clone());
        let connected = transport
            .connect(&self.device.host(), self.device.port)
            .await;

        let (sender, mut receiver) = match connected {
            Ok(pair) => pair,
            Err(e) => {
                *self.state.write() = ConnectionState::Disconnected;
                self.ended.store(true, Ordering::SeqCst);
                return Err(e.into());
            }
        };

        let sender = Arc::new(sender);
        let dispatcher = Arc::new(RequestDispatcher::new(
            sender.clone() as Arc<dyn TransportSender>
        ));

        let connection = Arc::new(ConnectionChannel::new(dispatcher.clone()));
        let heartbeat = HeartbeatChannel::new(dispatcher.clone());
        let receiver_channel = ReceiverChannel::new(dispatcher.clone(), self.events_tx.clone());
        let media = MediaChannel::new(dispatcher.clone(), self.events_tx.clone());

        dispatcher.register_channel(connection.clone());
        dispatcher.register_channel(heartbeat.clone());
        dispatcher.register_channel(receiver_channel.clone());
        dispatcher.register_channel(media.clone());

        let session = Session {
            sender,
            dispatcher,
            connection,
            heartbeat,
            receiver: receiver_channel,
            media,
        };
        *self.session.write() = Some(session.clone());

        // Virtual connection to the platform; connected is reported only
        // once this send has succeeded
        if let Err(e) = session.connection.connect(RECEIVER_ID).await {
            session.sender.disconnect();
            *self.state.write() = ConnectionState::Disconnected;
            self.ended.store(true, Ordering::SeqCst);
            return Err(e);
        }

        *self.state.write() = ConnectionState::Connected;
        let _ = self.events_tx.send(ClientEvent::Connected);
        info!("connected to {}", self.device.name);

        // Read task: every inbound envelope counts as liveness and goes
        // through the dispatcher
        {
            let session = session.clone();
            let state = self.state.clone();
            let ended = self.ended.clone();
            let events = self.events_tx.clone();
            tokio::spawn(async move {
                while let Some(event) = receiver.recv().await {
                    match event {
                        TransportEvent::Connected => {}
                        TransportEvent::Message(envelope) => {
                            session.heartbeat.touch();
                            session.dispatcher.handle_incoming(&envelope);
                        }
                        TransportEvent::Closed { reason } => {
                            let error = reason.map(ClientError::ConnectionFailed);
                            finish(&state, &ended, &events, &session.dispatcher, error, "connection closed");
                            break;
                        }
                    }
                }
            });
        }

        // Heartbeat task: watch() resolves when liveness is lost
        {
            let session = session.clone();
            let state = self.state.clone();
            let ended = self.ended.clone();
            let events = self.events_tx.clone();
            let interval = self.config.heartbeat_interval;
            let timeout = self.config.heartbeat_timeout;
            tokio::spawn(async move {
                session.heartbeat.watch(interval, timeout).await;
                if finish(
                    &state,
                    &ended,
                    &events,
                    &session.dispatcher,
                    Some(ClientError::HeartbeatTimeout),
                    "heartbeat timeout",
                ) {
                    session.sender.disconnect();
                }
            });
        }

        Ok(())
    }

    /// Tear down the connection. Valid from `Connecting` or `Connected`;
    /// every pending request fails and exactly one
    /// [`ClientEvent::Disconnected`] is emitted.
    pub async fn disconnect(&self) -> Result<()> {
        let session = {
            if self.state() == ConnectionState::Disconnected {
                return Err(ClientError::NotConnected);
            }
            self.session
                .read()
                .clone()
                .ok_or(ClientError::NotConnected)?
        };

        // Best-effort goodbye for the virtual connection
        let joined = self.connected_app.write().take();
        if let Some(app) = joined {
            let _ = session.connection.close(&app.transport_id).await;
        }
        let _ = session.connection.close(RECEIVER_ID).await;

        if finish(
            &self.state,
            &self.ended,
            &self.events_tx,
            &session.dispatcher,
            None,
            "disconnect",
        ) {
            session.sender.disconnect();
        }

        debug!("disconnected from {}", self.device.name);
        Ok(())
    }

    /// Request the receiver status. Targets the platform id.
    pub async fn request_status(&self) -> Result<CastStatus> {
        self.session()?.receiver.request_status().await
    }

    /// Launch an app on the receiver. Targets the platform id; resolves to
    /// the launched app instance.
    pub async fn launch(&self, app_id: &str) -> Result<CastApp> {
        self.session()?.receiver.launch(app_id).await
    }

    /// Stop a running app. Targets the platform id.
    pub async fn stop_app(&self, app: &CastApp) -> Result<()> {
        self.session()?.receiver.stop(app).await
    }

    /// Set master volume. Targets the platform id.
    pub async fn set_volume(&self, level: f64) -> Result<()> {
        self.session()?.receiver.set_volume(level).await
    }

    /// Mute or unmute. Targets the platform id.
    pub async fn set_muted(&self, muted: bool) -> Result<()> {
        self.session()?.receiver.set_muted(muted).await
    }

    /// Ask which of `app_ids` this receiver can run. Targets the platform id.
    pub async fn app_availability(&self, app_ids: &[&str]) -> Result<AppAvailability> {
        self.session()?.receiver.app_availability(app_ids).await
    }

    /// Join a running app: virtual-connect to its transport id so that
    /// app-scoped (media) messages can flow
    pub async fn connect_to_app(&self, app: &CastApp) -> Result<()> {
        let session = self.session()?;
        session.connection.connect(&app.transport_id).await?;
        *self.connected_app.write() = Some(app.clone());
        Ok(())
    }

    /// Request media status. Targets the app's transport id.
    pub async fn request_media_status(&self, app: &CastApp) -> Result<Option<CastMediaStatus>> {
        let session = self.session()?;
        self.ensure_joined(&session, app).await?;
        session.media.request_status(app).await
    }

    /// Load media into a running app. Targets the app's transport id.
    pub async fn load(&self, media: &MediaInfo, app: &CastApp) -> Result<CastMediaStatus> {
        let session = self.session()?;
        self.ensure_joined(&session, app).await?;
        session.media.load(media, app).await
    }

    /// Resume playback. Targets the app's transport id.
    pub async fn play(&self, app: &CastApp) -> Result<()> {
        self.session()?.media.play(app).await
    }

    /// Pause playback. Targets the app's transport id.
    pub async fn pause(&self, app: &CastApp) -> Result<()> {
        self.session()?.media.pause(app).await
    }

    /// Stop playback. Targets the app's transport id.
    pub async fn stop_media(&self, app: &CastApp) -> Result<()> {
        self.session()?.media.stop(app).await
    }

    /// Seek to `time` seconds. Targets the app's transport id.
    pub async fn seek(&self, app: &CastApp, time: f64) -> Result<()> {
        self.session()?.media.seek(app, time).await
    }

    fn session(&self) -> Result<Session> {
        if self.state() != ConnectionState::Connected {
            return Err(ClientError::NotConnected);
        }
        self.session
            .read()
            .clone()
            .ok_or(ClientError::NotConnected)
    }

    /// Virtual-connect to the app's transport id if not already joined
    async fn ensure_joined(&self, session: &Session, app: &CastApp) -> Result<()> {
        let joined = self
            .connected_app
            .read()
            .as_ref()
            .map(|a| a.transport_id == app.transport_id)
            .unwrap_or(false);
        if joined {
            return Ok(());
        }

        session.connection.connect(&app.transport_id).await?;
        *self.connected_app.write() = Some(app.clone());
        Ok(())
    }
}

/// Move to `Disconnected` exactly once: cancel every pending request and
/// emit the terminal event. Returns whether this call performed the
/// transition.
fn finish(
    state: &Arc<RwLock<ConnectionState>>,
    ended: &Arc<AtomicBool>,
    events: &mpsc::UnboundedSender<ClientEvent>,
    dispatcher: &Arc<RequestDispatcher>,
    error: Option<ClientError>,
    reason: &str,
) -> bool {
    if ended.swap(true, Ordering::SeqCst) {
        return false;
    }

    *state.write() = ConnectionState::Disconnected;
    dispatcher.cancel_all(reason);
    let _ = events.send(ClientEvent::Disconnected(error));
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use castlink_discovery::Capabilities;

    fn unreachable_device() -> CastDevice {
        CastDevice {
            id: "dead".to_string(),
            name: "Unreachable".to_string(),
            model_name: "Test".to_string(),
            address: "127.0.0.1".parse().unwrap(),
            // Nothing listens here
            port: 1,
            capabilities: Capabilities::default(),
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.heartbeat_interval, Duration::from_secs(5));
        assert_eq!(config.heartbeat_timeout, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_initial_state() {
        let (client, _events) = CastClient::new(unreachable_device());
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(client.connected_app().is_none());
        assert!(client.latest_status().is_none());
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let (client, _events) = CastClient::new(unreachable_device());
        assert!(matches!(
            client.request_status().await,
            Err(ClientError::NotConnected)
        ));
        assert!(matches!(
            client.set_volume(0.5).await,
            Err(ClientError::NotConnected)
        ));
        assert!(matches!(
            client.disconnect().await,
            Err(ClientError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_failed_connect_is_terminal() {
        let (client, _events) = CastClient::with_config(
            unreachable_device(),
            ClientConfig {
                transport: TlsConfig {
                    connect_timeout: Duration::from_secs(2),
                    keepalive_secs: 0,
                },
                ..ClientConfig::default()
            },
        );

        assert!(client.connect().await.is_err());
        assert_eq!(client.state(), ConnectionState::Disconnected);

        // A new client is required per connection attempt
        assert!(matches!(
            client.connect().await,
            Err(ClientError::ConnectionClosed)
        ));
    }
}
