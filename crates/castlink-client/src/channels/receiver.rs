//! Receiver control channel
//!
//! Typed operations against the receiver platform: status queries, app
//! launch/stop, volume. Every operation targets the reserved platform id
//! (`receiver-0`).

use parking_lot::RwLock;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

use castlink_core::payload::{key, msg_type, AppAvailability, CastApp, CastStatus};
use castlink_core::{ns, payload, Envelope, RECEIVER_ID};

use crate::channel::CastChannel;
use crate::dispatcher::RequestDispatcher;
use crate::error::{ClientError, Result};
use crate::ClientEvent;

pub struct ReceiverChannel {
    dispatcher: Arc<RequestDispatcher>,
    events: mpsc::UnboundedSender<ClientEvent>,
    last_status: RwLock<Option<CastStatus>>,
}

impl ReceiverChannel {
    pub fn new(
        dispatcher: Arc<RequestDispatcher>,
        events: mpsc::UnboundedSender<ClientEvent>,
    ) -> Arc<Self> {
        Arc::new(Self {
            dispatcher,
            events,
            last_status: RwLock::new(None),
        })
    }

    /// Most recently observed receiver status
    pub fn last_status(&self) -> Option<CastStatus> {
        self.last_status.read().clone()
    }

    /// Request the current receiver status
    pub async fn request_status(&self) -> Result<CastStatus> {
        let request = self.dispatcher.request(
            ns::RECEIVER,
            RECEIVER_ID,
            json!({ key::TYPE: msg_type::GET_STATUS }),
        );
        let response = self.dispatcher.send_for_response(request).await?;

        let status = CastStatus::from_payload(&response)?;
        self.remember(&status);
        Ok(status)
    }

    /// Launch an application.
    ///
    /// The response to LAUNCH is itself a receiver-status payload; the
    /// launched app is the first entry that was not running before the
    /// request (or simply the first entry if nothing was). An app-less
    /// status is a launch failure, not a crash.
    pub async fn launch(&self, app_id: &str) -> Result<CastApp> {
        let pre_launch: Vec<String> = self
            .last_status()
            .map(|s| s.apps.iter().map(|a| a.session_id.clone()).collect())
            .unwrap_or_default();

        let request = self.dispatcher.request(
            ns::RECEIVER,
            RECEIVER_ID,
            json!({ key::TYPE: msg_type::LAUNCH, key::APP_ID: app_id }),
        );
        let response = self.dispatcher.send_for_response(request).await?;

        if let Some(kind @ (msg_type::LAUNCH_ERROR | msg_type::INVALID_REQUEST)) =
            payload::message_type(&response)
        {
            let reason = response
                .get("reason")
                .and_then(|r| r.as_str())
                .unwrap_or(kind);
            return Err(ClientError::Receiver(reason.to_string()));
        }

        let status = CastStatus::from_payload(&response)?;
        self.remember(&status);

        status
            .apps
            .iter()
            .find(|app| !pre_launch.contains(&app.session_id))
            .or_else(|| status.apps.first())
            .cloned()
            .ok_or_else(|| {
                ClientError::LaunchFailed("no app instance in launch response".to_string())
            })
    }

    /// Stop a running application instance
    pub async fn stop(&self, app: &CastApp) -> Result<()> {
        let request = self.dispatcher.request(
            ns::RECEIVER,
            RECEIVER_ID,
            json!({ key::TYPE: msg_type::STOP, key::SESSION_ID: app.session_id }),
        );
        self.dispatcher.send(request).await
    }

    /// Set the master volume level (0.0 ..= 1.0)
    pub async fn set_volume(&self, level: f64) -> Result<()> {
        let request = self.dispatcher.request(
            ns::RECEIVER,
            RECEIVER_ID,
            json!({ key::TYPE: msg_type::SET_VOLUME, key::VOLUME: { key::LEVEL: level } }),
        );
        self.dispatcher.send(request).await
    }

    /// Mute or unmute
    pub async fn set_muted(&self, muted: bool) -> Result<()> {
        let request = self.dispatcher.request(
            ns::RECEIVER,
            RECEIVER_ID,
            json!({ key::TYPE: msg_type::SET_VOLUME, key::VOLUME: { key::MUTED: muted } }),
        );
        self.dispatcher.send(request).await
    }

    /// Ask which of `app_ids` the receiver can run
    pub async fn app_availability(&self, app_ids: &[&str]) -> Result<AppAvailability> {
        let request = self.dispatcher.request(
            ns::RECEIVER,
            RECEIVER_ID,
            json!({ key::TYPE: msg_type::GET_APP_AVAILABILITY, key::APP_ID: app_ids }),
        );
        let response = self.dispatcher.send_for_response(request).await?;
        Ok(AppAvailability::from_payload(&response)?)
    }

    fn remember(&self, status: &CastStatus) {
        *self.last_status.write() = Some(status.clone());
    }
}

impl CastChannel for ReceiverChannel {
    fn namespace(&self) -> &str {
        ns::RECEIVER
    }

    fn handle_message(&self, envelope: &Envelope) {
        let Some(body) = envelope.payload.as_json() else {
            return;
        };

        match payload::message_type(body) {
            Some(msg_type::RECEIVER_STATUS) => match CastStatus::from_payload(body) {
                Ok(status) => {
                    self.remember(&status);
                    let _ = self.events.send(ClientEvent::StatusUpdated(status));
                }
                Err(e) => warn!("undecodable receiver status: {}", e),
            },
            other => {
                warn!("unhandled receiver message: {:?}", other);
            }
        }
    }
}
