//! Media control channel
//!
//! App-scoped playback control. Every operation targets the transport id of
//! a running application (obtained from the most recent receiver status),
//! never the platform id. Transport commands use the media session id from
//! the latest media status.

use parking_lot::RwLock;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

use castlink_core::payload::{key, msg_type, CastApp, CastMediaStatus, MediaInfo};
use castlink_core::{ns, payload, Envelope};

use crate::channel::CastChannel;
use crate::dispatcher::RequestDispatcher;
use crate::error::{ClientError, Result};
use crate::ClientEvent;

pub struct MediaChannel {
    dispatcher: Arc<RequestDispatcher>,
    events: mpsc::UnboundedSender<ClientEvent>,
    media_session_id: RwLock<Option<i64>>,
}

impl MediaChannel {
    pub fn new(
        dispatcher: Arc<RequestDispatcher>,
        events: mpsc::UnboundedSender<ClientEvent>,
    ) -> Arc<Self> {
        Arc::new(Self {
            dispatcher,
            events,
            media_session_id: RwLock::new(None),
        })
    }

    /// Media session id from the latest media status, if any
    pub fn media_session_id(&self) -> Option<i64> {
        *self.media_session_id.read()
    }

    /// Request the media status of a running app
    pub async fn request_status(&self, app: &CastApp) -> Result<Option<CastMediaStatus>> {
        let request = self.dispatcher.request(
            ns::MEDIA,
            &app.transport_id,
            json!({ key::TYPE: msg_type::GET_STATUS }),
        );
        let response = self.dispatcher.send_for_response(request).await?;

        let sessions = CastMediaStatus::list_from_payload(&response)?;
        let first = sessions.into_iter().next();
        if let Some(ref status) = first {
            self.remember(status);
        }
        Ok(first)
    }

    /// Load media into a running app and wait for the new session's status
    pub async fn load(&self, media: &MediaInfo, app: &CastApp) -> Result<CastMediaStatus> {
        let request = self.dispatcher.request(
            ns::MEDIA,
            &app.transport_id,
            json!({
                key::TYPE: msg_type::LOAD,
                "media": serde_json::to_value(media).map_err(castlink_core::Error::from)?,
                "autoplay": true,
                key::CURRENT_TIME: 0,
            }),
        );
        let response = self.dispatcher.send_for_response(request).await?;

        match payload::message_type(&response) {
            Some(msg_type::MEDIA_STATUS) => {}
            Some(msg_type::INVALID_REQUEST) => {
                let reason = response
                    .get("reason")
                    .and_then(|r| r.as_str())
                    .unwrap_or(msg_type::INVALID_REQUEST);
                return Err(ClientError::Receiver(reason.to_string()));
            }
            other => {
                return Err(ClientError::LoadFailed(
                    other.unwrap_or("no media status").to_string(),
                ));
            }
        }

        let status = CastMediaStatus::list_from_payload(&response)?
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::LoadFailed("empty media status".to_string()))?;
        self.remember(&status);
        Ok(status)
    }

    pub async fn play(&self, app: &CastApp) -> Result<()> {
        self.transport_command(app, msg_type::PLAY, json!({})).await
    }

    pub async fn pause(&self, app: &CastApp) -> Result<()> {
        self.transport_command(app, msg_type::PAUSE, json!({})).await
    }

    pub async fn stop(&self, app: &CastApp) -> Result<()> {
        self.transport_command(app, msg_type::STOP, json!({})).await
    }

    /// Seek to an absolute position in seconds
    pub async fn seek(&self, app: &CastApp, time: f64) -> Result<()> {
        self.transport_command(app, msg_type::SEEK, json!({ key::CURRENT_TIME: time }))
            .await
    }

    /// Fire a playback command at the current media session
    async fn transport_command(
        &self,
        app: &CastApp,
        command: &str,
        mut extra: serde_json::Value,
    ) -> Result<()> {
        let session_id = self.media_session_id().ok_or(ClientError::NoMediaSession)?;

        extra[key::TYPE] = json!(command);
        extra[key::MEDIA_SESSION_ID] = json!(session_id);

        let request = self.dispatcher.request(ns::MEDIA, &app.transport_id, extra);
        self.dispatcher.send(request).await
    }

    fn remember(&self, status: &CastMediaStatus) {
        *self.media_session_id.write() = Some(status.media_session_id);
    }
}

impl CastChannel for MediaChannel {
    fn namespace(&self) -> &str {
        ns::MEDIA
    }

    fn handle_message(&self, envelope: &Envelope) {
        let Some(body) = envelope.payload.as_json() else {
            return;
        };

        match payload::message_type(body) {
            Some(msg_type::MEDIA_STATUS) => match CastMediaStatus::list_from_payload(body) {
                Ok(sessions) => {
                    if let Some(status) = sessions.into_iter().next() {
                        self.remember(&status);
                        let _ = self.events.send(ClientEvent::MediaStatusUpdated(status));
                    }
                }
                Err(e) => warn!("undecodable media status: {}", e),
            },
            other => {
                warn!("unhandled media message: {:?}", other);
            }
        }
    }
}
