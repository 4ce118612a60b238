//! JSON payload models
//!
//! Typed views over the JSON payloads carried on the receiver and media
//! namespaces. Decoding is strict: a payload that is missing a mandatory
//! field yields [`Error::Payload`] instead of a silently-absent value.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{Error, Result};

/// Message `type` values
pub mod msg_type {
    pub const CONNECT: &str = "CONNECT";
    pub const CLOSE: &str = "CLOSE";
    pub const PING: &str = "PING";
    pub const PONG: &str = "PONG";
    pub const GET_STATUS: &str = "GET_STATUS";
    pub const RECEIVER_STATUS: &str = "RECEIVER_STATUS";
    pub const MEDIA_STATUS: &str = "MEDIA_STATUS";
    pub const LAUNCH: &str = "LAUNCH";
    pub const LAUNCH_ERROR: &str = "LAUNCH_ERROR";
    pub const STOP: &str = "STOP";
    pub const SET_VOLUME: &str = "SET_VOLUME";
    pub const GET_APP_AVAILABILITY: &str = "GET_APP_AVAILABILITY";
    pub const LOAD: &str = "LOAD";
    pub const PLAY: &str = "PLAY";
    pub const PAUSE: &str = "PAUSE";
    pub const SEEK: &str = "SEEK";
    pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
}

/// Reserved JSON payload keys
pub mod key {
    pub const TYPE: &str = "type";
    pub const REQUEST_ID: &str = "requestId";
    pub const APP_ID: &str = "appId";
    pub const SESSION_ID: &str = "sessionId";
    pub const MEDIA_SESSION_ID: &str = "mediaSessionId";
    pub const VOLUME: &str = "volume";
    pub const LEVEL: &str = "level";
    pub const MUTED: &str = "muted";
    pub const CURRENT_TIME: &str = "currentTime";
    pub const STATUS: &str = "status";
    pub const AVAILABILITY: &str = "availability";
}

/// The `type` field of a JSON payload, if present
pub fn message_type(payload: &Value) -> Option<&str> {
    payload.get(key::TYPE).and_then(Value::as_str)
}

/// The `requestId` field of a JSON payload, if present and non-zero
pub fn request_id(payload: &Value) -> Option<i64> {
    match payload.get(key::REQUEST_ID).and_then(Value::as_i64) {
        Some(0) | None => None,
        Some(id) => Some(id),
    }
}

/// A running application instance reported by the receiver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastApp {
    /// Application identifier, stable across installs
    pub app_id: String,
    /// Session id of this running instance
    pub session_id: String,
    /// Destination id for app-scoped messages (media control)
    pub transport_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub status_text: String,
}

/// Receiver volume state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub level: f64,
    pub muted: bool,
}

/// Receiver status: volume plus the list of running applications
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CastStatus {
    pub volume: Volume,
    #[serde(default, rename = "applications")]
    pub apps: Vec<CastApp>,
}

impl CastStatus {
    /// Decode from a `RECEIVER_STATUS` payload
    pub fn from_payload(payload: &Value) -> Result<Self> {
        let status = payload
            .get(key::STATUS)
            .ok_or_else(|| Error::Payload("receiver status without status object".into()))?;
        Ok(serde_json::from_value(status.clone())?)
    }
}

/// Media playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerState {
    Idle,
    Playing,
    Buffering,
    Paused,
    #[serde(other)]
    Unknown,
}

/// Status of one media session on a running application
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastMediaStatus {
    pub media_session_id: i64,
    pub player_state: PlayerState,
    #[serde(default)]
    pub current_time: f64,
}

impl CastMediaStatus {
    /// Decode the session list from a `MEDIA_STATUS` payload
    pub fn list_from_payload(payload: &Value) -> Result<Vec<Self>> {
        let status = payload
            .get(key::STATUS)
            .ok_or_else(|| Error::Payload("media status without status array".into()))?;
        Ok(serde_json::from_value(status.clone())?)
    }
}

/// Media description sent with a `LOAD` request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInfo {
    /// Content location, typically a URL
    pub content_id: String,
    pub content_type: String,
    pub stream_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl MediaInfo {
    /// A buffered stream at `url`
    pub fn new(url: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            content_id: url.into(),
            content_type: content_type.into(),
            stream_type: "BUFFERED".to_string(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Per-app availability answers from `GET_APP_AVAILABILITY`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppAvailability {
    available: HashMap<String, bool>,
}

impl AppAvailability {
    /// Decode from a `GET_APP_AVAILABILITY` response payload
    pub fn from_payload(payload: &Value) -> Result<Self> {
        let map = payload
            .get(key::AVAILABILITY)
            .and_then(Value::as_object)
            .ok_or_else(|| Error::Payload("availability response without map".into()))?;

        let available = map
            .iter()
            .map(|(app_id, v)| (app_id.clone(), v.as_str() == Some("APP_AVAILABLE")))
            .collect();

        Ok(Self { available })
    }

    pub fn is_available(&self, app_id: &str) -> bool {
        self.available.get(app_id).copied().unwrap_or(false)
    }

    pub fn app_ids(&self) -> impl Iterator<Item = &str> {
        self.available.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn receiver_status() -> Value {
        json!({
            "type": "RECEIVER_STATUS",
            "requestId": 3,
            "status": {
                "volume": {"level": 0.6, "muted": false},
                "applications": [{
                    "appId": "CC1AD845",
                    "sessionId": "sess-1",
                    "transportId": "abc123",
                    "displayName": "Default Media Receiver",
                    "statusText": "Ready"
                }]
            }
        })
    }

    #[test]
    fn test_receiver_status_decode() {
        let status = CastStatus::from_payload(&receiver_status()).unwrap();
        assert_eq!(status.volume.level, 0.6);
        assert!(!status.volume.muted);
        assert_eq!(status.apps.len(), 1);
        assert_eq!(status.apps[0].app_id, "CC1AD845");
        assert_eq!(status.apps[0].transport_id, "abc123");
    }

    #[test]
    fn test_receiver_status_without_apps() {
        let payload = json!({
            "type": "RECEIVER_STATUS",
            "status": {"volume": {"level": 1.0, "muted": true}}
        });
        let status = CastStatus::from_payload(&payload).unwrap();
        assert!(status.apps.is_empty());
        assert!(status.volume.muted);
    }

    #[test]
    fn test_receiver_status_missing_status_object() {
        let payload = json!({"type": "RECEIVER_STATUS"});
        assert!(matches!(
            CastStatus::from_payload(&payload),
            Err(Error::Payload(_))
        ));
    }

    #[test]
    fn test_app_missing_transport_id_is_error() {
        let payload = json!({
            "type": "RECEIVER_STATUS",
            "status": {
                "volume": {"level": 0.5, "muted": false},
                "applications": [{"appId": "CC1AD845", "sessionId": "s"}]
            }
        });
        assert!(CastStatus::from_payload(&payload).is_err());
    }

    #[test]
    fn test_media_status_decode() {
        let payload = json!({
            "type": "MEDIA_STATUS",
            "requestId": 9,
            "status": [{
                "mediaSessionId": 4,
                "playerState": "PLAYING",
                "currentTime": 12.5
            }]
        });
        let sessions = CastMediaStatus::list_from_payload(&payload).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].media_session_id, 4);
        assert_eq!(sessions[0].player_state, PlayerState::Playing);
        assert_eq!(sessions[0].current_time, 12.5);
    }

    #[test]
    fn test_media_status_unknown_state() {
        let payload = json!({
            "type": "MEDIA_STATUS",
            "status": [{"mediaSessionId": 1, "playerState": "LOADING"}]
        });
        let sessions = CastMediaStatus::list_from_payload(&payload).unwrap();
        assert_eq!(sessions[0].player_state, PlayerState::Unknown);
        assert_eq!(sessions[0].current_time, 0.0);
    }

    #[test]
    fn test_app_availability() {
        let payload = json!({
            "responseType": "GET_APP_AVAILABILITY",
            "availability": {
                "CC1AD845": "APP_AVAILABLE",
                "DEADBEEF": "APP_UNAVAILABLE"
            }
        });
        let availability = AppAvailability::from_payload(&payload).unwrap();
        assert!(availability.is_available("CC1AD845"));
        assert!(!availability.is_available("DEADBEEF"));
        assert!(!availability.is_available("UNKNOWN"));
    }

    #[test]
    fn test_request_id_extraction() {
        assert_eq!(request_id(&json!({"requestId": 12})), Some(12));
        assert_eq!(request_id(&json!({"requestId": 0})), None);
        assert_eq!(request_id(&json!({"type": "PING"})), None);
    }

    #[test]
    fn test_media_info_serialization() {
        let media = MediaInfo::new("http://example.com/a.mp3", "audio/mp3");
        let value = serde_json::to_value(&media).unwrap();
        assert_eq!(value["contentId"], "http://example.com/a.mp3");
        assert_eq!(value["streamType"], "BUFFERED");
        assert!(value.get("metadata").is_none());
    }
}
