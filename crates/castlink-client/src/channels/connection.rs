//! Virtual-connection handshake channel
//!
//! An application-level session is multiplexed over the one physical socket.
//! Before any other namespace is usable, CONNECT is sent to the platform
//! receiver; before app-scoped messages (media control), CONNECT is sent to
//! that app's transport id.

use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use castlink_core::payload::{key, msg_type};
use castlink_core::{ns, Envelope, SENDER_ID};

use crate::channel::CastChannel;
use crate::dispatcher::RequestDispatcher;
use crate::error::Result;

pub struct ConnectionChannel {
    dispatcher: Arc<RequestDispatcher>,
}

impl ConnectionChannel {
    pub fn new(dispatcher: Arc<RequestDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Open a virtual connection to `destination_id`. Handshake messages
    /// carry no request id and are never tracked.
    pub async fn connect(&self, destination_id: &str) -> Result<()> {
        let envelope = Envelope::json(
            SENDER_ID,
            destination_id,
            ns::CONNECTION,
            json!({ key::TYPE: msg_type::CONNECT }),
        );
        self.dispatcher.send_raw(envelope).await
    }

    /// Close the virtual connection to `destination_id`
    pub async fn close(&self, destination_id: &str) -> Result<()> {
        let envelope = Envelope::json(
            SENDER_ID,
            destination_id,
            ns::CONNECTION,
            json!({ key::TYPE: msg_type::CLOSE }),
        );
        self.dispatcher.send_raw(envelope).await
    }
}

impl CastChannel for ConnectionChannel {
    fn namespace(&self) -> &str {
        ns::CONNECTION
    }

    fn handle_message(&self, envelope: &Envelope) {
        // The receiver may close a virtual connection (e.g. the app quit);
        // the transport-level teardown that follows is what surfaces it
        if let Some(body) = envelope.payload.as_json() {
            debug!(
                "connection message from {}: {:?}",
                envelope.source_id,
                body.get(key::TYPE)
            );
        }
    }
}
