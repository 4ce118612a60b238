//! Heartbeat channel
//!
//! Liveness over the heartbeat namespace: PING on a fixed interval, any
//! inbound traffic resets the deadline. Heartbeat messages never reach the
//! client's observer. A receiver-initiated PING is answered with PONG.

use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use castlink_core::payload::{key, msg_type};
use castlink_core::{ns, Envelope, RECEIVER_ID, SENDER_ID};

use crate::channel::CastChannel;
use crate::dispatcher::RequestDispatcher;
use crate::error::Result;

pub struct HeartbeatChannel {
    dispatcher: Arc<RequestDispatcher>,
    last_traffic: Mutex<Instant>,
}

impl HeartbeatChannel {
    pub fn new(dispatcher: Arc<RequestDispatcher>) -> Arc<Self> {
        Arc::new(Self {
            dispatcher,
            last_traffic: Mutex::new(Instant::now()),
        })
    }

    /// Record inbound traffic; the read loop calls this for every envelope,
    /// not just heartbeat messages
    pub fn touch(&self) {
        *self.last_traffic.lock() = Instant::now();
    }

    /// Time since the last inbound traffic
    pub fn elapsed(&self) -> Duration {
        self.last_traffic.lock().elapsed()
    }

    /// Send one PING, fire-and-forget
    pub async fn ping(&self) -> Result<()> {
        let envelope = Envelope::json(
            SENDER_ID,
            RECEIVER_ID,
            ns::HEARTBEAT,
            json!({ key::TYPE: msg_type::PING }),
        );
        self.dispatcher.send_raw(envelope).await
    }

    /// Ping on every `interval` tick until no traffic has been observed for
    /// `timeout`; resolves when liveness is lost. The caller owns the
    /// teardown that follows.
    pub async fn watch(&self, interval: Duration, timeout: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            if self.elapsed() > timeout {
                warn!("liveness lost: no traffic for {:?}", self.elapsed());
                return;
            }

            if let Err(e) = self.ping().await {
                debug!("ping failed: {}", e);
                return;
            }
        }
    }
}

impl CastChannel for HeartbeatChannel {
    fn namespace(&self) -> &str {
        ns::HEARTBEAT
    }

    fn handle_message(&self, envelope: &Envelope) {
        let Some(body) = envelope.payload.as_json() else {
            return;
        };

        match body.get(key::TYPE).and_then(|t| t.as_str()) {
            // Receiver-initiated PING: answer it
            Some(msg_type::PING) => {
                let dispatcher = self.dispatcher.clone();
                let destination = envelope.source_id.clone();
                tokio::spawn(async move {
                    let pong = Envelope::json(
                        SENDER_ID,
                        destination,
                        ns::HEARTBEAT,
                        json!({ key::TYPE: msg_type::PONG }),
                    );
                    if let Err(e) = dispatcher.send_raw(pong).await {
                        debug!("pong failed: {}", e);
                    }
                });
            }
            // PONG resets the deadline (done by the read loop) and produces
            // no observer callback
            Some(msg_type::PONG) => {}
            other => debug!("unexpected heartbeat message: {:?}", other),
        }
    }
}
