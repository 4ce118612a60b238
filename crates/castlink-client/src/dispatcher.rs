//! Request dispatcher
//!
//! Multiplexes many concurrent requests over one transport. Every tracked
//! request gets a connection-scoped integer id stamped into its payload under
//! `requestId`; inbound messages carrying a pending id complete the matching
//! caller, everything else is routed to the channel registered for the
//! message's namespace. Responses correlate purely by id — no FIFO order is
//! assumed.

use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use castlink_core::payload::{self, key};
use castlink_core::{Envelope, Payload, SENDER_ID};
use castlink_transport::TransportSender;

use crate::channel::CastChannel;
use crate::error::{ClientError, Result};

type Completion = oneshot::Sender<Result<Value>>;

/// An outbound request: the envelope plus its allocated id.
///
/// Built by [`RequestDispatcher::request`]; nothing is sent until the request
/// is handed back to [`send`](RequestDispatcher::send) or
/// [`send_for_response`](RequestDispatcher::send_for_response).
#[derive(Debug)]
pub struct CastRequest {
    pub id: i64,
    pub envelope: Envelope,
}

/// Correlates responses to outstanding requests on one connection
pub struct RequestDispatcher {
    sender: Arc<dyn TransportSender>,
    source_id: String,
    next_id: AtomicI64,
    pending: DashMap<i64, Completion>,
    channels: DashMap<String, Arc<dyn CastChannel>>,
}

impl RequestDispatcher {
    pub fn new(sender: Arc<dyn TransportSender>) -> Self {
        Self {
            sender,
            source_id: SENDER_ID.to_string(),
            next_id: AtomicI64::new(1),
            pending: DashMap::new(),
            channels: DashMap::new(),
        }
    }

    /// Register the handler for a namespace
    pub fn register_channel(&self, channel: Arc<dyn CastChannel>) {
        self.channels
            .insert(channel.namespace().to_string(), channel);
    }

    /// Allocate the next request id and stamp it into `payload`.
    ///
    /// Ids are unique among outstanding requests for the lifetime of this
    /// dispatcher and are never reused while a completion is pending.
    pub fn request(&self, namespace: &str, destination_id: &str, mut body: Value) -> CastRequest {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        body[key::REQUEST_ID] = Value::from(id);

        CastRequest {
            id,
            envelope: Envelope::json(self.source_id.clone(), destination_id, namespace, body),
        }
    }

    /// Send a request fire-and-forget; it is never tracked for correlation
    pub async fn send(&self, request: CastRequest) -> Result<()> {
        self.sender.send(request.envelope).await?;
        Ok(())
    }

    /// Send an envelope that carries no request id (handshake, heartbeat)
    pub async fn send_raw(&self, envelope: Envelope) -> Result<()> {
        self.sender.send(envelope).await?;
        Ok(())
    }

    /// Send a request and hand back the completion for its response.
    ///
    /// The completion is registered before the write is issued, so a response
    /// arriving in the same tick as the send still finds its entry.
    pub async fn send_with_completion(
        &self,
        request: CastRequest,
    ) -> Result<oneshot::Receiver<Result<Value>>> {
        let (tx, rx) = oneshot::channel();
        let id = request.id;
        self.pending.insert(id, tx);

        if let Err(e) = self.sender.send(request.envelope).await {
            self.pending.remove(&id);
            return Err(e.into());
        }

        Ok(rx)
    }

    /// Send a request and wait for its correlated response payload
    pub async fn send_for_response(&self, request: CastRequest) -> Result<Value> {
        let rx = self.send_with_completion(request).await?;
        rx.await
            .map_err(|_| ClientError::Cancelled("dispatcher dropped".into()))?
    }

    /// Route one inbound envelope: a payload carrying a pending `requestId`
    /// completes its caller; everything else goes to the channel registered
    /// for the namespace. Unknown namespaces are expected (unimplemented
    /// receiver features) and dropped with a warning.
    pub fn handle_incoming(&self, envelope: &Envelope) {
        if let Payload::Json(body) = &envelope.payload {
            if let Some(id) = payload::request_id(body) {
                if let Some((_, completion)) = self.pending.remove(&id) {
                    debug!("completing request {}", id);
                    let _ = completion.send(Ok(body.clone()));
                    return;
                }
            }
        }

        match self.channels.get(&envelope.namespace) {
            Some(channel) => channel.handle_message(envelope),
            None => {
                warn!("no channel for namespace {}, dropping", envelope.namespace);
            }
        }
    }

    /// Fail every outstanding request. Invoked once by the client on
    /// disconnect; afterwards the pending table is empty.
    pub fn cancel_all(&self, reason: &str) {
        let ids: Vec<i64> = self.pending.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            if let Some((_, completion)) = self.pending.remove(&id) {
                let _ = completion.send(Err(ClientError::Cancelled(reason.to_string())));
            }
        }
    }

    /// Number of requests awaiting a response
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
