//! Channel abstraction
//!
//! A channel is a capability bound to one namespace: it turns typed
//! operations into payload dictionaries sent through the dispatcher, and
//! decodes inbound payloads on its namespace into typed events. Channels are
//! registered into the dispatcher's namespace map; adding a namespace is
//! purely additive.

use castlink_core::Envelope;

/// One namespace handler
pub trait CastChannel: Send + Sync {
    /// The namespace this channel is bound to
    fn namespace(&self) -> &str;

    /// Handle an inbound envelope on this namespace that was not claimed by
    /// a pending request completion
    fn handle_message(&self, envelope: &Envelope);
}
