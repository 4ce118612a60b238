//! Castlink Discovery
//!
//! Browses the local network for Cast receivers and maintains a live set of
//! devices with online/changed/offline notifications. This is a discovery
//! *client* only; nothing is advertised.

pub mod device;
pub mod error;
pub mod scanner;

pub use device::{Capabilities, CastDevice};
pub use error::{DiscoveryError, Result};
pub use scanner::CastDeviceScanner;

/// Scanner notifications, delivered in resolution order per device id
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    /// A new device was resolved
    Online(CastDevice),
    /// A known device re-resolved with different properties; carries the
    /// replacement value
    Changed(CastDevice),
    /// A device's advertisement disappeared; carries its id
    Offline(String),
}
