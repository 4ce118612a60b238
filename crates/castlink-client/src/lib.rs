//! Castlink Client Library
//!
//! High-level async client for driving one Cast receiver: request
//! dispatching over one TLS connection, namespace channels, and the session
//! facade with its connection state machine.
//!
//! # Example
//!
//! ```ignore
//! use castlink_client::{CastClient, ClientEvent};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let (client, mut events) = CastClient::new(device);
//!     client.connect().await?;
//!
//!     let app = client.launch("CC1AD845").await?;
//!     let media = castlink_core::MediaInfo::new("http://host/track.mp3", "audio/mp3");
//!     client.load(&media, &app).await?;
//!
//!     while let Some(event) = events.recv().await {
//!         println!("{event:?}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod channels;
pub mod client;
pub mod dispatcher;
pub mod error;

pub use channel::CastChannel;
pub use client::{CastClient, ClientConfig, ConnectionState};
pub use dispatcher::{CastRequest, RequestDispatcher};
pub use error::{ClientError, Result};

use castlink_core::{CastMediaStatus, CastStatus};

/// Events delivered to the client's observer.
///
/// All events arrive on the single receiver handed out by
/// [`CastClient::new`]; the consumer never synchronizes.
#[derive(Debug)]
pub enum ClientEvent {
    /// Transport and virtual-connection handshake completed
    Connected,
    /// Receiver status changed (volume, running apps)
    StatusUpdated(CastStatus),
    /// Media session status changed
    MediaStatusUpdated(CastMediaStatus),
    /// Terminal event, delivered exactly once. `None` for a locally
    /// requested disconnect; the error otherwise.
    Disconnected(Option<ClientError>),
}

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::client::{CastClient, ClientConfig};
    pub use crate::error::{ClientError, Result};
    pub use crate::ClientEvent;
    pub use castlink_core::{CastApp, CastMediaStatus, CastStatus, MediaInfo, Volume};
}
