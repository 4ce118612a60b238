//! Built-in channels
//!
//! One concrete channel per reserved namespace: virtual-connection
//! handshake, heartbeat liveness, receiver control, and media control.

pub mod connection;
pub mod heartbeat;
pub mod media;
pub mod receiver;

pub use connection::ConnectionChannel;
pub use heartbeat::HeartbeatChannel;
pub use media::MediaChannel;
pub use receiver::ReceiverChannel;
