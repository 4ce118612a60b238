//! Device representation
//!
//! A [`CastDevice`] is an immutable description of one discovered receiver.
//! The scanner replaces the whole value when a re-resolution detects a
//! change; nothing here is ever mutated in place.

use std::fmt;
use std::net::IpAddr;

/// Receiver capability bitmask from the `ca` TXT record.
///
/// Bit values are fixed by the advertisement format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities(pub u32);

impl Capabilities {
    pub const VIDEO_OUT: u32 = 1 << 0;
    pub const VIDEO_IN: u32 = 1 << 1;
    pub const AUDIO_OUT: u32 = 1 << 2;
    pub const AUDIO_IN: u32 = 1 << 3;
    pub const MULTIZONE_GROUP: u32 = 1 << 5;
    pub const MASTER_VOLUME: u32 = 1 << 11;
    pub const ATTENUATION_VOLUME: u32 = 1 << 12;

    pub fn contains(&self, bit: u32) -> bool {
        self.0 & bit != 0
    }

    pub fn video_out(&self) -> bool {
        self.contains(Self::VIDEO_OUT)
    }

    pub fn video_in(&self) -> bool {
        self.contains(Self::VIDEO_IN)
    }

    pub fn audio_out(&self) -> bool {
        self.contains(Self::AUDIO_OUT)
    }

    pub fn audio_in(&self) -> bool {
        self.contains(Self::AUDIO_IN)
    }

    /// Member of a multizone audio group
    pub fn multizone_group(&self) -> bool {
        self.contains(Self::MULTIZONE_GROUP)
    }

    pub fn master_volume(&self) -> bool {
        self.contains(Self::MASTER_VOLUME)
    }

    pub fn attenuation_volume(&self) -> bool {
        self.contains(Self::ATTENUATION_VOLUME)
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.video_out() {
            names.push("videoOut");
        }
        if self.video_in() {
            names.push("videoIn");
        }
        if self.audio_out() {
            names.push("audioOut");
        }
        if self.audio_in() {
            names.push("audioIn");
        }
        if self.multizone_group() {
            names.push("multizoneGroup");
        }
        if self.master_volume() {
            names.push("masterVolume");
        }
        if self.attenuation_volume() {
            names.push("attenuationVolume");
        }
        write!(f, "{}", names.join("|"))
    }
}

/// A discovered Cast receiver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastDevice {
    /// Receiver identifier, stable across sessions
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Hardware model
    pub model_name: String,
    /// Resolved network address
    pub address: IpAddr,
    /// Protocol port
    pub port: u16,
    /// Capability flags
    pub capabilities: Capabilities,
}

impl CastDevice {
    /// Host string for the transport layer
    pub fn host(&self) -> String {
        self.address.to_string()
    }
}

impl fmt::Display for CastDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) at {}:{}",
            self.name, self.model_name, self.address, self.port
        )
    }
}
