//! mDNS device scanner
//!
//! Continuously browses the Cast service type, resolves advertisements into
//! [`CastDevice`] values, and maintains the live set. Resolution failures
//! (missing TXT fields, no address) drop the candidate; a partial device is
//! never surfaced.

use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use castlink_core::{DEFAULT_PORT, MDNS_SERVICE_TYPE};

use crate::device::{Capabilities, CastDevice};
use crate::error::Result;
use crate::DeviceEvent;

/// Browses for Cast receivers on the local network.
///
/// Events are delivered on the channel handed out by [`new`](Self::new), in
/// resolution order per device id. The known-device set survives
/// [`stop_scanning`](Self::stop_scanning) and is discarded only by
/// [`reset`](Self::reset).
pub struct CastDeviceScanner {
    daemon: ServiceDaemon,
    registry: Arc<RwLock<Registry>>,
    events_tx: mpsc::UnboundedSender<DeviceEvent>,
    scanning: Mutex<bool>,
}

impl CastDeviceScanner {
    /// Create a scanner and the receiver for its device events
    pub fn new() -> Result<(Self, mpsc::UnboundedReceiver<DeviceEvent>)> {
        let daemon = ServiceDaemon::new()?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let scanner = Self {
            daemon,
            registry: Arc::new(RwLock::new(Registry::default())),
            events_tx,
            scanning: Mutex::new(false),
        };

        Ok((scanner, events_rx))
    }

    /// Begin continuous browsing; no-op while already scanning
    pub fn start_scanning(&self) -> Result<()> {
        let mut scanning = self.scanning.lock();
        if *scanning {
            return Ok(());
        }

        let browse_rx = self.daemon.browse(MDNS_SERVICE_TYPE)?;
        *scanning = true;
        info!("scanning for {}", MDNS_SERVICE_TYPE);

        let registry = self.registry.clone();
        let events_tx = self.events_tx.clone();

        tokio::spawn(async move {
            while let Ok(event) = browse_rx.recv_async().await {
                match event {
                    ServiceEvent::ServiceResolved(service) => {
                        match device_from_service(&service) {
                            Some(device) => {
                                let fullname = service.get_fullname().to_string();
                                if let Some(ev) = registry.write().apply_resolved(fullname, device) {
                                    let _ = events_tx.send(ev);
                                }
                            }
                            None => {
                                debug!(
                                    "dropping unresolvable advertisement: {}",
                                    service.get_fullname()
                                );
                            }
                        }
                    }
                    ServiceEvent::ServiceRemoved(_, fullname) => {
                        if let Some(ev) = registry.write().remove(&fullname) {
                            let _ = events_tx.send(ev);
                        }
                    }
                    ServiceEvent::SearchStopped(_) => {
                        debug!("browse stopped");
                        break;
                    }
                    _ => {}
                }
            }
        });

        Ok(())
    }

    /// Suspend browsing without discarding known devices
    pub fn stop_scanning(&self) {
        let mut scanning = self.scanning.lock();
        if !*scanning {
            return;
        }
        if let Err(e) = self.daemon.stop_browse(MDNS_SERVICE_TYPE) {
            warn!("stop_browse failed: {}", e);
        }
        *scanning = false;
    }

    /// Emit offline for every known device, clear the set, and stop
    pub fn reset(&self) {
        let ids: Vec<String> = {
            let mut registry = self.registry.write();
            registry.names.clear();
            registry.devices.drain().map(|(id, _)| id).collect()
        };

        for id in ids {
            let _ = self.events_tx.send(DeviceEvent::Offline(id));
        }

        self.stop_scanning();
    }

    /// Snapshot of the current live set
    pub fn devices(&self) -> Vec<CastDevice> {
        self.registry.read().devices.values().cloned().collect()
    }

    /// Look up a known device by id
    pub fn device(&self, id: &str) -> Option<CastDevice> {
        self.registry.read().devices.get(id).cloned()
    }
}

impl Drop for CastDeviceScanner {
    fn drop(&mut self) {
        let _ = self.daemon.shutdown();
    }
}

/// Live set of resolved devices, keyed by device id, with the mDNS fullname
/// of each advertisement tracked for removal events.
#[derive(Default)]
struct Registry {
    devices: HashMap<String, CastDevice>,
    names: HashMap<String, String>,
}

impl Registry {
    /// Apply a completed resolution. Returns the event to emit, if any:
    /// a new id is Online, a known id with different properties is Changed,
    /// an identical re-resolution is a duplicate and ignored.
    fn apply_resolved(&mut self, fullname: String, device: CastDevice) -> Option<DeviceEvent> {
        self.names.insert(fullname, device.id.clone());

        match self.devices.get(&device.id) {
            Some(known) if *known == device => None,
            Some(_) => {
                self.devices.insert(device.id.clone(), device.clone());
                Some(DeviceEvent::Changed(device))
            }
            None => {
                self.devices.insert(device.id.clone(), device.clone());
                Some(DeviceEvent::Online(device))
            }
        }
    }

    /// A browse-lost event for `fullname`; removes the device if known
    fn remove(&mut self, fullname: &str) -> Option<DeviceEvent> {
        let id = self.names.remove(fullname)?;
        self.devices.remove(&id)?;
        Some(DeviceEvent::Offline(id))
    }
}

/// Build a device from a resolved advertisement.
///
/// TXT fields: `id` (identity), `fn` (friendly name), `md` (model),
/// `ca` (capability bits, decimal). `id` and an address are mandatory;
/// anything else degrades gracefully.
fn device_from_service(service: &ServiceInfo) -> Option<CastDevice> {
    let props = service.get_properties();

    let id = txt_value(service, "id")?;
    let address: IpAddr = {
        let first = *service.get_addresses().iter().next()?;
        first.into()
    };

    let name = txt_value(service, "fn")
        .unwrap_or_else(|| service.get_fullname().to_string());
    let model_name = txt_value(service, "md").unwrap_or_default();
    let capabilities = parse_capabilities(props.get("ca").and_then(|p| p.val()));

    let port = match service.get_port() {
        0 => DEFAULT_PORT,
        port => port,
    };

    Some(CastDevice {
        id,
        name,
        model_name,
        address,
        port,
        capabilities,
    })
}

fn txt_value(service: &ServiceInfo, key: &str) -> Option<String> {
    service
        .get_properties()
        .get(key)
        .and_then(|p| p.val())
        .map(|v| String::from_utf8_lossy(v).into_owned())
        .filter(|s| !s.is_empty())
}

/// Parse the decimal `ca` capability field; absent or malformed means none
fn parse_capabilities(raw: Option<&[u8]>) -> Capabilities {
    let bits = raw
        .and_then(|v| std::str::from_utf8(v).ok())
        .and_then(|s| s.trim().parse::<u32>().ok())
        .unwrap_or(0);
    Capabilities(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str, name: &str) -> CastDevice {
        CastDevice {
            id: id.to_string(),
            name: name.to_string(),
            model_name: "Chromecast".to_string(),
            address: "192.168.1.50".parse().unwrap(),
            port: 8009,
            capabilities: Capabilities(Capabilities::VIDEO_OUT),
        }
    }

    #[test]
    fn test_registry_online_then_duplicate() {
        let mut registry = Registry::default();

        let ev = registry.apply_resolved("a._googlecast._tcp.local.".into(), device("dev1", "TV"));
        assert!(matches!(ev, Some(DeviceEvent::Online(_))));

        // Identical re-resolution is ignored
        let ev = registry.apply_resolved("a._googlecast._tcp.local.".into(), device("dev1", "TV"));
        assert!(ev.is_none());
        assert_eq!(registry.devices.len(), 1);
    }

    #[test]
    fn test_registry_changed_replaces_value() {
        let mut registry = Registry::default();
        registry.apply_resolved("a.local.".into(), device("dev1", "TV"));

        let ev = registry.apply_resolved("a.local.".into(), device("dev1", "Bedroom TV"));
        match ev {
            Some(DeviceEvent::Changed(d)) => assert_eq!(d.name, "Bedroom TV"),
            other => panic!("expected Changed, got {other:?}"),
        }
        assert_eq!(registry.devices["dev1"].name, "Bedroom TV");
    }

    #[test]
    fn test_registry_remove() {
        let mut registry = Registry::default();
        registry.apply_resolved("a.local.".into(), device("dev1", "TV"));

        let ev = registry.remove("a.local.");
        assert!(matches!(ev, Some(DeviceEvent::Offline(id)) if id == "dev1"));
        assert!(registry.devices.is_empty());

        // Losing an unknown advertisement emits nothing
        assert!(registry.remove("b.local.").is_none());
    }

    #[test]
    fn test_parse_capabilities() {
        // video-out (1) + master-volume (2048)
        let caps = parse_capabilities(Some(b"2049"));
        assert!(caps.video_out());
        assert!(caps.master_volume());
        assert!(!caps.audio_out());

        assert_eq!(parse_capabilities(None).0, 0);
        assert_eq!(parse_capabilities(Some(b"junk")).0, 0);
    }

    #[test]
    fn test_device_from_service() {
        let service = ServiceInfo::new(
            MDNS_SERVICE_TYPE,
            "Living-Room-TV-abc123",
            "cast-host.local.",
            "192.168.1.77",
            8009,
            &[
                ("id", "abc123"),
                ("fn", "Living Room TV"),
                ("md", "Chromecast Ultra"),
                ("ca", "5"),
            ][..],
        )
        .unwrap();

        let device = device_from_service(&service).unwrap();
        assert_eq!(device.id, "abc123");
        assert_eq!(device.name, "Living Room TV");
        assert_eq!(device.model_name, "Chromecast Ultra");
        assert_eq!(device.address, "192.168.1.77".parse::<IpAddr>().unwrap());
        assert_eq!(device.port, 8009);
        assert!(device.capabilities.video_out());
        assert!(device.capabilities.audio_out());
    }

    #[test]
    fn test_advertisement_without_id_is_dropped() {
        let service = ServiceInfo::new(
            MDNS_SERVICE_TYPE,
            "anon",
            "cast-host.local.",
            "192.168.1.78",
            8009,
            &[("fn", "Nameless")][..],
        )
        .unwrap();

        assert!(device_from_service(&service).is_none());
    }
}
