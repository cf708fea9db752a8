use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::device::pixel_device::{ColourModel, DeviceId, PixelDevice};

/// Notifications from the device registry
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    /// A controller joined the network (or re-announced itself)
    Added(Arc<PixelDevice>),
}

/// A device declared in the config file rather than discovered on the network
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceConfig {
    /// MAC address, e.g. "d8:80:39:66:4b:0f"
    pub id: String,
    /// Colour model of each strip, in strip order
    pub strips: Vec<ColourModel>,
    pub pixels_per_strip: usize,
    pub artnet_universe: u16,
    pub artnet_channel: u16,
}

impl DeviceConfig {
    pub fn to_device(&self) -> Result<PixelDevice, String> {
        let id: DeviceId = self.id.parse()?;
        Ok(PixelDevice::new(
            id,
            self.strips.clone(),
            self.pixels_per_strip,
            self.artnet_universe,
            self.artnet_channel,
        ))
    }
}

/// Settings configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    // Mapping settings
    pub colour_order: String,
    pub packing: bool,

    // Art-Net input
    pub artnet_enabled: bool,
    pub artnet_bind_ip: String,
    pub artnet_port: u16,

    // sACN input
    pub sacn_enabled: bool,
    pub sacn_bind_ip: String,
    pub sacn_port: u16,
    pub multicast_refresh_ms: u64,

    // Diagnostics
    pub debug: bool,
    pub debug_packet_interval: u32,

    // Devices announced at startup
    pub devices: Vec<DeviceConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // Mapping defaults
            colour_order: "RGB".to_string(),
            packing: true,

            // Art-Net defaults
            artnet_enabled: true,
            artnet_bind_ip: "0.0.0.0".to_string(),
            artnet_port: 6454,

            // sACN defaults
            sacn_enabled: true,
            sacn_bind_ip: "0.0.0.0".to_string(),
            sacn_port: 5568,
            multicast_refresh_ms: 1000,

            // Diagnostics defaults
            debug: false,
            debug_packet_interval: 100,

            devices: Vec::new(),
        }
    }
}
