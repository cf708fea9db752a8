use std::fmt;
use std::str::FromStr;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Hardware (MAC) address identifying a pixel controller on the device network
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct DeviceId(pub [u8; 6]);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", a, b, c, d, e, g)
    }
}

impl FromStr for DeviceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut parts = s.split(':');
        for byte in &mut bytes {
            let part = parts
                .next()
                .ok_or_else(|| format!("Invalid device id '{}': expected 6 octets", s))?;
            *byte = u8::from_str_radix(part, 16)
                .map_err(|e| format!("Invalid device id '{}': {}", s, e))?;
        }
        if parts.next().is_some() {
            return Err(format!("Invalid device id '{}': expected 6 octets", s));
        }
        Ok(DeviceId(bytes))
    }
}

/// Colour model of a physical strip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColourModel {
    #[default]
    Rgb,
    Rgbow,
}

impl ColourModel {
    /// DMX channels one pixel of this model occupies
    pub fn width(self) -> u16 {
        match self {
            ColourModel::Rgb => 3,
            ColourModel::Rgbow => 5,
        }
    }
}

/// Layout and addressing a pixel controller declares when it is discovered.
///
/// The layout is fixed for the lifetime of the value. The only mutable part is the last
/// universe the mapping engine placed the device's pixels in, which sync and flush logic
/// read back.
#[derive(Debug)]
pub struct PixelDevice {
    id: DeviceId,
    strips: Vec<ColourModel>,
    pixels_per_strip: usize,
    artnet_universe: u16,
    artnet_channel: u16,
    last_universe: Mutex<Option<u16>>,
}

impl PixelDevice {
    pub fn new(
        id: DeviceId,
        strips: Vec<ColourModel>,
        pixels_per_strip: usize,
        artnet_universe: u16,
        artnet_channel: u16,
    ) -> Self {
        Self {
            id,
            strips,
            pixels_per_strip,
            artnet_universe,
            artnet_channel,
            last_universe: Mutex::new(None),
        }
    }

    /// Device with `strip_count` strips that all share one colour model
    pub fn uniform(
        id: DeviceId,
        strip_count: usize,
        model: ColourModel,
        pixels_per_strip: usize,
        artnet_universe: u16,
        artnet_channel: u16,
    ) -> Self {
        Self::new(
            id,
            vec![model; strip_count],
            pixels_per_strip,
            artnet_universe,
            artnet_channel,
        )
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn strip_count(&self) -> usize {
        self.strips.len()
    }

    pub fn pixels_per_strip(&self) -> usize {
        self.pixels_per_strip
    }

    pub fn total_pixels(&self) -> usize {
        self.strips.len() * self.pixels_per_strip
    }

    /// Colour model of a strip; out of range strips read as RGB
    pub fn strip_model(&self, strip: usize) -> ColourModel {
        self.strips.get(strip).copied().unwrap_or_default()
    }

    pub fn artnet_universe(&self) -> u16 {
        self.artnet_universe
    }

    pub fn artnet_channel(&self) -> u16 {
        self.artnet_channel
    }

    /// Universe 0 and channel 0 together mean the device was never given an address
    pub fn is_unconfigured(&self) -> bool {
        self.artnet_universe == 0 && self.artnet_channel == 0
    }

    pub fn last_universe(&self) -> Option<u16> {
        *self.last_universe.lock()
    }

    pub fn set_last_universe(&self, universe: u16) {
        *self.last_universe.lock() = Some(universe);
    }
}
