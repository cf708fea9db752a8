use std::fmt;
use std::net::Ipv4Addr;

use serde::Serialize;

use super::multicast::sacn_multicast_group;
use crate::colour::colour_order::ColourChannel;
use crate::device::pixel_device::DeviceId;
use crate::error::MappingError;

/// Number of channels in one DMX universe
pub const CHANNELS_PER_UNIVERSE: u16 = 512;

/// A single DMX slot as seen by Art-Net and sACN senders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DmxAddress {
    universe: u16,
    channel: u16,
    multicast_group: Ipv4Addr,
}

impl DmxAddress {
    /// Build the address for `channel` (1-512) of `universe`, resolving the universe's sACN
    /// multicast group. Both the mapping engine and lookups construct keys through here so
    /// they compare equal.
    pub fn resolve(universe: u32, channel: u16) -> Result<Self, MappingError> {
        if !(1..=CHANNELS_PER_UNIVERSE).contains(&channel) {
            return Err(MappingError::InvalidChannel(channel));
        }
        let multicast_group = sacn_multicast_group(universe)?;
        Ok(Self {
            // resolution succeeded, so the universe fits in 16 bits
            universe: universe as u16,
            channel,
            multicast_group,
        })
    }

    /// Same universe and group, `delta` channels further on
    pub(crate) fn offset(&self, delta: u16) -> Self {
        let channel = self.channel + delta;
        debug_assert!(channel <= CHANNELS_PER_UNIVERSE);
        Self { channel, ..*self }
    }

    pub fn universe(&self) -> u16 {
        self.universe
    }

    pub fn channel(&self) -> u16 {
        self.channel
    }

    pub fn multicast_group(&self) -> Ipv4Addr {
        self.multicast_group
    }
}

impl fmt::Display for DmxAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.universe, self.channel)
    }
}

/// One colour byte of one pixel on one device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DeviceTarget {
    pub device_id: DeviceId,
    pub strip: usize,
    pub pixel: usize,
    pub channel: ColourChannel,
}

impl DeviceTarget {
    pub fn new(device_id: DeviceId, strip: usize, pixel: usize, channel: ColourChannel) -> Self {
        Self {
            device_id,
            strip,
            pixel,
            channel,
        }
    }
}

impl fmt::Display for DeviceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} strip {} pixel {} {}",
            self.device_id, self.strip, self.pixel, self.channel
        )
    }
}
