use std::collections::HashMap;

use parking_lot::Mutex;

use super::pixel_device::DeviceId;
use crate::colour::colour_order::{ColourChannel, ExtraColour, PrimaryColour};
use crate::mapping::address::{DeviceTarget, CHANNELS_PER_UNIVERSE};
use crate::mapping::lookup::MappingSnapshot;

/// Colour of one pixel. Orange and white stay 0 on RGB strips.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pixel {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub orange: u8,
    pub white: u8,
}

impl Pixel {
    pub fn set(&mut self, channel: ColourChannel, value: u8) {
        let slot = match channel {
            ColourChannel::Primary(PrimaryColour::Red) => &mut self.red,
            ColourChannel::Primary(PrimaryColour::Green) => &mut self.green,
            ColourChannel::Primary(PrimaryColour::Blue) => &mut self.blue,
            ColourChannel::Extra(ExtraColour::Orange) => &mut self.orange,
            ColourChannel::Extra(ExtraColour::White) => &mut self.white,
        };
        *slot = value;
    }
}

/// Pending output for one device, strip by strip
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceFrame {
    pub strips: Vec<Vec<Pixel>>,
}

impl DeviceFrame {
    pub fn pixel(&self, strip: usize, pixel: usize) -> Option<&Pixel> {
        self.strips.get(strip)?.get(pixel)
    }

    fn pixel_mut(&mut self, strip: usize, pixel: usize) -> &mut Pixel {
        if self.strips.len() <= strip {
            self.strips.resize_with(strip + 1, Vec::new);
        }
        let strip = &mut self.strips[strip];
        if strip.len() <= pixel {
            strip.resize(pixel + 1, Pixel::default());
        }
        &mut strip[pixel]
    }
}

#[derive(Debug, Default)]
struct FrameSlot {
    frame: DeviceFrame,
    dirty: bool,
}

/// Output buffers the protocol receivers write into and the device pusher drains.
///
/// Frames grow on demand to cover whatever strip and pixel indices are written.
#[derive(Debug, Default)]
pub struct FrameStore {
    slots: Mutex<HashMap<DeviceId, FrameSlot>>,
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&self, target: &DeviceTarget, value: u8) {
        let mut slots = self.slots.lock();
        let slot = slots.entry(target.device_id).or_default();
        slot.frame
            .pixel_mut(target.strip, target.pixel)
            .set(target.channel, value);
        slot.dirty = true;
    }

    /// Write a batch of resolved bytes under one lock
    pub fn write_all<I>(&self, writes: I) -> usize
    where
        I: IntoIterator<Item = (DeviceTarget, u8)>,
    {
        let mut slots = self.slots.lock();
        let mut written = 0;
        for (target, value) in writes {
            let slot = slots.entry(target.device_id).or_default();
            slot.frame
                .pixel_mut(target.strip, target.pixel)
                .set(target.channel, value);
            slot.dirty = true;
            written += 1;
        }
        written
    }

    /// Route one universe of DMX data, `data[0]` being channel 1. Channels without a mapping
    /// are dropped. Returns how many bytes landed in a frame.
    pub fn apply_universe(&self, mapping: &MappingSnapshot, universe: u16, data: &[u8]) -> usize {
        let writes = data
            .iter()
            .take(CHANNELS_PER_UNIVERSE as usize)
            .zip(1..=CHANNELS_PER_UNIVERSE)
            .filter_map(|(value, channel)| {
                mapping
                    .target(universe, channel)
                    .map(|target| (target, *value))
            });
        self.write_all(writes)
    }

    /// Copy of a device's current frame
    pub fn frame(&self, device: &DeviceId) -> Option<DeviceFrame> {
        self.slots.lock().get(device).map(|slot| slot.frame.clone())
    }

    /// Frames changed since the last call, clearing their dirty flags
    pub fn take_dirty(&self) -> Vec<(DeviceId, DeviceFrame)> {
        let mut slots = self.slots.lock();
        slots
            .iter_mut()
            .filter(|(_, slot)| slot.dirty)
            .map(|(id, slot)| {
                slot.dirty = false;
                (*id, slot.frame.clone())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_grows_frame() {
        let store = FrameStore::new();
        let id = DeviceId([9; 6]);
        store.write(&DeviceTarget::new(id, 1, 4, ColourChannel::WHITE), 200);

        let frame = store.frame(&id).unwrap();
        assert_eq!(frame.strips.len(), 2);
        assert_eq!(frame.strips[1].len(), 5);
        assert_eq!(frame.pixel(1, 4).unwrap().white, 200);
        assert_eq!(frame.pixel(0, 0), None);
    }

    #[test]
    fn test_take_dirty_clears_flag() {
        let store = FrameStore::new();
        let id = DeviceId([3; 6]);
        let written = store.write_all([
            (DeviceTarget::new(id, 0, 0, ColourChannel::RED), 10),
            (DeviceTarget::new(id, 0, 0, ColourChannel::GREEN), 20),
        ]);
        assert_eq!(written, 2);

        let dirty = store.take_dirty();
        assert_eq!(dirty.len(), 1);
        let pixel = dirty[0].1.pixel(0, 0).unwrap();
        assert_eq!((pixel.red, pixel.green, pixel.blue), (10, 20, 0));

        assert!(store.take_dirty().is_empty());
    }
}
