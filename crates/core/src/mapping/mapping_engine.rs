use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::address::{DeviceTarget, DmxAddress, CHANNELS_PER_UNIVERSE};
use super::lookup::{MappingLookup, MappingSnapshot, SharedSnapshot};
use crate::colour::colour_order::{ColourChannel, ColourOrder, ExtraColour, PrimaryColour};
use crate::device::pixel_device::{ColourModel, DeviceId, PixelDevice};

/// Computes the DMX (universe, channel) to device colour byte table.
///
/// There is one writer (`generate_mapping`) and any number of readers obtained through
/// [`MappingEngine::lookup`]. Each generation is built off to the side and published in one
/// swap, so a reader sees either the previous table or the new one.
#[derive(Debug)]
pub struct MappingEngine {
    colour_order: ColourOrder,
    state: SharedSnapshot,
    // serialises generations so tracked devices and groups carry over between them
    writer: Mutex<()>,
}

/// Position of the next pixel to place
struct Cursor {
    universe: u32,
    channel: u16,
    strip: usize,
    pixel: usize,
}

/// A start channel the first pixel can occupy without running past channel 512
fn fits(channel: u16, width: u16) -> bool {
    channel <= CHANNELS_PER_UNIVERSE && CHANNELS_PER_UNIVERSE - channel >= width
}

impl MappingEngine {
    pub fn new(colour_order: ColourOrder) -> Self {
        Self {
            colour_order,
            state: Arc::new(RwLock::new(Arc::new(MappingSnapshot::default()))),
            writer: Mutex::new(()),
        }
    }

    pub fn colour_order(&self) -> ColourOrder {
        self.colour_order
    }

    /// A read handle onto the published mapping
    pub fn lookup(&self) -> MappingLookup {
        MappingLookup::new(Arc::clone(&self.state))
    }

    pub fn snapshot(&self) -> Arc<MappingSnapshot> {
        Arc::clone(&*self.state.read())
    }

    /// Rebuild the table for `devices`, in order.
    ///
    /// With `pack` set, pixels fill each universe before moving to the next one. Without it,
    /// every strip after the first begins at channel 1 of a fresh universe.
    ///
    /// The table is rebuilt from scratch, so entries for devices missing from `devices` or
    /// for pixels a device no longer declares are dropped. The tracked device list and the
    /// multicast group list only ever grow.
    pub fn generate_mapping(&self, devices: &[Arc<PixelDevice>], pack: bool) {
        let _writer = self.writer.lock();
        let current = self.snapshot();

        let mut next = MappingSnapshot {
            generation: current.generation + 1,
            table: HashMap::new(),
            devices: current.devices.clone(),
            multicast_groups: current.multicast_groups.clone(),
            last_universes: current.last_universes.clone(),
        };

        for device in devices {
            self.map_device(device, pack, &mut next);
        }

        log::info!(
            "Mapping generation {}: {} channels, {} devices, {} multicast groups",
            next.generation,
            next.table.len(),
            next.devices.len(),
            next.multicast_groups.len()
        );

        *self.state.write() = Arc::new(next);
    }

    fn map_device(&self, device: &PixelDevice, pack: bool, next: &mut MappingSnapshot) {
        let id = device.id();
        let start_universe = device.artnet_universe();
        let start_channel = device.artnet_channel();
        log::info!(
            "Mapping device {} at starting universe {}, starting channel {}",
            id,
            start_universe,
            start_channel
        );

        if device.is_unconfigured() {
            log::warn!(
                "Not mapping device {}: set its Art-Net universe and channel to something other than 0",
                id
            );
            return;
        }

        if next.devices.contains(&id) {
            log::info!("Device {} already mapped, recomputing its addresses", id);
        } else {
            next.devices.push(id);
        }

        let strip_count = device.strip_count();
        let pixels_per_strip = device.pixels_per_strip();
        let mut remaining = strip_count * pixels_per_strip;
        if remaining == 0 {
            log::warn!("Device {} declares no pixels", id);
            return;
        }

        let mut cursor = Cursor {
            universe: start_universe as u32,
            channel: start_channel,
            strip: 0,
            pixel: 0,
        };

        if cursor.channel == 0 {
            log::warn!("Device {} declares channel 0, starting at channel 1", id);
            cursor.channel = 1;
        }
        let first_width = device.strip_model(0).width();
        if !fits(cursor.channel, first_width) {
            log::warn!(
                "Device {} start channel {} leaves no room for a pixel, starting at universe {} channel 1",
                id,
                cursor.channel,
                cursor.universe + 1
            );
            cursor.channel = 1;
            cursor.universe += 1;
        }

        while remaining > 0 {
            let base = match DmxAddress::resolve(cursor.universe, cursor.channel) {
                Ok(base) => base,
                Err(e) => {
                    // every later universe is out of range too
                    log::error!("{}: {} pixels of device {} left unmapped", e, remaining, id);
                    break;
                }
            };

            let model = device.strip_model(cursor.strip);
            let width = model.width();
            self.emit_pixel(next, &cursor, base, id, model);

            next.last_universes.insert(id, base.universe());
            device.set_last_universe(base.universe());

            let group = base.multicast_group();
            if !next.multicast_groups.contains(&group) {
                next.multicast_groups.push(group);
            }

            cursor.pixel += 1;
            remaining -= 1;

            if cursor.pixel == pixels_per_strip {
                cursor.pixel = 0;
                cursor.strip += 1;

                if cursor.strip >= strip_count {
                    continue;
                }

                if !pack {
                    cursor.channel = 1;
                    cursor.universe += 1;
                    continue;
                }
            }

            // never split a pixel across universes; room is judged by the next pixel's model
            cursor.channel += width;
            let next_width = device.strip_model(cursor.strip).width();
            if CHANNELS_PER_UNIVERSE - cursor.channel < next_width {
                cursor.channel = 1;
                cursor.universe += 1;
            }
        }
    }

    fn emit_pixel(
        &self,
        next: &mut MappingSnapshot,
        cursor: &Cursor,
        base: DmxAddress,
        id: DeviceId,
        model: ColourModel,
    ) {
        let target = |channel| DeviceTarget::new(id, cursor.strip, cursor.pixel, channel);

        for primary in PrimaryColour::ALL {
            let address = base.offset(self.colour_order.offset(primary));
            next.table.insert(address, target(ColourChannel::Primary(primary)));
        }

        if model == ColourModel::Rgbow {
            for extra in ExtraColour::ALL {
                next.table
                    .insert(base.offset(extra.offset()), target(ColourChannel::Extra(extra)));
            }
        }

        log::debug!(
            "{:?} channels [{}, {}..{}] -> device {} [{}, {}] at multicast {}",
            model,
            base.universe(),
            base.channel(),
            base.channel() + model.width() - 1,
            id,
            cursor.strip,
            cursor.pixel,
            base.multicast_group()
        );
    }
}

impl Default for MappingEngine {
    fn default() -> Self {
        Self::new(ColourOrder::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb_device(strips: usize, pixels: usize, universe: u16, channel: u16) -> Arc<PixelDevice> {
        Arc::new(PixelDevice::uniform(
            DeviceId([0xaa, 0, 0, 0, 0, 1]),
            strips,
            ColourModel::Rgb,
            pixels,
            universe,
            channel,
        ))
    }

    #[test]
    fn test_two_pixel_example() {
        let engine = MappingEngine::default();
        let device = rgb_device(1, 2, 1, 1);
        engine.generate_mapping(&[Arc::clone(&device)], true);

        let lookup = engine.lookup();
        assert_eq!(lookup.len(), 6);
        let expected = [
            (1, 0, ColourChannel::RED),
            (2, 0, ColourChannel::GREEN),
            (3, 0, ColourChannel::BLUE),
            (4, 1, ColourChannel::RED),
            (5, 1, ColourChannel::GREEN),
            (6, 1, ColourChannel::BLUE),
        ];
        for (channel, pixel, colour) in expected {
            assert_eq!(
                lookup.lookup(1, channel),
                Some(DeviceTarget::new(device.id(), 0, pixel, colour)),
                "channel {}",
                channel
            );
        }
        assert_eq!(device.last_universe(), Some(1));
        assert_eq!(lookup.last_universe(&device.id()), Some(1));
    }

    #[test]
    fn test_grb_order_swaps_red_and_green() {
        let engine = MappingEngine::new(ColourOrder::new("GRB").unwrap());
        let device = rgb_device(1, 2, 1, 1);
        engine.generate_mapping(&[Arc::clone(&device)], true);

        let lookup = engine.lookup();
        assert_eq!(lookup.lookup(1, 1).unwrap().channel, ColourChannel::GREEN);
        assert_eq!(lookup.lookup(1, 2).unwrap().channel, ColourChannel::RED);
        assert_eq!(lookup.lookup(1, 3).unwrap().channel, ColourChannel::BLUE);
        assert_eq!(lookup.lookup(1, 4).unwrap().channel, ColourChannel::GREEN);
        assert_eq!(lookup.lookup(1, 5).unwrap().channel, ColourChannel::RED);
    }

    #[test]
    fn test_unconfigured_device_is_skipped() {
        let engine = MappingEngine::default();
        engine.generate_mapping(&[rgb_device(2, 10, 0, 0)], true);

        let snapshot = engine.snapshot();
        assert!(snapshot.is_empty());
        assert!(snapshot.devices().is_empty());
        assert!(snapshot.multicast_groups().is_empty());
    }

    #[test]
    fn test_channel_zero_starts_at_one() {
        let engine = MappingEngine::default();
        engine.generate_mapping(&[rgb_device(1, 1, 3, 0)], true);

        let lookup = engine.lookup();
        assert_eq!(lookup.lookup(3, 1).unwrap().channel, ColourChannel::RED);
        assert_eq!(lookup.len(), 3);
    }

    #[test]
    fn test_start_channel_without_room_moves_to_next_universe() {
        let engine = MappingEngine::default();
        engine.generate_mapping(&[rgb_device(1, 1, 1, 511)], true);

        let lookup = engine.lookup();
        assert_eq!(lookup.lookup(1, 511), None);
        assert_eq!(lookup.lookup(2, 1).unwrap().channel, ColourChannel::RED);
    }

    #[test]
    fn test_membership_is_idempotent() {
        let engine = MappingEngine::default();
        let device = rgb_device(1, 4, 1, 1);
        engine.generate_mapping(&[Arc::clone(&device)], true);
        engine.generate_mapping(&[Arc::clone(&device)], true);

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.devices(), &[device.id()]);
        assert_eq!(snapshot.len(), 12);
        assert_eq!(snapshot.generation(), 2);
    }

    #[test]
    fn test_universe_overflow_stops_device_only() {
        let engine = MappingEngine::default();
        let edge = Arc::new(PixelDevice::uniform(
            DeviceId([1; 6]),
            2,
            ColourModel::Rgb,
            1,
            65535,
            1,
        ));
        let other = Arc::new(PixelDevice::uniform(
            DeviceId([2; 6]),
            1,
            ColourModel::Rgb,
            1,
            5,
            1,
        ));
        engine.generate_mapping(&[edge, Arc::clone(&other)], false);

        let snapshot = engine.snapshot();
        // first strip fits in universe 65535, the second would need 65536
        assert_eq!(snapshot.len(), 6);
        assert_eq!(snapshot.devices().len(), 2);
        assert!(snapshot.target(5, 1).is_some());
    }
}
