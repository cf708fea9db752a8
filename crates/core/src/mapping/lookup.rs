use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

use parking_lot::RwLock;

use super::address::{DeviceTarget, DmxAddress};
use crate::device::pixel_device::DeviceId;

pub(crate) type SharedSnapshot = Arc<RwLock<Arc<MappingSnapshot>>>;

/// One complete generation of the mapping.
///
/// Snapshots are immutable once published; the engine builds the next one on the side and
/// swaps it in whole.
#[derive(Debug, Default, Clone)]
pub struct MappingSnapshot {
    pub(crate) generation: u64,
    pub(crate) table: HashMap<DmxAddress, DeviceTarget>,
    pub(crate) devices: Vec<DeviceId>,
    pub(crate) multicast_groups: Vec<Ipv4Addr>,
    pub(crate) last_universes: HashMap<DeviceId, u16>,
}

impl MappingSnapshot {
    /// Resolve a DMX slot to the colour byte it drives
    pub fn target(&self, universe: u16, channel: u16) -> Option<DeviceTarget> {
        let address = DmxAddress::resolve(universe as u32, channel).ok()?;
        self.table.get(&address).copied()
    }

    /// Number of generations published before and including this one
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn table(&self) -> &HashMap<DmxAddress, DeviceTarget> {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Devices that have been mapped, in the order they were first seen
    pub fn devices(&self) -> &[DeviceId] {
        &self.devices
    }

    /// sACN groups carrying at least one mapped universe
    pub fn multicast_groups(&self) -> &[Ipv4Addr] {
        &self.multicast_groups
    }

    pub fn last_universe(&self, device: &DeviceId) -> Option<u16> {
        self.last_universes.get(device).copied()
    }
}

/// Read side of the mapping, handed to protocol receivers.
///
/// Cheap to clone. Every call observes exactly one published snapshot.
#[derive(Debug, Clone)]
pub struct MappingLookup {
    state: SharedSnapshot,
}

impl MappingLookup {
    pub(crate) fn new(state: SharedSnapshot) -> Self {
        Self { state }
    }

    /// The current snapshot. Hold on to it to resolve a whole packet against one generation.
    pub fn snapshot(&self) -> Arc<MappingSnapshot> {
        Arc::clone(&*self.state.read())
    }

    pub fn lookup(&self, universe: u16, channel: u16) -> Option<DeviceTarget> {
        self.snapshot().target(universe, channel)
    }

    pub fn multicast_groups(&self) -> Vec<Ipv4Addr> {
        self.snapshot().multicast_groups.clone()
    }

    pub fn mapped_devices(&self) -> Vec<DeviceId> {
        self.snapshot().devices.clone()
    }

    pub fn last_universe(&self, device: &DeviceId) -> Option<u16> {
        self.snapshot().last_universe(device)
    }

    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    pub fn len(&self) -> usize {
        self.state.read().table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
