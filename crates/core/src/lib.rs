pub use bridge::PixelBridge;
pub use colour::colour_order::{ColourChannel, ColourOrder, ExtraColour, PrimaryColour};
pub use config::{ConfigError, ConfigManager, ConfigSchema};
pub use device::frame_store::{DeviceFrame, FrameStore, Pixel};
pub use device::pixel_device::{ColourModel, DeviceId, PixelDevice};
pub use error::MappingError;
pub use mapping::address::{DeviceTarget, DmxAddress, CHANNELS_PER_UNIVERSE};
pub use mapping::lookup::{MappingLookup, MappingSnapshot};
pub use mapping::mapping_engine::MappingEngine;
pub use mapping::multicast::{sacn_multicast_addr, sacn_multicast_group, SACN_PORT};
pub use messages::{DeviceConfig, DeviceEvent, Settings};
// Async module system exports
pub use modules::{
    parse_sacn_dmx, ArtNetModule, AsyncModule, MappingModule, ModuleEvent, ModuleId,
    ModuleManager, ModuleMessage, SacnDmx, SacnModule,
};

mod bridge;
mod colour;
mod config;
mod device;
mod error;
mod mapping;
pub mod messages;
mod modules;
