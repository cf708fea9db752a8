pub mod artnet_module;
pub mod mapping_module;
pub mod module_manager;
pub mod sacn_module;
pub mod traits;

// Re-export for convenience
pub use artnet_module::ArtNetModule;
pub use mapping_module::MappingModule;
pub use module_manager::ModuleManager;
pub use sacn_module::{parse_sacn_dmx, SacnDmx, SacnModule};
pub use traits::{AsyncModule, ModuleEvent, ModuleId, ModuleMessage};
