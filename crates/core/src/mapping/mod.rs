pub mod address;
pub mod lookup;
pub mod mapping_engine;
pub mod multicast;
