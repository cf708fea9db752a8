pub mod frame_store;
pub mod pixel_device;
