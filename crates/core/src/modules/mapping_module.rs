use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::traits::{AsyncModule, ModuleEvent, ModuleId, ModuleMessage};
use crate::colour::colour_order::PrimaryColour;
use crate::device::pixel_device::PixelDevice;
use crate::mapping::mapping_engine::MappingEngine;
use crate::messages::DeviceEvent;

/// Regenerates the mapping whenever the device registry reports a device.
///
/// Keeps the registry's view of all known devices in arrival order; a device that announces
/// itself again replaces its earlier entry in place.
pub struct MappingModule {
    engine: Arc<MappingEngine>,
    pack: bool,
    devices: Vec<Arc<PixelDevice>>,
    device_rx: Option<mpsc::Receiver<DeviceEvent>>,
    status: HashMap<String, String>,
}

impl MappingModule {
    pub fn new(engine: Arc<MappingEngine>, pack: bool, device_rx: mpsc::Receiver<DeviceEvent>) -> Self {
        Self {
            engine,
            pack,
            devices: Vec::new(),
            device_rx: Some(device_rx),
            status: HashMap::new(),
        }
    }

    /// Apply one registry event and rebuild the mapping over every known device
    pub fn handle_device_event(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::Added(device) => {
                match self.devices.iter_mut().find(|known| known.id() == device.id()) {
                    Some(known) => *known = device,
                    None => self.devices.push(device),
                }
            }
        }

        self.engine.generate_mapping(&self.devices, self.pack);

        let snapshot = self.engine.snapshot();
        self.status
            .insert("generation".to_string(), snapshot.generation().to_string());
        self.status
            .insert("channels".to_string(), snapshot.len().to_string());
        self.status
            .insert("devices".to_string(), snapshot.devices().len().to_string());
        self.status.insert(
            "multicast_groups".to_string(),
            snapshot.multicast_groups().len().to_string(),
        );
    }

    pub fn known_devices(&self) -> &[Arc<PixelDevice>] {
        &self.devices
    }
}

#[async_trait]
impl AsyncModule for MappingModule {
    fn id(&self) -> ModuleId {
        ModuleId::Mapping
    }

    async fn initialize(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let order = self.engine.colour_order();
        log::info!("Colour order {}", order);
        for primary in PrimaryColour::ALL {
            log::info!("{:?} components at channel + {}", primary, order.offset(primary));
        }

        if self.pack {
            log::info!("Universe packing mode pack: universes will be filled");
        } else {
            log::info!("Universe packing mode nopack: universes will be left part-filled");
        }

        self.status.insert("colour_order".to_string(), order.to_string());
        self.status.insert("pack".to_string(), self.pack.to_string());
        self.status
            .insert("status".to_string(), "initialized".to_string());
        Ok(())
    }

    async fn run(
        &mut self,
        mut rx: mpsc::Receiver<ModuleEvent>,
        tx: mpsc::Sender<ModuleMessage>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut device_rx = self
            .device_rx
            .take()
            .ok_or("Mapping module has no device channel")?;

        self.status.insert("status".to_string(), "running".to_string());
        log::info!("Mapping module started, waiting for devices");

        loop {
            tokio::select! {
                Some(event) = rx.recv() => {
                    match event {
                        ModuleEvent::Shutdown => {
                            log::info!("Mapping module received shutdown signal");
                            break;
                        }
                    }
                }

                Some(event) = device_rx.recv() => {
                    self.handle_device_event(event);
                    let _ = tx
                        .send(ModuleMessage::Status(format!(
                            "Mapping: {} channels across {} devices",
                            self.status.get("channels").map_or("0", String::as_str),
                            self.status.get("devices").map_or("0", String::as_str),
                        )))
                        .await;
                }

                else => break,
            }
        }

        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.status
            .insert("status".to_string(), "shutdown".to_string());
        log::info!("Mapping module shutdown complete");
        Ok(())
    }

    fn status(&self) -> HashMap<String, String> {
        self.status.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colour::colour_order::ColourOrder;
    use crate::device::pixel_device::{ColourModel, DeviceId};

    fn device(last_octet: u8, pixels: usize, universe: u16) -> Arc<PixelDevice> {
        Arc::new(PixelDevice::uniform(
            DeviceId([0, 0, 0, 0, 0, last_octet]),
            1,
            ColourModel::Rgb,
            pixels,
            universe,
            1,
        ))
    }

    #[test]
    fn test_reannounced_device_replaces_layout() {
        let engine = Arc::new(MappingEngine::new(ColourOrder::RGB));
        let (_tx, rx) = mpsc::channel(1);
        let mut module = MappingModule::new(Arc::clone(&engine), true, rx);

        module.handle_device_event(DeviceEvent::Added(device(1, 10, 1)));
        module.handle_device_event(DeviceEvent::Added(device(2, 1, 2)));
        assert_eq!(engine.snapshot().len(), 33);

        module.handle_device_event(DeviceEvent::Added(device(1, 4, 1)));
        assert_eq!(module.known_devices().len(), 2);
        // shrunken layout leaves no stale entries behind
        assert_eq!(engine.snapshot().len(), 15);
        assert_eq!(module.status().get("generation").map(String::as_str), Some("3"));
    }

    #[tokio::test]
    async fn test_run_maps_devices_until_shutdown() {
        let engine = Arc::new(MappingEngine::default());
        let (device_tx, device_rx) = mpsc::channel(8);
        let (event_tx, event_rx) = mpsc::channel(8);
        let (message_tx, mut message_rx) = mpsc::channel(8);

        let mut module = MappingModule::new(Arc::clone(&engine), false, device_rx);
        module.initialize().await.unwrap();

        let handle = tokio::spawn(async move {
            module.run(event_rx, message_tx).await.unwrap();
            module
        });

        device_tx
            .send(DeviceEvent::Added(device(7, 2, 3)))
            .await
            .unwrap();
        let message = message_rx.recv().await.unwrap();
        assert!(matches!(message, ModuleMessage::Status(_)));
        assert_eq!(engine.lookup().len(), 6);

        event_tx.send(ModuleEvent::Shutdown).await.unwrap();
        let module = handle.await.unwrap();
        assert_eq!(module.known_devices().len(), 1);
    }
}
