use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::colour::colour_order::ColourOrder;
use crate::device::frame_store::FrameStore;
use crate::mapping::lookup::MappingLookup;
use crate::mapping::mapping_engine::MappingEngine;
use crate::messages::{DeviceEvent, Settings};
use crate::modules::{
    ArtNetModule, MappingModule, ModuleId, ModuleManager, ModuleMessage, SacnModule,
};

const DEVICE_CHANNEL_SIZE: usize = 64;

/// Wires the mapping engine, the frame store and the network listeners together
pub struct PixelBridge {
    settings: Settings,
    engine: Arc<MappingEngine>,
    frames: Arc<FrameStore>,
    device_tx: mpsc::Sender<DeviceEvent>,

    // Async module system
    module_manager: ModuleManager,
    message_handler: Option<JoinHandle<()>>,

    is_running: bool,
}

impl PixelBridge {
    /// Build the bridge from validated settings. An unknown colour order is fatal.
    pub fn new(settings: Settings) -> Result<Self, anyhow::Error> {
        let colour_order = ColourOrder::new(&settings.colour_order)?;
        let engine = Arc::new(MappingEngine::new(colour_order));
        let frames = Arc::new(FrameStore::new());
        let (device_tx, device_rx) = mpsc::channel(DEVICE_CHANNEL_SIZE);

        let mut module_manager = ModuleManager::new();
        module_manager.register_module(Box::new(MappingModule::new(
            Arc::clone(&engine),
            settings.packing,
            device_rx,
        )));

        if settings.artnet_enabled {
            let ip: IpAddr = settings
                .artnet_bind_ip
                .parse()
                .with_context(|| format!("Invalid Art-Net bind IP {}", settings.artnet_bind_ip))?;
            let mut artnet = ArtNetModule::new(
                SocketAddr::new(ip, settings.artnet_port),
                engine.lookup(),
                Arc::clone(&frames),
            );
            artnet.set_debug(settings.debug, settings.debug_packet_interval);
            module_manager.register_module(Box::new(artnet));
        }

        if settings.sacn_enabled {
            let interface: Ipv4Addr = settings
                .sacn_bind_ip
                .parse()
                .with_context(|| format!("Invalid sACN bind IP {}", settings.sacn_bind_ip))?;
            let mut sacn = SacnModule::new(
                interface,
                settings.sacn_port,
                engine.lookup(),
                Arc::clone(&frames),
            );
            sacn.set_refresh_interval(Duration::from_millis(settings.multicast_refresh_ms.max(1)));
            module_manager.register_module(Box::new(sacn));
        }

        Ok(Self {
            settings,
            engine,
            frames,
            device_tx,
            module_manager,
            message_handler: None,
            is_running: false,
        })
    }

    /// Initialize and start every module
    pub async fn initialize(&mut self) -> Result<(), anyhow::Error> {
        log::info!("Initializing pixel bridge...");

        self.module_manager
            .initialize()
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        self.module_manager
            .start()
            .await
            .map_err(|e| anyhow::anyhow!(e))?;

        if let Some(mut message_rx) = self.module_manager.take_message_receiver() {
            let handle = tokio::spawn(async move {
                while let Some(message) = message_rx.recv().await {
                    match message {
                        ModuleMessage::Status(status) => log::info!("Module status: {}", status),
                        ModuleMessage::Error(error) => log::error!("Module error: {}", error),
                    }
                }
            });
            self.message_handler = Some(handle);
        }

        self.is_running = true;
        log::info!("Pixel bridge initialized successfully");
        Ok(())
    }

    /// Report a device to the mapping module
    pub async fn add_device(&self, event: DeviceEvent) -> Result<(), anyhow::Error> {
        self.device_tx
            .send(event)
            .await
            .map_err(|_| anyhow::anyhow!("Mapping module is not running"))
    }

    /// Sender for a device registry running elsewhere
    pub fn device_sender(&self) -> mpsc::Sender<DeviceEvent> {
        self.device_tx.clone()
    }

    pub fn lookup(&self) -> MappingLookup {
        self.engine.lookup()
    }

    pub fn engine(&self) -> &Arc<MappingEngine> {
        &self.engine
    }

    pub fn frames(&self) -> &Arc<FrameStore> {
        &self.frames
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn has_module(&self, id: ModuleId) -> bool {
        self.module_manager.has_module(id)
    }

    /// Status of each module; populated before start and after shutdown
    pub fn module_status(&self) -> HashMap<ModuleId, HashMap<String, String>> {
        self.module_manager.get_status()
    }

    pub async fn shutdown(&mut self) -> Result<(), anyhow::Error> {
        if !self.is_running {
            return Ok(());
        }

        log::info!("Shutting down pixel bridge...");

        self.module_manager
            .shutdown()
            .await
            .map_err(|e| anyhow::anyhow!(e))?;

        if let Some(handle) = self.message_handler.take() {
            handle.abort();
        }

        self.is_running = false;
        log::info!("Pixel bridge shutdown complete");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }
}
