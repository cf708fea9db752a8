use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use artnet_protocol::ArtCommand;
use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use super::traits::{AsyncModule, ModuleEvent, ModuleId, ModuleMessage};
use crate::device::frame_store::FrameStore;
use crate::mapping::lookup::MappingLookup;

// OpDmx header plus a full universe, with room to spare
const RECEIVE_BUFFER_SIZE: usize = 1024;

/// Listens for Art-Net OpDmx packets and routes their channels into device frames
pub struct ArtNetModule {
    bind_addr: SocketAddr,
    lookup: MappingLookup,
    frames: Arc<FrameStore>,
    socket: Option<UdpSocket>,
    debug: bool,
    debug_interval: u64,
    packets_received: u64,
    bytes_routed: u64,
    status: HashMap<String, String>,
}

impl ArtNetModule {
    pub fn new(bind_addr: SocketAddr, lookup: MappingLookup, frames: Arc<FrameStore>) -> Self {
        Self {
            bind_addr,
            lookup,
            frames,
            socket: None,
            debug: false,
            debug_interval: 100,
            packets_received: 0,
            bytes_routed: 0,
            status: HashMap::new(),
        }
    }

    /// Log a line every `interval` DMX packets
    pub fn set_debug(&mut self, debug: bool, interval: u32) {
        self.debug = debug;
        self.debug_interval = u64::from(interval.max(1));
    }

    pub fn packets_received(&self) -> u64 {
        self.packets_received
    }

    /// Decode one datagram. Non-DMX Art-Net traffic and malformed packets are ignored.
    pub fn handle_datagram(&mut self, data: &[u8], source: SocketAddr) {
        let command = match ArtCommand::from_buffer(data) {
            Ok(command) => command,
            Err(e) => {
                log::debug!("Dropping malformed Art-Net packet from {}: {:?}", source, e);
                return;
            }
        };

        match command {
            ArtCommand::Output(output) => {
                let universe = u16::from(output.port_address);
                let payload: &[u8] = output.data.as_ref();
                let routed = self
                    .frames
                    .apply_universe(&self.lookup.snapshot(), universe, payload);

                self.packets_received += 1;
                self.bytes_routed += routed as u64;

                if self.debug && self.packets_received % self.debug_interval == 0 {
                    log::info!(
                        "Art-Net: {} packets received, last from {} for universe {} ({} of {} channels mapped)",
                        self.packets_received,
                        source,
                        universe,
                        routed,
                        payload.len()
                    );
                }
            }
            other => log::trace!("Ignoring Art-Net command from {}: {:?}", source, other),
        }
    }
}

#[async_trait]
impl AsyncModule for ArtNetModule {
    fn id(&self) -> ModuleId {
        ModuleId::ArtNet
    }

    async fn initialize(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        log::info!("Initializing Art-Net listener on {}", self.bind_addr);

        let socket = UdpSocket::bind(self.bind_addr).await?;
        socket.set_broadcast(true)?;
        self.socket = Some(socket);

        self.status
            .insert("bind".to_string(), self.bind_addr.to_string());
        self.status
            .insert("status".to_string(), "initialized".to_string());
        Ok(())
    }

    async fn run(
        &mut self,
        mut rx: mpsc::Receiver<ModuleEvent>,
        tx: mpsc::Sender<ModuleMessage>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let socket = self
            .socket
            .take()
            .ok_or("Art-Net module not initialized")?;
        let mut buffer = vec![0u8; RECEIVE_BUFFER_SIZE];

        log::info!("Art-Net module started, listening on {}", self.bind_addr);
        let _ = tx
            .send(ModuleMessage::Status(format!(
                "Art-Net listening on {}",
                self.bind_addr
            )))
            .await;

        loop {
            tokio::select! {
                Some(event) = rx.recv() => {
                    match event {
                        ModuleEvent::Shutdown => {
                            log::info!("Art-Net module received shutdown signal");
                            break;
                        }
                    }
                }

                received = socket.recv_from(&mut buffer) => {
                    match received {
                        Ok((length, source)) => self.handle_datagram(&buffer[..length], source),
                        Err(e) => log::warn!("Art-Net receive error: {}", e),
                    }
                }
            }
        }

        log::info!(
            "Art-Net module shutting down after {} packets ({} channels routed)",
            self.packets_received,
            self.bytes_routed
        );
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.status
            .insert("packets".to_string(), self.packets_received.to_string());
        self.status
            .insert("status".to_string(), "shutdown".to_string());
        log::info!("Art-Net module shutdown complete");
        Ok(())
    }

    fn status(&self) -> HashMap<String, String> {
        self.status.clone()
    }
}

#[cfg(test)]
mod tests {
    use artnet_protocol::{Output, Poll};

    use super::*;
    use crate::colour::colour_order::ColourOrder;
    use crate::device::pixel_device::{ColourModel, DeviceId, PixelDevice};
    use crate::mapping::mapping_engine::MappingEngine;

    fn source() -> SocketAddr {
        "192.168.1.20:6454".parse().unwrap()
    }

    fn mapped_module() -> (ArtNetModule, Arc<FrameStore>, DeviceId) {
        let engine = MappingEngine::new(ColourOrder::new("GRB").unwrap());
        let id = DeviceId([0xd8, 0x80, 0x39, 0, 0, 1]);
        let device = Arc::new(PixelDevice::uniform(id, 1, ColourModel::Rgb, 2, 1, 1));
        engine.generate_mapping(&[device], true);

        let frames = Arc::new(FrameStore::new());
        let module = ArtNetModule::new(
            "127.0.0.1:0".parse().unwrap(),
            engine.lookup(),
            Arc::clone(&frames),
        );
        (module, frames, id)
    }

    #[test]
    fn test_output_packet_updates_frame() {
        let (mut module, frames, id) = mapped_module();

        let packet = ArtCommand::Output(Output {
            port_address: 1.into(),
            data: vec![10, 20, 30, 40, 50, 60].into(),
            ..Output::default()
        })
        .write_to_buffer()
        .unwrap();
        module.handle_datagram(&packet, source());

        let frame = frames.frame(&id).unwrap();
        let first = frame.pixel(0, 0).unwrap();
        // GRB: the first byte of each pixel is green
        assert_eq!((first.red, first.green, first.blue), (20, 10, 30));
        let second = frame.pixel(0, 1).unwrap();
        assert_eq!((second.red, second.green, second.blue), (50, 40, 60));
        assert_eq!(module.packets_received(), 1);
    }

    #[test]
    fn test_unmapped_universe_is_dropped() {
        let (mut module, frames, _) = mapped_module();

        let packet = ArtCommand::Output(Output {
            port_address: 9.into(),
            data: vec![255; 12].into(),
            ..Output::default()
        })
        .write_to_buffer()
        .unwrap();
        module.handle_datagram(&packet, source());

        assert!(frames.take_dirty().is_empty());
        assert_eq!(module.packets_received(), 1);
    }

    #[test]
    fn test_non_dmx_traffic_is_ignored() {
        let (mut module, frames, _) = mapped_module();

        let poll = ArtCommand::Poll(Poll::default()).write_to_buffer().unwrap();
        module.handle_datagram(&poll, source());
        module.handle_datagram(b"not art-net", source());

        assert!(frames.take_dirty().is_empty());
        assert_eq!(module.packets_received(), 0);
    }

    #[tokio::test]
    async fn test_run_requires_initialize() {
        let (mut module, _, _) = mapped_module();
        let (_event_tx, event_rx) = mpsc::channel(1);
        let (message_tx, _message_rx) = mpsc::channel(1);

        assert!(module.run(event_rx, message_tx).await.is_err());
    }
}
