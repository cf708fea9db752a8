use std::collections::{HashMap, HashSet};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;

use async_trait::async_trait;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};

use super::traits::{AsyncModule, ModuleEvent, ModuleId, ModuleMessage};
use crate::device::frame_store::FrameStore;
use crate::mapping::lookup::MappingLookup;

/// "ASC-E1.17\0\0\0"
const ACN_PACKET_IDENTIFIER: [u8; 12] = [
    0x41, 0x53, 0x43, 0x2d, 0x45, 0x31, 0x2e, 0x31, 0x37, 0x00, 0x00, 0x00,
];
const VECTOR_ROOT_E131_DATA: u32 = 0x0000_0004;
const VECTOR_E131_DATA_PACKET: u32 = 0x0000_0002;
const VECTOR_DMP_SET_PROPERTY: u8 = 0x02;
const DMX_START_CODE: u8 = 0x00;
// root, framing and DMP layers up to and including the start code
const DATA_OFFSET: usize = 126;
const RECEIVE_BUFFER_SIZE: usize = 1144;

/// Universe and channel data of an E1.31 data packet
#[derive(Debug, PartialEq, Eq)]
pub struct SacnDmx<'a> {
    pub universe: u16,
    pub sequence: u8,
    pub priority: u8,
    /// Channel data after the start code, `data[0]` is channel 1
    pub data: &'a [u8],
}

/// Parse an E1.31 data packet carrying null start code DMX.
///
/// Returns `None` for anything else: discovery and sync packets, alternate start codes and
/// truncated or foreign datagrams.
pub fn parse_sacn_dmx(packet: &[u8]) -> Option<SacnDmx<'_>> {
    if packet.len() < DATA_OFFSET {
        return None;
    }

    // root layer
    if packet[0..2] != [0x00, 0x10] || packet[2..4] != [0x00, 0x00] {
        return None;
    }
    if packet[4..16] != ACN_PACKET_IDENTIFIER {
        return None;
    }
    let root_vector = u32::from_be_bytes([packet[18], packet[19], packet[20], packet[21]]);
    if root_vector != VECTOR_ROOT_E131_DATA {
        return None;
    }

    // framing layer
    let framing_vector = u32::from_be_bytes([packet[40], packet[41], packet[42], packet[43]]);
    if framing_vector != VECTOR_E131_DATA_PACKET {
        return None;
    }
    let priority = packet[108];
    let sequence = packet[111];
    let universe = u16::from_be_bytes([packet[113], packet[114]]);

    // DMP layer
    if packet[117] != VECTOR_DMP_SET_PROPERTY {
        return None;
    }
    let property_count = u16::from_be_bytes([packet[123], packet[124]]) as usize;
    if property_count == 0 || packet[125] != DMX_START_CODE {
        return None;
    }
    let end = (DATA_OFFSET + property_count - 1).min(packet.len());

    Some(SacnDmx {
        universe,
        sequence,
        priority,
        data: &packet[DATA_OFFSET..end],
    })
}

/// Listens for sACN data and keeps the socket joined to every multicast group the mapping
/// uses
pub struct SacnModule {
    bind_addr: SocketAddr,
    interface: Ipv4Addr,
    lookup: MappingLookup,
    frames: Arc<FrameStore>,
    refresh: Duration,
    socket: Option<UdpSocket>,
    joined: HashSet<Ipv4Addr>,
    packets_received: u64,
    status: HashMap<String, String>,
}

impl SacnModule {
    pub fn new(
        interface: Ipv4Addr,
        port: u16,
        lookup: MappingLookup,
        frames: Arc<FrameStore>,
    ) -> Self {
        Self {
            bind_addr: SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port).into(),
            interface,
            lookup,
            frames,
            refresh: Duration::from_secs(1),
            socket: None,
            joined: HashSet::new(),
            packets_received: 0,
            status: HashMap::new(),
        }
    }

    /// How often the mapping is checked for newly used multicast groups
    pub fn set_refresh_interval(&mut self, refresh: Duration) {
        self.refresh = refresh;
    }

    pub fn packets_received(&self) -> u64 {
        self.packets_received
    }

    /// Route one datagram; returns the number of channels that hit a mapping
    pub fn handle_datagram(&mut self, packet: &[u8]) -> usize {
        let Some(dmx) = parse_sacn_dmx(packet) else {
            log::trace!("Ignoring non-DMX sACN packet ({} bytes)", packet.len());
            return 0;
        };

        self.packets_received += 1;
        self.frames
            .apply_universe(&self.lookup.snapshot(), dmx.universe, dmx.data)
    }

    /// Join groups the mapping lists that the socket is not yet a member of
    fn join_new_groups(&mut self, socket: &UdpSocket) {
        for group in self.lookup.multicast_groups() {
            if self.joined.contains(&group) {
                continue;
            }
            match socket.join_multicast_v4(group, self.interface) {
                Ok(()) => {
                    log::info!("Joined sACN multicast group {}", group);
                    self.joined.insert(group);
                }
                Err(e) => log::error!("Failed to join sACN multicast group {}: {}", group, e),
            }
        }
        self.status
            .insert("joined_groups".to_string(), self.joined.len().to_string());
    }

    fn bind_socket(&self) -> std::io::Result<UdpSocket> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        // other sACN consumers on this host may listen on the same port
        socket.set_reuse_address(true)?;
        socket.set_nonblocking(true)?;
        socket.bind(&self.bind_addr.into())?;
        UdpSocket::from_std(socket.into())
    }
}

#[async_trait]
impl AsyncModule for SacnModule {
    fn id(&self) -> ModuleId {
        ModuleId::Sacn
    }

    async fn initialize(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        log::info!(
            "Initializing sACN listener on {} (interface {})",
            self.bind_addr,
            self.interface
        );

        self.socket = Some(self.bind_socket()?);

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
        let socket = self.socket.take().ok_or("sACN module not initialized")?;
        let mut buffer = vec![0u8; RECEIVE_BUFFER_SIZE];
        let mut refresh = interval(self.refresh);

        log::info!("sACN module started, listening on {}", self.bind_addr);
        let _ = tx
            .send(ModuleMessage::Status(format!(
                "sACN listening on {}",
                self.bind_addr
            )))
            .await;

        loop {
            tokio::select! {
                Some(event) = rx.recv() => {
                    match event {
                        ModuleEvent::Shutdown => {
                            log::info!("sACN module received shutdown signal");
                            break;
                        }
                    }
                }

                _ = refresh.tick() => {
                    self.join_new_groups(&socket);
                }

                received = socket.recv_from(&mut buffer) => {
                    match received {
                        Ok((length, _source)) => {
                            self.handle_datagram(&buffer[..length]);
                        }
                        Err(e) => log::warn!("sACN receive error: {}", e),
                    }
                }
            }
        }

        for group in self.joined.drain() {
            if let Err(e) = socket.leave_multicast_v4(group, self.interface) {
                log::debug!("Failed to leave sACN multicast group {}: {}", group, e);
            }
        }

        log::info!(
            "sACN module shutting down after {} packets",
            self.packets_received
        );
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.status
            .insert("packets".to_string(), self.packets_received.to_string());
        self.status
            .insert("status".to_string(), "shutdown".to_string());
        log::info!("sACN module shutdown complete");
        Ok(())
    }

    fn status(&self) -> HashMap<String, String> {
        self.status.clone()
    }
}
