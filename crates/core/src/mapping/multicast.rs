use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use crate::error::MappingError;

/// UDP port sACN data is sent to
pub const SACN_PORT: u16 = 5568;

/// Derive the sACN multicast group for a universe: `239.255.<high byte>.<low byte>`.
///
/// Universes are carried as `u32` so a mapping cursor that ran past the 16-bit universe space
/// reports an error instead of wrapping.
pub fn sacn_multicast_group(universe: u32) -> Result<Ipv4Addr, MappingError> {
    let universe = u16::try_from(universe).map_err(|_| MappingError::AddressResolution(universe))?;
    let [high, low] = universe.to_be_bytes();
    Ok(Ipv4Addr::new(239, 255, high, low))
}

/// Multicast group plus the sACN port, as used when joining or sending
pub fn sacn_multicast_addr(universe: u32) -> Result<SocketAddr, MappingError> {
    sacn_multicast_group(universe).map(|group| SocketAddrV4::new(group, SACN_PORT).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_universe() {
        assert_eq!(sacn_multicast_group(1).unwrap(), Ipv4Addr::new(239, 255, 0, 1));
    }

    #[test]
    fn test_high_byte_universe() {
        assert_eq!(sacn_multicast_group(256).unwrap(), Ipv4Addr::new(239, 255, 1, 0));
        assert_eq!(
            sacn_multicast_group(63999).unwrap(),
            Ipv4Addr::new(239, 255, 249, 255)
        );
    }

    #[test]
    fn test_universe_zero_and_max() {
        assert_eq!(sacn_multicast_group(0).unwrap(), Ipv4Addr::new(239, 255, 0, 0));
        assert_eq!(
            sacn_multicast_group(65535).unwrap(),
            Ipv4Addr::new(239, 255, 255, 255)
        );
    }

    #[test]
    fn test_out_of_range_universe() {
        assert_eq!(
            sacn_multicast_group(65536),
            Err(MappingError::AddressResolution(65536))
        );
    }

    #[test]
    fn test_socket_addr_uses_sacn_port() {
        let addr = sacn_multicast_addr(2).unwrap();
        assert_eq!(addr.port(), SACN_PORT);
        assert_eq!(addr.ip().to_string(), "239.255.0.2");
    }
}
