use thiserror::Error;

/// Errors raised while configuring or computing the DMX to pixel mapping
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// The colour order string is not a permutation of R, G and B
    #[error("Invalid colour order '{0}': expected a permutation of R, G and B")]
    InvalidColourOrder(String),

    /// No sACN multicast group exists for the universe
    #[error("Cannot resolve sACN multicast group for universe {0}")]
    AddressResolution(u32),

    /// DMX channels run from 1 to 512
    #[error("Channel {0} is outside 1-512")]
    InvalidChannel(u16),
}
