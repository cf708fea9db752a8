use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MappingError;

/// The three primaries a colour order can permute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimaryColour {
    Red,
    Green,
    Blue,
}

impl PrimaryColour {
    pub const ALL: [PrimaryColour; 3] = [PrimaryColour::Red, PrimaryColour::Green, PrimaryColour::Blue];

    fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'R' => Some(PrimaryColour::Red),
            'G' => Some(PrimaryColour::Green),
            'B' => Some(PrimaryColour::Blue),
            _ => None,
        }
    }

    fn letter(self) -> char {
        match self {
            PrimaryColour::Red => 'R',
            PrimaryColour::Green => 'G',
            PrimaryColour::Blue => 'B',
        }
    }
}

/// Extra emitters on RGBOW strips. These sit at fixed offsets after the primaries and are
/// never reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtraColour {
    Orange,
    White,
}

impl ExtraColour {
    pub const ALL: [ExtraColour; 2] = [ExtraColour::Orange, ExtraColour::White];

    /// Offset from the pixel's first channel
    pub fn offset(self) -> u16 {
        match self {
            ExtraColour::Orange => 3,
            ExtraColour::White => 4,
        }
    }
}

/// A single colour byte of a pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColourChannel {
    Primary(PrimaryColour),
    Extra(ExtraColour),
}

impl ColourChannel {
    pub const RED: ColourChannel = ColourChannel::Primary(PrimaryColour::Red);
    pub const GREEN: ColourChannel = ColourChannel::Primary(PrimaryColour::Green);
    pub const BLUE: ColourChannel = ColourChannel::Primary(PrimaryColour::Blue);
    pub const ORANGE: ColourChannel = ColourChannel::Extra(ExtraColour::Orange);
    pub const WHITE: ColourChannel = ColourChannel::Extra(ExtraColour::White);
}

impl fmt::Display for ColourChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColourChannel::Primary(PrimaryColour::Red) => "red",
            ColourChannel::Primary(PrimaryColour::Green) => "green",
            ColourChannel::Primary(PrimaryColour::Blue) => "blue",
            ColourChannel::Extra(ExtraColour::Orange) => "orange",
            ColourChannel::Extra(ExtraColour::White) => "white",
        };
        f.write_str(name)
    }
}

/// Byte order of the primaries inside an incoming 3-byte pixel.
///
/// Built once from a string such as `"RGB"` or `"grb"`. The position of each letter is the
/// offset of that primary from the pixel's first channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColourOrder {
    // indexed by PrimaryColour as usize
    offsets: [u8; 3],
}

impl ColourOrder {
    pub const RGB: ColourOrder = ColourOrder { offsets: [0, 1, 2] };

    pub fn new(order: &str) -> Result<Self, MappingError> {
        let invalid = || MappingError::InvalidColourOrder(order.to_string());

        let letters: Vec<char> = order.trim().chars().collect();
        if letters.len() != 3 {
            return Err(invalid());
        }

        let mut offsets = [None; 3];
        for (position, letter) in letters.into_iter().enumerate() {
            let primary = PrimaryColour::from_letter(letter).ok_or_else(invalid)?;
            let slot = &mut offsets[primary as usize];
            if slot.is_some() {
                return Err(invalid());
            }
            *slot = Some(position as u8);
        }

        match offsets {
            [Some(r), Some(g), Some(b)] => Ok(Self { offsets: [r, g, b] }),
            _ => Err(invalid()),
        }
    }

    /// Offset of the primary from the pixel's first channel, always 0, 1 or 2
    pub fn offset(&self, colour: PrimaryColour) -> u16 {
        self.offsets[colour as usize] as u16
    }
}

impl Default for ColourOrder {
    fn default() -> Self {
        Self::RGB
    }
}

impl FromStr for ColourOrder {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for ColourOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut letters = ['R'; 3];
        for primary in PrimaryColour::ALL {
            letters[self.offset(primary) as usize] = primary.letter();
        }
        letters.iter().try_for_each(|letter| write!(f, "{}", letter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_offsets() {
        let order = ColourOrder::new("RGB").unwrap();
        assert_eq!(order.offset(PrimaryColour::Red), 0);
        assert_eq!(order.offset(PrimaryColour::Green), 1);
        assert_eq!(order.offset(PrimaryColour::Blue), 2);
    }

    #[test]
    fn test_grb_swaps_red_and_green() {
        let order = ColourOrder::new("GRB").unwrap();
        assert_eq!(order.offset(PrimaryColour::Red), 1);
        assert_eq!(order.offset(PrimaryColour::Green), 0);
        assert_eq!(order.offset(PrimaryColour::Blue), 2);
    }

    #[test]
    fn test_case_insensitive() {
        let order: ColourOrder = "brg".parse().unwrap();
        assert_eq!(order.offset(PrimaryColour::Blue), 0);
        assert_eq!(order.offset(PrimaryColour::Red), 1);
        assert_eq!(order.offset(PrimaryColour::Green), 2);
        assert_eq!(order.to_string(), "BRG");
    }

    #[test]
    fn test_rejects_invalid_orders() {
        for bad in ["", "RG", "RGBW", "RRB", "RGX", "R G"] {
            assert_eq!(
                ColourOrder::new(bad),
                Err(MappingError::InvalidColourOrder(bad.to_string())),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_extra_offsets_are_fixed() {
        assert_eq!(ExtraColour::Orange.offset(), 3);
        assert_eq!(ExtraColour::White.offset(), 4);
    }

    #[test]
    fn test_default_is_rgb() {
        assert_eq!(ColourOrder::default(), ColourOrder::RGB);
        assert_eq!(ColourOrder::default().to_string(), "RGB");
    }
}
