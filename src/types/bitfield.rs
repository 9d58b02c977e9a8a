//! 32-bit flag words and sequence counter arithmetic

use std::fmt;

use serde::{Deserialize, Serialize};

/// A `BitField` member (`typedef UINT32 BitField` in `stdrtdn.h`).
///
/// On the wire it is a plain `uint32`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BitField(pub u32);

impl BitField {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u32 {
        self.0
    }

    /// Bit `bit` (0 = least significant) is set. Out-of-range bits are never set.
    pub fn is_set(self, bit: u32) -> bool {
        bit < u32::BITS && self.0 & (1 << bit) != 0
    }

    /// Any bit of `mask` is set.
    pub fn has_flag(self, mask: u32) -> bool {
        self.0 & mask != 0
    }

    /// Copy with every bit of `mask` set.
    #[must_use]
    pub fn with(self, mask: u32) -> Self {
        Self(self.0 | mask)
    }

    /// Copy with every bit of `mask` cleared.
    #[must_use]
    pub fn without(self, mask: u32) -> Self {
        Self(self.0 & !mask)
    }

    /// Only the bits selected by `mask`.
    pub fn masked(self, mask: u32) -> u32 {
        self.0 & mask
    }

    /// Indices of set bits, lowest first.
    pub fn set_bits(self) -> impl Iterator<Item = u32> {
        (0..u32::BITS).filter(move |&bit| self.is_set(bit))
    }
}

impl From<u32> for BitField {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<BitField> for u32 {
    fn from(bits: BitField) -> Self {
        bits.0
    }
}

impl fmt::Display for BitField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Half-range comparison of wrapping u32 counters: true if `a` is newer than `b`.
pub fn seq_after_u32(a: u32, b: u32) -> bool {
    a != b && a.wrapping_sub(b) < 0x8000_0000
}
