//! Common RTPS status flags shared by generated packet definitions
//!
//! These occupy the first 16 bits of an `rtpsStatus` BitField (see `stdrtdn.h`).
//! The upper 16 bits are system specific.

use serde::{Deserialize, Serialize};

use super::BitField;

/// Raw flag constants from `stdrtdn.h`.
pub mod flags {
    pub const UNDEFINED: u32 = 0x00; // System considered to be not operational
    pub const NORMAL: u32 = 0x01; // System is in normal running mode
    pub const CONTROLLED: u32 = 0x02; // System running RTPS requested command
    pub const UNABLE: u32 = 0x04; // System is unable to run RTPS command
    pub const BLIND: u32 = 0x08; // System is not receiving RTPS messages
    pub const BAD: u32 = 0x10; // System is not operational

    pub const COMMON_MASK: u32 = 0x0000_FFFF;
    pub const SYSTEM_MASK: u32 = 0xFFFF_0000;
}

/// One of the common RTPS status flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RtpsFlag {
    Normal,
    Controlled,
    Unable,
    Blind,
    Bad,
}

impl RtpsFlag {
    pub const ALL: [RtpsFlag; 5] =
        [RtpsFlag::Normal, RtpsFlag::Controlled, RtpsFlag::Unable, RtpsFlag::Blind, RtpsFlag::Bad];

    /// Bit mask of this flag.
    pub const fn mask(self) -> u32 {
        match self {
            RtpsFlag::Normal => flags::NORMAL,
            RtpsFlag::Controlled => flags::CONTROLLED,
            RtpsFlag::Unable => flags::UNABLE,
            RtpsFlag::Blind => flags::BLIND,
            RtpsFlag::Bad => flags::BAD,
        }
    }
}

/// Decoded `rtpsStatus` word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtpsStatus {
    /// Common flags that are set, in bit order
    pub flags: Vec<RtpsFlag>,
    /// System-specific upper 16 bits
    pub system_bits: u16,
}

impl RtpsStatus {
    /// True when no common flag is set (`RTPS_STAT_UNDEFINED`).
    pub fn is_undefined(&self) -> bool {
        self.flags.is_empty()
    }

    /// True when the system reports normal or controlled running and is not flagged bad.
    pub fn is_operational(&self) -> bool {
        let running = self.has(RtpsFlag::Normal) || self.has(RtpsFlag::Controlled);
        running && !self.has(RtpsFlag::Bad)
    }

    pub fn has(&self, flag: RtpsFlag) -> bool {
        self.flags.contains(&flag)
    }
}

/// Decode a BitField carrying an `rtpsStatus` word.
pub fn decode_rtps_status(bits: BitField) -> RtpsStatus {
    let flags = RtpsFlag::ALL.into_iter().filter(|flag| bits.has_flag(flag.mask())).collect();
    let system_bits = (bits.masked(flags::SYSTEM_MASK) >> 16) as u16;

    RtpsStatus { flags, system_bits }
}
