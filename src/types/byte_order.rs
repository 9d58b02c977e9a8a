//! Byte order selection for packet fields

use serde::{Deserialize, Serialize};

/// Byte order used to lay out multi-byte fields on the wire.
///
/// Generated RTDN structures are copied as raw host memory, so the default is
/// the host's native order. `Little` and `Big` exist for reading captures taken
/// on a host with a different endianness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    /// Host-native byte order
    #[default]
    Native,
    /// Little-endian regardless of host
    Little,
    /// Big-endian regardless of host
    Big,
}

impl ByteOrder {
    /// Resolve `Native` to the concrete order of this host.
    pub const fn resolved(self) -> Self {
        match self {
            ByteOrder::Native => {
                if cfg!(target_endian = "little") {
                    ByteOrder::Little
                } else {
                    ByteOrder::Big
                }
            }
            other => other,
        }
    }

    /// Returns true if this order matches the host's native order.
    pub const fn is_native(self) -> bool {
        matches!(
            (self.resolved(), ByteOrder::Native.resolved()),
            (ByteOrder::Little, ByteOrder::Little) | (ByteOrder::Big, ByteOrder::Big)
        )
    }

    /// Read a `u32` from the first four bytes of `bytes`.
    pub fn read_u32(self, bytes: &[u8]) -> Option<u32> {
        let raw: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
        Some(match self {
            ByteOrder::Native => u32::from_ne_bytes(raw),
            ByteOrder::Little => u32::from_le_bytes(raw),
            ByteOrder::Big => u32::from_be_bytes(raw),
        })
    }

    /// Encode a `u32` in this byte order.
    pub fn u32_bytes(self, value: u32) -> [u8; 4] {
        match self {
            ByteOrder::Native => value.to_ne_bytes(),
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        }
    }
}
