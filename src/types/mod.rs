//! Core types for RTDN packet representation.
//!
//! This module provides the foundational data structures for describing and
//! reading fixed-layout telemetry packets.
//!
//! ## Architecture
//!
//! The type system maps directly to the generated C structures:
//! - [`PacketLayout`] describes one packet type: ordered fields, packed offsets,
//!   total size and the trailing identity tag
//! - [`PacketIdentity`] carries the four constants (PVC, ID, VERSION, METADATA)
//! - [`FieldType`] maps to the fundamental C types with size information
//! - [`FieldData`] provides type-safe reads and writes of scalar fields
//! - [`BitField`] handles 32-bit flag words such as `rtpsStatus`
//!
//! ## Usage Example
//!
//! ```rust
//! use rtdn::types::{ByteOrder, FieldData, FieldType, PacketIdentity, PacketLayout};
//!
//! let identity = PacketIdentity::new(488, 488000002, 2, 2);
//! let layout = PacketLayout::builder("test2", identity)
//!     .field("sequenceNo", FieldType::UInt32)
//!     .field("sampleTime", FieldType::UInt32)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(layout.size, 12);
//! assert_eq!(layout.tag_offset(), 8);
//!
//! let mut data = Vec::new();
//! 7u32.write(&mut data, ByteOrder::Native);
//! 1000u32.write(&mut data, ByteOrder::Native);
//! 488000002u32.write(&mut data, ByteOrder::Native);
//!
//! let info = layout.field("sampleTime").unwrap();
//! assert_eq!(u32::from_bytes(&data, info, ByteOrder::Native).unwrap(), 1000);
//! ```

mod bitfield;
mod byte_order;
mod field_data;
mod field_type;
mod layout;
pub mod rtps_status;

// Re-export all public types
pub use bitfield::{BitField, seq_after_u32};
pub use byte_order::ByteOrder;
pub use field_data::{FieldData, read_array};
pub use field_type::{FieldType, Value};
pub use layout::{
    FieldInfo, FieldSpec, LayoutBuilder, PacketIdentity, PacketLayout, TAG_SIZE, encoded_size,
};
pub use rtps_status::{RtpsFlag, RtpsStatus, decode_rtps_status};
