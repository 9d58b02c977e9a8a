//! Type-safe codec and identity registry for RTDN telemetry packets.
//!
//! RTDN packets are fixed-layout records generated as C structures. Every
//! record ends with a `uint32` identity tag equal to its type's `RT_<name>_ID`
//! constant, which lets a consumer check, or discover, what a buffer holds.
//!
//! # Features
//!
//! - **Typed records**: [`Test1`], [`Test2`] and [`Test3`] with exact wire layouts
//! - **Identity checks**: size and tag are validated on every decode
//! - **Registry**: identify and decode buffers of unknown type
//! - **Runtime layouts**: load generated headers and decode them as [`DynamicPacket`]s
//! - **Streams**: framing codec and stream adapters for async consumers
//!
//! # Quick Start
//!
//! ```rust
//! use rtdn::{Packet, PacketCodec, PacketRegistry, Test3};
//!
//! let record = Test3 { sequence_no: 7, sample_time: 700, c2e_upze1: 0.5, ..Default::default() };
//! let bytes = record.encode();
//! assert_eq!(bytes.len(), 32);
//!
//! // Decoding as the known type checks size and tag
//! assert_eq!(Test3::decode(&bytes).unwrap(), record);
//!
//! // Decoding an unknown buffer goes through the registry
//! match PacketRegistry::builtin().decode(&bytes).unwrap() {
//!     Packet::Test3(decoded) => assert_eq!(decoded.sequence_no, 7),
//!     other => panic!("unexpected packet {other:?}"),
//! }
//! ```
//!
//! ## Example (runtime layouts)
//!
//! ```rust,no_run
//! use rtdn::{RtdnConfig, TypeDb};
//!
//! fn main() -> rtdn::Result<()> {
//!     let mut db = TypeDb::new()?;
//!     db.load_dir("/opt/rtdn/types")?;
//!     let registry = db.register_into(rtdn::PacketRegistry::builder().with_builtin()?)?.build();
//!
//!     // Or describe the same thing in YAML
//!     let registry_from_config = RtdnConfig::load("rtdn.yaml")?.build_registry()?;
//!     assert_eq!(registry.len(), registry_from_config.len());
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod codec;
pub mod dynamic_packet;
mod error;
pub mod packets;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Registry and type loading
pub mod config;
pub mod header;
pub mod registry;

// Stream consumers
pub mod framed;
pub mod sequence;
pub mod stream;

// Core exports
pub use codec::{FieldReader, FieldWriter, PacketCodec, RtdnPacket};
pub use dynamic_packet::{DynamicPacket, DynamicPacketBuilder};
pub use error::*;
pub use packets::{IntoPacket, Packet, PacketKind, Test1, Test2, Test3};
pub use types::*;

// Registry exports
pub use config::RtdnConfig;
pub use header::TypeDb;
pub use registry::{PacketRegistry, RegistryBuilder, TypeTag};

// Stream exports
pub use framed::RecordCodec;
pub use sequence::{SequenceEvent, SequenceMonitor, SequenceStats, SequenceTracker};
pub use stream::{Decode, DecodeExt};
