//! Generic encode/decode capability for fixed-layout packets.
//!
//! Each typed record implements [`RtdnPacket`], which only describes its fields
//! and how to read/write them in declaration order. The identity tag handling
//! (writing the ID as the last act of encoding, rejecting wrong-sized buffers,
//! validating the tag after decode) lives once in the blanket [`PacketCodec`]
//! implementation.

use std::fmt;

use tracing::trace;

use crate::types::{FieldData, FieldSpec, PacketIdentity, PacketLayout, TAG_SIZE, encoded_size};
use crate::{Result, RtdnError};

pub use crate::types::ByteOrder;

/// Field-level description of a typed packet record.
///
/// Implementors list their data fields in wire order. The trailing identity tag
/// is never part of the record; it is implied by the type.
pub trait RtdnPacket: Sized + Clone + PartialEq + fmt::Debug {
    /// Packet type name as declared in the generated header (e.g. `test1`).
    const NAME: &'static str;

    /// PVC, ID, VERSION and METADATA constants.
    const IDENTITY: PacketIdentity;

    /// Data fields in declaration order, identity tag excluded.
    const FIELDS: &'static [FieldSpec];

    /// Number of data fields.
    const FIELD_COUNT: usize = Self::FIELDS.len();

    /// Write every data field in declaration order.
    fn write_fields(&self, writer: &mut FieldWriter<'_>);

    /// Read every data field in declaration order.
    fn read_fields(reader: &mut FieldReader<'_>) -> Result<Self>;
}

/// Sequential writer appending fields to an output buffer.
#[derive(Debug)]
pub struct FieldWriter<'a> {
    out: &'a mut Vec<u8>,
    order: ByteOrder,
}

impl<'a> FieldWriter<'a> {
    pub fn new(out: &'a mut Vec<u8>, order: ByteOrder) -> Self {
        Self { out, order }
    }

    /// Append one value.
    pub fn put<T: FieldData>(&mut self, value: T) {
        value.write(self.out, self.order);
    }

    /// Append every element of an array field.
    pub fn put_array<T: FieldData>(&mut self, values: &[T]) {
        values.iter().for_each(|value| self.put(*value));
    }
}

/// Sequential reader over the data portion of a packet.
#[derive(Debug)]
pub struct FieldReader<'a> {
    data: &'a [u8],
    position: usize,
    order: ByteOrder,
    packet: &'static str,
}

impl<'a> FieldReader<'a> {
    pub fn new(data: &'a [u8], order: ByteOrder, packet: &'static str) -> Self {
        Self { data, position: 0, order, packet }
    }

    /// Read the next value and advance.
    pub fn get<T: FieldData>(&mut self) -> Result<T> {
        let width = T::FIELD_TYPE.size();
        let value = self
            .data
            .get(self.position..)
            .and_then(|bytes| T::read(bytes, self.order))
            .ok_or_else(|| {
                RtdnError::size_mismatch(self.packet, self.position + width, self.data.len())
            })?;
        self.position += width;
        Ok(value)
    }

    /// Read `N` consecutive values.
    pub fn get_array<T: FieldData + Default, const N: usize>(&mut self) -> Result<[T; N]> {
        let mut values = [T::default(); N];
        for value in values.iter_mut() {
            *value = self.get()?;
        }
        Ok(values)
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.position
    }
}

/// Encode/decode capability shared by every [`RtdnPacket`].
///
/// # Examples
///
/// ```rust
/// use rtdn::{PacketCodec, RtdnError, Test2};
///
/// let record = Test2 { sequence_no: 1, sample_time: 1000 };
/// let bytes = record.encode();
/// assert_eq!(bytes.len(), Test2::SIZE);
/// assert_eq!(Test2::tag_of(&bytes), Some(488000002));
/// assert_eq!(Test2::decode(&bytes).unwrap(), record);
///
/// let err = Test2::decode(&bytes[..11]).unwrap_err();
/// assert!(matches!(err, RtdnError::PacketSizeMismatch { expected: 12, actual: 11, .. }));
/// ```
pub trait PacketCodec: RtdnPacket {
    /// Fixed encoded size in bytes, identity tag included.
    const SIZE: usize = encoded_size(Self::FIELDS);

    /// Byte offset of the identity tag.
    const TAG_OFFSET: usize = Self::SIZE - TAG_SIZE;

    /// Encode in host-native byte order.
    fn encode(&self) -> Vec<u8> {
        self.encode_with(ByteOrder::Native)
    }

    /// Encode in the given byte order.
    fn encode_with(&self, order: ByteOrder) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        self.encode_into(&mut out, order);
        out
    }

    /// Append the encoded record to `out`. The identity tag is written last.
    fn encode_into(&self, out: &mut Vec<u8>, order: ByteOrder) {
        let start = out.len();
        self.write_fields(&mut FieldWriter::new(out, order));
        debug_assert_eq!(out.len() - start, Self::TAG_OFFSET, "{} wrote wrong field width", Self::NAME);
        out.extend_from_slice(&order.u32_bytes(Self::IDENTITY.id));
    }

    /// Decode a host-native buffer.
    fn decode(bytes: &[u8]) -> Result<Self> {
        Self::decode_with(bytes, ByteOrder::Native)
    }

    /// Decode a buffer of exactly [`Self::SIZE`] bytes and validate its tag.
    fn decode_with(bytes: &[u8], order: ByteOrder) -> Result<Self> {
        if bytes.len() != Self::SIZE {
            return Err(RtdnError::size_mismatch(Self::NAME, Self::SIZE, bytes.len()));
        }

        let (body, tag) = bytes.split_at(Self::TAG_OFFSET);
        let mut reader = FieldReader::new(body, order, Self::NAME);
        let record = Self::read_fields(&mut reader)?;
        if reader.position() != body.len() {
            return Err(RtdnError::layout_error(
                Self::NAME,
                format!("fields cover {} bytes, expected {}", reader.position(), body.len()),
            ));
        }

        let found = order
            .read_u32(tag)
            .ok_or_else(|| RtdnError::size_mismatch(Self::NAME, Self::SIZE, bytes.len()))?;
        if found != Self::IDENTITY.id {
            trace!(packet = Self::NAME, expected = Self::IDENTITY.id, found, "Identity tag mismatch");
            return Err(RtdnError::identity_mismatch(Self::NAME, Self::IDENTITY.id, found));
        }

        trace!(packet = Self::NAME, size = Self::SIZE, "Decoded packet");
        Ok(record)
    }

    /// True if `bytes` has this type's size and carries its identity tag
    /// in host-native order.
    fn is_packet(bytes: &[u8]) -> bool {
        bytes.len() == Self::SIZE && Self::tag_of(bytes) == Some(Self::IDENTITY.id)
    }

    /// Read the identity tag at this type's tag offset, host-native order.
    fn tag_of(bytes: &[u8]) -> Option<u32> {
        Self::tag_of_with(bytes, ByteOrder::Native)
    }

    fn tag_of_with(bytes: &[u8], order: ByteOrder) -> Option<u32> {
        order.read_u32(bytes.get(Self::TAG_OFFSET..Self::SIZE)?)
    }

    /// Runtime layout equivalent of this type.
    fn layout() -> Result<PacketLayout> {
        PacketLayout::from_specs(Self::NAME, Self::IDENTITY, Self::FIELDS)
    }
}

impl<T: RtdnPacket> PacketCodec for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldType;

    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Sensor {
        counter: u32,
        gains: [f32; 3],
        flags: u16,
    }

    impl RtdnPacket for Sensor {
        const NAME: &'static str = "sensor";
        const IDENTITY: PacketIdentity = PacketIdentity::new(7, 7000001, 1, 3);
        const FIELDS: &'static [FieldSpec] = &[
            FieldSpec::scalar("counter", FieldType::UInt32),
            FieldSpec { name: "gains", field_type: FieldType::Float32, count: 3 },
            FieldSpec::scalar("flags", FieldType::UInt16),
        ];

        fn write_fields(&self, writer: &mut FieldWriter<'_>) {
            writer.put(self.counter);
            writer.put_array(&self.gains);
            writer.put(self.flags);
        }

        fn read_fields(reader: &mut FieldReader<'_>) -> Result<Self> {
            Ok(Self { counter: reader.get()?, gains: reader.get_array()?, flags: reader.get()? })
        }
    }

    // Declares a field it never writes
    #[derive(Debug, Clone, PartialEq)]
    struct Short {
        a: u32,
    }

    impl RtdnPacket for Short {
        const NAME: &'static str = "short";
        const IDENTITY: PacketIdentity = PacketIdentity::new(1, 11, 1, 1);
        const FIELDS: &'static [FieldSpec] = &[
            FieldSpec::scalar("a", FieldType::UInt32),
            FieldSpec::scalar("b", FieldType::UInt32),
        ];

        fn write_fields(&self, writer: &mut FieldWriter<'_>) {
            writer.put(self.a);
            writer.put(0u32);
        }

        fn read_fields(reader: &mut FieldReader<'_>) -> Result<Self> {
            Ok(Self { a: reader.get()? })
        }
    }

    fn sensor() -> Sensor {
        Sensor { counter: 42, gains: [0.5, -1.25, 3.0], flags: 0x0102 }
    }

    #[test]
    fn sizes_include_the_tag() {
        assert_eq!(Sensor::FIELD_COUNT, 3);
        assert_eq!(Sensor::SIZE, 4 + 12 + 2 + TAG_SIZE);
        assert_eq!(Sensor::TAG_OFFSET, 18);
    }

    #[test]
    fn encode_writes_tag_last() {
        let bytes = sensor().encode_with(ByteOrder::Big);
        assert_eq!(bytes.len(), Sensor::SIZE);
        assert_eq!(&bytes[18..], &7000001u32.to_be_bytes());
        assert_eq!(&bytes[16..18], &[0x01, 0x02]);
        assert_eq!(Sensor::tag_of_with(&bytes, ByteOrder::Big), Some(7000001));
    }

    #[test]
    fn encode_into_appends() {
        let mut out = vec![0xAA];
        sensor().encode_into(&mut out, ByteOrder::Native);
        assert_eq!(out.len(), 1 + Sensor::SIZE);
        assert_eq!(out[0], 0xAA);
        assert_eq!(Sensor::decode(&out[1..]).unwrap(), sensor());
    }

    #[test]
    fn decode_rejects_wrong_tag() {
        let mut bytes = sensor().encode_with(ByteOrder::Little);
        bytes[Sensor::TAG_OFFSET..].copy_from_slice(&5u32.to_le_bytes());

        let err = Sensor::decode_with(&bytes, ByteOrder::Little).unwrap_err();
        assert!(matches!(
            err,
            RtdnError::PacketIdentityMismatch { expected: 7000001, found: 5, .. }
        ));
    }

    #[test]
    fn decode_detects_field_width_drift() {
        let bytes = Short { a: 9 }.encode();
        let err = Short::decode(&bytes).unwrap_err();
        assert!(matches!(err, RtdnError::Layout { .. }));
    }

    #[test]
    fn layout_matches_static_description() {
        let layout = Sensor::layout().unwrap();
        assert_eq!(layout.size, Sensor::SIZE);
        assert_eq!(layout.tag_offset(), Sensor::TAG_OFFSET);
        assert_eq!(layout.field("gains").unwrap().count, 3);
        assert_eq!(layout.tag_field().unwrap().name, "sensor_7000001");
    }

    #[test]
    fn tag_of_short_buffer_is_none() {
        assert_eq!(Sensor::tag_of(&[0u8; 10]), None);
        assert!(!Sensor::is_packet(&[0u8; 10]));
    }

    proptest! {
        #[test]
        fn prop_roundtrip_any_order(
            counter in any::<u32>(),
            gains in prop::array::uniform3(-1.0e6f32..1.0e6),
            flags in any::<u16>(),
            order in prop::sample::select(vec![ByteOrder::Native, ByteOrder::Little, ByteOrder::Big]),
        ) {
            let record = Sensor { counter, gains, flags };
            let bytes = record.encode_with(order);
            prop_assert_eq!(Sensor::decode_with(&bytes, order).unwrap(), record);
        }

        #[test]
        fn prop_size_rejection(len in 0usize..64) {
            prop_assume!(len != Sensor::SIZE);
            let err = Sensor::decode(&vec![0u8; len]).unwrap_err();
            prop_assert_eq!(err.kind(), crate::ErrorKind::PacketSizeMismatch);
        }
    }
}
