//! Typed packet records and the [`Packet`] sum type.
//!
//! Each record mirrors one generated C structure field-for-field, minus the
//! trailing identity tag, which the codec writes and checks on its own.

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::codec::{ByteOrder, PacketCodec, RtdnPacket};
use crate::dynamic_packet::DynamicPacket;
use crate::types::PacketIdentity;

/// Declares a typed record together with its [`RtdnPacket`] implementation.
///
/// Field order in the invocation is wire order. Every field type must
/// implement [`FieldData`](crate::types::FieldData).
#[macro_export]
macro_rules! rtdn_packet {
    (
        $(#[$meta:meta])*
        pub struct $name:ident as $wire:literal {
            identity: $identity:expr,
            $(
                $(#[$field_meta:meta])*
                $field:ident : $ty:ty => $wire_field:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
        pub struct $name {
            $(
                $(#[$field_meta])*
                #[serde(rename = $wire_field)]
                pub $field: $ty,
            )*
        }

        impl $crate::codec::RtdnPacket for $name {
            const NAME: &'static str = $wire;
            const IDENTITY: $crate::types::PacketIdentity = $identity;
            const FIELDS: &'static [$crate::types::FieldSpec] = &[
                $(
                    $crate::types::FieldSpec::scalar(
                        $wire_field,
                        <$ty as $crate::types::FieldData>::FIELD_TYPE,
                    ),
                )*
            ];

            fn write_fields(&self, writer: &mut $crate::codec::FieldWriter<'_>) {
                $( writer.put(self.$field); )*
            }

            fn read_fields(reader: &mut $crate::codec::FieldReader<'_>) -> $crate::Result<Self> {
                Ok(Self { $( $field: reader.get()?, )* })
            }
        }
    };
}

rtdn_packet! {
    /// Frequency/damping measurement packet (`test1`, 60 bytes).
    pub struct Test1 as "test1" {
        identity: PacketIdentity::new(488, 488000002, 2, 2),
        sequence_no: u32 => "sequenceNo",
        sample_time: u32 => "sampleTime",
        available: u32 => "available",
        saturated: u32 => "saturated",
        dev_hz: f32 => "devHz",
        freq: f32 => "freq",
        damping_raw: f32 => "DampingRaw",
        damping_norm: f32 => "DampingNorm",
        time_damping: f32 => "TimeDamping",
        /// Status code for `dev_hz`
        dev_hz_sta: u32 => "devHz_sta",
        freq_sta: u32 => "freq_sta",
        damping_raw_sta: u32 => "DampingRaw_sta",
        damping_norm_sta: u32 => "DampingNorm_sta",
        time_damping_sta: u32 => "TimeDamping_sta",
    }
}

rtdn_packet! {
    /// Minimal sequence/time packet (`test2`, 12 bytes). Shares its ID with `test1`.
    pub struct Test2 as "test2" {
        identity: PacketIdentity::new(488, 488000002, 2, 2),
        sequence_no: u32 => "sequenceNo",
        sample_time: u32 => "sampleTime",
    }
}

rtdn_packet! {
    /// Zero-error measurement packet (`test3`, 32 bytes).
    pub struct Test3 as "test3" {
        identity: PacketIdentity::new(416, 416000005, 5, 7),
        sequence_no: u32 => "sequenceNo",
        sample_time: u32 => "sampleTime",
        c2e_upze1: f32 => "C2E_UPZE1",
        c2e_unze1: f32 => "C2E_UNZE1",
        c2e_upze2: f32 => "C2E_UPZE2",
        c2e_unze2: f32 => "C2E_UNZE2",
        c2e_upze3: f32 => "C2E_UPZE3",
    }
}

/// Discriminant of a [`Packet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketKind {
    Test1,
    Test2,
    Test3,
    /// A layout known only at runtime (parsed from a header)
    Dynamic,
}

/// Any decoded packet.
///
/// The identity tag is checked while decoding into this type, so a `Packet`
/// can never carry a tag that disagrees with its variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Test1(Test1),
    Test2(Test2),
    Test3(Test3),
    Dynamic(DynamicPacket),
}

impl Packet {
    pub fn kind(&self) -> PacketKind {
        match self {
            Packet::Test1(_) => PacketKind::Test1,
            Packet::Test2(_) => PacketKind::Test2,
            Packet::Test3(_) => PacketKind::Test3,
            Packet::Dynamic(_) => PacketKind::Dynamic,
        }
    }

    /// Packet type name (`test1`, ...).
    pub fn name(&self) -> &str {
        match self {
            Packet::Test1(_) => Test1::NAME,
            Packet::Test2(_) => Test2::NAME,
            Packet::Test3(_) => Test3::NAME,
            Packet::Dynamic(packet) => &packet.layout().name,
        }
    }

    pub fn identity(&self) -> PacketIdentity {
        match self {
            Packet::Test1(_) => Test1::IDENTITY,
            Packet::Test2(_) => Test2::IDENTITY,
            Packet::Test3(_) => Test3::IDENTITY,
            Packet::Dynamic(packet) => packet.layout().identity,
        }
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> usize {
        match self {
            Packet::Test1(_) => Test1::SIZE,
            Packet::Test2(_) => Test2::SIZE,
            Packet::Test3(_) => Test3::SIZE,
            Packet::Dynamic(packet) => packet.layout().size,
        }
    }

    /// Encode in host-native byte order.
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.encode_with(ByteOrder::Native)
    }

    /// Encode in the given byte order.
    ///
    /// A dynamic packet keeps the bytes it was decoded from; they are
    /// re-encoded only when `order` differs from the order they were read in.
    pub fn encode_with(&self, order: ByteOrder) -> Result<Vec<u8>> {
        match self {
            Packet::Test1(packet) => Ok(packet.encode_with(order)),
            Packet::Test2(packet) => Ok(packet.encode_with(order)),
            Packet::Test3(packet) => Ok(packet.encode_with(order)),
            Packet::Dynamic(packet) => packet.encode_with(order),
        }
    }

    pub fn sequence_no(&self) -> Option<u32> {
        match self {
            Packet::Test1(packet) => Some(packet.sequence_no),
            Packet::Test2(packet) => Some(packet.sequence_no),
            Packet::Test3(packet) => Some(packet.sequence_no),
            Packet::Dynamic(packet) => packet.sequence_no(),
        }
    }

    pub fn sample_time(&self) -> Option<u32> {
        match self {
            Packet::Test1(packet) => Some(packet.sample_time),
            Packet::Test2(packet) => Some(packet.sample_time),
            Packet::Test3(packet) => Some(packet.sample_time),
            Packet::Dynamic(packet) => packet.sample_time(),
        }
    }
}

impl From<Test1> for Packet {
    fn from(packet: Test1) -> Self {
        Packet::Test1(packet)
    }
}

impl From<Test2> for Packet {
    fn from(packet: Test2) -> Self {
        Packet::Test2(packet)
    }
}

impl From<Test3> for Packet {
    fn from(packet: Test3) -> Self {
        Packet::Test3(packet)
    }
}

impl From<DynamicPacket> for Packet {
    fn from(packet: DynamicPacket) -> Self {
        Packet::Dynamic(packet)
    }
}

/// Typed records that can be wrapped into a [`Packet`].
pub trait IntoPacket: PacketCodec + Into<Packet> {
    const KIND: PacketKind;

    /// Decode straight into the sum type.
    fn decode_packet(bytes: &[u8], order: ByteOrder) -> Result<Packet> {
        Self::decode_with(bytes, order).map(Into::into)
    }
}

impl IntoPacket for Test1 {
    const KIND: PacketKind = PacketKind::Test1;
}

impl IntoPacket for Test2 {
    const KIND: PacketKind = PacketKind::Test2;
}

impl IntoPacket for Test3 {
    const KIND: PacketKind = PacketKind::Test3;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, RtdnError};

    use proptest::prelude::*;

    #[test]
    fn builtin_sizes() {
        assert_eq!(Test1::SIZE, 60);
        assert_eq!(Test2::SIZE, 12);
        assert_eq!(Test3::SIZE, 32);
        assert_eq!(Test1::FIELD_COUNT, 14);
        assert_eq!(Test3::TAG_OFFSET, 28);
    }

    #[test]
    fn identities_follow_the_headers() {
        assert_eq!(Test1::IDENTITY.pvc, Test2::IDENTITY.pvc);
        assert_eq!(Test1::IDENTITY.id, Test2::IDENTITY.id);
        assert_ne!(Test3::IDENTITY.pvc, Test1::IDENTITY.pvc);
        assert_eq!(Test3::IDENTITY.version, 5);
        assert_eq!(Test3::IDENTITY.metadata, 7);
    }

    #[test]
    fn scenario_a_encode_test2() {
        let bytes = Test2 { sequence_no: 1, sample_time: 1000 }.encode();
        assert_eq!(bytes.len(), 12);
        assert_eq!(bytes[8..12], 488000002u32.to_ne_bytes());
        assert_eq!(bytes[0..4], 1u32.to_ne_bytes());
        assert_eq!(bytes[4..8], 1000u32.to_ne_bytes());
    }

    #[test]
    fn scenario_b_foreign_tag() {
        let mut bytes = vec![0u8; 12];
        bytes[8..].copy_from_slice(&416000005u32.to_ne_bytes());
        let err = Test2::decode(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PacketIdentityMismatch);
        assert!(matches!(
            err,
            RtdnError::PacketIdentityMismatch { expected: 488000002, found: 416000005, .. }
        ));
    }

    #[test]
    fn scenario_c_short_buffer() {
        let err = Test2::decode(&[0u8; 11]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PacketSizeMismatch);
    }

    #[test]
    fn field_specs_use_wire_names() {
        let names: Vec<_> = Test3::FIELDS.iter().map(|spec| spec.name).collect();
        assert_eq!(
            names,
            ["sequenceNo", "sampleTime", "C2E_UPZE1", "C2E_UNZE1", "C2E_UPZE2", "C2E_UNZE2", "C2E_UPZE3"]
        );
    }

    #[test]
    fn packet_accessors() {
        let packet: Packet = Test3 { sequence_no: 9, sample_time: 90, ..Default::default() }.into();
        assert_eq!(packet.kind(), PacketKind::Test3);
        assert_eq!(packet.name(), "test3");
        assert_eq!(packet.identity().id, 416000005);
        assert_eq!(packet.size(), 32);
        assert_eq!(packet.sequence_no(), Some(9));
        assert_eq!(packet.sample_time(), Some(90));
        assert_eq!(packet.encode().unwrap().len(), 32);
    }

    #[test]
    fn serde_uses_wire_names() {
        let yaml = serde_yaml_ng::to_string(&Test2 { sequence_no: 3, sample_time: 4 }).unwrap();
        assert!(yaml.contains("sequenceNo: 3"));
        assert!(yaml.contains("sampleTime: 4"));
    }

    prop_compose! {
        fn arb_test1()(
            counters in prop::array::uniform4(any::<u32>()),
            measurements in prop::array::uniform5(-1.0e9f32..1.0e9),
            status in prop::array::uniform5(any::<u32>()),
        ) -> Test1 {
            Test1 {
                sequence_no: counters[0],
                sample_time: counters[1],
                available: counters[2],
                saturated: counters[3],
                dev_hz: measurements[0],
                freq: measurements[1],
                damping_raw: measurements[2],
                damping_norm: measurements[3],
                time_damping: measurements[4],
                dev_hz_sta: status[0],
                freq_sta: status[1],
                damping_raw_sta: status[2],
                damping_norm_sta: status[3],
                time_damping_sta: status[4],
            }
        }
    }

    proptest! {
        #[test]
        fn prop_test1_roundtrip(record in arb_test1()) {
            let bytes = record.encode();
            prop_assert_eq!(bytes.len(), 60);
            prop_assert_eq!(Test1::tag_of(&bytes), Some(488000002));
            prop_assert_eq!(Test1::decode(&bytes).unwrap(), record);
        }

        #[test]
        fn prop_test3_roundtrip(
            seq in any::<u32>(),
            time in any::<u32>(),
            v in prop::array::uniform5(-1.0e9f32..1.0e9),
        ) {
            let record = Test3 {
                sequence_no: seq,
                sample_time: time,
                c2e_upze1: v[0],
                c2e_unze1: v[1],
                c2e_upze2: v[2],
                c2e_unze2: v[3],
                c2e_upze3: v[4],
            };
            let bytes = record.encode();
            prop_assert_eq!(Test3::tag_of(&bytes), Some(416000005));
            prop_assert_eq!(Test3::decode(&bytes).unwrap(), record);
        }

        #[test]
        fn prop_size_off_by_one_is_size_mismatch(record in arb_test1(), grow in any::<bool>()) {
            let mut bytes = record.encode();
            if grow {
                bytes.push(0);
            } else {
                bytes.pop();
            }
            prop_assert_eq!(Test1::decode(&bytes).unwrap_err().kind(), ErrorKind::PacketSizeMismatch);
        }

        #[test]
        fn prop_foreign_id_is_identity_mismatch(seq in any::<u32>(), time in any::<u32>()) {
            let mut bytes = Test2 { sequence_no: seq, sample_time: time }.encode();
            bytes[Test2::TAG_OFFSET..].copy_from_slice(&Test3::IDENTITY.id.to_ne_bytes());
            prop_assert_eq!(Test2::decode(&bytes).unwrap_err().kind(), ErrorKind::PacketIdentityMismatch);
        }
    }
}
