//! Layout-driven view over a single packet supporting by-name lookups.
//!
//! This is how packets parsed from headers at runtime are read without a
//! bespoke typed struct. It is intended for tooling, diagnostics and types
//! the crate does not know at compile time. For hot paths, prefer the typed
//! records in [`crate::packets`], which avoid per-field name lookups and copies.

use std::sync::Arc;

use tracing::trace;

use crate::types::{ByteOrder, FieldData, FieldInfo, PacketLayout, Value, read_array};
use crate::{Result, RtdnError};

const SEQUENCE_NO: &str = "sequenceNo";
const SAMPLE_TIME: &str = "sampleTime";

/// A self-contained, validated packet decoded against a runtime layout.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicPacket {
    data: Arc<[u8]>,
    layout: Arc<PacketLayout>,
    order: ByteOrder,
}

impl DynamicPacket {
    /// Validate `bytes` against `layout` and take a copy.
    ///
    /// The length must equal the layout size and the trailing tag must equal
    /// the layout's ID.
    pub fn decode(bytes: &[u8], layout: Arc<PacketLayout>, order: ByteOrder) -> Result<Self> {
        if bytes.len() != layout.size {
            return Err(RtdnError::size_mismatch(layout.name.clone(), layout.size, bytes.len()));
        }

        let found = order.read_u32(&bytes[layout.tag_offset()..]).ok_or_else(|| {
            RtdnError::size_mismatch(layout.name.clone(), layout.size, bytes.len())
        })?;
        if found != layout.identity.id {
            return Err(RtdnError::identity_mismatch(layout.name.clone(), layout.identity.id, found));
        }

        trace!(packet = %layout.name, size = layout.size, "Decoded dynamic packet");
        Ok(Self { data: Arc::from(bytes), layout, order })
    }

    /// Start building a packet for `layout` with every field zeroed.
    pub fn builder(layout: Arc<PacketLayout>) -> DynamicPacketBuilder {
        let values = layout.data_fields().iter().map(zero_value).collect();
        DynamicPacketBuilder { layout, values }
    }

    pub fn layout(&self) -> &PacketLayout {
        &self.layout
    }

    /// Shared handle to the layout.
    pub fn layout_arc(&self) -> Arc<PacketLayout> {
        Arc::clone(&self.layout)
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    /// Raw bytes as received.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns field metadata if present.
    pub fn field_info(&self, name: &str) -> Option<&FieldInfo> {
        self.layout.field(name)
    }

    /// Generic typed lookup by field name.
    /// Returns None if the field is missing or type conversion fails.
    pub fn get<T: FieldData>(&self, name: &str) -> Option<T> {
        self.try_get(name).ok()
    }

    /// Typed lookup reporting why it failed.
    pub fn try_get<T: FieldData>(&self, name: &str) -> Result<T> {
        let info = self.require(name)?;
        T::from_bytes(&self.data, info, self.order)
    }

    /// Every element of an array field.
    pub fn get_array<T: FieldData>(&self, name: &str) -> Result<Vec<T>> {
        let info = self.require(name)?;
        read_array(&self.data, info, self.order)
    }

    /// Convenience typed helpers
    pub fn u32(&self, name: &str) -> Option<u32> {
        self.get(name)
    }
    pub fn f32(&self, name: &str) -> Option<f32> {
        self.get(name)
    }

    /// Runtime value of a field. Arrays become [`Value::Array`].
    pub fn value(&self, name: &str) -> Result<Value> {
        let info = self.require(name)?;
        read_value(&self.data, info, self.order)
    }

    /// All data fields in declaration order, identity tag excluded.
    pub fn values(&self) -> Result<Vec<(&str, Value)>> {
        self.layout
            .data_fields()
            .iter()
            .map(|info| Ok((info.name.as_str(), read_value(&self.data, info, self.order)?)))
            .collect()
    }

    pub fn sequence_no(&self) -> Option<u32> {
        self.get(SEQUENCE_NO)
    }

    pub fn sample_time(&self) -> Option<u32> {
        self.get(SAMPLE_TIME)
    }

    /// The identity tag carried by the bytes (always the layout's ID).
    pub fn tag(&self) -> u32 {
        self.layout.identity.id
    }

    /// Encode in `order`. Returns the original bytes when the order matches.
    ///
    /// Always yields exactly `layout.size` bytes; a field the stored bytes
    /// cannot supply is an error rather than a shorter packet.
    pub fn encode_with(&self, order: ByteOrder) -> Result<Vec<u8>> {
        if order.resolved() == self.order.resolved() {
            return Ok(self.data.to_vec());
        }

        let mut out = Vec::with_capacity(self.layout.size);
        for info in self.layout.data_fields() {
            read_value(&self.data, info, self.order)?.write(&mut out, order);
        }
        out.extend_from_slice(&order.u32_bytes(self.layout.identity.id));
        Ok(out)
    }

    fn require(&self, name: &str) -> Result<&FieldInfo> {
        self.layout
            .field(name)
            .ok_or_else(|| RtdnError::FieldNotFound { field: format!("{}.{}", self.layout.name, name) })
    }
}

fn zero_value(info: &FieldInfo) -> Value {
    if info.count == 1 {
        Value::zero(info.field_type)
    } else {
        Value::Array(vec![Value::zero(info.field_type); info.count])
    }
}

fn read_value(data: &[u8], info: &FieldInfo, order: ByteOrder) -> Result<Value> {
    let width = info.field_type.size();
    let read = |index: usize| {
        data.get(info.offset + index * width..)
            .and_then(|bytes| Value::read_scalar(info.field_type, bytes, order))
            .ok_or_else(|| RtdnError::size_mismatch(info.name.clone(), info.range().end, data.len()))
    };

    if info.count == 1 {
        read(0)
    } else {
        (0..info.count).map(read).collect::<Result<Vec<_>>>().map(Value::Array)
    }
}

/// Builds a [`DynamicPacket`] field by field. The identity tag is written on build.
#[derive(Debug, Clone)]
pub struct DynamicPacketBuilder {
    layout: Arc<PacketLayout>,
    values: Vec<Value>,
}

impl DynamicPacketBuilder {
    /// Set a data field. The value's type and element count must match the layout.
    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Result<Self> {
        let value = value.into();
        let index = self
            .layout
            .data_fields()
            .iter()
            .position(|info| info.name == name)
            .ok_or_else(|| RtdnError::FieldNotFound {
                field: format!("{}.{}", self.layout.name, name),
            })?;
        let info = &self.layout.data_fields()[index];

        let count = match &value {
            Value::Array(items) => items.len(),
            _ => 1,
        };
        let scalar_shape = info.count == 1 && !matches!(value, Value::Array(_));
        let array_shape = info.count > 1 && count == info.count;
        let homogeneous = match &value {
            Value::Array(items) => items.iter().all(|item| item.field_type() == Some(info.field_type)),
            other => other.field_type() == Some(info.field_type),
        };

        if !(scalar_shape || array_shape) || !homogeneous {
            return Err(RtdnError::TypeConversion {
                details: format!(
                    "Field '{}' is {} x {:?}, got {:?}",
                    info.name, info.count, info.field_type, value
                ),
            });
        }

        self.values[index] = value;
        Ok(self)
    }

    /// Encode in `order` and wrap the result.
    pub fn build(self, order: ByteOrder) -> DynamicPacket {
        let mut out = Vec::with_capacity(self.layout.size);
        self.values.iter().for_each(|value| value.write(&mut out, order));
        out.extend_from_slice(&order.u32_bytes(self.layout.identity.id));

        DynamicPacket { data: Arc::from(out), layout: self.layout, order }
    }
}

macro_rules! impl_value_from {
    ($($ty:ty),*) => {$(
        impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                value.to_value()
            }
        }
    )*};
}

impl_value_from!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

impl<T: FieldData> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::Array(values.into_iter().map(FieldData::to_value).collect())
    }
}
