//! Field data parsing trait and implementations

use super::{BitField, ByteOrder, FieldInfo, FieldType, Value};
use crate::{Result, RtdnError};

/// Trait for scalar types that can be read from and written to packet bytes.
pub trait FieldData: Sized + Copy {
    /// Declared wire type of this Rust type.
    const FIELD_TYPE: FieldType;

    /// Read one value from the start of `bytes`. Returns `None` if `bytes` is too short.
    fn read(bytes: &[u8], order: ByteOrder) -> Option<Self>;

    /// Append this value's wire bytes to `out`.
    fn write(self, out: &mut Vec<u8>, order: ByteOrder);

    /// Convert to a runtime [`Value`].
    fn to_value(self) -> Value;

    /// Convert from a runtime [`Value`] of the matching variant.
    fn from_value(value: &Value) -> Option<Self>;

    /// Parse this type from packet bytes at the field's offset.
    fn from_bytes(data: &[u8], info: &FieldInfo, order: ByteOrder) -> Result<Self> {
        if info.field_type != Self::FIELD_TYPE {
            return Err(RtdnError::TypeConversion {
                details: format!(
                    "Field '{}' is {:?}, requested {:?}",
                    info.name,
                    info.field_type,
                    Self::FIELD_TYPE
                ),
            });
        }

        data.get(info.offset..)
            .and_then(|bytes| Self::read(bytes, order))
            .ok_or_else(|| {
                RtdnError::size_mismatch(
                    info.name.clone(),
                    info.offset + Self::FIELD_TYPE.size(),
                    data.len(),
                )
            })
    }
}

macro_rules! impl_field_data {
    ($($ty:ty => $variant:ident),* $(,)?) => {$(
        impl FieldData for $ty {
            const FIELD_TYPE: FieldType = FieldType::$variant;

            fn read(bytes: &[u8], order: ByteOrder) -> Option<Self> {
                const WIDTH: usize = std::mem::size_of::<$ty>();
                let raw: [u8; WIDTH] = bytes.get(..WIDTH)?.try_into().ok()?;
                Some(match order {
                    ByteOrder::Native => <$ty>::from_ne_bytes(raw),
                    ByteOrder::Little => <$ty>::from_le_bytes(raw),
                    ByteOrder::Big => <$ty>::from_be_bytes(raw),
                })
            }

            fn write(self, out: &mut Vec<u8>, order: ByteOrder) {
                let raw = match order {
                    ByteOrder::Native => self.to_ne_bytes(),
                    ByteOrder::Little => self.to_le_bytes(),
                    ByteOrder::Big => self.to_be_bytes(),
                };
                out.extend_from_slice(&raw);
            }

            fn to_value(self) -> Value {
                Value::$variant(self)
            }

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(*v),
                    _ => None,
                }
            }
        }
    )*};
}

impl_field_data! {
    u8 => UInt8,
    i8 => Int8,
    u16 => UInt16,
    i16 => Int16,
    u32 => UInt32,
    i32 => Int32,
    u64 => UInt64,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
}

// BitField shares the uint32 wire representation
impl FieldData for BitField {
    const FIELD_TYPE: FieldType = FieldType::UInt32;

    fn read(bytes: &[u8], order: ByteOrder) -> Option<Self> {
        u32::read(bytes, order).map(BitField)
    }

    fn write(self, out: &mut Vec<u8>, order: ByteOrder) {
        self.0.write(out, order)
    }

    fn to_value(self) -> Value {
        Value::UInt32(self.0)
    }

    fn from_value(value: &Value) -> Option<Self> {
        u32::from_value(value).map(BitField)
    }
}

/// Read every element of an array field.
pub fn read_array<T: FieldData>(data: &[u8], info: &FieldInfo, order: ByteOrder) -> Result<Vec<T>> {
    let element_size = info.field_type.size();
    let mut result = Vec::with_capacity(info.count);

    for i in 0..info.count {
        let element = FieldInfo {
            offset: info.offset + i * element_size,
            count: 1,
            ..info.clone()
        };
        result.push(T::from_bytes(data, &element, order)?);
    }

    Ok(result)
}
