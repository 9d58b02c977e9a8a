//! Packet field type definitions

use serde::{Deserialize, Serialize};

use super::ByteOrder;

/// Fundamental field types that can appear in an RTDN packet.
///
/// Maps to the C type names used by generated headers (`uint32`, `float32`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// 8-bit unsigned integer (`uint8`)
    UInt8,
    /// 8-bit signed integer (`int8`)
    Int8,
    /// 16-bit unsigned integer (`uint16`)
    UInt16,
    /// 16-bit signed integer (`int16`)
    Int16,
    /// 32-bit unsigned integer (`uint32`, `BitField`)
    UInt32,
    /// 32-bit signed integer (`int32`)
    Int32,
    /// 64-bit unsigned integer (`uint64`)
    UInt64,
    /// 64-bit signed integer (`int64`)
    Int64,
    /// 32-bit floating point (`float32`, `float`)
    Float32,
    /// 64-bit floating point (`float64`)
    Float64,
}

impl FieldType {
    /// Returns the size in bytes of this field type.
    pub const fn size(&self) -> usize {
        match self {
            FieldType::UInt8 | FieldType::Int8 => 1,
            FieldType::UInt16 | FieldType::Int16 => 2,
            FieldType::UInt32 | FieldType::Int32 | FieldType::Float32 => 4,
            FieldType::UInt64 | FieldType::Int64 | FieldType::Float64 => 8,
        }
    }

    /// Map a C type name from a generated header to a field type.
    ///
    /// Matching is case-insensitive. `BitField` is an alias of `uint32` and
    /// `float` an alias of `float32`.
    pub fn from_c_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "uint8" => Some(FieldType::UInt8),
            "int8" => Some(FieldType::Int8),
            "uint16" => Some(FieldType::UInt16),
            "int16" => Some(FieldType::Int16),
            "uint32" | "bitfield" => Some(FieldType::UInt32),
            "int32" => Some(FieldType::Int32),
            "uint64" => Some(FieldType::UInt64),
            "int64" => Some(FieldType::Int64),
            "float32" | "float" => Some(FieldType::Float32),
            "float64" => Some(FieldType::Float64),
            _ => None,
        }
    }

    /// The canonical C type name for this field type.
    pub const fn c_name(&self) -> &'static str {
        match self {
            FieldType::UInt8 => "uint8",
            FieldType::Int8 => "int8",
            FieldType::UInt16 => "uint16",
            FieldType::Int16 => "int16",
            FieldType::UInt32 => "uint32",
            FieldType::Int32 => "int32",
            FieldType::UInt64 => "uint64",
            FieldType::Int64 => "int64",
            FieldType::Float32 => "float32",
            FieldType::Float64 => "float64",
        }
    }
}

/// Runtime value that can hold any packet field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    UInt8(u8),
    Int8(i8),
    UInt16(u16),
    Int16(i16),
    UInt32(u32),
    Int32(i32),
    UInt64(u64),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Array(Vec<Value>),
}

impl Value {
    /// Element type of this value, or `None` for an empty array.
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            Value::UInt8(_) => Some(FieldType::UInt8),
            Value::Int8(_) => Some(FieldType::Int8),
            Value::UInt16(_) => Some(FieldType::UInt16),
            Value::Int16(_) => Some(FieldType::Int16),
            Value::UInt32(_) => Some(FieldType::UInt32),
            Value::Int32(_) => Some(FieldType::Int32),
            Value::UInt64(_) => Some(FieldType::UInt64),
            Value::Int64(_) => Some(FieldType::Int64),
            Value::Float32(_) => Some(FieldType::Float32),
            Value::Float64(_) => Some(FieldType::Float64),
            Value::Array(items) => items.first().and_then(Value::field_type),
        }
    }

    /// Zero value for a field type.
    pub fn zero(field_type: FieldType) -> Self {
        match field_type {
            FieldType::UInt8 => Value::UInt8(0),
            FieldType::Int8 => Value::Int8(0),
            FieldType::UInt16 => Value::UInt16(0),
            FieldType::Int16 => Value::Int16(0),
            FieldType::UInt32 => Value::UInt32(0),
            FieldType::Int32 => Value::Int32(0),
            FieldType::UInt64 => Value::UInt64(0),
            FieldType::Int64 => Value::Int64(0),
            FieldType::Float32 => Value::Float32(0.0),
            FieldType::Float64 => Value::Float64(0.0),
        }
    }

    /// Decode a single scalar of `field_type` from the start of `bytes`.
    pub fn read_scalar(field_type: FieldType, bytes: &[u8], order: ByteOrder) -> Option<Self> {
        use super::FieldData;

        Some(match field_type {
            FieldType::UInt8 => Value::UInt8(u8::read(bytes, order)?),
            FieldType::Int8 => Value::Int8(i8::read(bytes, order)?),
            FieldType::UInt16 => Value::UInt16(u16::read(bytes, order)?),
            FieldType::Int16 => Value::Int16(i16::read(bytes, order)?),
            FieldType::UInt32 => Value::UInt32(u32::read(bytes, order)?),
            FieldType::Int32 => Value::Int32(i32::read(bytes, order)?),
            FieldType::UInt64 => Value::UInt64(u64::read(bytes, order)?),
            FieldType::Int64 => Value::Int64(i64::read(bytes, order)?),
            FieldType::Float32 => Value::Float32(f32::read(bytes, order)?),
            FieldType::Float64 => Value::Float64(f64::read(bytes, order)?),
        })
    }

    /// Append this value's wire bytes to `out`. Arrays are written element by element.
    pub fn write(&self, out: &mut Vec<u8>, order: ByteOrder) {
        use super::FieldData;

        match self {
            Value::UInt8(v) => v.write(out, order),
            Value::Int8(v) => v.write(out, order),
            Value::UInt16(v) => v.write(out, order),
            Value::Int16(v) => v.write(out, order),
            Value::UInt32(v) => v.write(out, order),
            Value::Int32(v) => v.write(out, order),
            Value::UInt64(v) => v.write(out, order),
            Value::Int64(v) => v.write(out, order),
            Value::Float32(v) => v.write(out, order),
            Value::Float64(v) => v.write(out, order),
            Value::Array(items) => items.iter().for_each(|item| item.write(out, order)),
        }
    }
}
