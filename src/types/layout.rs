//! Packet layout types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::FieldType;
use crate::{Result, RtdnError};

/// Width of the trailing identity tag field.
pub const TAG_SIZE: usize = 4;

/// The four identity constants every generated packet type carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PacketIdentity {
    /// Protocol/category code shared by related packet types (`RT_<name>_PVC`)
    pub pvc: u32,
    /// Numeric type identity, also the tag value (`RT_<name>_ID`)
    pub id: u32,
    /// Wire-layout version (`RT_<name>_VERSION`)
    pub version: u32,
    /// Metadata/schema revision (`<NAME>_<name>_METADATA`)
    pub metadata: u32,
}

impl PacketIdentity {
    pub const fn new(pvc: u32, id: u32, version: u32, metadata: u32) -> Self {
        Self { pvc, id, version, metadata }
    }
}

impl fmt::Display for PacketIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pvc={} id={} version={} metadata={}",
            self.pvc, self.id, self.version, self.metadata
        )
    }
}

/// Static description of a declared field, used by typed packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field_type: FieldType,
    pub count: usize,
}

impl FieldSpec {
    pub const fn scalar(name: &'static str, field_type: FieldType) -> Self {
        Self { name, field_type, count: 1 }
    }

    pub const fn size(&self) -> usize {
        self.field_type.size() * self.count
    }
}

/// Total encoded size of a field list plus the trailing tag.
pub const fn encoded_size(fields: &[FieldSpec]) -> usize {
    let mut total = TAG_SIZE;
    let mut i = 0;
    while i < fields.len() {
        total += fields[i].size();
        i += 1;
    }
    total
}

/// Information about a single field in a packet layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    /// Field name as declared in the generated structure
    pub name: String,
    /// Element type
    pub field_type: FieldType,
    /// Byte offset within the packet
    pub offset: usize,
    /// Number of elements (1 for scalar, >1 for arrays)
    pub count: usize,
    /// Comment captured from the declaration, if any
    pub comment: String,
}

impl FieldInfo {
    /// Size in bytes of the whole field. Saturates at `usize::MAX`.
    pub fn size(&self) -> usize {
        self.checked_size().unwrap_or(usize::MAX)
    }

    /// Size in bytes of the whole field, `None` if it does not fit a `usize`.
    pub fn checked_size(&self) -> Option<usize> {
        self.field_type.size().checked_mul(self.count)
    }

    /// Byte range covered by the field.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset.saturating_add(self.size())
    }
}

/// Fixed layout of one packet type: ordered fields, total size and identity.
///
/// The last field is always the identity tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketLayout {
    /// Packet type name (e.g. `test1`)
    pub name: String,
    /// Identity constants
    pub identity: PacketIdentity,
    /// Fields in declaration order, identity tag last
    pub fields: Vec<FieldInfo>,
    /// Total encoded size in bytes
    pub size: usize,
    /// Header file version label (e.g. `2_2`), when loaded from a header
    pub version_label: Option<String>,
    /// Header file the layout was parsed from
    pub source: Option<PathBuf>,
}

impl PacketLayout {
    /// Start building a layout. The identity tag is appended by [`LayoutBuilder::build`].
    pub fn builder(name: impl Into<String>, identity: PacketIdentity) -> LayoutBuilder {
        LayoutBuilder {
            name: name.into(),
            identity,
            fields: Vec::new(),
            offset: 0,
            overflowed: None,
            tag_name: None,
            version_label: None,
            source: None,
        }
    }

    /// Build a layout from static field specs (tag excluded).
    pub fn from_specs(name: &str, identity: PacketIdentity, specs: &[FieldSpec]) -> Result<Self> {
        specs
            .iter()
            .fold(Self::builder(name, identity), |builder, spec| {
                builder.array(spec.name, spec.field_type, spec.count)
            })
            .build()
    }

    /// Validate the layout for consistency.
    pub fn validate(&self) -> Result<()> {
        let Some(tag) = self.fields.last() else {
            return Err(RtdnError::layout_error(&self.name, "layout has no fields"));
        };

        if tag.field_type != FieldType::UInt32 || tag.count != 1 {
            return Err(RtdnError::layout_error(
                &self.name,
                format!("identity tag '{}' must be a single uint32", tag.name),
            ));
        }

        let mut expected_offset = 0;
        for (index, field) in self.fields.iter().enumerate() {
            if field.count == 0 {
                return Err(RtdnError::layout_error(
                    &self.name,
                    format!("field '{}' has count of 0", field.name),
                ));
            }

            if field.offset != expected_offset {
                return Err(RtdnError::layout_error(
                    &self.name,
                    format!(
                        "field '{}' at offset {} but expected {}",
                        field.name, field.offset, expected_offset
                    ),
                ));
            }

            if self.fields[..index].iter().any(|other| other.name == field.name) {
                return Err(RtdnError::layout_error(
                    &self.name,
                    format!("duplicate field name '{}'", field.name),
                ));
            }

            expected_offset = field
                .checked_size()
                .and_then(|size| expected_offset.checked_add(size))
                .ok_or_else(|| overflow(&self.name, &field.name))?;
        }

        if expected_offset != self.size {
            return Err(RtdnError::layout_error(
                &self.name,
                format!("fields cover {} bytes but size is {}", expected_offset, self.size),
            ));
        }

        Ok(())
    }

    /// Get field info by name.
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Check if a field exists.
    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Get the number of fields, identity tag included.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Fields excluding the identity tag.
    pub fn data_fields(&self) -> &[FieldInfo] {
        &self.fields[..self.fields.len().saturating_sub(1)]
    }

    /// The identity tag field.
    pub fn tag_field(&self) -> Option<&FieldInfo> {
        self.fields.last()
    }

    /// Byte offset of the identity tag.
    pub fn tag_offset(&self) -> usize {
        self.size.saturating_sub(TAG_SIZE)
    }

    /// True when both layouts describe the same bytes on the wire.
    ///
    /// Field names and comments are ignored.
    pub fn wire_compatible(&self, other: &PacketLayout) -> bool {
        self.identity == other.identity
            && self.size == other.size
            && self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|(a, b)| a.field_type == b.field_type && a.count == b.count)
    }
}

/// Incremental builder computing packed offsets for a [`PacketLayout`].
#[derive(Debug, Clone)]
pub struct LayoutBuilder {
    name: String,
    identity: PacketIdentity,
    fields: Vec<FieldInfo>,
    offset: usize,
    // first field whose end offset did not fit a usize
    overflowed: Option<String>,
    tag_name: Option<String>,
    version_label: Option<String>,
    source: Option<PathBuf>,
}

fn overflow(packet: &str, field: &str) -> RtdnError {
    RtdnError::layout_error(packet, format!("field '{field}' size overflows"))
}

impl LayoutBuilder {
    /// Append a scalar field.
    pub fn field(self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.array(name, field_type, 1)
    }

    /// Append an array field of `count` elements.
    pub fn array(self, name: impl Into<String>, field_type: FieldType, count: usize) -> Self {
        self.commented(name, field_type, count, String::new())
    }

    /// Append a field with a captured comment.
    ///
    /// A field whose size or end offset overflows is reported by [`LayoutBuilder::build`].
    pub fn commented(
        mut self,
        name: impl Into<String>,
        field_type: FieldType,
        count: usize,
        comment: impl Into<String>,
    ) -> Self {
        let info = FieldInfo {
            name: name.into(),
            field_type,
            offset: self.offset,
            count,
            comment: comment.into(),
        };
        match info.checked_size().and_then(|size| self.offset.checked_add(size)) {
            Some(end) => self.offset = end,
            None => {
                self.overflowed.get_or_insert_with(|| info.name.clone());
            }
        }
        self.fields.push(info);
        self
    }

    /// Name of the trailing tag field. Defaults to `<name>_<id>`.
    pub fn tag_name(mut self, name: impl Into<String>) -> Self {
        self.tag_name = Some(name.into());
        self
    }

    pub fn version_label(mut self, label: impl Into<String>) -> Self {
        self.version_label = Some(label.into());
        self
    }

    pub fn source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    /// Append the identity tag and validate the result.
    pub fn build(self) -> Result<PacketLayout> {
        let tag_name =
            self.tag_name.unwrap_or_else(|| format!("{}_{}", self.name, self.identity.id));
        let builder = Self { tag_name: None, ..self }.field(tag_name, FieldType::UInt32);
        if let Some(field) = &builder.overflowed {
            return Err(overflow(&builder.name, field));
        }

        let layout = PacketLayout {
            name: builder.name,
            identity: builder.identity,
            fields: builder.fields,
            size: builder.offset,
            version_label: builder.version_label,
            source: builder.source,
        };
        layout.validate()?;
        Ok(layout)
    }
}
