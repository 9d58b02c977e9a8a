//! Read-only table mapping identity tags to packet types.
//!
//! A [`PacketRegistry`] is assembled once through [`RegistryBuilder`] and never
//! mutated afterwards, so it can be shared across threads behind an `Arc`
//! without locking.
//!
//! ```rust
//! use rtdn::{Packet, PacketCodec, PacketRegistry, Test1, Test2};
//!
//! let registry = PacketRegistry::builtin();
//!
//! // test1 and test2 share an ID; the buffer length tells them apart
//! let bytes = Test2 { sequence_no: 1, sample_time: 1000 }.encode();
//! assert_eq!(&*registry.identify(&bytes).unwrap().name, "test2");
//!
//! let bytes = Test1::default().encode();
//! assert!(matches!(registry.decode(&bytes).unwrap(), Packet::Test1(_)));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use tracing::{debug, trace};

use crate::codec::{ByteOrder, PacketCodec};
use crate::dynamic_packet::DynamicPacket;
use crate::packets::{IntoPacket, Packet, PacketKind, Test1, Test2, Test3};
use crate::types::{PacketIdentity, PacketLayout, TAG_SIZE};
use crate::{Result, RtdnError};

/// What [`PacketRegistry::identify`] reports about a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeTag {
    /// Packet type name
    pub name: Arc<str>,
    /// Identity constants of the type
    pub identity: PacketIdentity,
    /// Fixed encoded size
    pub size: usize,
    /// Typed variant the packet decodes into
    pub kind: PacketKind,
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes, {})", self.name, self.size, self.identity)
    }
}

type TypedDecoder = fn(&[u8], ByteOrder) -> Result<Packet>;

#[derive(Clone)]
struct Entry {
    tag: TypeTag,
    layout: Arc<PacketLayout>,
    typed: Option<TypedDecoder>,
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("tag", &self.tag)
            .field("typed", &self.typed.is_some())
            .finish()
    }
}

/// Collects packet types before freezing them into a [`PacketRegistry`].
#[derive(Debug, Clone, Default)]
pub struct RegistryBuilder {
    entries: Vec<Entry>,
    order: ByteOrder,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Byte order used by [`PacketRegistry::decode`]. Defaults to host-native.
    pub fn byte_order(mut self, order: ByteOrder) -> Self {
        self.order = order;
        self
    }

    /// Register `test1`, `test2` and `test3`.
    pub fn with_builtin(self) -> Result<Self> {
        self.register::<Test1>()?.register::<Test2>()?.register::<Test3>()
    }

    /// Register a typed record. Decoding yields its [`Packet`] variant.
    pub fn register<P: IntoPacket>(mut self) -> Result<Self> {
        let layout = P::layout()?;
        self.insert(Entry {
            tag: tag_for(&layout, P::KIND),
            layout: Arc::new(layout),
            typed: Some(P::decode_packet as TypedDecoder),
        })?;
        Ok(self)
    }

    /// Register a runtime layout. Decoding yields [`Packet::Dynamic`].
    ///
    /// A layout whose name is already registered with the same wire shape is
    /// skipped, so typed records take precedence over parsed headers.
    pub fn register_layout(mut self, layout: PacketLayout) -> Result<Self> {
        layout.validate()?;
        self.insert(Entry {
            tag: tag_for(&layout, PacketKind::Dynamic),
            layout: Arc::new(layout),
            typed: None,
        })?;
        Ok(self)
    }

    /// Register every layout in turn.
    pub fn register_layouts(self, layouts: impl IntoIterator<Item = PacketLayout>) -> Result<Self> {
        layouts.into_iter().try_fold(self, Self::register_layout)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, entry: Entry) -> Result<()> {
        if let Some(existing) = self.entries.iter().find(|e| e.tag.name == entry.tag.name) {
            if existing.layout.wire_compatible(&entry.layout) {
                debug!(packet = %entry.tag.name, "Packet type already registered with the same layout, skipping");
                return Ok(());
            }
            return Err(RtdnError::DuplicateType { name: entry.tag.name.to_string() });
        }

        if let Some(clash) = self
            .entries
            .iter()
            .find(|e| e.tag.identity.id == entry.tag.identity.id && e.tag.size == entry.tag.size)
        {
            return Err(RtdnError::layout_error(
                entry.tag.name.to_string(),
                format!(
                    "tag {} with size {} is already used by '{}'",
                    entry.tag.identity.id, entry.tag.size, clash.tag.name
                ),
            ));
        }

        debug!(
            packet = %entry.tag.name,
            id = entry.tag.identity.id,
            size = entry.tag.size,
            typed = entry.typed.is_some(),
            "Registered packet type"
        );
        self.entries.push(entry);
        Ok(())
    }

    /// Freeze into an immutable registry.
    pub fn build(self) -> PacketRegistry {
        let mut by_id: HashMap<u32, Vec<usize>> = HashMap::new();
        let mut by_name = HashMap::new();
        for (index, entry) in self.entries.iter().enumerate() {
            by_id.entry(entry.tag.identity.id).or_default().push(index);
            by_name.insert(Arc::clone(&entry.tag.name), index);
        }

        debug!(types = self.entries.len(), order = ?self.order, "Built packet registry");
        PacketRegistry { entries: self.entries, by_id, by_name, order: self.order }
    }
}

fn tag_for(layout: &PacketLayout, kind: PacketKind) -> TypeTag {
    TypeTag {
        name: Arc::from(layout.name.as_str()),
        identity: layout.identity,
        size: layout.size,
        kind,
    }
}

// The built-in layouts are compile-time constants; registering them cannot fail.
static BUILTIN: LazyLock<Arc<PacketRegistry>> = LazyLock::new(|| {
    let builder = RegistryBuilder::new().with_builtin().expect("built-in layouts are valid");
    Arc::new(builder.build())
});

/// Immutable identity tag to packet type table.
#[derive(Debug, Clone)]
pub struct PacketRegistry {
    entries: Vec<Entry>,
    by_id: HashMap<u32, Vec<usize>>,
    by_name: HashMap<Arc<str>, usize>,
    order: ByteOrder,
}

impl PacketRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Process-wide registry of the built-in types, host-native byte order.
    pub fn builtin() -> Arc<PacketRegistry> {
        Arc::clone(&BUILTIN)
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Registered types in registration order.
    pub fn tags(&self) -> impl Iterator<Item = &TypeTag> {
        self.entries.iter().map(|entry| &entry.tag)
    }

    /// Layout of a registered type.
    pub fn layout(&self, name: &str) -> Option<&PacketLayout> {
        self.entry_by_name(name).map(|entry| entry.layout.as_ref())
    }

    /// Determine which registered type `bytes` claims to be from its trailing tag.
    ///
    /// Only the last four bytes are inspected. When several types share the tag,
    /// the one whose size equals the buffer length is chosen. The chosen type's
    /// size is not otherwise checked here; [`decode`](Self::decode) does that.
    pub fn identify(&self, bytes: &[u8]) -> Result<&TypeTag> {
        self.identify_entry(bytes).map(|entry| &entry.tag)
    }

    /// Identify and fully decode `bytes`.
    pub fn decode(&self, bytes: &[u8]) -> Result<Packet> {
        let entry = self.identify_entry(bytes)?;
        self.decode_entry(entry, bytes)
    }

    /// Decode `bytes` as the named type, skipping identification.
    pub fn decode_as(&self, name: &str, bytes: &[u8]) -> Result<Packet> {
        let entry = self
            .entry_by_name(name)
            .ok_or_else(|| RtdnError::UnknownPacketType { name: name.to_string() })?;
        self.decode_entry(entry, bytes)
    }

    /// Identify and decode through the layout only, even for typed entries.
    pub fn decode_dynamic(&self, bytes: &[u8]) -> Result<DynamicPacket> {
        let entry = self.identify_entry(bytes)?;
        DynamicPacket::decode(bytes, Arc::clone(&entry.layout), self.order)
    }

    fn entry_by_name(&self, name: &str) -> Option<&Entry> {
        self.by_name.get(name).map(|&index| &self.entries[index])
    }

    fn decode_entry(&self, entry: &Entry, bytes: &[u8]) -> Result<Packet> {
        match entry.typed {
            Some(decode) => decode(bytes, self.order),
            None => DynamicPacket::decode(bytes, Arc::clone(&entry.layout), self.order)
                .map(Packet::Dynamic),
        }
    }

    fn identify_entry(&self, bytes: &[u8]) -> Result<&Entry> {
        let length = bytes.len();
        let Some(tag) = length
            .checked_sub(TAG_SIZE)
            .and_then(|start| self.order.read_u32(&bytes[start..]))
        else {
            let smallest = self.entries.iter().map(|entry| entry.tag.size).min().unwrap_or(TAG_SIZE);
            return Err(RtdnError::size_mismatch("<any>", smallest, length));
        };

        let candidates = self
            .by_id
            .get(&tag)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let entry = match candidates {
            [] => {
                trace!(tag, length, "Unknown packet tag");
                return Err(RtdnError::UnknownPacketTag { tag, length });
            }
            [only] => &self.entries[*only],
            many => {
                let Some(index) = many.iter().find(|&&index| self.entries[index].tag.size == length)
                else {
                    let first = &self.entries[many[0]];
                    let names: Vec<&str> =
                        many.iter().map(|&index| &*self.entries[index].tag.name).collect();
                    return Err(RtdnError::size_mismatch(names.join("|"), first.tag.size, length));
                };
                &self.entries[*index]
            }
        };

        trace!(packet = %entry.tag.name, tag, length, "Identified packet");
        Ok(entry)
    }
}

// Compile-time check that the registry can be shared across threads
const _: fn() = || {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<PacketRegistry>();
};
