//! Database of constants and struct definitions loaded from header files.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::parser::{Constant, HeaderParser, StructDef};
use crate::registry::RegistryBuilder;
use crate::types::{FieldType, PacketIdentity, PacketLayout};
use crate::{Result, RtdnError};

/// Prefixes under which generators emit `<prefix>_<name>_ID` and friends.
const IDENTITY_PREFIXES: [&str; 2] = ["RT", "RTDN"];

/// Constants and structs gathered from one or more headers.
///
/// Headers are loaded in order; constants defined by earlier headers are
/// visible to later ones.
///
/// ```rust,no_run
/// use rtdn::header::TypeDb;
///
/// let mut db = TypeDb::new()?;
/// db.load_dir("test-data/headers")?;
/// let registry = db.into_registry_builder()?.build();
/// # Ok::<(), rtdn::RtdnError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TypeDb {
    parser: HeaderParser,
    definitions: BTreeMap<String, Constant>,
    structs: BTreeMap<String, StructDef>,
    files: Vec<PathBuf>,
}

impl TypeDb {
    pub fn new() -> Result<Self> {
        Ok(Self {
            parser: HeaderParser::new()?,
            definitions: BTreeMap::new(),
            structs: BTreeMap::new(),
            files: Vec::new(),
        })
    }

    /// Load every `.h` file in `dir`, headers included by others first.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        let ordered = self.sorted_headers(dir)?;
        debug!(dir = %dir.display(), headers = ordered.len(), "Loading header directory");

        for (path, text) in ordered {
            self.load_text(&text, Some(&path))?;
        }
        Ok(())
    }

    /// Load a single header file.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| RtdnError::file_error(path.to_path_buf(), err))?;
        self.load_text(&text, Some(path))
    }

    /// Load header text. `file` supplies the version label and error context.
    pub fn load_str(&mut self, text: &str, file: Option<&Path>) -> Result<()> {
        self.load_text(text, file)
    }

    fn load_text(&mut self, text: &str, file: Option<&Path>) -> Result<()> {
        let header = self.parser.parse(text, file, &mut self.definitions)?;

        for def in header.structs {
            if let Some(previous) = self.structs.get(&def.name) {
                warn!(
                    name = %def.name,
                    previous = ?previous.file,
                    current = ?def.file,
                    "Struct redefined, keeping the latest definition"
                );
            }
            self.structs.insert(def.name.clone(), def);
        }

        if let Some(path) = header.path {
            self.files.push(path);
        }
        Ok(())
    }

    /// Read all headers in `dir` and order them so includes come first.
    ///
    /// Ties, and headers with no relationship, are ordered alphabetically.
    fn sorted_headers(&self, dir: &Path) -> Result<Vec<(PathBuf, String)>> {
        let entries = fs::read_dir(dir).map_err(|err| RtdnError::file_error(dir.to_path_buf(), err))?;

        let mut headers = BTreeMap::new();
        for entry in entries {
            let path = entry.map_err(|err| RtdnError::file_error(dir.to_path_buf(), err))?.path();
            let is_header = path.is_file() && path.extension().is_some_and(|ext| ext == "h");
            let Some(name) = path.file_name().and_then(|name| name.to_str()).filter(|_| is_header) else {
                continue;
            };
            let name = name.to_string();
            let text = fs::read_to_string(&path).map_err(|err| RtdnError::file_error(path.clone(), err))?;
            headers.insert(name, (path, text));
        }

        let includes: HashMap<&str, Vec<String>> = headers
            .iter()
            .map(|(name, (_, text))| {
                let targets = self
                    .parser
                    .includes(text)
                    .into_iter()
                    .filter_map(|target| {
                        Path::new(&target).file_name().and_then(|n| n.to_str()).map(str::to_string)
                    })
                    .filter(|target| headers.contains_key(target))
                    .collect();
                (name.as_str(), targets)
            })
            .collect();

        let mut order = Vec::with_capacity(headers.len());
        let mut done = BTreeSet::new();
        let mut visiting = BTreeSet::new();
        for name in headers.keys() {
            visit(name, &includes, &mut done, &mut visiting, &mut order);
        }

        Ok(order
            .into_iter()
            .filter_map(|name| headers.get(&name).cloned())
            .collect())
    }

    /// All constants seen so far.
    pub fn definitions(&self) -> &BTreeMap<String, Constant> {
        &self.definitions
    }

    /// Value of a constant.
    pub fn constant(&self, name: &str) -> Option<i64> {
        self.definitions.get(name).map(|constant| constant.value)
    }

    /// All struct definitions, keyed by name.
    pub fn structs(&self) -> &BTreeMap<String, StructDef> {
        &self.structs
    }

    pub fn get_struct(&self, name: &str) -> Result<&StructDef> {
        self.structs
            .get(name)
            .ok_or_else(|| RtdnError::parse_error("type database", format!("no struct named '{name}'")))
    }

    /// True for the fundamental types a packet field may use.
    pub fn is_fundamental(&self, type_name: &str) -> bool {
        FieldType::from_c_name(type_name).is_some()
    }

    /// Files loaded so far, in load order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Identity constants for `name`, if its `ID` constant is defined.
    pub fn identity(&self, name: &str) -> Result<Option<PacketIdentity>> {
        let lookup = |suffix: &str| {
            IDENTITY_PREFIXES
                .iter()
                .find_map(|prefix| self.definitions.get(&format!("{prefix}_{name}_{suffix}")))
        };

        let Some(id) = lookup("ID") else {
            return Ok(None);
        };

        let metadata_suffix = format!("_{name}_METADATA");
        let metadata = self
            .definitions
            .get(&format!("{}{metadata_suffix}", name.to_uppercase()))
            .or_else(|| {
                self.definitions
                    .values()
                    .find(|constant| constant.name.ends_with(&metadata_suffix))
            });

        let narrow = |constant: Option<&Constant>, what: &str| -> Result<u32> {
            match constant {
                Some(constant) => u32::try_from(constant.value).map_err(|_| {
                    RtdnError::parse_error(
                        format!("identity of {name}"),
                        format!("{} = {} does not fit in 32 bits", constant.name, constant.value),
                    )
                }),
                None => {
                    warn!(packet = name, constant = what, "Missing identity constant, using 0");
                    Ok(0)
                }
            }
        };

        Ok(Some(PacketIdentity {
            pvc: narrow(lookup("PVC"), "PVC")?,
            id: narrow(Some(id), "ID")?,
            version: narrow(lookup("VERSION"), "VERSION")?,
            metadata: narrow(metadata, "METADATA")?,
        }))
    }

    /// Packet layout of the named struct.
    ///
    /// The struct must have an `ID` constant and only fundamental field types.
    /// A final `uint32` member named `..._<ID>` is taken as the identity tag;
    /// without one, an implicit `<name>_<ID>` tag is appended.
    pub fn layout(&self, name: &str) -> Result<PacketLayout> {
        let def = self.get_struct(name)?;
        let identity = self.identity(name)?.ok_or_else(|| {
            RtdnError::parse_error(format!("struct {name}"), "no RT_<name>_ID constant defined")
        })?;

        let tag_suffix = format!("_{}", identity.id);
        let (data_fields, tag) = match def.fields.split_last() {
            Some((last, rest))
                if last.name.ends_with(&tag_suffix)
                    && last.field_type() == Some(FieldType::UInt32)
                    && last.count == 1 =>
            {
                (rest, Some(last.name.clone()))
            }
            _ => {
                warn!(
                    packet = name,
                    tag = %format!("{name}{tag_suffix}"),
                    "No identity tag member, appending implicit tag"
                );
                (def.fields.as_slice(), None)
            }
        };

        let mut builder = PacketLayout::builder(name, identity).version_label(def.version.clone());
        if let Some(file) = &def.file {
            builder = builder.source(file.clone());
        }
        if let Some(tag) = tag {
            builder = builder.tag_name(tag);
        }

        for field in data_fields {
            let field_type = field.field_type().ok_or_else(|| {
                RtdnError::parse_error(
                    format!("struct {name}"),
                    format!("field '{}' has non-fundamental type '{}'", field.name, field.type_name),
                )
            })?;
            builder = builder.commented(field.name.clone(), field_type, field.count, field.comment.clone());
        }

        builder.build()
    }

    /// Layouts for every struct that has an `ID` constant.
    pub fn layouts(&self) -> Result<Vec<PacketLayout>> {
        let mut layouts = Vec::new();
        for name in self.structs.keys() {
            if self.identity(name)?.is_none() {
                warn!(name = %name, "Struct has no identity constants, not a packet");
                continue;
            }
            layouts.push(self.layout(name)?);
        }
        Ok(layouts)
    }

    /// Register every packet layout into `builder`.
    pub fn register_into(&self, builder: RegistryBuilder) -> Result<RegistryBuilder> {
        builder.register_layouts(self.layouts()?)
    }

    /// A registry builder holding every packet layout, ready for more registrations.
    pub fn into_registry_builder(self) -> Result<RegistryBuilder> {
        self.register_into(RegistryBuilder::new())
    }
}

fn visit(
    name: &str,
    includes: &HashMap<&str, Vec<String>>,
    done: &mut BTreeSet<String>,
    visiting: &mut BTreeSet<String>,
    order: &mut Vec<String>,
) {
    if done.contains(name) {
        return;
    }
    if !visiting.insert(name.to_string()) {
        warn!(header = name, "Include cycle detected");
        return;
    }

    let mut targets: Vec<&String> = includes.get(name).map(|t| t.iter().collect()).unwrap_or_default();
    targets.sort();
    for target in targets {
        visit(target, includes, done, visiting, order);
    }

    visiting.remove(name);
    done.insert(name.to_string());
    order.push(name.to_string());
}
