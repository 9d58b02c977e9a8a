//! YAML configuration for building a [`PacketRegistry`].
//!
//! ```yaml
//! byte_order: little
//! include_builtin: true
//! type_dirs:
//!   - /opt/rtdn/types
//! header_files:
//!   - extra/test9_1_1.h
//! ```
//!
//! Every key is optional. Relative paths in a file loaded with
//! [`RtdnConfig::load`] are resolved against the directory of that file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::header::TypeDb;
use crate::registry::{PacketRegistry, RegistryBuilder};
use crate::types::ByteOrder;
use crate::{Result, RtdnError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RtdnConfig {
    /// Byte order of every packet on the wire
    pub byte_order: ByteOrder,
    /// Register the built-in typed records before any header layouts
    pub include_builtin: bool,
    /// Directories whose `.h` files are all loaded
    pub type_dirs: Vec<PathBuf>,
    /// Individual header files, loaded after the directories
    pub header_files: Vec<PathBuf>,
}

impl Default for RtdnConfig {
    fn default() -> Self {
        Self {
            byte_order: ByteOrder::Native,
            include_builtin: true,
            type_dirs: Vec::new(),
            header_files: Vec::new(),
        }
    }
}

impl RtdnConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml_ng::from_str(yaml).map_err(|e| RtdnError::Config {
            details: format!("YAML parsing failed: {}", e),
        })
    }

    /// Read a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| RtdnError::file_error(path.to_path_buf(), err))?;
        let mut config = Self::from_yaml_str(&text)?;

        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        debug!(path = %path.display(), ?config, "Loaded configuration");
        Ok(config)
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        for path in self.type_dirs.iter_mut().chain(self.header_files.iter_mut()) {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    /// Load the configured headers and freeze everything into a registry.
    pub fn build_registry(&self) -> Result<PacketRegistry> {
        let mut builder = RegistryBuilder::new().byte_order(self.byte_order);
        if self.include_builtin {
            builder = builder.with_builtin()?;
        }

        if !self.type_dirs.is_empty() || !self.header_files.is_empty() {
            let mut db = TypeDb::new()?;
            for dir in &self.type_dirs {
                db.load_dir(dir)?;
            }
            for file in &self.header_files {
                db.load_file(file)?;
            }
            builder = db.register_into(builder)?;
        }

        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn empty_document_uses_defaults() {
        let config = RtdnConfig::from_yaml_str("").unwrap();
        assert_eq!(config, RtdnConfig::default());
        assert!(config.include_builtin);
        assert_eq!(config.byte_order, ByteOrder::Native);
    }

    #[test]
    fn parses_every_key() {
        let config = RtdnConfig::from_yaml_str(
            "byte_order: big\ninclude_builtin: false\ntype_dirs: [types]\nheader_files: [a.h, b.h]\n",
        )
        .unwrap();

        assert_eq!(config.byte_order, ByteOrder::Big);
        assert!(!config.include_builtin);
        assert_eq!(config.type_dirs, vec![PathBuf::from("types")]);
        assert_eq!(config.header_files.len(), 2);
    }

    #[test]
    fn rejects_unknown_keys_and_orders() {
        let err = RtdnConfig::from_yaml_str("byte_order: middle\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);

        let err = RtdnConfig::from_yaml_str("bogus: 1\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn relative_paths_follow_the_config_file() {
        let mut config = RtdnConfig {
            type_dirs: vec![PathBuf::from("types"), PathBuf::from("/abs/types")],
            ..Default::default()
        };
        config.resolve_relative_to(Path::new("/etc/rtdn"));
        assert_eq!(config.type_dirs[0], PathBuf::from("/etc/rtdn/types"));
        assert_eq!(config.type_dirs[1], PathBuf::from("/abs/types"));
    }

    #[test]
    fn builtin_only_registry() {
        let registry = RtdnConfig::default().build_registry().unwrap();
        assert_eq!(registry.len(), 3);
        assert!(registry.contains("test3"));

        let empty = RtdnConfig { include_builtin: false, ..Default::default() }.build_registry().unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn missing_config_file_is_a_file_error() {
        let err = RtdnConfig::load("/nonexistent/rtdn.yaml").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::File);
    }
}
