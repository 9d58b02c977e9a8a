//! Building registries from YAML configuration files.

use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use rtdn::{ByteOrder, ErrorKind, Packet, PacketCodec, RtdnConfig, Test1, Test3};

fn scratch_dir(name: &str) -> Result<PathBuf> {
    let dir = std::env::temp_dir().join(format!("rtdn-{name}-{}", std::process::id()));
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn header_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test-data").join("headers")
}

#[test]
fn config_file_builds_a_big_endian_registry() -> Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let dir = scratch_dir("big-endian")?;
    let path = dir.join("rtdn.yaml");
    fs::write(
        &path,
        format!("byte_order: big\ninclude_builtin: false\ntype_dirs:\n  - {}\n", header_dir().display()),
    )?;

    let config = RtdnConfig::load(&path)?;
    assert_eq!(config.byte_order, ByteOrder::Big);

    let registry = config.build_registry()?;
    assert_eq!(registry.byte_order(), ByteOrder::Big);
    assert_eq!(registry.len(), 3);

    let bytes = Test3 { sequence_no: 77, ..Default::default() }.encode_with(ByteOrder::Big);
    let Packet::Dynamic(packet) = registry.decode(&bytes)? else {
        anyhow::bail!("header-only registry should decode dynamically");
    };
    assert_eq!(packet.sequence_no(), Some(77));

    fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn relative_header_files_resolve_next_to_the_config() -> Result<()> {
    let dir = scratch_dir("relative")?;
    fs::copy(header_dir().join("test1_2_2.h"), dir.join("test1_2_2.h"))?;
    let path = dir.join("rtdn.yaml");
    fs::write(&path, "include_builtin: true\nheader_files: [test1_2_2.h]\n")?;

    let registry = RtdnConfig::load(&path)?.build_registry()?;
    assert_eq!(registry.len(), 3);

    let bytes = Test1 { sequence_no: 1, ..Default::default() }.encode();
    assert!(matches!(registry.decode(&bytes)?, Packet::Test1(_)));

    fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn missing_header_dir_is_a_file_error() -> Result<()> {
    let config = RtdnConfig::from_yaml_str("type_dirs: [/nonexistent/rtdn/types]\n")?;
    let err = config.build_registry().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::File);
    Ok(())
}
