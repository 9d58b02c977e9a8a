//! Loading the sample generated headers and decoding through the resulting registry.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, ensure};
use rtdn::{
    ByteOrder, DynamicPacket, ErrorKind, FieldType, Packet, PacketCodec, PacketKind, PacketRegistry, Test1, Test2,
    Test3, TypeDb,
};

fn header_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test-data").join("headers")
}

fn load_db() -> Result<TypeDb> {
    let _ = tracing_subscriber::fmt::try_init();
    let mut db = TypeDb::new()?;
    db.load_dir(header_dir()).context("loading test-data/headers")?;
    Ok(db)
}

#[test]
fn constants_from_every_header() -> Result<()> {
    let db = load_db()?;

    assert_eq!(db.constant("RT_test1_PVC"), Some(488));
    assert_eq!(db.constant("RT_test2_ID"), Some(488000002));
    assert_eq!(db.constant("TEST3_test3_METADATA"), Some(7));
    assert_eq!(db.constant("RTPS_STAT_BAD"), Some(0x10));
    assert_eq!(db.files().len(), 4);

    let comment = &db.definitions()["RTPS_STAT_NORMAL"].comment;
    ensure!(comment.contains("normal running mode"), "unexpected comment {comment:?}");
    Ok(())
}

#[test]
fn header_layouts_match_typed_records() -> Result<()> {
    let db = load_db()?;

    let expected = [Test1::layout()?, Test2::layout()?, Test3::layout()?];
    for typed in expected {
        let parsed = db.layout(&typed.name)?;
        ensure!(parsed.wire_compatible(&typed), "{} differs from its header", typed.name);
        assert_eq!(parsed.size, typed.size);
        assert_eq!(parsed.identity, typed.identity);
    }
    Ok(())
}

#[test]
fn version_labels_come_from_file_names() -> Result<()> {
    let db = load_db()?;

    assert_eq!(db.layout("test1")?.version_label.as_deref(), Some("2_2"));
    assert_eq!(db.layout("test3")?.version_label.as_deref(), Some("5_7"));
    assert_eq!(db.get_struct("test3")?.version, "5_7");
    Ok(())
}

#[test]
fn test2_header_gets_an_implicit_tag() -> Result<()> {
    let db = load_db()?;

    let layout = db.layout("test2")?;
    assert_eq!(layout.size, 12);
    assert_eq!(layout.field_count(), 3);
    let tag = layout.tag_field().context("layout without tag")?;
    assert_eq!(tag.name, "test2_488000002");
    assert_eq!(tag.field_type, FieldType::UInt32);
    assert_eq!(tag.offset, 8);

    let test1 = db.layout("test1")?;
    assert_eq!(test1.tag_field().map(|f| f.name.as_str()), Some("test1Pkt_488000002"));
    Ok(())
}

#[test]
fn header_only_registry_decodes_dynamically() -> Result<()> {
    let registry = load_db()?.into_registry_builder()?.build();
    assert_eq!(registry.len(), 3);

    let bytes = Test1 { sequence_no: 5, freq: 50.0, dev_hz: 0.25, ..Default::default() }.encode();
    let Packet::Dynamic(packet) = registry.decode(&bytes)? else {
        anyhow::bail!("expected a dynamic packet");
    };
    assert_eq!(packet.layout().name, "test1");
    assert_eq!(packet.sequence_no(), Some(5));
    assert_eq!(packet.f32("freq"), Some(50.0));
    assert_eq!(packet.f32("devHz"), Some(0.25));

    let short = Test2 { sequence_no: 6, sample_time: 60 }.encode();
    assert_eq!(&*registry.identify(&short)?.name, "test2");
    assert_eq!(registry.decode(&short)?.sample_time(), Some(60));
    Ok(())
}

#[test]
fn builtin_types_win_over_identical_headers() -> Result<()> {
    let db = load_db()?;
    let registry = db.register_into(PacketRegistry::builder().with_builtin()?)?.build();

    assert_eq!(registry.len(), 3);
    let kinds: Vec<PacketKind> = registry.tags().map(|tag| tag.kind).collect();
    assert_eq!(kinds, [PacketKind::Test1, PacketKind::Test2, PacketKind::Test3]);

    let bytes = Test3 { sequence_no: 3, ..Default::default() }.encode();
    assert!(matches!(registry.decode(&bytes)?, Packet::Test3(_)));
    Ok(())
}

#[test]
fn header_with_new_type_extends_builtin_registry() -> Result<()> {
    let mut db = load_db()?;
    db.load_str(
        r#"
        #define RT_test9_PVC 416
        #define RT_test9_ID 416000009
        #define RT_test9_VERSION 1
        #define TEST9_test9_METADATA 1
        #define TEST9_SAMPLES 4

        typedef struct {
            uint32 sequenceNo;
            uint32 sampleTime;
            BitField rtpsStatus;      /* RTPS_STAT_* flags */
            float32 samples[TEST9_SAMPLES];
            uint32 test9_416000009;
        } test9;
        "#,
        None,
    )?;

    let registry = db.register_into(PacketRegistry::builder().with_builtin()?)?.build();
    assert_eq!(registry.len(), 4);

    let layout = Arc::new(registry.layout("test9").context("test9 not registered")?.clone());
    assert_eq!(layout.size, 32);
    assert_eq!(layout.field("rtpsStatus").map(|f| f.comment.as_str()), Some("RTPS_STAT_* flags"));

    let packet = DynamicPacket::builder(Arc::clone(&layout))
        .set("sequenceNo", 11u32)?
        .set("rtpsStatus", 0x01u32)?
        .set("samples", vec![1.0f32, 2.0, 3.0, 4.0])?
        .build(ByteOrder::Native);

    let decoded = registry.decode_dynamic(packet.as_bytes())?;
    assert_eq!(decoded.sequence_no(), Some(11));
    assert_eq!(decoded.get_array::<f32>("samples")?, vec![1.0, 2.0, 3.0, 4.0]);
    assert_eq!(decoded.tag(), 416000009);
    Ok(())
}

#[test]
fn non_packet_structs_are_skipped() -> Result<()> {
    let mut db = load_db()?;
    db.load_str("typedef struct { uint32 a; } helper;", None)?;

    let layouts = db.layouts()?;
    assert_eq!(layouts.len(), 3);
    assert_eq!(db.layout("helper").unwrap_err().kind(), ErrorKind::Parse);
    Ok(())
}
