mod common;

use std::fs;

use std::path::Path;

use common::{
    block_at, dimension_layout, entries, java_chunk, load_all, snapshot, three_dimension_world,
    write_java_world, write_world,
};
use mcconvert::model::{BlockState, Dimension, Edition};
use mcconvert::{Config, Engine, FormatReader, SchemaRegistry};

fn engine() -> Engine {
    Engine::new(Config::default())
}

fn quiet() -> impl FnMut(&str) {
    |_: &str| {}
}

#[test]
fn same_schema_without_repair_copies_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_java_world(&dir.path().join("in"), None);
    let output = dir.path().join("out");

    let result = engine().convert_world(&input, &output, "java-to-java", None, false, &mut quiet());
    assert!(result.success, "{}", result.message);
    assert_eq!(snapshot(&input), snapshot(&output));
}

#[test]
fn repair_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_java_world(&dir.path().join("in"), None);
    let first = dir.path().join("first");
    let second = dir.path().join("second");

    let result = engine().convert_world(&input, &first, "java-to-java", None, true, &mut quiet());
    assert!(result.success, "{}", result.message);
    let result = engine().convert_world(&first, &second, "java-to-java", None, true, &mut quiet());
    assert!(result.success, "{}", result.message);

    assert!(!first.join("poi").exists());
    assert!(first.join("data").join("notes.txt").is_file());
    assert_eq!(snapshot(&first), snapshot(&second));
}

#[test]
fn bedrock_repair_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_java_world(&dir.path().join("in"), None);
    let bedrock = dir.path().join("bedrock");
    let first = dir.path().join("first");
    let second = dir.path().join("second");

    let result = engine().convert_world(&input, &bedrock, "java-to-bedrock", None, false, &mut quiet());
    assert!(result.success, "{}", result.message);
    let result = engine().convert_world(&bedrock, &first, "bedrock-to-bedrock", None, true, &mut quiet());
    assert!(result.success, "{}", result.message);
    let result = engine().convert_world(&first, &second, "bedrock-to-bedrock", None, true, &mut quiet());
    assert!(result.success, "{}", result.message);

    for name in ["LOG", "LOG.old", "LOCK"] {
        assert!(!first.join("db").join(name).exists(), "{}", name);
    }
    assert_eq!(snapshot(&first), snapshot(&second));
}

/// 三个维度的地面与高处标记都在，且区块属于目标版本
fn assert_layers_survive(world: &Path, version: &str) {
    let schema = SchemaRegistry::global().resolve(version, Edition::Java).unwrap().id;
    let chunks = load_all(world, Edition::Java);
    for dimension in Dimension::ALL {
        let (floor, marker) = dimension_layout(dimension);
        let floor = BlockState::new(floor);
        let in_dimension: Vec<_> = chunks.iter().filter(|c| c.dimension == dimension).collect();
        assert_eq!(in_dimension.len(), 2, "{}", dimension);
        for chunk in in_dimension {
            assert_eq!(chunk.schema, schema);
            assert_eq!(block_at(chunk, 7, dimension.min_y(), 7), floor, "{} floor", dimension);
            assert_eq!(block_at(chunk, 2, marker, 2), floor, "{} y={}", dimension, marker);
            assert!(block_at(chunk, 3, marker, 3).is_air());
        }
    }
}

#[test]
fn upgrade_keeps_every_dimension_intact() {
    let dir = tempfile::tempdir().unwrap();
    let input = three_dimension_world(&dir.path().join("in"), "1.18.2");
    let output = dir.path().join("out");

    let result = engine().convert_world(&input, &output, "java-to-java", Some("1.21.4"), false, &mut quiet());
    assert!(result.success, "{}", result.message);
    assert!(!result.message.contains("out-of-range"), "{}", result.message);
    assert_layers_survive(&output, "1.21.4");
}

#[test]
fn downgrade_keeps_every_dimension_intact() {
    let dir = tempfile::tempdir().unwrap();
    let input = three_dimension_world(&dir.path().join("in"), "1.21.4");
    let output = dir.path().join("out");

    let result = engine().convert_world(&input, &output, "java-to-java", Some("1.18.2"), false, &mut quiet());
    assert!(result.success, "{}", result.message);
    assert!(!result.message.contains("out-of-range"), "{}", result.message);
    assert_layers_survive(&output, "1.18.2");
}

#[test]
fn bedrock_upgrade_flattens_legacy_blocks() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_java_world(&dir.path().join("in"), None);
    let old = dir.path().join("old");
    let new = dir.path().join("new");
    let back = dir.path().join("back");
    let registry = SchemaRegistry::global();

    let result = engine().convert_world(&input, &old, "java-to-bedrock", Some("1.18.30"), false, &mut quiet());
    assert!(result.success, "{}", result.message);
    let world = FormatReader::Bedrock.read(&old, &Default::default()).unwrap();
    assert_eq!(world.schema, registry.resolve("1.18.30", Edition::Bedrock).unwrap().id);
    let legacy = load_all(&old, Edition::Bedrock);
    assert_eq!(block_at(&legacy[0], 3, 1, 3).name, "minecraft:log");
    assert!(block_at(&legacy[0], 0, -60, 0).properties.contains_key("stone_type"));

    let result = engine().convert_world(&old, &new, "bedrock-to-bedrock", None, false, &mut quiet());
    assert!(result.success, "{}", result.message);
    let current = load_all(&new, Edition::Bedrock);
    assert_eq!(current.len(), legacy.len());
    for chunk in &current {
        assert_eq!(chunk.schema, registry.latest(Edition::Bedrock).id);
        assert_eq!(block_at(chunk, 3, 1, 3).name, "minecraft:oak_log");
        assert_eq!(block_at(chunk, 0, -60, 0), BlockState::new("minecraft:stone"));
    }

    let result = engine().convert_world(&new, &back, "bedrock-to-java", None, false, &mut quiet());
    assert!(result.success, "{}", result.message);
    let original = load_all(&input, Edition::Java);
    let returned = load_all(&back, Edition::Java);
    assert_eq!(original.len(), returned.len());
    for (a, b) in original.iter().zip(&returned) {
        for (x, y, z) in [(0, -60, 0), (4, 0, 4), (3, 1, 3)] {
            assert_eq!(block_at(a, x, y, z), block_at(b, x, y, z), "({}, {}, {})", x, y, z);
        }
    }
}

#[test]
fn java_bedrock_java_keeps_blocks_and_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_java_world(&dir.path().join("in"), None);
    let bedrock = dir.path().join("bedrock");
    let back = dir.path().join("back");

    let result = engine().convert_world(&input, &bedrock, "java-to-bedrock", None, false, &mut quiet());
    assert!(result.success, "{}", result.message);
    assert!(bedrock.join("db").join("CURRENT").is_file());
    assert!(bedrock.join("levelname.txt").is_file());

    let result = engine().convert_world(&bedrock, &back, "bedrock-to-java", None, false, &mut quiet());
    assert!(result.success, "{}", result.message);

    let original = load_all(&input, Edition::Java);
    let returned = load_all(&back, Edition::Java);
    assert_eq!(original.len(), returned.len());
    for (a, b) in original.iter().zip(&returned) {
        assert_eq!(a.pos, b.pos);
        for (x, y, z) in [(0, -60, 0), (7, -1, 9), (4, 0, 4), (3, 1, 3), (10, 20, 10)] {
            assert_eq!(block_at(a, x, y, z), block_at(b, x, y, z), "({}, {}, {}) in {:?}", x, y, z, a.pos);
        }
        assert_eq!(a.entities.len(), b.entities.len());
    }
    assert_eq!(
        block_at(&returned[0], 3, 1, 3),
        BlockState::new("minecraft:oak_log").with_str("axis", "x")
    );
    let pig = &returned[0].entities[0];
    assert_eq!(pig.id, "minecraft:pig");
    assert_eq!(pig.custom_name.as_deref(), Some("Wilbur"));

    let world = FormatReader::Java.read(&back, &Default::default()).unwrap();
    assert_eq!(world.metadata.level_name, common::LEVEL_NAME);
    assert_eq!(world.metadata.seed, common::SEED);
    assert_eq!(world.metadata.game_rules, common::metadata().game_rules);
    let player = world.player.expect("player survives the round trip");
    assert!((player.pos[1] - common::player().pos[1]).abs() < 1e-3);
}

#[test]
fn unmapped_block_is_reported_once() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_java_world(&dir.path().join("in"), Some("examplemod:gizmo"));
    let output = dir.path().join("out");

    let mut lines = Vec::new();
    let result = engine().convert_world(
        &input,
        &output,
        "java-to-bedrock",
        None,
        false,
        &mut |line: &str| lines.push(line.to_string()),
    );
    assert!(result.success, "{}", result.message);
    assert!(result.message.contains("1 unmapped block type(s) defaulted"), "{}", result.message);
    let notices = lines.iter().filter(|l| l.contains("examplemod:gizmo")).count();
    assert_eq!(notices, 1);

    for chunk in load_all(&output, Edition::Bedrock) {
        assert_eq!(block_at(&chunk, 5, 1, 5), BlockState::new("minecraft:stone"));
    }
}

#[test]
fn cancelled_run_leaves_destination_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_java_world(&dir.path().join("in"), None);
    let output = dir.path().join("out");
    fs::create_dir_all(&output).unwrap();
    fs::write(output.join("keep.txt"), "previous").unwrap();

    let engine = engine();
    engine.cancel.cancel();
    let result = engine.convert_world(&input, &output, "java-to-bedrock", None, false, &mut quiet());
    assert!(!result.success);
    assert!(result.message.contains("cancelled"), "{}", result.message);
    assert_eq!(entries(&output), vec!["keep.txt"]);
    assert_eq!(entries(dir.path()), vec!["in", "out"]);
}

#[test]
fn cancelling_mid_write_leaves_destination_untouched() {
    let dir = tempfile::tempdir().unwrap();
    // 第二个 region 里的未知方块触发取消，此时第一个 region 已写入暂存目录
    let chunks = vec![
        java_chunk(0, 0, None),
        java_chunk(1, 0, None),
        java_chunk(32, 0, Some("examplemod:gizmo")),
        java_chunk(33, 0, None),
    ];
    let input = write_world(&dir.path().join("in"), "1.21.4", chunks);
    let output = dir.path().join("out");
    fs::create_dir_all(&output).unwrap();
    fs::write(output.join("keep.txt"), "previous").unwrap();

    let engine = engine();
    let token = engine.cancel.clone();
    let mut lines = Vec::new();
    let result = engine.convert_world(&input, &output, "java-to-bedrock", None, false, &mut |line: &str| {
        if line.contains("examplemod:gizmo") {
            token.cancel();
        }
        lines.push(line.to_string());
    });
    assert!(!result.success);
    assert!(result.message.contains("cancelled"), "{}", result.message);
    assert!(lines.iter().any(|l| l.starts_with("Writing")));
    assert_eq!(entries(&output), vec!["keep.txt"]);
    assert_eq!(fs::read_to_string(output.join("keep.txt")).unwrap(), "previous");
    assert_eq!(entries(dir.path()), vec!["in", "out"]);
}

#[test]
fn unknown_target_version_fails_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_java_world(&dir.path().join("in"), None);
    let output = dir.path().join("out");

    let result = engine().convert_world(&input, &output, "java-to-bedrock", Some("9.9.9"), false, &mut quiet());
    assert!(!result.success);
    assert!(result.message.contains("9.9.9"));
    assert!(!output.exists());
}

#[test]
fn invalid_direction_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let result = engine().convert_world(
        dir.path(),
        &dir.path().join("out"),
        "java-to-console",
        None,
        false,
        &mut quiet(),
    );
    assert!(!result.success);
    assert!(result.message.contains("java-to-console"));
}

#[test]
fn batch_isolates_failures() {
    let dir = tempfile::tempdir().unwrap();
    let good_a = write_java_world(&dir.path().join("a").join("world"), None);
    let broken = dir.path().join("b").join("world");
    fs::create_dir_all(broken.join("region")).unwrap();
    fs::write(broken.join("level.dat"), b"not gzip").unwrap();
    let good_c = write_java_world(&dir.path().join("c").join("world"), None);
    let out = dir.path().join("out");

    let result = engine().convert_batch(
        &[good_a, broken, good_c],
        &out,
        "java-to-bedrock",
        None,
        false,
        &mut quiet(),
    );
    assert!(!result.success);
    let details = result.details.expect("batch results carry details");
    assert_eq!(details.len(), 3);
    assert_eq!(
        details.iter().map(|d| d.success).collect::<Vec<_>>(),
        vec![true, false, true]
    );
    assert!(details[1].message.contains("not a Java world"), "{}", details[1].message);
    assert!(out.join("world").join("level.dat").is_file());
    assert!(!out.join("world_2").exists());
    assert!(out.join("world_3").join("level.dat").is_file());
}

#[test]
fn empty_batch_fails() {
    let dir = tempfile::tempdir().unwrap();
    let result = engine().convert_batch(&[], &dir.path().join("out"), "java-to-bedrock", None, false, &mut quiet());
    assert!(!result.success);
    assert!(result.details.is_none());
    assert!(!dir.path().join("out").exists());
}
