//! 集成测试共用的存档夹具，全部通过本 crate 的写出端生成

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use mcconvert::java::JavaWriter;
use mcconvert::model::{
    Biome, BlockState, ChunkModel, ChunkPos, Dimension, Edition, EntityModel, GameRuleValue, PlayerData,
    RegionPos, SectionModel, WorldMetadata,
};
use mcconvert::schema::SchemaId;
use mcconvert::SchemaRegistry;
use walkdir::WalkDir;

pub const LEVEL_NAME: &str = "Fixture";
pub const SEED: i64 = 424242;

/// 石头地基、泥土地表，(3, 1, 3) 处一根 x 向橡木原木；可选地在 (5, 1, 5) 放一个额外方块
pub fn java_chunk(x: i32, z: i32, extra: Option<&str>) -> ChunkModel {
    let schema = SchemaRegistry::global().latest(Edition::Java).id;
    let plains = Biome::Named("minecraft:plains".to_string());
    let mut chunk = ChunkModel::new(Dimension::Overworld, ChunkPos::new(x, z), schema);
    for y in -4..=1 {
        let fill = if y < 0 {
            BlockState::new("minecraft:stone")
        } else {
            BlockState::air()
        };
        chunk.sections.push(SectionModel::filled(y, fill, plains.clone()));
    }
    let ground = &mut chunk.sections[4];
    for bx in 0..16 {
        for bz in 0..16 {
            ground.set_block(bx, 0, bz, BlockState::new("minecraft:dirt"));
        }
    }
    ground.set_block(3, 1, 3, BlockState::new("minecraft:oak_log").with_str("axis", "x"));
    if let Some(name) = extra {
        ground.set_block(5, 1, 5, BlockState::new(name));
    }
    if x == 0 && z == 0 {
        chunk.entities.push(EntityModel {
            id: "minecraft:pig".to_string(),
            pos: [8.5, 1.0, 8.5],
            rotation: [45.0, 0.0],
            custom_name: Some("Wilbur".to_string()),
            native: None,
        });
    }
    chunk
}

pub fn metadata() -> WorldMetadata {
    let mut game_rules = BTreeMap::new();
    game_rules.insert("keepInventory".to_string(), GameRuleValue::Bool(true));
    game_rules.insert("randomTickSpeed".to_string(), GameRuleValue::Int(3));
    WorldMetadata {
        level_name: LEVEL_NAME.to_string(),
        seed: SEED,
        spawn: [8, 1, 8],
        game_rules,
        ..WorldMetadata::default()
    }
}

pub fn player() -> PlayerData {
    PlayerData {
        dimension: Dimension::Overworld,
        pos: [8.5, 1.0, 8.5],
        rotation: [90.0, 0.0],
        native: None,
    }
}

/// 在 `root` 写一个最新 Java 版本的 2×2 区块存档
pub fn write_java_world(root: &Path, extra: Option<&str>) -> PathBuf {
    let schema = SchemaRegistry::global().latest(Edition::Java);
    let chunks: Vec<ChunkModel> = [(0, 0), (1, 0), (0, 1), (1, 1)]
        .iter()
        .map(|&(x, z)| java_chunk(x, z, extra))
        .collect();
    let mut writer = JavaWriter::create(root, schema, flate2::Compression::default()).unwrap();
    writer
        .write_region(Dimension::Overworld, RegionPos { x: 0, z: 0 }, &chunks)
        .unwrap();
    writer.finish(&metadata(), Some(&player())).unwrap();

    fs::create_dir_all(root.join("poi")).unwrap();
    fs::write(root.join("poi").join("r.0.0.mca"), [0u8; 16]).unwrap();
    fs::create_dir_all(root.join("data")).unwrap();
    fs::write(root.join("data").join("notes.txt"), "carried").unwrap();
    root.to_path_buf()
}

/// 每个维度的地面方块与高处标记的 y
pub fn dimension_layout(dimension: Dimension) -> (&'static str, i32) {
    match dimension {
        Dimension::Overworld => ("minecraft:stone", 250),
        Dimension::Nether => ("minecraft:netherrack", 200),
        Dimension::End => ("minecraft:end_stone", 180),
    }
}

/// 铺满 Java 高度范围的区块：最底层是地面方块，(2, 标记 y, 2) 处再放一个
pub fn layered_chunk(dimension: Dimension, x: i32, z: i32, schema: SchemaId) -> ChunkModel {
    let (floor, marker) = dimension_layout(dimension);
    let biome = Biome::Named(
        match dimension {
            Dimension::Overworld => "minecraft:plains",
            Dimension::Nether => "minecraft:nether_wastes",
            Dimension::End => "minecraft:the_end",
        }
        .to_string(),
    );
    let mut chunk = ChunkModel::new(dimension, ChunkPos::new(x, z), schema);
    for y in dimension.section_range(Edition::Java) {
        chunk.sections.push(SectionModel::filled(y, BlockState::air(), biome.clone()));
    }
    let bottom = &mut chunk.sections[0];
    for bx in 0..16 {
        for bz in 0..16 {
            bottom.set_block(bx, 0, bz, BlockState::new(floor));
        }
    }
    let top = marker.div_euclid(16) - *dimension.section_range(Edition::Java).start();
    chunk.sections[top as usize].set_block(2, marker.rem_euclid(16) as usize, 2, BlockState::new(floor));
    chunk
}

/// 按 (维度, region) 分组写出给定版本的 Java 存档
pub fn write_world(root: &Path, version: &str, chunks: Vec<ChunkModel>) -> PathBuf {
    let schema = SchemaRegistry::global().resolve(version, Edition::Java).unwrap();
    let mut regions: BTreeMap<(Dimension, i32, i32), Vec<ChunkModel>> = BTreeMap::new();
    for mut chunk in chunks {
        chunk.schema = schema.id;
        let region = chunk.pos.region();
        regions.entry((chunk.dimension, region.x, region.z)).or_default().push(chunk);
    }
    let mut writer = JavaWriter::create(root, schema, flate2::Compression::default()).unwrap();
    for ((dimension, x, z), chunks) in &regions {
        writer.write_region(*dimension, RegionPos { x: *x, z: *z }, chunks).unwrap();
    }
    writer.finish(&metadata(), Some(&player())).unwrap();
    root.to_path_buf()
}

/// 三个维度各两个区块
pub fn three_dimension_world(root: &Path, version: &str) -> PathBuf {
    let schema = SchemaRegistry::global().resolve(version, Edition::Java).unwrap().id;
    let chunks = Dimension::ALL
        .iter()
        .flat_map(|&d| [layered_chunk(d, 0, 0, schema), layered_chunk(d, 1, 0, schema)])
        .collect();
    write_world(root, version, chunks)
}

/// 相对路径 → 文件内容
pub fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_path_buf();
            (rel, fs::read(e.path()).unwrap())
        })
        .collect()
}

/// 目录下（不含子目录）的条目名
pub fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// 读出一个存档的全部区块
pub fn load_all(path: &Path, edition: Edition) -> Vec<ChunkModel> {
    let mut world = mcconvert::FormatReader::for_edition(edition)
        .read(path, &mcconvert::config::OutputConfig::default())
        .unwrap();
    let regions = world.regions.clone();
    let mut chunks = Vec::new();
    for region in &regions {
        chunks.extend(world.load_region(region).unwrap());
    }
    chunks.sort_by_key(|c| (c.dimension, c.pos.x, c.pos.z));
    chunks
}

/// 世界坐标处的方块；缺失的 section 视为空气
pub fn block_at(chunk: &ChunkModel, x: usize, y: i32, z: usize) -> BlockState {
    let section_y = y.div_euclid(16);
    match chunk.section(section_y) {
        Some(section) => section.block(x, y.rem_euclid(16) as usize, z).clone(),
        None => BlockState::air(),
    }
}
