//! level.dat 读写（gzip 压缩的大端 NBT）

use anyhow::{bail, Context, Result};
use fastnbt::Value;
use flate2::read::GzDecoder;
use flate2::GzBuilder;
use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use crate::model::{Dimension, Edition, GameRuleValue, NativeTags, PlayerData, WorldMetadata};
use crate::nbt::{self, Compound};
use crate::schema::cross::GAME_RULES;
use crate::schema::Schema;

pub const LEVEL_DAT: &str = "level.dat";

/// 由 level.dat 读出的内容
#[derive(Debug, Clone)]
pub struct LevelDat {
    pub data_version: Option<i32>,
    pub metadata: WorldMetadata,
    pub player: Option<PlayerData>,
}

pub fn read_gzip_nbt(path: &Path) -> Result<Value> {
    let raw = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mut decoder = GzDecoder::new(raw.as_slice());
    let mut data = Vec::new();
    decoder
        .read_to_end(&mut data)
        .with_context(|| format!("{} is not gzip compressed", path.display()))?;
    nbt::from_bytes(&data)
}

/// 写出 gzip NBT；头部时间戳固定为 0，相同内容得到相同字节
pub fn write_gzip_nbt(path: &Path, value: &Value, compression: flate2::Compression) -> Result<()> {
    let bytes = nbt::to_bytes(value)?;
    let mut encoder = GzBuilder::new().mtime(0).write(Vec::new(), compression);
    encoder.write_all(&bytes)?;
    fs::write(path, encoder.finish()?)?;
    Ok(())
}

fn parse_rule(raw: &str) -> Option<GameRuleValue> {
    match raw {
        "true" => Some(GameRuleValue::Bool(true)),
        "false" => Some(GameRuleValue::Bool(false)),
        other => other.parse().ok().map(GameRuleValue::Int),
    }
}

fn read_player(map: &Compound) -> Option<PlayerData> {
    let pos = nbt::get_f64s::<3>(map, "Pos")?;
    let rotation = nbt::get_f64s::<2>(map, "Rotation").unwrap_or([0.0; 2]);
    let dimension = match map.get("Dimension") {
        Some(Value::String(name)) => Dimension::from_java_name(name).unwrap_or(Dimension::Overworld),
        // 1.16 之前的整数维度
        Some(other) => match nbt::as_i64(other) {
            Some(-1) => Dimension::Nether,
            Some(1) => Dimension::End,
            _ => Dimension::Overworld,
        },
        None => Dimension::Overworld,
    };
    Some(PlayerData {
        dimension,
        pos,
        rotation: [rotation[0] as f32, rotation[1] as f32],
        native: Some(NativeTags::new(Edition::Java, map.clone())),
    })
}

pub fn read_level_dat(path: &Path) -> Result<LevelDat> {
    let root = read_gzip_nbt(path)?;
    let Some(data) = nbt::compound(&root).and_then(|r| nbt::get_compound(r, "Data")) else {
        bail!("level.dat has no Data compound");
    };

    let seed = nbt::get_compound(data, "WorldGenSettings")
        .and_then(|w| nbt::get_i64(w, "seed"))
        .or_else(|| nbt::get_i64(data, "RandomSeed"))
        .unwrap_or(0);

    let game_rules: BTreeMap<String, GameRuleValue> = nbt::get_compound(data, "GameRules")
        .map(|rules| {
            rules
                .iter()
                .filter_map(|(k, v)| match v {
                    Value::String(s) => parse_rule(s).map(|r| (k.clone(), r)),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    let mut native = data.clone();
    native.remove("Player");

    let metadata = WorldMetadata {
        level_name: nbt::get_str(data, "LevelName").unwrap_or("world").to_string(),
        seed,
        spawn: [
            nbt::get_i32(data, "SpawnX").unwrap_or(0),
            nbt::get_i32(data, "SpawnY").unwrap_or(64),
            nbt::get_i32(data, "SpawnZ").unwrap_or(0),
        ],
        game_type: nbt::get_i32(data, "GameType").unwrap_or(0),
        game_rules,
        time: nbt::get_i64(data, "Time").unwrap_or(0),
        last_played: nbt::get_i64(data, "LastPlayed").unwrap_or(0),
        native: Some(NativeTags::new(Edition::Java, native)),
    };

    Ok(LevelDat {
        data_version: nbt::get_i32(data, "DataVersion"),
        metadata,
        player: nbt::get_compound(data, "Player").and_then(read_player),
    })
}

fn noise_dimension(generator_settings: &str, biome_source: Value) -> Value {
    let mut generator = Compound::new();
    generator.insert("type".to_string(), nbt::string("minecraft:noise"));
    generator.insert("settings".to_string(), nbt::string(generator_settings));
    generator.insert("biome_source".to_string(), biome_source);
    let mut dim = Compound::new();
    dim.insert("generator".to_string(), Value::Compound(generator));
    Value::Compound(dim)
}

fn biome_source(kind: &str, preset: Option<&str>) -> Value {
    let mut map = Compound::new();
    map.insert("type".to_string(), nbt::string(kind));
    if let Some(preset) = preset {
        map.insert("preset".to_string(), nbt::string(preset));
    }
    Value::Compound(map)
}

/// 跨版本族时使用的最小 Data 骨架
fn skeleton(metadata: &WorldMetadata) -> Compound {
    let mut dimensions = Compound::new();
    let overworld = noise_dimension(
        "minecraft:overworld",
        biome_source("minecraft:multi_noise", Some("minecraft:overworld")),
    );
    let nether = noise_dimension(
        "minecraft:nether",
        biome_source("minecraft:multi_noise", Some("minecraft:nether")),
    );
    let end = noise_dimension("minecraft:end", biome_source("minecraft:the_end", None));
    for (dim, mut value) in [
        (Dimension::Overworld, overworld),
        (Dimension::Nether, nether),
        (Dimension::End, end),
    ] {
        if let Value::Compound(map) = &mut value {
            map.insert("type".to_string(), nbt::string(dim.java_name()));
        }
        dimensions.insert(dim.java_name().to_string(), value);
    }

    let mut world_gen = Compound::new();
    world_gen.insert("seed".to_string(), Value::Long(metadata.seed));
    world_gen.insert("generate_features".to_string(), Value::Byte(1));
    world_gen.insert("bonus_chest".to_string(), Value::Byte(0));
    world_gen.insert("dimensions".to_string(), Value::Compound(dimensions));

    let mut data_packs = Compound::new();
    data_packs.insert("Enabled".to_string(), Value::List(vec![nbt::string("vanilla")]));
    data_packs.insert("Disabled".to_string(), Value::List(Vec::new()));

    let mut data = Compound::new();
    data.insert("version".to_string(), Value::Int(19133));
    data.insert("Difficulty".to_string(), Value::Byte(2));
    data.insert("allowCommands".to_string(), Value::Byte(0));
    data.insert("hardcore".to_string(), Value::Byte(0));
    data.insert("initialized".to_string(), Value::Byte(1));
    data.insert("raining".to_string(), Value::Byte(0));
    data.insert("thundering".to_string(), Value::Byte(0));
    data.insert("rainTime".to_string(), Value::Int(0));
    data.insert("thunderTime".to_string(), Value::Int(0));
    data.insert("clearWeatherTime".to_string(), Value::Int(0));
    data.insert("WorldGenSettings".to_string(), Value::Compound(world_gen));
    data.insert("DataPacks".to_string(), Value::Compound(data_packs));
    data
}

fn write_player(player: &PlayerData, game_type: i32) -> Value {
    let mut map = NativeTags::for_edition(&player.native, Edition::Java)
        .cloned()
        .unwrap_or_else(|| {
            let mut fresh = Compound::new();
            fresh.insert("Health".to_string(), Value::Float(20.0));
            fresh.insert("foodLevel".to_string(), Value::Int(20));
            fresh.insert("playerGameType".to_string(), Value::Int(game_type));
            fresh.insert("Inventory".to_string(), Value::List(Vec::new()));
            fresh
        });
    map.insert("Pos".to_string(), nbt::doubles(&player.pos));
    map.insert("Rotation".to_string(), nbt::floats(&player.rotation));
    map.insert("Dimension".to_string(), nbt::string(player.dimension.java_name()));
    Value::Compound(map)
}

/// 生成目标版本的 Data 复合标签
pub fn build_level_data(metadata: &WorldMetadata, player: Option<&PlayerData>, schema: &Schema) -> Compound {
    let mut data = match NativeTags::for_edition(&metadata.native, Edition::Java) {
        Some(native) => native.clone(),
        None => skeleton(metadata),
    };

    let mut version = Compound::new();
    version.insert("Id".to_string(), Value::Int(schema.data_version));
    version.insert("Name".to_string(), nbt::string(schema.name));
    version.insert("Series".to_string(), nbt::string("main"));
    version.insert("Snapshot".to_string(), Value::Byte(0));

    data.insert("DataVersion".to_string(), Value::Int(schema.data_version));
    data.insert("Version".to_string(), Value::Compound(version));
    data.insert("LevelName".to_string(), nbt::string(&metadata.level_name));
    data.insert("SpawnX".to_string(), Value::Int(metadata.spawn[0]));
    data.insert("SpawnY".to_string(), Value::Int(metadata.spawn[1]));
    data.insert("SpawnZ".to_string(), Value::Int(metadata.spawn[2]));
    data.insert("GameType".to_string(), Value::Int(metadata.game_type));
    data.insert("Time".to_string(), Value::Long(metadata.time));
    data.insert("DayTime".to_string(), Value::Long(metadata.time));
    data.insert("LastPlayed".to_string(), Value::Long(metadata.last_played));

    let mut rules = match data.remove("GameRules") {
        Some(Value::Compound(existing)) => existing,
        _ => Compound::new(),
    };
    for (name, value) in &metadata.game_rules {
        if GAME_RULES.contains(&name.as_str()) || rules.contains_key(name) {
            rules.insert(name.clone(), nbt::string(value.to_string()));
        }
    }
    data.insert("GameRules".to_string(), Value::Compound(rules));

    match player {
        Some(player) => {
            data.insert("Player".to_string(), write_player(player, metadata.game_type));
        }
        None => {
            data.remove("Player");
        }
    }
    data
}

pub fn write_level_dat(
    path: &Path,
    metadata: &WorldMetadata,
    player: Option<&PlayerData>,
    schema: &Schema,
    compression: flate2::Compression,
) -> Result<()> {
    let mut root = Compound::new();
    root.insert(
        "Data".to_string(),
        Value::Compound(build_level_data(metadata, player, schema)),
    );
    write_gzip_nbt(path, &Value::Compound(root), compression)
}
