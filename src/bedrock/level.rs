//! Bedrock level.dat（8 字节头 + 小端 NBT）与本地玩家记录

use anyhow::{bail, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use fastnbt::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::Cursor;
use std::path::Path;

use crate::model::{Dimension, Edition, GameRuleValue, NativeTags, PlayerData, WorldMetadata};
use crate::nbt::{self, Compound};
use crate::nbt_le;
use crate::schema::catalog::BEDROCK_STORAGE_VERSION;
use crate::schema::cross::GAME_RULES;
use crate::schema::Schema;

pub const LEVEL_DAT: &str = "level.dat";
pub const LEVELNAME_TXT: &str = "levelname.txt";

/// Bedrock 玩家坐标是视线高度
pub const EYE_HEIGHT: f64 = 1.62;

#[derive(Debug, Clone)]
pub struct BedrockLevel {
    /// lastOpenedWithVersion 的前三位
    pub version: Option<[i32; 3]>,
    pub metadata: WorldMetadata,
}

/// Bedrock 全小写规则名还原为 Java 驼峰名
fn java_rule_name(bedrock: &str) -> String {
    GAME_RULES
        .iter()
        .find(|name| name.eq_ignore_ascii_case(bedrock))
        .map(|name| name.to_string())
        .unwrap_or_else(|| bedrock.to_string())
}

fn is_game_rule(key: &str) -> bool {
    GAME_RULES.iter().any(|name| name.eq_ignore_ascii_case(key))
}

pub fn parse_level_dat(raw: &[u8]) -> Result<Compound> {
    let mut cursor = Cursor::new(raw);
    let _storage = cursor
        .read_u32::<LittleEndian>()
        .context("level.dat header is truncated")?;
    let length = cursor
        .read_u32::<LittleEndian>()
        .context("level.dat header is truncated")? as usize;
    if raw.len() < 8 + length {
        bail!("level.dat body is truncated ({} of {} bytes)", raw.len() - 8, length);
    }
    nbt_le::from_bytes(&raw[8..8 + length])
}

pub fn read_level_dat(path: &Path) -> Result<BedrockLevel> {
    let raw = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let root = parse_level_dat(&raw)?;

    let version = nbt::get_list(&root, "lastOpenedWithVersion").and_then(|parts| {
        let parts: Vec<i32> = parts.iter().filter_map(nbt::as_i64).map(|v| v as i32).collect();
        (parts.len() >= 3).then(|| [parts[0], parts[1], parts[2]])
    });

    let game_rules: BTreeMap<String, GameRuleValue> = root
        .iter()
        .filter(|(k, _)| is_game_rule(k))
        .filter_map(|(k, v)| {
            let value = match v {
                Value::Byte(b) => GameRuleValue::Bool(*b != 0),
                other => GameRuleValue::Int(nbt::as_i64(other)? as i32),
            };
            Some((java_rule_name(k), value))
        })
        .collect();

    let metadata = WorldMetadata {
        level_name: nbt::get_str(&root, "LevelName").unwrap_or("world").to_string(),
        seed: nbt::get_i64(&root, "RandomSeed").unwrap_or(0),
        spawn: [
            nbt::get_i32(&root, "SpawnX").unwrap_or(0),
            nbt::get_i32(&root, "SpawnY").unwrap_or(64),
            nbt::get_i32(&root, "SpawnZ").unwrap_or(0),
        ],
        game_type: nbt::get_i32(&root, "GameType").unwrap_or(0),
        game_rules,
        time: nbt::get_i64(&root, "Time").unwrap_or(0),
        last_played: nbt::get_i64(&root, "LastPlayed").unwrap_or(0) * 1000,
        native: Some(NativeTags::new(Edition::Bedrock, root)),
    };
    Ok(BedrockLevel { version, metadata })
}

fn skeleton() -> Compound {
    let mut root = Compound::new();
    root.insert("Generator".to_string(), Value::Int(1));
    root.insert("Difficulty".to_string(), Value::Int(2));
    root.insert("commandsEnabled".to_string(), Value::Byte(0));
    root.insert("hasBeenLoadedInCreative".to_string(), Value::Byte(0));
    root.insert("spawnMobs".to_string(), Value::Byte(1));
    root.insert("Platform".to_string(), Value::Int(2));
    root.insert("eduOffer".to_string(), Value::Int(0));
    root
}

/// 生成目标版本的 level.dat 根标签
pub fn build_level_root(metadata: &WorldMetadata, schema: &Schema) -> Compound {
    let mut root = match NativeTags::for_edition(&metadata.native, Edition::Bedrock) {
        Some(native) => native.clone(),
        None => skeleton(),
    };
    let version: Vec<Value> = schema
        .version
        .iter()
        .copied()
        .chain([0, 0])
        .map(Value::Int)
        .collect();

    root.insert("StorageVersion".to_string(), Value::Int(BEDROCK_STORAGE_VERSION));
    root.insert("NetworkVersion".to_string(), Value::Int(schema.flags.network_version));
    root.insert("lastOpenedWithVersion".to_string(), Value::List(version.clone()));
    root.insert("MinimumCompatibleClientVersion".to_string(), Value::List(version));
    root.insert("LevelName".to_string(), nbt::string(&metadata.level_name));
    root.insert("RandomSeed".to_string(), Value::Long(metadata.seed));
    root.insert("SpawnX".to_string(), Value::Int(metadata.spawn[0]));
    root.insert("SpawnY".to_string(), Value::Int(metadata.spawn[1]));
    root.insert("SpawnZ".to_string(), Value::Int(metadata.spawn[2]));
    root.insert("GameType".to_string(), Value::Int(metadata.game_type));
    root.insert("Time".to_string(), Value::Long(metadata.time));
    root.insert("LastPlayed".to_string(), Value::Long(metadata.last_played / 1000));

    for (name, value) in &metadata.game_rules {
        let key = name.to_ascii_lowercase();
        let value = match value {
            GameRuleValue::Bool(b) => Value::Byte(*b as i8),
            GameRuleValue::Int(v) => Value::Int(*v),
        };
        root.insert(key, value);
    }
    root
}

pub fn write_level_dat(dir: &Path, metadata: &WorldMetadata, schema: &Schema) -> Result<()> {
    let body = nbt_le::to_bytes(&build_level_root(metadata, schema))?;
    let mut out = Vec::with_capacity(body.len() + 8);
    out.write_u32::<LittleEndian>(BEDROCK_STORAGE_VERSION as u32)?;
    out.write_u32::<LittleEndian>(body.len() as u32)?;
    out.extend_from_slice(&body);
    fs::write(dir.join(LEVEL_DAT), out)?;
    fs::write(dir.join(LEVELNAME_TXT), &metadata.level_name)?;
    Ok(())
}

// ============== 玩家 ==============

const PLAYER_FIELDS: &[&str] = &["Pos", "Rotation", "DimensionId"];

pub fn decode_player(raw: &[u8]) -> Result<PlayerData> {
    let map = nbt_le::from_bytes(raw)?;
    let Some(pos) = nbt::get_f64s::<3>(&map, "Pos") else {
        bail!("Player record has no Pos");
    };
    let rotation = nbt::get_f64s::<2>(&map, "Rotation").unwrap_or([0.0; 2]);
    let dimension = nbt::get_i32(&map, "DimensionId")
        .and_then(Dimension::from_bedrock_id)
        .unwrap_or(Dimension::Overworld);
    let native = map
        .iter()
        .filter(|(k, _)| !PLAYER_FIELDS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Ok(PlayerData {
        dimension,
        pos: [pos[0], pos[1] - EYE_HEIGHT, pos[2]],
        rotation: [rotation[0] as f32, rotation[1] as f32],
        native: Some(NativeTags::new(Edition::Bedrock, native)),
    })
}

pub fn encode_player(player: &PlayerData) -> Result<Vec<u8>> {
    let mut map = NativeTags::for_edition(&player.native, Edition::Bedrock)
        .cloned()
        .unwrap_or_default();
    let pos = [
        player.pos[0] as f32,
        (player.pos[1] + EYE_HEIGHT) as f32,
        player.pos[2] as f32,
    ];
    map.insert("Pos".to_string(), nbt::floats(&pos));
    map.insert("Rotation".to_string(), nbt::floats(&player.rotation));
    map.insert("DimensionId".to_string(), Value::Int(player.dimension.bedrock_id()));
    nbt_le::to_bytes(&map)
}
