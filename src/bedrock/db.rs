//! Bedrock LevelDB 访问：Mojang 压缩器与区块键布局
//!
//! 区块键：`x: i32 LE | z: i32 LE | [dimension: i32 LE] | tag | [subchunk y: i8]`，
//! 主世界省略维度字段。

use anyhow::{Context, Result};
use flate2::read::{DeflateDecoder, ZlibDecoder};
use flate2::write::{DeflateEncoder, ZlibEncoder};
use rusty_leveldb::compressor::{Compressor, NoneCompressor};
use rusty_leveldb::{CompressorList, LdbIterator, Options, Status, StatusCode, DB};
use std::io::{Read, Write};
use std::path::Path;
use std::rc::Rc;

use crate::model::{ChunkPos, Dimension};

/// 旧版 zlib 压缩器 ID
const COMPRESSOR_ZLIB: u8 = 2;
/// 原始 deflate 压缩器 ID（游戏当前使用）
const COMPRESSOR_RAW_DEFLATE: u8 = 4;

pub const TAG_DATA_3D: u8 = 0x2B;
pub const TAG_VERSION: u8 = 0x2C;
pub const TAG_SUBCHUNK: u8 = 0x2F;
pub const TAG_BLOCK_ENTITY: u8 = 0x31;
pub const TAG_ENTITY: u8 = 0x32;
pub const TAG_FINALIZED_STATE: u8 = 0x36;
pub const TAG_LEGACY_VERSION: u8 = 0x76;

const CHUNK_TAGS: &[u8] = &[
    TAG_DATA_3D,
    TAG_VERSION,
    TAG_SUBCHUNK,
    TAG_BLOCK_ENTITY,
    TAG_ENTITY,
    TAG_FINALIZED_STATE,
    TAG_LEGACY_VERSION,
    0x2D, // Data2D
    0x2E, // Data2DLegacy
    0x30, // LegacyTerrain
    0x33, // PendingTicks
    0x35, // BiomeState
    0x39, // BlendingBiomeHeight
    0x3A, // RandomTicks
    0x3B, // Checksums
    0x3D, // GenerationSeed
    0x3F, // BlendingData
    0x40, // ActorDigestVersion
];

pub const LOCAL_PLAYER: &[u8] = b"~local_player";
const DIGP_PREFIX: &[u8] = b"digp";
const ACTOR_PREFIX: &[u8] = b"actorprefix";

/// zlib / 原始 deflate 块压缩
struct MojangCompressor {
    raw: bool,
    level: flate2::Compression,
}

impl Compressor for MojangCompressor {
    fn encode(&self, block: Vec<u8>) -> rusty_leveldb::Result<Vec<u8>> {
        let result = if self.raw {
            let mut encoder = DeflateEncoder::new(Vec::new(), self.level);
            encoder.write_all(&block).and_then(|_| encoder.finish())
        } else {
            let mut encoder = ZlibEncoder::new(Vec::new(), self.level);
            encoder.write_all(&block).and_then(|_| encoder.finish())
        };
        result.map_err(|e| Status::new(StatusCode::CompressionError, &e.to_string()))
    }

    fn decode(&self, block: Vec<u8>) -> rusty_leveldb::Result<Vec<u8>> {
        let mut out = Vec::new();
        let result = if self.raw {
            DeflateDecoder::new(block.as_slice()).read_to_end(&mut out)
        } else {
            ZlibDecoder::new(block.as_slice()).read_to_end(&mut out)
        };
        result
            .map(|_| out)
            .map_err(|e| Status::new(StatusCode::CompressionError, &e.to_string()))
    }
}

fn options(create_if_missing: bool, level: flate2::Compression) -> Options {
    let mut list = CompressorList::new();
    list.set_with_id(0, NoneCompressor);
    list.set_with_id(COMPRESSOR_ZLIB, MojangCompressor { raw: false, level });
    list.set_with_id(COMPRESSOR_RAW_DEFLATE, MojangCompressor { raw: true, level });
    Options {
        create_if_missing,
        compressor: COMPRESSOR_RAW_DEFLATE,
        compressor_list: Rc::new(list),
        ..Options::default()
    }
}

// ============== 键 ==============

/// 解析后的区块键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkKey {
    pub pos: ChunkPos,
    pub dimension: Dimension,
    pub tag: u8,
    pub subchunk: Option<i8>,
}

fn chunk_prefix(pos: ChunkPos, dimension: Dimension) -> Vec<u8> {
    let mut key = Vec::with_capacity(14);
    key.extend_from_slice(&pos.x.to_le_bytes());
    key.extend_from_slice(&pos.z.to_le_bytes());
    if dimension != Dimension::Overworld {
        key.extend_from_slice(&dimension.bedrock_id().to_le_bytes());
    }
    key
}

pub fn chunk_key(pos: ChunkPos, dimension: Dimension, tag: u8) -> Vec<u8> {
    let mut key = chunk_prefix(pos, dimension);
    key.push(tag);
    key
}

pub fn subchunk_key(pos: ChunkPos, dimension: Dimension, y: i8) -> Vec<u8> {
    let mut key = chunk_key(pos, dimension, TAG_SUBCHUNK);
    key.push(y as u8);
    key
}

pub fn digp_key(pos: ChunkPos, dimension: Dimension) -> Vec<u8> {
    let mut key = DIGP_PREFIX.to_vec();
    key.extend_from_slice(&chunk_prefix(pos, dimension));
    key
}

pub fn actor_key(unique_id: i64) -> Vec<u8> {
    let mut key = ACTOR_PREFIX.to_vec();
    key.extend_from_slice(&unique_id.to_le_bytes());
    key
}

fn le_i32(bytes: &[u8]) -> i32 {
    i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

pub fn parse_chunk_key(key: &[u8]) -> Option<ChunkKey> {
    let (dimension, rest) = match key.len() {
        9 | 10 => (Dimension::Overworld, &key[8..]),
        13 | 14 => (Dimension::from_bedrock_id(le_i32(&key[8..12])).filter(|d| *d != Dimension::Overworld)?, &key[12..]),
        _ => return None,
    };
    let tag = rest[0];
    if !CHUNK_TAGS.contains(&tag) {
        return None;
    }
    let subchunk = match rest.len() {
        2 if tag == TAG_SUBCHUNK => Some(rest[1] as i8),
        1 if tag != TAG_SUBCHUNK => None,
        _ => return None,
    };
    Some(ChunkKey {
        pos: ChunkPos::new(le_i32(&key[0..4]), le_i32(&key[4..8])),
        dimension,
        tag,
        subchunk,
    })
}

/// digp 键的区块坐标与维度
pub fn parse_digp_key(key: &[u8]) -> Option<(ChunkPos, Dimension)> {
    let rest = key.strip_prefix(DIGP_PREFIX)?;
    let dimension = match rest.len() {
        8 => Dimension::Overworld,
        12 => Dimension::from_bedrock_id(le_i32(&rest[8..12]))?,
        _ => return None,
    };
    Some((ChunkPos::new(le_i32(&rest[0..4]), le_i32(&rest[4..8])), dimension))
}

pub fn is_actor_key(key: &[u8]) -> bool {
    key.starts_with(ACTOR_PREFIX)
}

/// 既不是区块记录也不是实体或玩家的记录（同版本族时原样携带）
pub fn is_auxiliary_key(key: &[u8]) -> bool {
    parse_chunk_key(key).is_none()
        && parse_digp_key(key).is_none()
        && !is_actor_key(key)
        && key != LOCAL_PLAYER
}

// ============== 数据库 ==============

pub struct BedrockDb {
    db: DB,
}

impl BedrockDb {
    pub fn open(path: &Path, level: flate2::Compression) -> Result<Self> {
        let db = DB::open(path, options(false, level))
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Failed to open LevelDB at {}", path.display()))?;
        Ok(Self { db })
    }

    pub fn create(path: &Path, level: flate2::Compression) -> Result<Self> {
        let db = DB::open(path, options(true, level))
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Failed to create LevelDB at {}", path.display()))?;
        Ok(Self { db })
    }

    pub fn get(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        self.db.get(key).map(|v| v.to_vec())
    }

    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.db
            .put(key, value)
            .map_err(|e| anyhow::anyhow!("LevelDB put failed: {}", e))
    }

    /// 按键序遍历所有记录
    pub fn for_each<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(&[u8], &[u8]),
    {
        let mut iter = self
            .db
            .new_iter()
            .map_err(|e| anyhow::anyhow!("LevelDB iteration failed: {}", e))?;
        while let Some((key, value)) = iter.next() {
            f(&key, &value);
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| anyhow::anyhow!("LevelDB flush failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_keys_parse_back() {
        let pos = ChunkPos::new(-3, 7);
        let key = chunk_key(pos, Dimension::Overworld, TAG_VERSION);
        assert_eq!(key.len(), 9);
        assert_eq!(
            parse_chunk_key(&key),
            Some(ChunkKey { pos, dimension: Dimension::Overworld, tag: TAG_VERSION, subchunk: None })
        );

        let key = subchunk_key(pos, Dimension::Nether, -4);
        assert_eq!(key.len(), 14);
        let parsed = parse_chunk_key(&key).unwrap();
        assert_eq!(parsed.dimension, Dimension::Nether);
        assert_eq!(parsed.subchunk, Some(-4));
    }

    #[test]
    fn named_records_are_not_chunk_keys() {
        for key in [&b"~local_player"[..], b"Overworld", b"BiomeData", b"portals", b"scoreboard"] {
            assert_eq!(parse_chunk_key(key), None);
        }
        assert!(is_auxiliary_key(b"scoreboard"));
        assert!(!is_auxiliary_key(LOCAL_PLAYER));
        assert!(!is_auxiliary_key(&actor_key(5)));
        assert!(!is_auxiliary_key(&digp_key(ChunkPos::new(0, 0), Dimension::End)));
    }

    #[test]
    fn digp_keys_parse_back() {
        let pos = ChunkPos::new(12, -1);
        assert_eq!(parse_digp_key(&digp_key(pos, Dimension::End)), Some((pos, Dimension::End)));
        assert_eq!(
            parse_digp_key(&digp_key(pos, Dimension::Overworld)),
            Some((pos, Dimension::Overworld))
        );
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db");
        {
            let mut db = BedrockDb::create(&path, flate2::Compression::default()).unwrap();
            db.put(b"alpha", &[1u8; 300]).unwrap();
            db.put(&chunk_key(ChunkPos::new(1, 2), Dimension::Overworld, TAG_VERSION), &[41]).unwrap();
            db.flush().unwrap();
        }
        let mut db = BedrockDb::open(&path, flate2::Compression::default()).unwrap();
        assert_eq!(db.get(b"alpha"), Some(vec![1u8; 300]));
        let mut keys = Vec::new();
        db.for_each(|k, _| keys.push(k.to_vec())).unwrap();
        assert_eq!(keys.len(), 2);
    }
}
