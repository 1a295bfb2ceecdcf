//! Bedrock 存档读取
//!
//! LevelDB 先复制到私有临时目录再打开，源存档不会被改动（包括 LOCK 与日志文件）。

use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use super::chunk::{decode_chunk, ChunkRecords};
use super::db::{
    actor_key, chunk_key, digp_key, is_auxiliary_key, parse_chunk_key, subchunk_key, BedrockDb,
    LOCAL_PLAYER, TAG_BLOCK_ENTITY, TAG_DATA_3D, TAG_ENTITY, TAG_FINALIZED_STATE, TAG_LEGACY_VERSION,
    TAG_SUBCHUNK, TAG_VERSION,
};
use super::level::{decode_player, read_level_dat, LEVEL_DAT};
use crate::error::{ConvertError, IoContext, Result};
use crate::format::ChunkSource;
use crate::model::{group_regions, ChunkModel, ChunkPos, Dimension, Edition, RegionRef, WorldModel};
use crate::nbt::Compound;
use crate::nbt_le;
use crate::schema::{SchemaId, SchemaRegistry};

/// 顶层标志：level.dat 与 db/CURRENT
pub fn is_bedrock_world(root: &Path) -> bool {
    root.join(LEVEL_DAT).is_file() && root.join("db").join("CURRENT").is_file()
}

pub struct BedrockSource {
    root: PathBuf,
    db: BedrockDb,
    /// 每个区块存在的 sub-chunk 纵向索引
    subchunks: BTreeMap<(Dimension, ChunkPos), Vec<i8>>,
    _snapshot: TempDir,
}

impl BedrockSource {
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entities(&mut self, pos: ChunkPos, dimension: Dimension) -> Vec<Compound> {
        let mut out = Vec::new();
        if let Some(raw) = self.db.get(&chunk_key(pos, dimension, TAG_ENTITY)) {
            match nbt_le::read_all(&raw) {
                Ok(list) => out.extend(list),
                Err(e) => warn!("Legacy entities of chunk ({}, {}) unreadable: {:#}", pos.x, pos.z, e),
            }
        }
        if let Some(digest) = self.db.get(&digp_key(pos, dimension)) {
            for id in digest.chunks_exact(8) {
                let id = i64::from_le_bytes([id[0], id[1], id[2], id[3], id[4], id[5], id[6], id[7]]);
                let Some(raw) = self.db.get(&actor_key(id)) else {
                    continue;
                };
                match nbt_le::from_bytes(&raw) {
                    Ok(entity) => out.push(entity),
                    Err(e) => warn!("Actor {} unreadable: {:#}", id, e),
                }
            }
        }
        out
    }

    pub fn load_region(&mut self, region: &RegionRef, schema: SchemaId) -> Result<Vec<ChunkModel>> {
        let mut chunks = Vec::with_capacity(region.chunks.len());
        for &pos in &region.chunks {
            let dim = region.dimension;
            let ys = self.subchunks.get(&(dim, pos)).cloned().unwrap_or_default();
            let records = ChunkRecords {
                finalized: self.db.get(&chunk_key(pos, dim, TAG_FINALIZED_STATE)),
                data3d: self.db.get(&chunk_key(pos, dim, TAG_DATA_3D)),
                subchunks: ys
                    .into_iter()
                    .filter_map(|y| self.db.get(&subchunk_key(pos, dim, y)).map(|v| (y, v)))
                    .collect(),
                block_entities: self.db.get(&chunk_key(pos, dim, TAG_BLOCK_ENTITY)),
                entities: self.entities(pos, dim),
            };
            chunks.push(decode_chunk(&records, dim, pos, schema));
        }
        debug!("Loaded {} chunk(s) from {} region ({}, {})", chunks.len(), region.dimension, region.pos.x, region.pos.z);
        Ok(chunks)
    }

    /// 非区块、非实体、非玩家的记录，按键序
    pub fn auxiliary_records(&mut self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut out = Vec::new();
        self.db.for_each(|key, value| {
            if is_auxiliary_key(key) {
                out.push((key.to_vec(), value.to_vec()));
            }
        })?;
        Ok(out)
    }
}

/// 平铺复制 db 目录（LevelDB 没有子目录），跳过 LOCK
fn snapshot_db(db_dir: &Path) -> Result<TempDir> {
    let snapshot = tempfile::Builder::new()
        .prefix("mcconvert-db-")
        .tempdir()
        .io_context(|| "creating LevelDB snapshot")?;
    let entries = fs::read_dir(db_dir).io_context(|| format!("listing {}", db_dir.display()))?;
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() || entry.file_name() == "LOCK" {
            continue;
        }
        fs::copy(&path, snapshot.path().join(entry.file_name()))
            .io_context(|| format!("copying {}", path.display()))?;
    }
    Ok(snapshot)
}

pub fn read(root: &Path, compression: flate2::Compression) -> Result<WorldModel> {
    if !root.join(LEVEL_DAT).is_file() {
        return Err(ConvertError::not_a_world(Edition::Bedrock, root, "level.dat not found"));
    }
    if !root.join("db").join("CURRENT").is_file() {
        return Err(ConvertError::not_a_world(Edition::Bedrock, root, "db/CURRENT not found"));
    }
    let level = read_level_dat(&root.join(LEVEL_DAT)).map_err(|e| {
        ConvertError::not_a_world(Edition::Bedrock, root, format!("level.dat unreadable: {:#}", e))
    })?;
    let Some(version) = level.version else {
        return Err(ConvertError::unsupported(Edition::Bedrock, "without lastOpenedWithVersion"));
    };
    let schema = SchemaRegistry::global().detect_bedrock(version)?;

    let snapshot = snapshot_db(&root.join("db"))?;
    let mut db = BedrockDb::open(snapshot.path(), compression)
        .map_err(|e| ConvertError::not_a_world(Edition::Bedrock, root, format!("{:#}", e)))?;

    let mut present: BTreeSet<(Dimension, ChunkPos)> = BTreeSet::new();
    let mut subchunks: BTreeMap<(Dimension, ChunkPos), Vec<i8>> = BTreeMap::new();
    let mut player_raw = None;
    db.for_each(|key, value| {
        if key == LOCAL_PLAYER {
            player_raw = Some(value.to_vec());
            return;
        }
        if let Some(parsed) = parse_chunk_key(key) {
            match parsed.tag {
                TAG_VERSION | TAG_LEGACY_VERSION => {
                    present.insert((parsed.dimension, parsed.pos));
                }
                TAG_SUBCHUNK => {
                    if let Some(y) = parsed.subchunk {
                        subchunks.entry((parsed.dimension, parsed.pos)).or_default().push(y);
                    }
                }
                _ => {}
            }
        }
    })?;

    let player = player_raw.and_then(|raw| match decode_player(&raw) {
        Ok(player) => Some(player),
        Err(e) => {
            warn!("~local_player unreadable: {:#}", e);
            None
        }
    });

    let regions: Vec<RegionRef> = group_regions(present.iter().map(|&(d, p)| (d, p)));
    debug!("Bedrock world {} at {} with {} region(s)", root.display(), schema.name, regions.len());

    Ok(WorldModel::new(
        Edition::Bedrock,
        schema.id,
        level.metadata,
        player,
        regions,
        ChunkSource::Bedrock(BedrockSource {
            root: root.to_path_buf(),
            db,
            subchunks,
            _snapshot: snapshot,
        }),
    ))
}
