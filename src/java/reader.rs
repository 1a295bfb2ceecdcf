//! Java 存档读取：level.dat + 各维度的 region / entities 目录

use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

use super::chunk::{decode_chunk, decode_entity_chunk};
use super::level::{read_level_dat, LEVEL_DAT};
use super::region::{list_chunks, parse_mca_filename, region_filename, RegionFile};
use crate::error::{ConvertError, Result};
use crate::format::ChunkSource;
use crate::model::{group_regions, ChunkModel, ChunkPos, Dimension, Edition, RegionPos, RegionRef, WorldModel};
use crate::schema::{SchemaId, SchemaRegistry};

/// 维度内某个子目录（region / entities）
pub fn dimension_dir(root: &Path, dimension: Dimension, kind: &str) -> PathBuf {
    let dir = dimension.java_dir();
    if dir.is_empty() {
        root.join(kind)
    } else {
        root.join(dir).join(kind)
    }
}

/// 顶层标志：level.dat 与 region 目录
pub fn is_java_world(root: &Path) -> bool {
    root.join(LEVEL_DAT).is_file() && root.join("region").is_dir()
}

/// 按需读取 region 的区块来源
pub struct JavaSource {
    root: PathBuf,
}

impl JavaSource {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn load_region(&mut self, region: &RegionRef, fallback: SchemaId) -> Result<Vec<ChunkModel>> {
        let registry = SchemaRegistry::global();
        let fallback = registry.get(fallback);
        let name = region_filename(region.pos);
        let path = dimension_dir(&self.root, region.dimension, "region").join(&name);

        let file = match RegionFile::open(&path, region.pos) {
            Ok(file) => file,
            Err(e) => {
                warn!("Region {} unreadable: {:#}", path.display(), e);
                let reason = format!("{:#}", e);
                return Ok(region
                    .chunks
                    .iter()
                    .map(|&pos| ChunkModel::corrupt(region.dimension, pos, fallback.id, reason.clone()))
                    .collect());
            }
        };

        let entity_path = dimension_dir(&self.root, region.dimension, "entities").join(&name);
        let entities = if entity_path.is_file() {
            match RegionFile::open(&entity_path, region.pos) {
                Ok(file) => Some(file),
                Err(e) => {
                    warn!("Entity region {} unreadable: {:#}", entity_path.display(), e);
                    None
                }
            }
        } else {
            None
        };

        let mut chunks = Vec::with_capacity(region.chunks.len());
        for &pos in &region.chunks {
            let index = pos.local_index();
            let mut chunk = match file.read_chunk(index) {
                Ok(Some(value)) => decode_chunk(&value, region.dimension, pos, fallback),
                Ok(None) => continue,
                Err(e) => ChunkModel::corrupt(region.dimension, pos, fallback.id, format!("{:#}", e)),
            };
            if chunk.is_corrupt() {
                chunks.push(chunk);
                continue;
            }
            if let Some(entity_file) = &entities {
                match entity_file.read_chunk(index) {
                    Ok(Some(value)) => chunk.entities = decode_entity_chunk(&value),
                    Ok(None) => {}
                    Err(e) => warn!("Entities of chunk ({}, {}) unreadable: {:#}", pos.x, pos.z, e),
                }
            }
            chunks.push(chunk);
        }
        debug!(
            "Loaded {} chunk(s) from {} {}",
            chunks.len(),
            region.dimension,
            name
        );
        Ok(chunks)
    }
}

fn scan_dimension(root: &Path, dimension: Dimension) -> Vec<(Dimension, ChunkPos)> {
    let dir = dimension_dir(root, dimension, "region");
    let Ok(entries) = fs::read_dir(&dir) else {
        return Vec::new();
    };
    let mut found = Vec::new();
    for entry in entries.filter_map(|e| e.ok()) {
        let file_name = entry.file_name();
        let Some((rx, rz)) = file_name.to_str().and_then(parse_mca_filename) else {
            continue;
        };
        let pos = RegionPos { x: rx, z: rz };
        match list_chunks(&entry.path()) {
            Ok(indices) => found.extend(indices.into_iter().map(|i| (dimension, pos.chunk_at(i)))),
            Err(e) => warn!("Skipping region {}: {:#}", entry.path().display(), e),
        }
    }
    found
}

/// 打开 Java 存档；区块内容在 `load_region` 时才解码
pub fn read(root: &Path) -> Result<WorldModel> {
    if !root.join(LEVEL_DAT).is_file() {
        return Err(ConvertError::not_a_world(Edition::Java, root, "level.dat not found"));
    }
    if !root.join("region").is_dir() {
        return Err(ConvertError::not_a_world(Edition::Java, root, "region directory not found"));
    }
    let level = read_level_dat(&root.join(LEVEL_DAT))
        .map_err(|e| ConvertError::not_a_world(Edition::Java, root, format!("level.dat unreadable: {:#}", e)))?;
    let Some(data_version) = level.data_version else {
        return Err(ConvertError::unsupported(Edition::Java, "without DataVersion"));
    };
    let schema = SchemaRegistry::global().detect_java(data_version)?;

    let regions: Vec<RegionRef> = group_regions(
        Dimension::ALL
            .into_iter()
            .flat_map(|dimension| scan_dimension(root, dimension)),
    );
    debug!("Java world {} at {} with {} region(s)", root.display(), schema.name, regions.len());

    Ok(WorldModel::new(
        Edition::Java,
        schema.id,
        level.metadata,
        level.player,
        regions,
        ChunkSource::Java(JavaSource {
            root: root.to_path_buf(),
        }),
    ))
}
