//! 强制修复 - 规整区块、丢弃可由游戏重新生成的派生数据

use log::{debug, warn};
use std::fs;
use std::path::Path;

use crate::config::RepairConfig;
use crate::error::{IoContext, Result};
use crate::model::{Biome, ChunkModel, Edition};

fn gap_biome(edition: Edition) -> Biome {
    match edition {
        Edition::Java => Biome::Named("minecraft:plains".to_string()),
        Edition::Bedrock => Biome::Numeric(1),
    }
}

/// 对区块进行修复处理（使用配置）
///
/// 结果只依赖区块内容，对同一区块重复执行得到相同结果。
pub fn normalize_chunk(mut chunk: ChunkModel, config: &RepairConfig) -> ChunkModel {
    if chunk.is_corrupt() {
        return chunk;
    }
    chunk.fill_gaps(gap_biome(chunk.schema.edition));
    for section in &mut chunk.sections {
        section.compact();
        if config.drop_light {
            section.block_light = None;
            section.sky_light = None;
        }
    }
    if let Some(native) = &mut chunk.native {
        for field in &config.stale_chunk_fields {
            native.tags.remove(field);
        }
    }
    chunk.heightmaps = None;
    chunk.derived_stale = true;
    chunk
}

/// 删除配置中列出的派生数据目录（相对存档根目录）
pub fn discard_paths(root: &Path, config: &RepairConfig) -> Result<usize> {
    let mut removed = 0;
    for rel in &config.discard_paths {
        if Path::new(rel).is_absolute() || rel.contains("..") {
            warn!("Ignoring discard path outside the world: {}", rel);
            continue;
        }
        let path = root.join(rel);
        if path.is_dir() {
            fs::remove_dir_all(&path).io_context(|| format!("removing {}", path.display()))?;
            removed += 1;
        } else if path.is_file() {
            fs::remove_file(&path).io_context(|| format!("removing {}", path.display()))?;
            removed += 1;
        }
    }
    debug!("Discarded {} derived path(s) under {}", removed, root.display());
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockState, ChunkPos, Dimension, NativeTags, SectionModel};
    use crate::schema::SchemaRegistry;
    use fastnbt::Value;
    use std::collections::HashMap;

    fn messy_chunk() -> ChunkModel {
        let schema = SchemaRegistry::global().latest(Edition::Java).id;
        let plains = Biome::Named("minecraft:plains".into());
        let mut chunk = ChunkModel::new(Dimension::Overworld, ChunkPos::new(0, 0), schema);
        let mut low = SectionModel::filled(0, BlockState::new("minecraft:stone"), plains.clone());
        low.palette.push(BlockState::new("minecraft:dirt"));
        low.sky_light = Some(vec![0; 2048]);
        chunk.sections.push(low);
        chunk.sections.push(SectionModel::filled(2, BlockState::new("minecraft:stone"), plains));
        let mut tags = HashMap::new();
        tags.insert("PostProcessing".to_string(), Value::List(Vec::new()));
        tags.insert("structures".to_string(), Value::Compound(HashMap::new()));
        chunk.native = Some(NativeTags::new(Edition::Java, tags));
        chunk.derived_stale = false;
        chunk
    }

    #[test]
    fn normalize_strips_derived_data() {
        let config = RepairConfig::default();
        let chunk = normalize_chunk(messy_chunk(), &config);
        assert!(chunk.is_contiguous());
        assert_eq!(chunk.sections.len(), 3);
        assert_eq!(chunk.sections[0].palette.len(), 1);
        assert!(chunk.sections[0].sky_light.is_none());
        assert!(chunk.derived_stale);
        let tags = &chunk.native.as_ref().unwrap().tags;
        assert!(!tags.contains_key("PostProcessing"));
        assert!(tags.contains_key("structures"));
    }

    #[test]
    fn normalize_is_idempotent() {
        let config = RepairConfig::default();
        let once = normalize_chunk(messy_chunk(), &config);
        let twice = normalize_chunk(once.clone(), &config);
        assert_eq!(once, twice);
    }

    #[test]
    fn discard_removes_configured_dirs_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("poi")).unwrap();
        fs::create_dir_all(dir.path().join("data")).unwrap();
        let config = RepairConfig {
            discard_paths: vec!["poi".into(), "../elsewhere".into()],
            ..RepairConfig::default()
        };
        assert_eq!(discard_paths(dir.path(), &config).unwrap(), 1);
        assert!(!dir.path().join("poi").exists());
        assert!(dir.path().join("data").exists());
    }
}
