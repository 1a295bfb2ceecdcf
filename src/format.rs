//! 读写端按版本族分派
//!
//! 读端产出懒加载的 `WorldModel`；写端逐 region 接收区块，写出前做一致性检查。

use log::debug;
use std::collections::BTreeMap;
use std::path::Path;

use crate::bedrock::{self, BedrockSource, BedrockWriter};
use crate::config::{Config, OutputConfig};
use crate::error::{ConvertError, Result};
use crate::java::{self, JavaSource, JavaWriter};
use crate::model::{ChunkModel, ChunkPos, Dimension, Edition, PlayerData, RegionRef, WorldMetadata, WorldModel};
use crate::schema::{Schema, SchemaId};
use crate::staging::{copy_tree, Stage};

/// 区块的实际来源
pub(crate) enum ChunkSource {
    Java(JavaSource),
    Bedrock(BedrockSource),
    Memory(BTreeMap<(Dimension, ChunkPos), ChunkModel>),
}

impl ChunkSource {
    pub(crate) fn memory(chunks: Vec<ChunkModel>) -> Self {
        ChunkSource::Memory(chunks.into_iter().map(|c| ((c.dimension, c.pos), c)).collect())
    }

    pub(crate) fn load_region(&mut self, region: &RegionRef, schema: SchemaId) -> Result<Vec<ChunkModel>> {
        match self {
            ChunkSource::Java(source) => source.load_region(region, schema),
            ChunkSource::Bedrock(source) => source.load_region(region, schema),
            ChunkSource::Memory(chunks) => Ok(region
                .chunks
                .iter()
                .filter_map(|&pos| chunks.get(&(region.dimension, pos)).cloned())
                .collect()),
        }
    }

    /// 磁盘上的存档根目录
    pub(crate) fn root(&self) -> Option<&Path> {
        match self {
            ChunkSource::Java(source) => Some(source.root()),
            ChunkSource::Bedrock(source) => Some(source.root()),
            ChunkSource::Memory(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatReader {
    Java,
    Bedrock,
}

impl FormatReader {
    pub fn for_edition(edition: Edition) -> Self {
        match edition {
            Edition::Java => FormatReader::Java,
            Edition::Bedrock => FormatReader::Bedrock,
        }
    }

    /// 打开存档；区块在遍历 region 时才解码
    pub fn read(self, path: &Path, output: &OutputConfig) -> Result<WorldModel> {
        match self {
            FormatReader::Java => java::reader::read(path),
            FormatReader::Bedrock => bedrock::reader::read(path, output.compression()),
        }
    }
}

/// 目标 schema 必须认识区块里的每个方块名
pub fn check_consistency(chunk: &ChunkModel, schema: &Schema) -> Result<()> {
    if chunk.schema != schema.id {
        return Err(ConvertError::SchemaMismatch {
            x: chunk.pos.x,
            z: chunk.pos.z,
            block: format!("identifiers of {}", chunk.schema),
            schema: schema.id.to_string(),
        });
    }
    for section in &chunk.sections {
        if let Some(unknown) = section.palette.iter().find(|s| !schema.knows_block(&s.name)) {
            return Err(ConvertError::SchemaMismatch {
                x: chunk.pos.x,
                z: chunk.pos.z,
                block: unknown.name.clone(),
                schema: schema.id.to_string(),
            });
        }
    }
    Ok(())
}

pub enum FormatWriter {
    Java(JavaWriter),
    Bedrock(BedrockWriter),
}

impl FormatWriter {
    pub fn create(dir: &Path, schema: &'static Schema, output: &OutputConfig) -> Result<Self> {
        Ok(match schema.edition() {
            Edition::Java => FormatWriter::Java(JavaWriter::create(dir, schema, output.compression())?),
            Edition::Bedrock => FormatWriter::Bedrock(BedrockWriter::create(dir, schema, output.compression())?),
        })
    }

    fn schema(&self) -> &'static Schema {
        match self {
            FormatWriter::Java(w) => w.schema(),
            FormatWriter::Bedrock(w) => w.schema(),
        }
    }

    /// 写出一个 region；损坏的区块不写
    pub fn write_region(&mut self, region: &RegionRef, mut chunks: Vec<ChunkModel>) -> Result<()> {
        let schema = self.schema();
        chunks.retain(|c| !c.is_corrupt());
        for chunk in &chunks {
            check_consistency(chunk, schema)?;
        }
        match self {
            FormatWriter::Java(w) => w.write_region(region.dimension, region.pos, &chunks),
            FormatWriter::Bedrock(w) => w.write_chunks(&chunks),
        }
    }

    pub fn finish(self, metadata: &WorldMetadata, player: Option<&PlayerData>) -> Result<()> {
        match self {
            FormatWriter::Java(w) => w.finish(metadata, player),
            FormatWriter::Bedrock(w) => w.finish(metadata, player),
        }
    }
}

/// 同版本族转换时由写端重新生成、不原样携带的顶层条目
fn regenerated(edition: Edition, rel: &Path) -> bool {
    let mut parts = rel.components().map(|c| c.as_os_str().to_string_lossy().into_owned());
    let first = parts.next().unwrap_or_default();
    match edition {
        Edition::Java => {
            if matches!(first.as_str(), "level.dat" | "level.dat_old" | "session.lock" | "region" | "entities") {
                return true;
            }
            let second = parts.next();
            matches!(first.as_str(), "DIM-1" | "DIM1") && matches!(second.as_deref(), Some("region" | "entities"))
        }
        Edition::Bedrock => matches!(first.as_str(), "db" | "level.dat" | "level.dat_old" | "levelname.txt"),
    }
}

/// 同版本族：复制非区块文件与非区块数据库记录
fn carry_auxiliary(world: &mut WorldModel, dir: &Path, writer: &mut FormatWriter) -> Result<()> {
    if let Some(root) = world.source.root() {
        let edition = world.edition;
        let copied = copy_tree(root, dir, |rel| regenerated(edition, rel))?;
        debug!("Carried {} auxiliary file(s) from {}", copied, root.display());
    }
    if let (ChunkSource::Bedrock(source), FormatWriter::Bedrock(w)) = (&mut world.source, writer) {
        let records = source.auxiliary_records()?;
        for (key, value) in &records {
            w.put_raw(key, value)?;
        }
        debug!("Carried {} auxiliary LevelDB record(s)", records.len());
    }
    Ok(())
}

/// 把世界逐 region 写入 `dir`，每个区块先交给 `each`（返回 `None` 表示跳过）
///
/// 返回写出的区块数。
pub fn write_into<F>(
    world: &mut WorldModel,
    dir: &Path,
    schema: &'static Schema,
    output: &OutputConfig,
    mut each: F,
) -> Result<usize>
where
    F: FnMut(ChunkModel) -> Result<Option<ChunkModel>>,
{
    let mut writer = FormatWriter::create(dir, schema, output)?;
    if world.edition == schema.edition() {
        carry_auxiliary(world, dir, &mut writer)?;
    }

    let mut written = 0;
    let regions = world.regions.clone();
    for region in &regions {
        let loaded = world.load_region(region)?;
        let mut out = Vec::with_capacity(loaded.len());
        for chunk in loaded {
            if let Some(chunk) = each(chunk)? {
                out.push(chunk);
            }
        }
        written += out.iter().filter(|c| !c.is_corrupt()).count();
        writer.write_region(region, out)?;
    }
    writer.finish(&world.metadata, world.player.as_ref())?;
    Ok(written)
}

/// 不做映射地把世界写到 `path`（经暂存目录提交）
pub fn write(world: &mut WorldModel, path: &Path, schema: &'static Schema, config: &Config) -> Result<usize> {
    let stage = Stage::new(path, &config.output.stage_suffix)?;
    let written = write_into(world, stage.path(), schema, &config.output, |chunk| Ok(Some(chunk)))?;
    stage.commit()?;
    Ok(written)
}
