//! 单个存档的转换流程
//!
//! 状态：Idle → Reading → Mapping → Writing → (Repairing) → Done | Failed。
//! 所有输出都先进入暂存目录，只有 Done 之前的最后一步才会替换目标路径。

use log::{debug, info, warn};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;

use crate::config::Config;
use crate::error::{ConvertError, Result};
use crate::format::{write_into, FormatReader};
use crate::mapper::{BlockMapper, MapStats};
use crate::model::{ChunkModel, ChunkStatus, Edition};
use crate::progress::{CancelToken, ProgressSink};
use crate::repair;
use crate::schema::{Schema, SchemaRegistry};
use crate::staging::{copy_tree, Stage};

/// 每处理这么多区块输出一行进度
const PROGRESS_EVERY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Reading,
    Mapping,
    Writing,
    Repairing,
    Done,
    Failed,
}

/// 转换方向：源版本族与目标版本族
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Direction {
    pub source: Edition,
    pub target: Edition,
}

impl FromStr for Direction {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        let (source, target) = match s.trim().to_ascii_lowercase().as_str() {
            "bedrock-to-java" => (Edition::Bedrock, Edition::Java),
            "java-to-bedrock" => (Edition::Java, Edition::Bedrock),
            "java-to-java" => (Edition::Java, Edition::Java),
            "bedrock-to-bedrock" => (Edition::Bedrock, Edition::Bedrock),
            _ => return Err(ConvertError::InvalidDirection(s.to_string())),
        };
        Ok(Direction { source, target })
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-to-{}", self.source, self.target)
    }
}

/// 一次转换的统计
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub source: String,
    pub target: String,
    pub chunks: usize,
    pub corrupt: usize,
    pub partial_skipped: usize,
    pub mapping: MapStats,
    /// 原样复制时的文件数
    pub verbatim_files: Option<u64>,
    pub repaired: bool,
}

impl RunStats {
    fn absorb(&mut self, other: &MapStats) {
        let m = &mut self.mapping;
        m.unmapped_blocks += other.unmapped_blocks;
        m.unmapped_biomes += other.unmapped_biomes;
        m.dropped_entities += other.dropped_entities;
        m.dropped_block_entities += other.dropped_block_entities;
        m.dropped_sections += other.dropped_sections;
    }

    pub fn summary(&self) -> String {
        let mut message = match self.verbatim_files {
            Some(files) => format!(
                "Copied {} unchanged ({} chunk(s), {} file(s))",
                self.source, self.chunks, files
            ),
            None => format!("Converted {} chunk(s) from {} to {}", self.chunks, self.source, self.target),
        };
        let soft = [
            (self.corrupt, "corrupt chunk(s) skipped"),
            (self.partial_skipped, "partially generated chunk(s) skipped"),
            (self.mapping.unmapped_blocks, "unmapped block type(s) defaulted"),
            (self.mapping.unmapped_biomes, "unmapped biome(s) defaulted"),
            (self.mapping.dropped_entities, "entit(ies) dropped"),
            (self.mapping.dropped_block_entities, "block entit(ies) dropped"),
            (self.mapping.dropped_sections, "out-of-range section(s) discarded"),
        ];
        for (count, what) in soft {
            if count > 0 {
                message.push_str(&format!(", {} {}", count, what));
            }
        }
        if self.repaired {
            message.push_str("; repaired");
        }
        message
    }
}

pub struct Pipeline<'a> {
    config: &'a Config,
    cancel: &'a CancelToken,
    phase: Phase,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, cancel: &'a CancelToken) -> Self {
        Self {
            config,
            cancel,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn enter(&mut self, phase: Phase) {
        debug!("Pipeline {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    fn check_cancel(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(ConvertError::Cancelled);
        }
        Ok(())
    }

    /// 执行转换；失败时目标路径保持原样
    pub fn run(
        &mut self,
        input: &Path,
        output: &Path,
        direction: Direction,
        target_version: Option<&str>,
        force_repair: bool,
        log: &mut dyn ProgressSink,
    ) -> Result<RunStats> {
        let result = self.execute(input, output, direction, target_version, force_repair, log);
        match &result {
            Ok(_) => self.enter(Phase::Done),
            Err(e) => {
                warn!("Conversion of {} failed: {}", input.display(), e);
                self.enter(Phase::Failed);
            }
        }
        result
    }

    fn execute(
        &mut self,
        input: &Path,
        output: &Path,
        direction: Direction,
        target_version: Option<&str>,
        force_repair: bool,
        log: &mut dyn ProgressSink,
    ) -> Result<RunStats> {
        let start = Instant::now();
        let registry = SchemaRegistry::global();
        let target: &'static Schema = registry.target(target_version, direction.target)?;

        self.enter(Phase::Reading);
        log.line(&format!("Reading {} world {}", direction.source, input.display()));
        let mut world = FormatReader::for_edition(direction.source).read(input, &self.config.output)?;
        let source = registry.get(world.schema);
        let total = world.chunk_count();
        log.line(&format!(
            "Detected {} {} with {} chunk(s) in {} region(s)",
            source.edition(),
            source.name,
            total,
            world.regions.len()
        ));

        self.enter(Phase::Mapping);
        let mut mapper = BlockMapper::new(world.schema, target, &self.config.mapping)?;
        mapper.map_metadata(&mut world);
        let mut stats = RunStats {
            source: world.schema.to_string(),
            target: target.id.to_string(),
            ..RunStats::default()
        };

        self.enter(Phase::Writing);
        let stage = Stage::new(output, &self.config.output.stage_suffix)?;
        if mapper.is_identity() && !force_repair {
            log.line(&format!("{} already matches the target; copying verbatim", stats.source));
            self.check_cancel()?;
            let files = copy_tree(input, stage.path(), |_| false)?;
            self.check_cancel()?;
            stats.chunks = total;
            stats.verbatim_files = Some(files);
        } else {
            log.line(&format!("Writing {} world", target.id));
            let skip_partial = self.config.mapping.skip_partial_chunks && mapper.crosses_edition();
            let cancel = self.cancel;
            let mut seen = 0;
            let mut corrupt = 0;
            let mut partial = 0;
            let written = write_into(&mut world, stage.path(), target, &self.config.output, |chunk: ChunkModel| {
                if cancel.is_cancelled() {
                    return Err(ConvertError::Cancelled);
                }
                seen += 1;
                if seen % PROGRESS_EVERY == 0 {
                    log.line(&format!("Processed {}/{} chunk(s)", seen, total));
                }
                match &chunk.status {
                    ChunkStatus::Corrupt(reason) => {
                        warn!("Skipping corrupt chunk ({}, {}) in {}: {}", chunk.pos.x, chunk.pos.z, chunk.dimension, reason);
                        corrupt += 1;
                        return Ok(None);
                    }
                    ChunkStatus::Partial(_) if skip_partial => {
                        partial += 1;
                        return Ok(None);
                    }
                    _ => {}
                }
                Ok(Some(mapper.map_chunk(chunk, &mut *log)))
            })?;
            stats.chunks = written;
            stats.corrupt = corrupt;
            stats.partial_skipped = partial;
            stats.absorb(mapper.stats());
        }
        drop(world);

        if force_repair {
            self.enter(Phase::Repairing);
            let repaired = self.repair(&stage, output, target, log)?;
            stats.absorb(&repaired);
            stats.repaired = true;
            self.check_cancel()?;
            drop(stage);
        } else {
            self.check_cancel()?;
            stage.commit()?;
        }

        info!("Converted {} in {:.2}s", input.display(), start.elapsed().as_secs_f64());
        Ok(stats)
    }

    /// 用目标格式重新读取暂存输出，规整后写入第二个暂存目录并提交
    fn repair(
        &self,
        staged: &Stage,
        output: &Path,
        target: &'static Schema,
        log: &mut dyn ProgressSink,
    ) -> Result<MapStats> {
        log.line("Repairing converted world");
        let repair_suffix = format!("{}-repair", self.config.output.stage_suffix);
        let mut world = FormatReader::for_edition(target.edition()).read(staged.path(), &self.config.output)?;
        let mut mapper = BlockMapper::new(world.schema, target, &self.config.mapping)?;
        let stage = Stage::new(output, &repair_suffix)?;
        let cancel = self.cancel;
        let repair_config = &self.config.repair;
        let mut corrupt = 0;
        let written = write_into(&mut world, stage.path(), target, &self.config.output, |chunk: ChunkModel| {
            if cancel.is_cancelled() {
                return Err(ConvertError::Cancelled);
            }
            if chunk.is_corrupt() {
                corrupt += 1;
                return Ok(None);
            }
            let chunk = mapper.map_chunk(chunk, &mut *log);
            Ok(Some(repair::normalize_chunk(chunk, repair_config)))
        })?;
        drop(world);
        repair::discard_paths(stage.path(), repair_config)?;
        if corrupt > 0 {
            warn!("{} chunk(s) of the staged output could not be re-read", corrupt);
        }
        debug!("Repair pass rewrote {} chunk(s)", written);

        if cancel.is_cancelled() {
            return Err(ConvertError::Cancelled);
        }
        stage.commit()?;
        Ok(mapper.stats().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions_parse() {
        let d: Direction = "Java-to-Bedrock".parse().unwrap();
        assert_eq!(d.source, Edition::Java);
        assert_eq!(d.target, Edition::Bedrock);
        assert_eq!(d.to_string(), "java-to-bedrock");
        assert!(matches!(
            "java-to-pocket".parse::<Direction>(),
            Err(ConvertError::InvalidDirection(_))
        ));
    }

    #[test]
    fn summary_lists_only_nonzero_counts() {
        let stats = RunStats {
            source: "Java 1.20.1".into(),
            target: "Bedrock 1.21.50".into(),
            chunks: 12,
            corrupt: 1,
            mapping: MapStats {
                unmapped_blocks: 2,
                ..MapStats::default()
            },
            ..RunStats::default()
        };
        let message = stats.summary();
        assert!(message.starts_with("Converted 12 chunk(s) from Java 1.20.1 to Bedrock 1.21.50"));
        assert!(message.contains("1 corrupt chunk(s) skipped"));
        assert!(message.contains("2 unmapped block type(s) defaulted"));
        assert!(!message.contains("dropped"));
    }

    #[test]
    fn failed_run_ends_in_failed_phase() {
        let config = Config::default();
        let cancel = CancelToken::new();
        let mut pipeline = Pipeline::new(&config, &cancel);
        let dir = tempfile::tempdir().unwrap();
        let direction: Direction = "java-to-java".parse().unwrap();
        let result = pipeline.run(
            &dir.path().join("missing"),
            &dir.path().join("out"),
            direction,
            None,
            false,
            &mut |_: &str| {},
        );
        assert!(matches!(result, Err(ConvertError::NotAWorld { .. })));
        assert_eq!(pipeline.phase(), Phase::Failed);
        assert!(!dir.path().join("out").exists());
    }
}
