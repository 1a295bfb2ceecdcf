//! Java 存档写出

use fastnbt::Value;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

use super::chunk::{encode_chunk, encode_entity_chunk};
use super::level::{write_level_dat, LEVEL_DAT};
use super::reader::dimension_dir;
use super::region::{region_filename, write_mca};
use crate::error::{IoContext, Result};
use crate::model::{ChunkModel, Dimension, PlayerData, RegionPos, WorldMetadata};
use crate::schema::Schema;

/// 1.18 起 session.lock 的固定内容
const SESSION_LOCK: &str = "\u{2603}";

pub struct JavaWriter {
    root: PathBuf,
    schema: &'static Schema,
    compression: flate2::Compression,
}

impl JavaWriter {
    pub fn create(root: &Path, schema: &'static Schema, compression: flate2::Compression) -> Result<Self> {
        fs::create_dir_all(root.join("region"))
            .io_context(|| format!("creating {}", root.display()))?;
        Ok(Self {
            root: root.to_path_buf(),
            schema,
            compression,
        })
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// 写出一个 region 的区块及其实体
    pub fn write_region(&mut self, dimension: Dimension, pos: RegionPos, chunks: &[ChunkModel]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let name = region_filename(pos);

        let encoded: Vec<(usize, Value)> = chunks
            .iter()
            .map(|c| (c.pos.local_index(), encode_chunk(c, self.schema)))
            .collect();
        write_mca(
            &dimension_dir(&self.root, dimension, "region").join(&name),
            pos,
            &encoded,
            self.compression,
        )?;

        let entities: Vec<(usize, Value)> = chunks
            .iter()
            .filter(|c| !c.entities.is_empty())
            .map(|c| (c.pos.local_index(), encode_entity_chunk(c, self.schema)))
            .collect();
        if !entities.is_empty() {
            write_mca(
                &dimension_dir(&self.root, dimension, "entities").join(&name),
                pos,
                &entities,
                self.compression,
            )?;
        }
        debug!("Wrote {} chunk(s) to {} {}", chunks.len(), dimension, name);
        Ok(())
    }

    pub fn finish(self, metadata: &WorldMetadata, player: Option<&PlayerData>) -> Result<()> {
        write_level_dat(
            &self.root.join(LEVEL_DAT),
            metadata,
            player,
            self.schema,
            self.compression,
        )?;
        fs::write(self.root.join("session.lock"), SESSION_LOCK)
            .io_context(|| "writing session.lock")?;
        Ok(())
    }
}
