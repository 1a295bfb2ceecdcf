//! Bedrock 存档写出

use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

use super::chunk::encode_chunk;
use super::db::{BedrockDb, LOCAL_PLAYER};
use super::level::{encode_player, write_level_dat};
use crate::error::{IoContext, Result};
use crate::model::{ChunkModel, PlayerData, WorldMetadata};
use crate::schema::Schema;

pub struct BedrockWriter {
    root: PathBuf,
    db: BedrockDb,
    schema: &'static Schema,
}

impl BedrockWriter {
    pub fn create(root: &Path, schema: &'static Schema, compression: flate2::Compression) -> Result<Self> {
        let db_dir = root.join("db");
        fs::create_dir_all(&db_dir).io_context(|| format!("creating {}", db_dir.display()))?;
        let db = BedrockDb::create(&db_dir, compression)?;
        Ok(Self {
            root: root.to_path_buf(),
            db,
            schema,
        })
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    pub fn write_chunks(&mut self, chunks: &[ChunkModel]) -> Result<()> {
        for chunk in chunks {
            for (key, value) in encode_chunk(chunk, self.schema)? {
                self.db.put(&key, &value)?;
            }
        }
        debug!("Wrote {} chunk(s) to LevelDB", chunks.len());
        Ok(())
    }

    /// 原样写入一条记录（同版本族携带的非区块数据）
    pub fn put_raw(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.db.put(key, value)?;
        Ok(())
    }

    pub fn finish(mut self, metadata: &WorldMetadata, player: Option<&PlayerData>) -> Result<()> {
        if let Some(player) = player {
            self.db.put(LOCAL_PLAYER, &encode_player(player)?)?;
        }
        self.db.flush()?;
        let Self { root, db, schema } = self;
        drop(db);
        remove_db_scratch(&root.join("db"))?;
        write_level_dat(&root, metadata, schema)?;
        Ok(())
    }
}

/// 关闭后的数据库目录里，LOG 记着写出时的绝对路径，LOCK 只在打开期间有意义
fn remove_db_scratch(db_dir: &Path) -> Result<()> {
    for name in ["LOG", "LOG.old", "LOCK"] {
        let path = db_dir.join(name);
        if path.is_file() {
            fs::remove_file(&path).io_context(|| format!("removing {}", path.display()))?;
        }
    }
    Ok(())
}
