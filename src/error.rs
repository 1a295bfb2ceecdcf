//! 错误类型

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::Edition;

pub type Result<T, E = ConvertError> = std::result::Result<T, E>;

/// 转换引擎的错误分类
///
/// 硬错误会中止当前存档的转换；损坏区块、丢弃实体、方块回退等软性问题
/// 只计数，不会出现在这里。
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("unknown platform '{0}' (expected 'java' or 'bedrock')")]
    InvalidPlatform(String),

    #[error("unknown direction '{0}' (expected bedrock-to-java, java-to-bedrock, java-to-java or bedrock-to-bedrock)")]
    InvalidDirection(String),

    #[error("{} is not a {edition} world: {reason}", path.display())]
    NotAWorld {
        edition: Edition,
        path: PathBuf,
        reason: String,
    },

    #[error("unsupported {edition} world version {detected} (oldest supported is {oldest})")]
    UnsupportedSchema {
        edition: Edition,
        detected: String,
        oldest: String,
    },

    #[error("unknown {edition} version '{version}'")]
    UnknownVersion { edition: Edition, version: String },

    #[error("no mapping path from {from} to {to}")]
    NoMappingPath { from: String, to: String },

    #[error("batch contains no worlds")]
    EmptyBatch,

    #[error("I/O failure while {context}: {source}")]
    IoFailure {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),

    #[error("chunk ({x}, {z}) holds '{block}' which schema {schema} does not know")]
    SchemaMismatch {
        x: i32,
        z: i32,
        block: String,
        schema: String,
    },

    #[error("conversion cancelled")]
    Cancelled,
}

impl ConvertError {
    pub fn not_a_world(edition: Edition, path: &Path, reason: impl Into<String>) -> Self {
        ConvertError::NotAWorld {
            edition,
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        ConvertError::IoFailure {
            context: context.into(),
            source,
        }
    }
}

/// 给 `io::Result` 附加上下文，转换为 `ConvertError::IoFailure`
pub trait IoContext<T> {
    fn io_context<C, F>(self, f: F) -> Result<T>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T> IoContext<T> for io::Result<T> {
    fn io_context<C, F>(self, f: F) -> Result<T>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| ConvertError::io(f(), e))
    }
}
