//! 版本目录：每个平台可产出的 schema 版本

use std::fmt;

use crate::error::{ConvertError, Result};
use crate::model::Edition;

/// Java 1.18 起的区块布局（sections 内嵌 block_states）
pub const JAVA_MIN_DATA_VERSION: i32 = 2860;

/// Bedrock sub-chunk 格式版本（带 NBT 调色板）
pub const SUBCHUNK_VERSION: u8 = 9;

/// Bedrock level.dat 头部的存储版本
pub const BEDROCK_STORAGE_VERSION: i32 = 10;

/// schema 标识：平台 + 在该平台目录中的序号（越大越新）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId {
    pub edition: Edition,
    pub index: usize,
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match super::SchemaRegistry::global()
            .schemas(self.edition)
            .get(self.index)
        {
            Some(schema) => write!(f, "{} {}", self.edition, schema.name),
            None => write!(f, "{} #{}", self.edition, self.index),
        }
    }
}

/// 区块格式相关的开关
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaFlags {
    /// Java：Status 字段带 "minecraft:" 前缀
    pub namespaced_status: bool,
    /// Java：物品数量为 int 类型的 `count`，否则为 byte 类型的 `Count`
    pub int_item_count: bool,
    /// Bedrock：区块版本字节（0x2C 记录）
    pub chunk_version: u8,
    /// Bedrock：调色板方块状态版本号
    pub block_version: i32,
    /// Bedrock：网络协议版本
    pub network_version: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub id: SchemaId,
    pub name: &'static str,
    /// 解析后的版本号 [major, minor, patch]
    pub version: [i32; 3],
    /// Java DataVersion；Bedrock 为 0
    pub data_version: i32,
    pub flags: SchemaFlags,
}

impl Schema {
    pub fn edition(&self) -> Edition {
        self.id.edition
    }
}

struct JavaEntry {
    name: &'static str,
    data_version: i32,
}

struct BedrockEntry {
    name: &'static str,
    chunk_version: u8,
    network_version: i32,
}

// 从旧到新，声明顺序即图的边顺序
const JAVA_VERSIONS: &[JavaEntry] = &[
    JavaEntry { name: "1.18.2", data_version: 2975 },
    JavaEntry { name: "1.19.4", data_version: 3337 },
    JavaEntry { name: "1.20.1", data_version: 3465 },
    JavaEntry { name: "1.20.4", data_version: 3700 },
    JavaEntry { name: "1.21.1", data_version: 3955 },
    JavaEntry { name: "1.21.4", data_version: 4189 },
];

const BEDROCK_VERSIONS: &[BedrockEntry] = &[
    BedrockEntry { name: "1.18.30", chunk_version: 40, network_version: 503 },
    BedrockEntry { name: "1.19.80", chunk_version: 40, network_version: 582 },
    BedrockEntry { name: "1.20.0", chunk_version: 40, network_version: 589 },
    BedrockEntry { name: "1.20.80", chunk_version: 40, network_version: 671 },
    BedrockEntry { name: "1.21.0", chunk_version: 41, network_version: 685 },
    BedrockEntry { name: "1.21.50", chunk_version: 42, network_version: 766 },
];

/// 解析 "1.20.80" 形式的版本号，缺失的部分补 0
pub fn parse_version(name: &str) -> Option<[i32; 3]> {
    let mut out = [0; 3];
    let mut parts = name.trim().split('.');
    for slot in out.iter_mut() {
        match parts.next() {
            Some(p) => *slot = p.parse().ok()?,
            None => break,
        }
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}

pub fn bedrock_block_version(version: [i32; 3]) -> i32 {
    (version[0] << 24) | (version[1] << 16) | (version[2] << 8)
}

pub(crate) fn build_schemas(edition: Edition) -> Vec<Schema> {
    match edition {
        Edition::Java => JAVA_VERSIONS
            .iter()
            .enumerate()
            .map(|(index, e)| {
                let version = parse_version(e.name).unwrap_or_default();
                Schema {
                    id: SchemaId { edition, index },
                    name: e.name,
                    version,
                    data_version: e.data_version,
                    flags: SchemaFlags {
                        namespaced_status: version >= [1, 20, 0],
                        int_item_count: version >= [1, 20, 5],
                        chunk_version: 0,
                        block_version: 0,
                        network_version: 0,
                    },
                }
            })
            .collect(),
        Edition::Bedrock => BEDROCK_VERSIONS
            .iter()
            .enumerate()
            .map(|(index, e)| {
                let version = parse_version(e.name).unwrap_or_default();
                Schema {
                    id: SchemaId { edition, index },
                    name: e.name,
                    version,
                    data_version: 0,
                    flags: SchemaFlags {
                        namespaced_status: false,
                        int_item_count: false,
                        chunk_version: e.chunk_version,
                        block_version: bedrock_block_version(version),
                        network_version: e.network_version,
                    },
                }
            })
            .collect(),
    }
}

/// 列出平台可选的目标版本，最新的在前
pub fn list_target_versions(platform: &str) -> Result<Vec<String>> {
    let edition = Edition::parse_platform(platform)?;
    Ok(super::SchemaRegistry::global()
        .schemas(edition)
        .iter()
        .rev()
        .map(|s| s.name.to_string())
        .collect())
}

impl ConvertError {
    pub(crate) fn unsupported(edition: Edition, detected: impl Into<String>) -> Self {
        let oldest = super::SchemaRegistry::global()
            .schemas(edition)
            .first()
            .map(|s| s.name.to_string())
            .unwrap_or_default();
        ConvertError::UnsupportedSchema {
            edition,
            detected: detected.into(),
            oldest,
        }
    }
}
