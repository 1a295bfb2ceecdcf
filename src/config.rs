//! 配置文件加载与管理

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 主配置结构
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 映射回退配置
    pub mapping: MappingConfig,
    /// 强制修复配置
    pub repair: RepairConfig,
    /// 输出配置
    pub output: OutputConfig,
}

/// 映射配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// 无法映射的方块在 Java 中的替代
    pub java_fallback_block: String,
    /// 无法映射的方块在 Bedrock 中的替代
    pub bedrock_fallback_block: String,
    /// 无法映射的生物群系在 Java 中的替代
    pub java_fallback_biome: String,
    /// 无法映射的生物群系在 Bedrock 中的替代（数字 ID）
    pub bedrock_fallback_biome: i32,
    /// 跨版本族转换时跳过未完全生成的区块
    pub skip_partial_chunks: bool,
}

/// 强制修复配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// 视为过期派生数据、修复时移除的区块字段
    pub stale_chunk_fields: Vec<String>,
    /// 丢弃光照数据，由游戏重新计算
    pub drop_light: bool,
    /// 修复时丢弃的派生数据目录（相对存档根目录）
    pub discard_paths: Vec<String>,
}

/// 输出配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// zlib / deflate 压缩级别（0-9）
    pub compression_level: u32,
    /// 暂存目录后缀
    pub stage_suffix: String,
}

// ============== 默认值 ==============

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            java_fallback_block: "minecraft:stone".to_string(),
            bedrock_fallback_block: "minecraft:stone".to_string(),
            java_fallback_biome: "minecraft:plains".to_string(),
            bedrock_fallback_biome: 1,
            skip_partial_chunks: true,
        }
    }
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            stale_chunk_fields: vec![
                "Heightmaps".to_string(),
                "isLightOn".to_string(),
                "PostProcessing".to_string(),
                "blending_data".to_string(),
                "CarvingMasks".to_string(),
            ],
            drop_light: true,
            discard_paths: vec!["poi".to_string()],
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            compression_level: 6,
            stage_suffix: ".mcconvert-stage".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn compression(&self) -> flate2::Compression {
        flate2::Compression::new(self.compression_level.min(9))
    }
}

// ============== 配置加载 ==============

impl Config {
    /// 从文件加载配置
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// 获取默认配置文件路径
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("mcconvert").join("config.toml"))
    }

    /// 按优先级加载配置：
    /// 1. 当前目录的 mcconvert.toml
    /// 2. 用户配置目录的 config.toml
    /// 3. 默认配置
    pub fn load() -> Self {
        // 当前目录
        let local_config = Path::new("mcconvert.toml");
        if local_config.exists() {
            if let Ok(config) = Self::load_from_file(local_config) {
                info!("Loaded config: mcconvert.toml");
                return config;
            }
        }

        // 用户配置目录
        if let Some(user_config) = Self::default_config_path() {
            if user_config.exists() {
                if let Ok(config) = Self::load_from_file(&user_config) {
                    info!("Loaded config: {}", user_config.display());
                    return config;
                }
            }
        }

        // 默认配置
        Self::default()
    }

    /// 生成默认配置文件内容
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}
