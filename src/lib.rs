//! Minecraft 存档转换工具
//!
//! 在 Java 版与 Bedrock 版之间（以及同一版本族的不同版本之间）转换存档。

pub mod batch;
pub mod bedrock;
pub mod config;
pub mod error;
pub mod format;
pub mod java;
pub mod mapper;
pub mod model;
pub mod nbt;
pub mod nbt_le;
pub mod pipeline;
pub mod progress;
pub mod repair;
pub mod schema;
pub mod staging;

pub use config::Config;
pub use error::{ConvertError, Result};
pub use format::{FormatReader, FormatWriter};
pub use mapper::BlockMapper;
pub use model::{Edition, WorldModel};
pub use pipeline::{Direction, Pipeline};
pub use progress::{CancelToken, ConversionResult, ItemResult, ProgressSink};
pub use schema::{list_target_versions, SchemaRegistry};

use std::path::{Path, PathBuf};

/// 带配置与取消标记的转换入口
#[derive(Debug, Clone, Default)]
pub struct Engine {
    pub config: Config,
    pub cancel: CancelToken,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            cancel: CancelToken::new(),
        }
    }

    /// 转换单个存档；任何错误都以 `success = false` 的结果返回
    pub fn convert_world(
        &self,
        input: &Path,
        output: &Path,
        direction: &str,
        target_version: Option<&str>,
        force_repair: bool,
        log: &mut dyn ProgressSink,
    ) -> ConversionResult {
        let outcome = direction.parse::<Direction>().and_then(|direction| {
            Pipeline::new(&self.config, &self.cancel).run(input, output, direction, target_version, force_repair, log)
        });
        match outcome {
            Ok(stats) => {
                let message = stats.summary();
                log.line(&message);
                ConversionResult::ok(message)
            }
            Err(e) => {
                let message = e.to_string();
                log.line(&format!("Conversion failed: {}", message));
                ConversionResult::failed(message)
            }
        }
    }

    /// 按顺序转换多个存档到 `output_root` 下的子目录
    pub fn convert_batch(
        &self,
        inputs: &[PathBuf],
        output_root: &Path,
        direction: &str,
        target_version: Option<&str>,
        force_repair: bool,
        log: &mut dyn ProgressSink,
    ) -> ConversionResult {
        let outcome = direction.parse::<Direction>().and_then(|direction| {
            batch::run_batch(
                &self.config,
                &self.cancel,
                inputs,
                output_root,
                direction,
                target_version,
                force_repair,
                log,
            )
        });
        match outcome {
            Ok(result) => {
                log.line(&result.message);
                result
            }
            Err(e) => {
                let message = e.to_string();
                log.line(&format!("Batch failed: {}", message));
                ConversionResult::failed(message)
            }
        }
    }
}

/// 使用默认配置加载顺序转换单个存档
pub fn convert_world(
    input: &Path,
    output: &Path,
    direction: &str,
    target_version: Option<&str>,
    force_repair: bool,
    log: &mut dyn ProgressSink,
) -> ConversionResult {
    Engine::new(Config::load()).convert_world(input, output, direction, target_version, force_repair, log)
}

/// 使用默认配置加载顺序批量转换
pub fn convert_batch(
    inputs: &[PathBuf],
    output_root: &Path,
    direction: &str,
    target_version: Option<&str>,
    force_repair: bool,
    log: &mut dyn ProgressSink,
) -> ConversionResult {
    Engine::new(Config::load()).convert_batch(inputs, output_root, direction, target_version, force_repair, log)
}
