//! 批量转换：按顺序逐个运行，单个失败不影响其他存档

use log::info;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{ConvertError, Result};
use crate::pipeline::{Direction, Pipeline};
use crate::progress::{CancelToken, ConversionResult, ItemResult, ProgressSink};
use crate::schema::SchemaRegistry;

/// 每个输入的输出子目录名：取输入目录名，重名依次加 `_2`、`_3` …
pub fn output_names(inputs: &[PathBuf]) -> Vec<String> {
    let mut used = HashSet::new();
    inputs
        .iter()
        .map(|input| {
            let base = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "world".to_string());
            let mut name = base.clone();
            let mut n = 2;
            while !used.insert(name.clone()) {
                name = format!("{}_{}", base, n);
                n += 1;
            }
            name
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
pub fn run_batch(
    config: &Config,
    cancel: &CancelToken,
    inputs: &[PathBuf],
    output_root: &Path,
    direction: Direction,
    target_version: Option<&str>,
    force_repair: bool,
    log: &mut dyn ProgressSink,
) -> Result<ConversionResult> {
    if inputs.is_empty() {
        return Err(ConvertError::EmptyBatch);
    }
    let names = output_names(inputs);
    // 目标版本对所有存档相同；无效时每项都记同一个失败，不做任何 I/O
    if let Err(e) = SchemaRegistry::global().target(target_version, direction.target) {
        let message = e.to_string();
        let details = inputs
            .iter()
            .zip(&names)
            .map(|(input, name)| ItemResult {
                input: input.display().to_string(),
                output: output_root.join(name).display().to_string(),
                success: false,
                message: message.clone(),
            })
            .collect();
        return Ok(ConversionResult {
            success: false,
            message,
            details: Some(details),
        });
    }

    let mut details = Vec::with_capacity(inputs.len());
    for (i, (input, name)) in inputs.iter().zip(&names).enumerate() {
        let output = output_root.join(name);
        log.line(&format!("[{}/{}] {} -> {}", i + 1, inputs.len(), input.display(), output.display()));
        let mut pipeline = Pipeline::new(config, cancel);
        let item = match pipeline.run(input, &output, direction, target_version, force_repair, log) {
            Ok(stats) => ItemResult {
                input: input.display().to_string(),
                output: output.display().to_string(),
                success: true,
                message: stats.summary(),
            },
            Err(e) => ItemResult {
                input: input.display().to_string(),
                output: output.display().to_string(),
                success: false,
                message: e.to_string(),
            },
        };
        log.line(&format!("[{}/{}] {}", i + 1, inputs.len(), item.message));
        details.push(item);
    }

    let succeeded = details.iter().filter(|d| d.success).count();
    info!("Batch finished: {}/{} succeeded", succeeded, details.len());
    Ok(ConversionResult {
        success: succeeded == details.len(),
        message: format!("Converted {} of {} world(s)", succeeded, details.len()),
        details: Some(details),
    })
}
