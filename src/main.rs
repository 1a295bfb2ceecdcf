//! Minecraft 存档转换工具 - Java ⇄ Bedrock

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;

use mcconvert::{list_target_versions, Config, ConversionResult, Engine};

/// Minecraft 存档转换工具 - Java ⇄ Bedrock
#[derive(Parser)]
#[command(name = "mcconvert", version, about)]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 以 JSON 输出结果
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 转换单个存档
    Convert {
        /// 源存档文件夹
        input: PathBuf,
        /// 输出存档文件夹
        output: PathBuf,
        /// 转换方向：bedrock-to-java、java-to-bedrock、java-to-java、bedrock-to-bedrock
        #[arg(short, long)]
        direction: String,
        /// 目标版本（默认最新）
        #[arg(short = 't', long = "target")]
        target_version: Option<String>,
        /// 转换后强制修复
        #[arg(long)]
        force_repair: bool,
    },
    /// 批量转换多个存档
    Batch {
        /// 输出根目录，每个存档写入同名子目录
        #[arg(short, long)]
        output: PathBuf,
        /// 转换方向
        #[arg(short, long)]
        direction: String,
        /// 目标版本（默认最新）
        #[arg(short = 't', long = "target")]
        target_version: Option<String>,
        /// 转换后强制修复
        #[arg(long)]
        force_repair: bool,
        /// 源存档文件夹
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// 列出平台可选的目标版本
    Versions {
        /// java 或 bedrock
        platform: String,
    },
    /// 生成默认配置文件
    Config {
        /// 输出路径（默认: mcconvert.toml）
        #[arg(short, long, default_value = "mcconvert.toml")]
        output: PathBuf,
        /// 覆盖已存在的文件
        #[arg(long)]
        force: bool,
    },
}

fn load_config(config_path: Option<PathBuf>) -> Config {
    if let Some(path) = config_path {
        match Config::load_from_file(&path) {
            Ok(config) => {
                log::info!("Loaded config: {}", path.display());
                return config;
            }
            Err(e) => {
                eprintln!("警告: 无法加载配置 {}: {:#}", path.display(), e);
            }
        }
    }
    Config::load()
}

fn report(result: &ConversionResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else if let Some(details) = &result.details {
        println!();
        for item in details {
            let mark = if item.success { "✓" } else { "✗" };
            println!("{} {} -> {}: {}", mark, item.input, item.output, item.message);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let json = cli.json;

    // JSON 模式下进度写到 stderr，stdout 只留结果
    let mut sink = |line: &str| {
        if json {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    };

    match cli.command {
        Commands::Convert {
            input,
            output,
            direction,
            target_version,
            force_repair,
        } => {
            let engine = Engine::new(load_config(cli.config));
            let start = Instant::now();
            let result = engine.convert_world(
                &input,
                &output,
                &direction,
                target_version.as_deref(),
                force_repair,
                &mut sink,
            );
            report(&result, json)?;
            if !json {
                println!("耗时: {:.2}s", start.elapsed().as_secs_f64());
            }
            if !result.success {
                std::process::exit(1);
            }
        }

        Commands::Batch {
            output,
            direction,
            target_version,
            force_repair,
            inputs,
        } => {
            let engine = Engine::new(load_config(cli.config));
            let start = Instant::now();
            let result = engine.convert_batch(
                &inputs,
                &output,
                &direction,
                target_version.as_deref(),
                force_repair,
                &mut sink,
            );
            report(&result, json)?;
            if !json {
                println!("耗时: {:.2}s", start.elapsed().as_secs_f64());
            }
            if !result.success {
                std::process::exit(1);
            }
        }

        Commands::Versions { platform } => {
            let versions = list_target_versions(&platform)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&versions)?);
            } else {
                for version in versions {
                    println!("{}", version);
                }
            }
        }

        Commands::Config { output, force } => {
            if output.exists() && !force {
                anyhow::bail!("文件已存在: {:?}\n使用 --force 覆盖", output);
            }

            let default_config = Config::default();
            default_config.save_to_file(&output)?;
            println!("已生成配置文件: {:?}", output);
            println!("\n配置项说明:");
            println!("  [mapping]");
            println!(
                "    java_fallback_block = {:?}     # 无法映射的方块",
                default_config.mapping.java_fallback_block
            );
            println!(
                "    skip_partial_chunks = {}         # 跨版本族时跳过未生成完的区块",
                default_config.mapping.skip_partial_chunks
            );
            println!("  [repair]");
            println!("    stale_chunk_fields = [...]        # 修复时移除的区块字段");
            println!(
                "    drop_light = {}                  # 丢弃光照",
                default_config.repair.drop_light
            );
            println!("    discard_paths = [...]             # 修复时删除的目录");
            println!("  [output]");
            println!(
                "    compression_level = {}            # 压缩级别",
                default_config.output.compression_level
            );
        }
    }

    Ok(())
}
