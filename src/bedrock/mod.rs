//! Bedrock 版存档格式

pub mod chunk;
pub mod db;
pub mod level;
pub mod reader;
pub mod subchunk;
pub mod writer;

pub use reader::{is_bedrock_world, BedrockSource};
pub use writer::BedrockWriter;
