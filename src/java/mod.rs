//! Java 版存档格式

pub mod chunk;
pub mod level;
pub mod reader;
pub mod region;
pub mod writer;

pub use reader::{is_java_world, JavaSource};
pub use writer::JavaWriter;
