//! 进度输出与转换结果

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 只追加的进度行接收端
///
/// 只会在执行转换的线程上调用，行的顺序即实际进度顺序。
pub trait ProgressSink {
    fn line(&mut self, line: &str);
}

impl<F> ProgressSink for F
where
    F: FnMut(&str),
{
    fn line(&mut self, line: &str) {
        self(line)
    }
}

/// 转换结果（单个或批量）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionResult {
    pub success: bool,
    pub message: String,
    /// 仅批量模式填充，每个输入一项，保持输入顺序
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ItemResult>>,
}

/// 批量模式中单个存档的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemResult {
    pub input: String,
    pub output: String,
    pub success: bool,
    pub message: String,
}

impl ConversionResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            details: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            details: None,
        }
    }
}

/// 协作式取消标记，在区块之间检查
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
