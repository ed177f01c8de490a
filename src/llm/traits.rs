//! 文本生成抽象
//!
//! 编排循环只依赖 TextGenerator：输入一段对话与采样参数，返回文本。
//! 输出被当作不可信的自由文本，由动作提取器兜底。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::Message;

/// 生成错误
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// 采样参数；`do_sample = false` 时实现应退化为贪心解码
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub do_sample: bool,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 50,
            temperature: 0.7,
            top_p: 0.9,
            top_k: 50,
            do_sample: true,
        }
    }
}

/// 文本生成 trait
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, messages: &[Message], params: &SamplingParams) -> Result<String, LlmError>;

    /// 用于日志的后端名称
    fn name(&self) -> &str {
        "generator"
    }
}
