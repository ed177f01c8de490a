//! 脚本化生成器（用于测试与离线演练，无需 API）
//!
//! 按顺序返回预置回复，耗尽后一直返回 fallback。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmError, Message, SamplingParams, TextGenerator};

/// 脚本化生成器：回复队列 + 兜底回复
#[derive(Debug)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<String>>,
    fallback: String,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new<I, S>(replies: I, fallback: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            fallback: fallback.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// 永远返回同一句话
    pub fn constant(reply: impl Into<String>) -> Self {
        Self::new(Vec::<String>::new(), reply)
    }

    /// 已被调用的次数
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedGenerator {
    fn default() -> Self {
        Self::constant("state")
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, _messages: &[Message], _params: &SamplingParams) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .replies
            .lock()
            .map_err(|_| LlmError::Request("script lock poisoned".to_string()))?
            .pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
