//! LLM 层：生成器抽象与实现（OpenAI 兼容 / Mock）

pub mod message;
pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

pub use message::{Message, Role};
pub use mock::ScriptedGenerator;
pub use openai::OpenAiGenerator;
pub use traits::{LlmError, SamplingParams, TextGenerator};

use crate::config::AppConfig;

/// 按配置创建生成器：provider = mock 时返回脚本化生成器（总是回答 "help"），否则走 OpenAI 兼容端点
pub fn create_generator_from_config(cfg: &AppConfig) -> Arc<dyn TextGenerator> {
    match cfg.llm.provider.as_str() {
        "mock" => {
            tracing::info!("Using mock text generator");
            Arc::new(ScriptedGenerator::constant("help"))
        }
        provider => {
            if provider != "openai" {
                tracing::warn!(provider, "Unknown LLM provider, falling back to OpenAI-compatible client");
            }
            tracing::info!(model = %cfg.llm.model, base_url = ?cfg.llm.base_url, "Using OpenAI-compatible text generator");
            Arc::new(OpenAiGenerator::new(
                cfg.llm.base_url.as_deref(),
                &cfg.llm.model,
                cfg.llm.api_key.as_deref(),
            ))
        }
    }
}
