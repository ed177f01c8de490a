//! Defusal - 双智能体拆弹编排
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、单局状态机与结果分类
//! - **game**: 动作提取、Prompt 构造、回合主循环、参数扫描
//! - **llm**: 文本生成抽象与实现（OpenAI 兼容 / Mock）
//! - **observability**: 日志初始化
//! - **session**: MCP SSE 会话传输与 Defuser / Expert / Resetter 角色客户端

pub mod config;
pub mod core;
pub mod game;
pub mod llm;
pub mod observability;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use core::{RunAborted, RunResult, RunState, SessionError, Success};
pub use game::{GameRun, RunOptions};
