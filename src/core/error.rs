//! 错误类型：会话传输、单局运行、运行中止
//!
//! SessionError 覆盖 NotConnected 与各类传输失败（网络、握手、超时、JSON-RPC 错误）；
//! RunAborted 携带已定稿的 RunResult，调用方在失败时依然能拿到迭代数与状态。

use thiserror::Error;

use crate::core::RunResult;
use crate::llm::LlmError;

/// 一次远程调用可能出现的错误
#[derive(Error, Debug)]
pub enum SessionError {
    /// 未调用 connect 或已 cleanup 后仍发起调用
    #[error("client is not connected to a server")]
    NotConnected,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("remote call '{operation}' timed out after {secs}s")]
    Timeout { operation: String, secs: u64 },

    #[error("remote returned JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// 对端返回了不符合 MCP 约定的数据
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl SessionError {
    /// NotConnected 之外的错误都属于传输类失败
    pub fn is_transport(&self) -> bool {
        !matches!(self, SessionError::NotConnected)
    }
}

impl From<reqwest::Error> for SessionError {
    fn from(e: reqwest::Error) -> Self {
        SessionError::Transport(e.to_string())
    }
}

/// 单局中导致回合无法继续的错误
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("text generation failed: {0}")]
    Llm(#[from] LlmError),
}

/// 单局异常结束：清理已完成，partial 为定稿后的结果（success 保持未决）
#[derive(Error, Debug)]
#[error("run aborted after {iterations} iterations: {source}", iterations = .partial.iterations)]
pub struct RunAborted {
    pub partial: RunResult,
    pub source: RunError,
}
