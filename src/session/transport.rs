//! 会话传输抽象
//!
//! 一次 execute = 打开会话 -> 一次请求/响应 -> 关闭会话；实现不得在调用之间复用连接。

use async_trait::async_trait;
use serde_json::Value;

use crate::core::SessionError;

/// 会话传输 trait：对指定端点调用一次远程操作，返回拼接后的文本
#[async_trait]
pub trait SessionTransport: Send + Sync {
    async fn execute(&self, endpoint: &str, operation: &str, arguments: Value) -> Result<String, SessionError>;
}
