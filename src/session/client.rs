//! 设备客户端：保存端点并把每次查询交给会话传输
//!
//! connect 只记录端点，真正的连接在每次 process_query 内开关；cleanup 清空端点，
//! 之后的调用返回 NotConnected，直到再次 connect。

use std::sync::Arc;

use serde_json::Value;

use crate::core::SessionError;
use crate::session::SessionTransport;

/// 角色客户端共用的底座
pub struct BombClient {
    transport: Arc<dyn SessionTransport>,
    endpoint: Option<String>,
}

impl BombClient {
    pub fn new(transport: Arc<dyn SessionTransport>) -> Self {
        Self {
            transport,
            endpoint: None,
        }
    }

    pub fn connect(&mut self, endpoint: impl Into<String>) {
        self.endpoint = Some(endpoint.into());
    }

    pub fn is_connected(&self) -> bool {
        self.endpoint.is_some()
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// 对当前端点执行一次远程操作
    pub async fn process_query(&self, operation: &str, arguments: Value) -> Result<String, SessionError> {
        let endpoint = self.endpoint.as_deref().ok_or(SessionError::NotConnected)?;
        self.transport.execute(endpoint, operation, arguments).await
    }

    /// 清空端点；返回调用前是否处于连接状态
    pub fn cleanup(&mut self) -> bool {
        self.endpoint.take().is_some()
    }
}
