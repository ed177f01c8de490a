//! 会话层：单次使用的 MCP 会话传输与三种角色客户端

pub mod client;
pub mod roles;
pub mod sse;
pub mod transport;

pub use client::BombClient;
pub use roles::{Defuser, Expert, Resetter, RoleKind};
pub use sse::SseTransport;
pub use transport::SessionTransport;

use std::sync::Arc;

use crate::config::AppConfig;

/// 按 [server] 配置创建 SSE 传输
pub fn create_transport_from_config(cfg: &AppConfig) -> Arc<dyn SessionTransport> {
    Arc::new(SseTransport::new(
        cfg.server.client_name.clone(),
        cfg.server.call_timeout_secs,
    ))
}
