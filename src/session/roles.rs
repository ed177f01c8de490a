//! 角色客户端：固定操作名 + 固定参数形状
//!
//! | 角色     | 远程操作           | 参数                 |
//! |----------|--------------------|----------------------|
//! | Defuser  | `game_interaction` | `{command: string}`  |
//! | Expert   | `get_manual`       | `{}`                 |
//! | Resetter | `reset`            | `{module: string?}`  |

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;
use std::sync::Arc;

use serde_json::json;

use crate::core::SessionError;
use crate::session::{BombClient, SessionTransport};

/// 角色标识
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RoleKind {
    Defuser,
    Expert,
    Resetter,
}

impl RoleKind {
    /// 该角色调用的远程操作名
    pub fn operation(self) -> &'static str {
        match self {
            RoleKind::Defuser => "game_interaction",
            RoleKind::Expert => "get_manual",
            RoleKind::Resetter => "reset",
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoleKind::Defuser => "Defuser",
            RoleKind::Expert => "Expert",
            RoleKind::Resetter => "Resetter",
        };
        f.write_str(name)
    }
}

impl FromStr for RoleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "defuser" => Ok(RoleKind::Defuser),
            "expert" => Ok(RoleKind::Expert),
            "resetter" => Ok(RoleKind::Resetter),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

macro_rules! role_client {
    ($name:ident) => {
        pub struct $name(BombClient);

        impl $name {
            pub fn new(transport: Arc<dyn SessionTransport>) -> Self {
                Self(BombClient::new(transport))
            }
        }

        impl Deref for $name {
            type Target = BombClient;

            fn deref(&self) -> &BombClient {
                &self.0
            }
        }

        impl DerefMut for $name {
            fn deref_mut(&mut self) -> &mut BombClient {
                &mut self.0
            }
        }
    };
}

role_client!(Defuser);
role_client!(Expert);
role_client!(Resetter);

impl Defuser {
    /// 向设备发送一条命令；命令内容不做校验，由设备裁定
    pub async fn run(&self, action: &str) -> Result<String, SessionError> {
        self.process_query(RoleKind::Defuser.operation(), json!({ "command": action }))
            .await
    }
}

impl Expert {
    /// 取回手册全文
    pub async fn run(&self) -> Result<String, SessionError> {
        self.process_query(RoleKind::Expert.operation(), json!({})).await
    }
}

impl Resetter {
    /// 重置指定模块；`None` 由设备解释为全部模块
    pub async fn run(&self, module: Option<&str>) -> Result<String, SessionError> {
        self.process_query(RoleKind::Resetter.operation(), json!({ "module": module }))
            .await
    }
}
