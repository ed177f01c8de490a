//! 动作提取：从自由文本中挑出一条设备可识别的命令
//!
//! 逐行扫描，trim + 小写后以识别前缀开头的第一行即为动作（保留该行其余参数）；
//! 没有任何匹配时退回安全默认 `help`，设备协议保证它无副作用。

use serde::Serialize;

/// 设备可识别的命令前缀（大小写不敏感，仅字面前缀匹配）
pub const ACTION_PREFIXES: [&str; 6] = ["cut", "press", "hold", "release", "help", "state"];

/// 无法解析时使用的安全默认命令
pub const SAFE_DEFAULT: &str = "help";

/// 提取结果：识别到的命令，或回退到安全默认
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "command", rename_all = "snake_case")]
pub enum Action {
    Recognized(String),
    Fallback,
}

impl Action {
    /// 实际发送给设备的命令文本
    pub fn command(&self) -> &str {
        match self {
            Action::Recognized(command) => command,
            Action::Fallback => SAFE_DEFAULT,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Action::Fallback)
    }
}

/// 从生成文本中提取动作
pub fn extract(raw: &str) -> Action {
    raw.lines()
        .map(|line| line.trim().to_lowercase())
        .find(|line| ACTION_PREFIXES.iter().any(|prefix| line.starts_with(prefix)))
        .map(Action::Recognized)
        .unwrap_or(Action::Fallback)
}

/// 字符串形式的提取：等价于 `extract(raw).command()`
pub fn extract_command(raw: &str) -> String {
    extract(raw).command().to_string()
}
