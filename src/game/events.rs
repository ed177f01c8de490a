//! 单局过程事件：供调用方实时观察回合推进与收尾

use serde::Serialize;

use crate::core::{Outcome, RunState, Success};

/// 单局过程事件（可序列化为 JSON）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// 开局前的设备重置完成
    Reset { response: String },
    /// 新回合开始（round 从 1 计）
    RoundStarted { round: usize, iteration_limit: usize },
    /// 动作已提取；fallback 为 true 表示生成文本无法解析
    ActionChosen {
        round: usize,
        command: String,
        fallback: bool,
    },
    /// 动作响应已分类
    RoundFinished {
        round: usize,
        outcome: Outcome,
        state: RunState,
    },
    /// 循环结束（任何路径）
    Finished {
        iterations: usize,
        success: Success,
        state: RunState,
    },
    /// 收尾清理完成；released 为清理前仍持有端点的客户端数
    CleanedUp { released: usize },
}
