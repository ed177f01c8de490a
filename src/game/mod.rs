//! 编排层：动作提取、Prompt 构造、回合主循环、过程事件与参数扫描

pub mod action;
pub mod events;
pub mod loop_;
pub mod prompts;
pub mod sweep;

pub use action::{extract, extract_command, Action, ACTION_PREFIXES, SAFE_DEFAULT};
pub use events::RunEvent;
pub use loop_::{GameRun, RunOptions};
pub use prompts::{defuser_prompt, expert_prompt, DefuserStage, PromptMode};
pub use sweep::{combinations, Sweep, SweepEntry, SweepKey, SweepReport};
