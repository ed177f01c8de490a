//! Prompt 构造：为拆弹员与专家拼出一次性对话
//!
//! 每次调用都返回 system + user 两条消息；模式只改变 system 的排版风格。

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::llm::Message;

/// Prompt 排版风格
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptMode {
    #[default]
    Default,
    Natural,
    Markdown,
    Json,
}

impl FromStr for PromptMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(PromptMode::Default),
            "natural" => Ok(PromptMode::Natural),
            "markdown" => Ok(PromptMode::Markdown),
            "json" => Ok(PromptMode::Json),
            other => Err(format!("unknown prompt mode '{}'", other)),
        }
    }
}

/// 拆弹员的两个发言阶段
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DefuserStage {
    /// 描述炸弹并向专家提问
    Question,
    /// 根据专家建议选出一个动作
    Action,
}

const NEUTRAL_SYSTEM: &str = "You are a careful, helpful assistant.";

fn defuser_system(mode: PromptMode, stage: DefuserStage) -> &'static str {
    match (mode, stage) {
        (PromptMode::Natural, DefuserStage::Question) => {
            "You are the bomb defuser. You can see the bomb but not the manual.\n\
             Describe the bomb to the expert and ask which action to take.\n\
             Do not write anything else."
        }
        (PromptMode::Markdown, DefuserStage::Question) => {
            "# ROLE\nYou are looking at a bomb.\n\
             ## INSTRUCTIONS\nDescribe the bomb to the expert so they can tell you how to defuse it."
        }
        (PromptMode::Json, DefuserStage::Question) => {
            r#"{"role": "defuser", "situation": "You are looking at a bomb.", "instructions": "Write a JSON object describing the bomb for the expert."}"#
        }
        (PromptMode::Natural, DefuserStage::Action) => {
            "Choose exactly one action the expert told you to take.\n\
             Reply with the command alone on its own line."
        }
        (PromptMode::Markdown, DefuserStage::Action) => {
            "## INSTRUCTIONS\nPick exactly one command from the expert's advice.\n\
             Put the command alone on its own line."
        }
        (PromptMode::Json, DefuserStage::Action) => {
            r#"{"role": "defuser", "instructions": "Execute the first command the expert gave. Write the command alone on its own line."}"#
        }
        (PromptMode::Default, _) => NEUTRAL_SYSTEM,
    }
}

fn expert_system(mode: PromptMode) -> &'static str {
    match mode {
        PromptMode::Natural => {
            "You advise another person who is defusing a bomb. You have the manual, they have the bomb.\n\
             Compare their description with the manual and tell them which command to use.\n\
             Only mention commands listed as available. Be very concise."
        }
        PromptMode::Markdown => {
            "# ROLE\nYou are the manual expert in a bomb defusal game.\n\
             ## OBSERVATIONS\nAvailable actions are listed after the \"Available commands:\" line.\n\
             The bomb state follows the line containing BOMB STATE.\n\
             ## INSTRUCTIONS\nRepeat the relevant rule, then give the single command to use. Be concise."
        }
        PromptMode::Json => {
            r#"{"role": "expert", "situation": "You have the bomb manual; the defuser has the bomb.", "instructions": "Write a JSON object with a list of actions for the defuser, using only available commands."}"#
        }
        PromptMode::Default => NEUTRAL_SYSTEM,
    }
}

/// 拆弹员对话：Question 阶段 advice 为空
pub fn defuser_prompt(bomb_state: &str, expert_advice: &str, mode: PromptMode, stage: DefuserStage) -> Vec<Message> {
    let user_content = format!(
        "Current bomb state:\n{}\n\nExpert's advice:\n{}\n\n",
        bomb_state, expert_advice
    );
    vec![
        Message::system(defuser_system(mode, stage)),
        Message::user(user_content),
    ]
}

/// 专家对话：手册 + 拆弹员的描述/提问
pub fn expert_prompt(manual_text: &str, defuser_question: &str, mode: PromptMode) -> Vec<Message> {
    let user_content = format!(
        "Manual excerpt:\n{}\n\nDEFUSER sees or asks:\n{}\n\n",
        manual_text, defuser_question
    );
    vec![Message::system(expert_system(mode)), Message::user(user_content)]
}
