//! 单局状态机：RunState、结果分类与纯转移函数
//!
//! 设备文本只在这里被解释。分类只做大小写敏感的子串匹配，
//! 优先级固定为 拆除 > 爆炸 > 未知命令，保证同一输入总得到同一结果。

use serde::Serialize;

use crate::game::Action;

/// 回合开头查询 state 时的终局标记
pub const STATE_DISARMED_MARKER: &str = "Bomb disarmed!";
pub const STATE_EXPLODED_MARKER: &str = "Bomb exploded!";

/// 执行动作后设备响应中的标记
pub const DISARMED_MARKER: &str = "BOMB SUCCESSFULLY DISARMED";
pub const EXPLODED_MARKER: &str = "BOMB HAS EXPLODED";
pub const UNKNOWN_COMMAND_MARKER: &str = "Unknown command";

/// 编排循环的显式状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    Disarmed,
    Exploded,
    IterationLimitReached,
    UnknownCommandAbort,
    Error,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        self != RunState::Running
    }
}

/// 三态成功标记：未决 / 成功 / 失败
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Success {
    #[default]
    Undecided,
    Succeeded,
    Failed,
}

impl Success {
    /// 汇总报表使用的数值编码：-1 未决，1 成功，0 失败
    pub fn code(self) -> i8 {
        match self {
            Success::Undecided => -1,
            Success::Succeeded => 1,
            Success::Failed => 0,
        }
    }
}

/// 一次动作响应的分类
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Continuing,
    Solved,
    Failed,
    ProtocolError,
}

impl Outcome {
    /// 该分类对应的下一状态
    pub fn next_state(self) -> RunState {
        match self {
            Outcome::Continuing => RunState::Running,
            Outcome::Solved => RunState::Disarmed,
            Outcome::Failed => RunState::Exploded,
            Outcome::ProtocolError => RunState::UnknownCommandAbort,
        }
    }

    /// 该分类对成功标记的裁定；Continuing 不改变标记
    pub fn verdict(self) -> Option<Success> {
        match self {
            Outcome::Continuing => None,
            Outcome::Solved => Some(Success::Succeeded),
            Outcome::Failed | Outcome::ProtocolError => Some(Success::Failed),
        }
    }
}

/// 对动作响应做子串分类
pub fn classify(response: &str) -> Outcome {
    if response.contains(DISARMED_MARKER) {
        Outcome::Solved
    } else if response.contains(EXPLODED_MARKER) {
        Outcome::Failed
    } else if response.contains(UNKNOWN_COMMAND_MARKER) {
        Outcome::ProtocolError
    } else {
        Outcome::Continuing
    }
}

/// 纯转移函数：终局状态吸收一切输入，Running 按响应分类转移
pub fn transition(current: RunState, response: &str) -> RunState {
    if current.is_terminal() {
        return current;
    }
    classify(response).next_state()
}

/// 回合开头的 state 文本若已是终局则短路本回合
pub fn precheck(bomb_state: &str) -> Option<RunState> {
    if bomb_state.contains(STATE_DISARMED_MARKER) {
        Some(RunState::Disarmed)
    } else if bomb_state.contains(STATE_EXPLODED_MARKER) {
        Some(RunState::Exploded)
    } else {
        None
    }
}

/// 一个完整回合的记录
#[derive(Clone, Debug, Serialize)]
pub struct RoundRecord {
    pub index: usize,
    pub bomb_state: String,
    pub question: String,
    pub advice: String,
    pub action: Action,
    pub response: String,
    pub outcome: Outcome,
}

/// 单局结果：迭代数、成功标记、最终状态与回合记录
#[derive(Clone, Debug, Serialize)]
pub struct RunResult {
    pub iterations: usize,
    pub success: Success,
    pub state: RunState,
    pub rounds: Vec<RoundRecord>,
}

impl RunResult {
    pub fn new() -> Self {
        Self {
            iterations: 0,
            success: Success::Undecided,
            state: RunState::Running,
            rounds: Vec::new(),
        }
    }

    /// 记录一个已执行动作的回合并推进状态
    pub fn apply_round(&mut self, record: RoundRecord) {
        self.iterations += 1;
        self.state = transition(self.state, &record.response);
        if let Some(verdict) = record.outcome.verdict() {
            self.success = verdict;
        }
        self.rounds.push(record);
    }
}

impl Default for RunResult {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(response: &str) -> RoundRecord {
        RoundRecord {
            index: 1,
            bomb_state: "BOMB STATE".into(),
            question: String::new(),
            advice: String::new(),
            action: Action::Fallback,
            response: response.into(),
            outcome: classify(response),
        }
    }

    #[test]
    fn test_classify_markers() {
        assert_eq!(classify("... BOMB SUCCESSFULLY DISARMED ..."), Outcome::Solved);
        assert_eq!(classify("BOMB HAS EXPLODED"), Outcome::Failed);
        assert_eq!(classify("Unknown command: dance"), Outcome::ProtocolError);
        assert_eq!(classify("Wire cut. Module still armed."), Outcome::Continuing);
    }

    #[test]
    fn test_classify_is_case_sensitive() {
        assert_eq!(classify("bomb successfully disarmed"), Outcome::Continuing);
        assert_eq!(classify("unknown command"), Outcome::Continuing);
    }

    #[test]
    fn test_classify_priority_on_overlap() {
        let text = "Unknown command\nBOMB HAS EXPLODED\nBOMB SUCCESSFULLY DISARMED";
        assert_eq!(classify(text), Outcome::Solved);
        assert_eq!(classify("Unknown command, BOMB HAS EXPLODED"), Outcome::Failed);
    }

    #[test]
    fn test_transition_from_running() {
        assert_eq!(transition(RunState::Running, "nothing"), RunState::Running);
        assert_eq!(
            transition(RunState::Running, "BOMB SUCCESSFULLY DISARMED"),
            RunState::Disarmed
        );
        assert_eq!(
            transition(RunState::Running, "BOMB HAS EXPLODED"),
            RunState::Exploded
        );
        assert_eq!(
            transition(RunState::Running, "Unknown command"),
            RunState::UnknownCommandAbort
        );
    }

    #[test]
    fn test_terminal_states_absorb() {
        assert_eq!(
            transition(RunState::Exploded, "BOMB SUCCESSFULLY DISARMED"),
            RunState::Exploded
        );
        assert_eq!(
            transition(RunState::IterationLimitReached, "Unknown command"),
            RunState::IterationLimitReached
        );
    }

    #[test]
    fn test_precheck_uses_state_markers() {
        assert_eq!(precheck("Bomb disarmed!"), Some(RunState::Disarmed));
        assert_eq!(precheck("Bomb exploded!"), Some(RunState::Exploded));
        // 动作响应的标记不参与开头检查
        assert_eq!(precheck("BOMB SUCCESSFULLY DISARMED"), None);
        assert_eq!(precheck("BOMB STATE: 3 wires"), None);
    }

    #[test]
    fn test_apply_round_verdicts() {
        let mut result = RunResult::new();
        result.apply_round(record("Wire cut."));
        assert_eq!(result.iterations, 1);
        assert_eq!(result.success, Success::Undecided);
        assert_eq!(result.state, RunState::Running);

        result.apply_round(record("Unknown command"));
        assert_eq!(result.iterations, 2);
        assert_eq!(result.success, Success::Failed);
        assert_eq!(result.state, RunState::UnknownCommandAbort);
    }

    #[test]
    fn test_success_codes() {
        assert_eq!(Success::Undecided.code(), -1);
        assert_eq!(Success::Succeeded.code(), 1);
        assert_eq!(Success::Failed.code(), 0);
    }
}
