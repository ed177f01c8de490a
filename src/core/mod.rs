//! 核心层：错误类型与单局状态机

pub mod error;
pub mod state;

pub use error::{RunAborted, RunError, SessionError};
pub use state::{
    classify, precheck, transition, Outcome, RoundRecord, RunResult, RunState, Success,
    DISARMED_MARKER, EXPLODED_MARKER, STATE_DISARMED_MARKER, STATE_EXPLODED_MARKER,
    UNKNOWN_COMMAND_MARKER,
};
