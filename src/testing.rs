//! 单元测试用的假设备：按脚本应答三种远程操作并记录每次调用

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::SessionError;
use crate::session::SessionTransport;

pub const DEFAULT_STATE: &str =
    "BOMB STATE:\nRegular Wires Module: red, blue, yellow\nAvailable commands: cut wire <n>, help, state";
pub const DEFAULT_ACTION_RESPONSE: &str = "Wire cut. The module is still armed.";
pub const MANUAL: &str = "Regular Wires Module\nIf there are no red wires, cut the second wire.";

#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub endpoint: String,
    pub operation: String,
    pub arguments: Value,
}

#[derive(Default)]
pub struct FakeDevice {
    state_responses: Mutex<VecDeque<String>>,
    action_responses: Mutex<VecDeque<String>>,
    fail_on: Option<(String, usize)>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// 依次作为非 state 命令的响应，耗尽后回到默认响应
    pub fn with_action_responses<I, S>(self, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.action_responses.lock().unwrap() = responses.into_iter().map(Into::into).collect();
        self
    }

    /// 依次作为 state 查询的响应，耗尽后回到默认状态
    pub fn with_state_responses<I, S>(self, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.state_responses.lock().unwrap() = responses.into_iter().map(Into::into).collect();
        self
    }

    /// 第 nth 次（从 1 开始）调用 operation 时返回传输错误
    pub fn failing_on(mut self, operation: &str, nth: usize) -> Self {
        self.fail_on = Some((operation.to_string(), nth));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// 发送过的 Defuser 命令（含 state 查询）
    pub fn commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.operation == "game_interaction")
            .filter_map(|c| c.arguments.get("command").and_then(Value::as_str).map(String::from))
            .collect()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls().iter().filter(|c| c.operation == operation).count()
    }
}

#[async_trait]
impl SessionTransport for FakeDevice {
    async fn execute(&self, endpoint: &str, operation: &str, arguments: Value) -> Result<String, SessionError> {
        let seen = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(RecordedCall {
                endpoint: endpoint.to_string(),
                operation: operation.to_string(),
                arguments: arguments.clone(),
            });
            calls.iter().filter(|c| c.operation == operation).count()
        };

        if let Some((op, nth)) = &self.fail_on {
            if op == operation && *nth == seen {
                return Err(SessionError::Transport("connection reset by peer".to_string()));
            }
        }

        let reply = match operation {
            "get_manual" => MANUAL.to_string(),
            "reset" => "Bomb reset.".to_string(),
            "game_interaction" => {
                let command = arguments.get("command").and_then(Value::as_str).unwrap_or_default();
                if command == "state" {
                    self.state_responses
                        .lock()
                        .unwrap()
                        .pop_front()
                        .unwrap_or_else(|| DEFAULT_STATE.to_string())
                } else {
                    self.action_responses
                        .lock()
                        .unwrap()
                        .pop_front()
                        .unwrap_or_else(|| DEFAULT_ACTION_RESPONSE.to_string())
                }
            }
            other => {
                return Err(SessionError::Rpc {
                    code: -32601,
                    message: format!("Unknown tool: {}", other),
                })
            }
        };
        Ok(reply)
    }
}
