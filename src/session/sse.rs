//! MCP HTTP+SSE 会话传输
//!
//! 每次调用：GET 端点建立 SSE 流 -> 等待 `endpoint` 事件得到 POST 地址 ->
//! initialize / notifications/initialized 握手 -> tools/call -> 从流上按 id 取回响应。
//! SseSession 持有事件流，任何退出路径（含超时取消）上 drop 即断开连接。

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures_util::{Stream, StreamExt};
use reqwest::header::ACCEPT;
use reqwest::Url;
use serde_json::{json, Value};
use tokio::time::timeout;

use crate::core::SessionError;
use crate::session::SessionTransport;

const PROTOCOL_VERSION: &str = "2024-11-05";
const EVENT_STREAM_MIME_TYPE: &str = "text/event-stream";

type EventStream = Pin<Box<dyn Stream<Item = Result<Event, EventStreamError<reqwest::Error>>> + Send>>;

/// MCP SSE 传输：无连接池，每次 execute 独立建连
#[derive(Clone)]
pub struct SseTransport {
    http: reqwest::Client,
    client_name: String,
    call_timeout: Option<Duration>,
}

impl SseTransport {
    /// `call_timeout_secs = 0` 表示不限时
    pub fn new(client_name: impl Into<String>, call_timeout_secs: u64) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_name: client_name.into(),
            call_timeout: (call_timeout_secs > 0).then(|| Duration::from_secs(call_timeout_secs)),
        }
    }

    async fn exchange(&self, endpoint: &str, operation: &str, arguments: Value) -> Result<String, SessionError> {
        let mut session = SseSession::open(self.http.clone(), endpoint).await?;
        let outcome = async {
            session.initialize(&self.client_name).await?;
            session.call_tool(operation, arguments).await
        }
        .await;
        session.close();
        outcome
    }
}

#[async_trait]
impl SessionTransport for SseTransport {
    async fn execute(&self, endpoint: &str, operation: &str, arguments: Value) -> Result<String, SessionError> {
        tracing::debug!(endpoint, operation, "MCP call");
        match self.call_timeout {
            Some(limit) => timeout(limit, self.exchange(endpoint, operation, arguments))
                .await
                .map_err(|_| SessionError::Timeout {
                    operation: operation.to_string(),
                    secs: limit.as_secs(),
                })?,
            None => self.exchange(endpoint, operation, arguments).await,
        }
    }
}

/// 单次使用的 SSE 会话
struct SseSession {
    http: reqwest::Client,
    events: Option<EventStream>,
    post_url: Url,
    next_id: u64,
}

impl SseSession {
    async fn open(http: reqwest::Client, endpoint: &str) -> Result<Self, SessionError> {
        let base = Url::parse(endpoint)
            .map_err(|e| SessionError::Transport(format!("invalid endpoint '{}': {}", endpoint, e)))?;

        let response = http
            .get(base.clone())
            .header(ACCEPT, EVENT_STREAM_MIME_TYPE)
            .send()
            .await?
            .error_for_status()?;
        let mut events: EventStream = Box::pin(response.bytes_stream().eventsource());

        let post_url = loop {
            match events.next().await {
                Some(Ok(event)) if event.event == "endpoint" => {
                    break base.join(event.data.trim()).map_err(|e| {
                        SessionError::Protocol(format!("invalid endpoint event '{}': {}", event.data, e))
                    })?;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(SessionError::Transport(format!("SSE stream error: {}", e))),
                None => {
                    return Err(SessionError::Transport(
                        "SSE stream closed before endpoint event".to_string(),
                    ))
                }
            }
        };

        Ok(Self {
            http,
            events: Some(events),
            post_url,
            next_id: 0,
        })
    }

    async fn initialize(&mut self, client_name: &str) -> Result<(), SessionError> {
        self.request(
            "initialize",
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {"name": client_name, "version": env!("CARGO_PKG_VERSION")},
            }),
        )
        .await?;
        self.post(&json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .await
    }

    async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<String, SessionError> {
        let result = self
            .request("tools/call", json!({"name": name, "arguments": arguments}))
            .await?;
        collect_text(&result)
    }

    async fn request(&mut self, method: &str, params: Value) -> Result<Value, SessionError> {
        self.next_id += 1;
        let id = self.next_id;
        self.post(&json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}))
            .await?;
        self.await_response(id).await
    }

    async fn post(&mut self, body: &Value) -> Result<(), SessionError> {
        self.http
            .post(self.post_url.clone())
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// 在 SSE 流上等待 id 匹配的 JSON-RPC 响应，忽略其它消息
    async fn await_response(&mut self, id: u64) -> Result<Value, SessionError> {
        let events = self
            .events
            .as_mut()
            .ok_or_else(|| SessionError::Transport("session already closed".to_string()))?;

        while let Some(event) = events.next().await {
            let event = event.map_err(|e| SessionError::Transport(format!("SSE stream error: {}", e)))?;
            if !event.event.is_empty() && event.event != "message" {
                continue;
            }
            let Ok(message) = serde_json::from_str::<Value>(&event.data) else {
                tracing::debug!(data = %event.data, "Skipping non-JSON SSE message");
                continue;
            };
            if message.get("id").and_then(Value::as_u64) != Some(id) {
                continue;
            }
            if let Some(error) = message.get("error") {
                return Err(SessionError::Rpc {
                    code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
                    message: error
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown error")
                        .to_string(),
                });
            }
            return message
                .get("result")
                .cloned()
                .ok_or_else(|| SessionError::Protocol(format!("response {} has no result", id)));
        }

        Err(SessionError::Transport(format!(
            "SSE stream closed before response {}",
            id
        )))
    }

    fn close(mut self) {
        self.events.take();
    }
}

impl Drop for SseSession {
    fn drop(&mut self) {
        if self.events.take().is_some() {
            tracing::debug!(post_url = %self.post_url, "SSE session dropped before close");
        }
    }
}

/// 按顺序拼接工具结果中所有 text 内容；非文本内容不计入
pub(crate) fn collect_text(result: &Value) -> Result<String, SessionError> {
    let content = result
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| SessionError::Protocol("tool result has no content list".to_string()))?;

    Ok(content
        .iter()
        .filter_map(|item| item.get("text").and_then(Value::as_str))
        .collect())
}
