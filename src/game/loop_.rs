//! 拆弹编排主循环
//!
//! 每回合固定顺序：查询 state -> 拆弹员提问 -> 专家取手册 -> 专家建议 -> 拆弹员选动作 ->
//! 执行动作 -> 分类响应。远程调用失败不重试（已作用于设备的动作无法安全重放），
//! 直接结束本局；三个角色客户端在任何退出路径上都只清理一次。
//! 可选 event_tx：向调用方推送 RoundStarted / ActionChosen / RoundFinished / Finished / CleanedUp。

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::core::{classify, precheck, RoundRecord, RunAborted, RunError, RunResult, RunState};
use crate::game::{defuser_prompt, expert_prompt, extract, DefuserStage, PromptMode, RunEvent};
use crate::llm::{SamplingParams, TextGenerator};
use crate::session::{Defuser, Expert, Resetter, SessionTransport};

/// 单局参数
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub sampling: SamplingParams,
    pub iteration_limit: usize,
    pub prompt_mode: PromptMode,
    pub reset_before_run: bool,
    pub reset_module: Option<String>,
    pub quiet: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            sampling: SamplingParams::default(),
            iteration_limit: 100,
            prompt_mode: PromptMode::Default,
            reset_before_run: true,
            reset_module: Some("wire".to_string()),
            quiet: false,
        }
    }
}

impl RunOptions {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            sampling: SamplingParams::from(&cfg.sampling),
            iteration_limit: cfg.run.iteration_limit,
            prompt_mode: cfg.run.prompt_mode,
            reset_before_run: cfg.run.reset_before_run,
            reset_module: cfg.run.reset_target(),
            quiet: cfg.run.quiet,
        }
    }
}

/// 一局所需的三个角色客户端，由本局独占。
/// release 只生效一次；run 的 future 被中途丢弃时由 Drop 兜底释放。
struct Participants {
    defuser: Defuser,
    expert: Expert,
    resetter: Resetter,
    event_tx: Option<mpsc::UnboundedSender<RunEvent>>,
    released: bool,
}

impl Participants {
    fn new(transport: &Arc<dyn SessionTransport>, event_tx: Option<mpsc::UnboundedSender<RunEvent>>) -> Self {
        Self {
            defuser: Defuser::new(transport.clone()),
            expert: Expert::new(transport.clone()),
            resetter: Resetter::new(transport.clone()),
            event_tx,
            released: false,
        }
    }

    /// 清空全部端点并推送 CleanedUp，返回清理前仍连接的客户端数
    fn release(&mut self) -> usize {
        if self.released {
            return 0;
        }
        self.released = true;
        let released = [
            self.defuser.cleanup(),
            self.expert.cleanup(),
            self.resetter.cleanup(),
        ]
        .into_iter()
        .filter(|connected| *connected)
        .count();
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(RunEvent::CleanedUp { released });
        }
        released
    }
}

impl Drop for Participants {
    fn drop(&mut self) {
        if !self.released {
            let released = self.release();
            tracing::warn!(released, "Run dropped before finalization, role clients released");
        }
    }
}

/// 单局编排配置
pub struct GameRun {
    transport: Arc<dyn SessionTransport>,
    endpoint: String,
    defuser_model: Arc<dyn TextGenerator>,
    expert_model: Arc<dyn TextGenerator>,
    options: RunOptions,
    event_tx: Option<mpsc::UnboundedSender<RunEvent>>,
}

impl GameRun {
    pub fn new(
        transport: Arc<dyn SessionTransport>,
        endpoint: impl Into<String>,
        defuser_model: Arc<dyn TextGenerator>,
        expert_model: Arc<dyn TextGenerator>,
        options: RunOptions,
    ) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            defuser_model,
            expert_model,
            options,
            event_tx: None,
        }
    }

    /// 设置事件推送通道
    pub fn with_event_tx(mut self, tx: mpsc::UnboundedSender<RunEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// 执行一局。成功路径返回定稿的 RunResult；远程或生成失败时返回 RunAborted，
    /// 其中 partial 同样已定稿（state = Error，success 保持未决）
    pub async fn run(&self) -> Result<RunResult, RunAborted> {
        let run_id = Uuid::new_v4();
        self.run_inner()
            .instrument(tracing::info_span!("run", %run_id))
            .await
    }

    async fn run_inner(&self) -> Result<RunResult, RunAborted> {
        tracing::info!(
            endpoint = %self.endpoint,
            iteration_limit = self.options.iteration_limit,
            mode = ?self.options.prompt_mode,
            defuser = self.defuser_model.name(),
            expert = self.expert_model.name(),
            "Starting run"
        );

        let mut participants = Participants::new(&self.transport, self.event_tx.clone());
        let mut result = RunResult::new();
        let outcome = self.drive(&mut participants, &mut result).await;
        if outcome.is_err() {
            result.state = RunState::Error;
        }
        self.emit(RunEvent::Finished {
            iterations: result.iterations,
            success: result.success,
            state: result.state,
        });

        let released = participants.release();
        tracing::debug!(released, "Role clients cleaned up");

        match outcome {
            Ok(()) => {
                tracing::info!(
                    iterations = result.iterations,
                    success = ?result.success,
                    state = ?result.state,
                    "Run finished"
                );
                Ok(result)
            }
            Err(source) => {
                tracing::error!(iterations = result.iterations, error = %source, "Run aborted");
                Err(RunAborted {
                    partial: result,
                    source,
                })
            }
        }
    }

    async fn drive(&self, p: &mut Participants, result: &mut RunResult) -> Result<(), RunError> {
        let endpoint = self.endpoint.as_str();
        let sampling = &self.options.sampling;
        let mode = self.options.prompt_mode;
        let limit = self.options.iteration_limit;

        if self.options.reset_before_run {
            p.resetter.connect(endpoint);
            let response = p.resetter.run(self.options.reset_module.as_deref()).await?;
            self.transcript(0, "RESET", &response);
            self.emit(RunEvent::Reset { response });
        }

        p.defuser.connect(endpoint);
        p.expert.connect(endpoint);

        while result.iterations < limit {
            let round = result.iterations + 1;
            self.emit(RunEvent::RoundStarted {
                round,
                iteration_limit: limit,
            });

            let bomb_state = p.defuser.run("state").await?;
            self.transcript(round, "DEFUSER sees BOMB STATE", &bomb_state);
            if let Some(state) = precheck(&bomb_state) {
                tracing::info!(round, ?state, "Bomb already finished, stopping before acting");
                result.state = state;
                return Ok(());
            }

            let question = self
                .defuser_model
                .generate(
                    &defuser_prompt(&bomb_state, "", mode, DefuserStage::Question),
                    sampling,
                )
                .await?;
            self.transcript(round, "DEFUSER SAYS TO EXPERT", &question);

            let manual = p.expert.run().await?;
            self.transcript(round, "EXPERT sees MANUAL", &manual);

            let advice = self
                .expert_model
                .generate(&expert_prompt(&manual, &question, mode), sampling)
                .await?;
            self.transcript(round, "EXPERT ADVICE to DEFUSER", &advice);

            let raw_action = self
                .defuser_model
                .generate(
                    &defuser_prompt(&bomb_state, &advice, mode, DefuserStage::Action),
                    sampling,
                )
                .await?;
            let action = extract(&raw_action);
            if action.is_fallback() {
                tracing::warn!(round, raw = %raw_action, "No recognized command in defuser output, using safe default");
            }
            self.transcript(round, "DEFUSER ACTION DECIDED", action.command());
            self.emit(RunEvent::ActionChosen {
                round,
                command: action.command().to_string(),
                fallback: action.is_fallback(),
            });

            let response = p.defuser.run(action.command()).await?;
            self.transcript(round, "SERVER RESPONSE", &response);

            let outcome = classify(&response);
            result.apply_round(RoundRecord {
                index: round,
                bomb_state,
                question,
                advice,
                action,
                response,
                outcome,
            });
            self.emit(RunEvent::RoundFinished {
                round,
                outcome,
                state: result.state,
            });

            match result.state {
                RunState::Running => {}
                RunState::UnknownCommandAbort => {
                    tracing::warn!(round, "Device rejected the command, aborting run");
                    return Ok(());
                }
                _ => return Ok(()),
            }
        }

        tracing::info!(limit, "Iteration limit reached");
        result.state = RunState::IterationLimitReached;
        Ok(())
    }

    fn emit(&self, event: RunEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }

    fn transcript(&self, round: usize, label: &str, text: &str) {
        if self.options.quiet {
            tracing::debug!(round, "[{}]:\n{}", label, text);
        } else {
            tracing::info!(round, "[{}]:\n{}", label, text);
        }
    }
}
