//! 采样参数扫描：对 (模式, temperature, top_p, top_k) 网格中每个组合重复若干局
//!
//! 每局都新建自己的角色客户端与连接生命周期；concurrency > 1 时多局并行，
//! 设备状态是否彼此隔离取决于服务端。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use serde::Serialize;

use crate::config::SweepSection;
use crate::game::{GameRun, PromptMode, RunOptions};
use crate::llm::TextGenerator;
use crate::session::SessionTransport;

/// 网格中的一个组合
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SweepKey {
    pub mode: PromptMode,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
}

/// 一个组合下所有局的结果；success 使用 -1 / 1 / 0 编码
#[derive(Clone, Debug, Serialize)]
pub struct SweepEntry {
    #[serde(flatten)]
    pub key: SweepKey,
    pub iterations: Vec<usize>,
    pub success: Vec<i8>,
    /// 异常结束的局数
    pub errors: usize,
}

impl SweepEntry {
    fn new(key: SweepKey) -> Self {
        Self {
            key,
            iterations: Vec::new(),
            success: Vec::new(),
            errors: 0,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SweepReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub entries: Vec<SweepEntry>,
}

/// 展开网格，顺序为 mode > temperature > top_p > top_k
pub fn combinations(grid: &SweepSection) -> Vec<SweepKey> {
    let mut keys = Vec::new();
    for &mode in &grid.modes {
        for &temperature in &grid.temperatures {
            for &top_p in &grid.top_ps {
                for &top_k in &grid.top_ks {
                    keys.push(SweepKey {
                        mode,
                        temperature,
                        top_p,
                        top_k,
                    });
                }
            }
        }
    }
    keys
}

pub struct Sweep {
    transport: Arc<dyn SessionTransport>,
    endpoint: String,
    defuser_model: Arc<dyn TextGenerator>,
    expert_model: Arc<dyn TextGenerator>,
    base: RunOptions,
    grid: SweepSection,
}

impl Sweep {
    pub fn new(
        transport: Arc<dyn SessionTransport>,
        endpoint: impl Into<String>,
        defuser_model: Arc<dyn TextGenerator>,
        expert_model: Arc<dyn TextGenerator>,
        base: RunOptions,
        grid: SweepSection,
    ) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            defuser_model,
            expert_model,
            base,
            grid,
        }
    }

    /// 某个组合对应的单局参数：网格覆盖采样参数，扫描时逐回合记录总是静默
    pub fn options_for(&self, key: &SweepKey) -> RunOptions {
        let mut options = self.base.clone();
        options.prompt_mode = key.mode;
        options.sampling.temperature = key.temperature;
        options.sampling.top_p = key.top_p;
        options.sampling.top_k = key.top_k;
        options.sampling.max_new_tokens = self.grid.max_new_tokens;
        options.iteration_limit = self.grid.iteration_limit;
        options.quiet = true;
        options
    }

    pub async fn run(&self) -> SweepReport {
        let started_at = Utc::now();
        let keys = combinations(&self.grid);
        let attempts = self.grid.attempts;
        let concurrency = self.grid.concurrency.max(1);
        tracing::info!(
            combinations = keys.len(),
            attempts,
            concurrency,
            "Starting sweep"
        );

        let mut entries: Vec<SweepEntry> = keys.iter().copied().map(SweepEntry::new).collect();
        let jobs: Vec<(usize, SweepKey, usize)> = keys
            .iter()
            .enumerate()
            .flat_map(|(index, key)| (0..attempts).map(move |attempt| (index, *key, attempt)))
            .collect();

        let outcomes = stream::iter(jobs)
            .map(|(index, key, attempt)| async move {
                tracing::info!(?key, attempt = attempt + 1, attempts, "Sweep run");
                let run = GameRun::new(
                    self.transport.clone(),
                    self.endpoint.clone(),
                    self.defuser_model.clone(),
                    self.expert_model.clone(),
                    self.options_for(&key),
                );
                (index, run.run().await)
            })
            .buffered(concurrency);
        let mut outcomes = std::pin::pin!(outcomes);

        while let Some((index, outcome)) = outcomes.next().await {
            let entry = &mut entries[index];
            match outcome {
                Ok(result) => {
                    entry.iterations.push(result.iterations);
                    entry.success.push(result.success.code());
                }
                Err(aborted) => {
                    tracing::warn!(key = ?entry.key, error = %aborted, "Sweep run aborted");
                    entry.iterations.push(aborted.partial.iterations);
                    entry.success.push(aborted.partial.success.code());
                    entry.errors += 1;
                }
            }
        }

        SweepReport {
            started_at,
            finished_at: Utc::now(),
            entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedGenerator;
    use crate::testing::FakeDevice;

    fn grid() -> SweepSection {
        SweepSection {
            modes: vec![PromptMode::Natural],
            temperatures: vec![0.2, 0.7],
            top_ps: vec![0.9],
            top_ks: vec![50],
            attempts: 2,
            iteration_limit: 1,
            max_new_tokens: 16,
            concurrency: 1,
        }
    }

    fn sweep(device: Arc<FakeDevice>, grid: SweepSection) -> Sweep {
        Sweep::new(
            device,
            "http://device/sse",
            Arc::new(ScriptedGenerator::constant("cut wire 2")),
            Arc::new(ScriptedGenerator::constant("Cut the second wire.")),
            RunOptions::default(),
            grid,
        )
    }

    #[test]
    fn test_default_grid_size() {
        assert_eq!(combinations(&SweepSection::default()).len(), 81);
    }

    #[test]
    fn test_combination_order() {
        let keys = combinations(&grid());
        assert_eq!(keys.len(), 2);
        assert!((keys[0].temperature - 0.2).abs() < 1e-6);
        assert!((keys[1].temperature - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_options_for_overrides_sampling() {
        let sweep = sweep(Arc::new(FakeDevice::new()), grid());
        let key = combinations(&grid())[1];
        let options = sweep.options_for(&key);
        assert_eq!(options.prompt_mode, PromptMode::Natural);
        assert_eq!(options.sampling.max_new_tokens, 16);
        assert_eq!(options.sampling.top_k, 50);
        assert_eq!(options.iteration_limit, 1);
        assert!(options.quiet);
    }

    #[tokio::test]
    async fn test_sweep_collects_every_attempt() {
        let device = Arc::new(FakeDevice::new());
        let report = sweep(device.clone(), grid()).run().await;

        assert_eq!(report.entries.len(), 2);
        for entry in &report.entries {
            assert_eq!(entry.iterations, vec![1, 1]);
            assert_eq!(entry.success, vec![-1, -1]);
            assert_eq!(entry.errors, 0);
        }
        // 每局各自 reset 一次
        assert_eq!(device.count("reset"), 4);
    }

    #[tokio::test]
    async fn test_sweep_records_aborted_runs() {
        let device = Arc::new(FakeDevice::new().failing_on("get_manual", 1));
        let report = sweep(device, grid()).run().await;

        assert_eq!(report.entries[0].errors, 1);
        assert_eq!(report.entries[0].iterations, vec![0, 1]);
        assert_eq!(report.entries[0].success, vec![-1, -1]);
        assert_eq!(report.entries[1].errors, 0);
    }

    #[tokio::test]
    async fn test_concurrent_sweep_keeps_attempt_order() {
        let device = Arc::new(FakeDevice::new());
        let report = sweep(
            device,
            SweepSection {
                concurrency: 4,
                ..grid()
            },
        )
        .run()
        .await;
        assert_eq!(report.entries.iter().map(|e| e.iterations.len()).sum::<usize>(), 4);
    }
}
