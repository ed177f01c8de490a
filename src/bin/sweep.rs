//! Defusal 参数扫描：按 [sweep] 网格跑多局，把 SweepReport 以 JSON 输出到 stdout

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use defusal::{
    config::load_config,
    game::{RunOptions, Sweep},
    llm::create_generator_from_config,
    observability,
    session::create_transport_from_config,
};

#[derive(Parser, Debug)]
#[command(name = "defusal-sweep", about = "Sweep sampling parameters over many runs")]
struct Args {
    #[arg(long)]
    config: Option<PathBuf>,

    /// 设备服务地址，覆盖 [server].url
    #[arg(long)]
    url: Option<String>,

    /// 每个组合重复的局数，覆盖 [sweep].attempts
    #[arg(long)]
    attempts: Option<usize>,

    /// 并行局数，覆盖 [sweep].concurrency
    #[arg(long)]
    concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();
    let args = Args::parse();

    let mut cfg = load_config(args.config).context("Failed to load config")?;
    if let Some(url) = args.url {
        cfg.server.url = url;
    }
    if let Some(attempts) = args.attempts {
        cfg.sweep.attempts = attempts;
    }
    if let Some(concurrency) = args.concurrency {
        cfg.sweep.concurrency = concurrency;
    }

    let sweep = Sweep::new(
        create_transport_from_config(&cfg),
        cfg.server.url.clone(),
        create_generator_from_config(&cfg),
        create_generator_from_config(&cfg),
        RunOptions::from_config(&cfg),
        cfg.sweep.clone(),
    );
    let report = sweep.run().await;

    let aborted: usize = report.entries.iter().map(|e| e.errors).sum();
    tracing::info!(entries = report.entries.len(), aborted, "Sweep finished");
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
