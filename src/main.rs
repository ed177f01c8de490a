//! Defusal - 单局入口
//!
//! 初始化日志、加载配置、创建两个生成器与 SSE 传输，跑一局并把 RunResult 以 JSON 输出到 stdout。

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use defusal::{
    config::load_config,
    game::{GameRun, PromptMode, RunOptions},
    llm::create_generator_from_config,
    observability,
    session::create_transport_from_config,
};

#[derive(Parser, Debug)]
#[command(name = "defusal", about = "Run one Defuser/Expert session against a bomb server")]
struct Args {
    /// 额外的配置文件（覆盖 config/default.toml）
    #[arg(long)]
    config: Option<PathBuf>,

    /// 设备服务地址，覆盖 [server].url
    #[arg(long)]
    url: Option<String>,

    /// 回合上限，覆盖 [run].iteration_limit
    #[arg(long)]
    iterations: Option<usize>,

    /// Prompt 模式：default / natural / markdown / json
    #[arg(long)]
    mode: Option<PromptMode>,

    /// 逐回合记录降为 debug
    #[arg(long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();
    let args = Args::parse();

    let mut cfg = load_config(args.config).context("Failed to load config")?;
    if let Some(url) = args.url {
        cfg.server.url = url;
    }
    if let Some(limit) = args.iterations {
        cfg.run.iteration_limit = limit;
    }
    if let Some(mode) = args.mode {
        cfg.run.prompt_mode = mode;
    }
    cfg.run.quiet |= args.quiet;

    let run = GameRun::new(
        create_transport_from_config(&cfg),
        cfg.server.url.clone(),
        create_generator_from_config(&cfg),
        create_generator_from_config(&cfg),
        RunOptions::from_config(&cfg),
    );

    match run.run().await {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(aborted) => {
            println!("{}", serde_json::to_string_pretty(&aborted.partial)?);
            Err(anyhow::Error::new(aborted.source).context("Run aborted"))
        }
    }
}
