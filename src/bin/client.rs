//! Defusal 交互式角色客户端
//!
//! 以 Defuser / Expert / Resetter 身份连接设备：
//! - Defuser：先做一次 state 冒烟检查，再逐行读取命令发送，输入 exit 退出
//! - Expert：取回手册并检查其中包含已知模块标题，之后持续轮询服务端消息直到 Ctrl+C
//! - Resetter：读取模块名并重置（空行重置全部模块）

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use defusal::{
    config::load_config,
    observability,
    session::{create_transport_from_config, Defuser, Expert, Resetter, RoleKind},
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

/// Expert 冒烟检查接受的手册片段
const KNOWN_MANUAL_MARKERS: [&str; 6] = [
    "BOOM!",
    "BOMB SUCCESSFULLY DISARMED!",
    "Regular Wires Module",
    "The Button Module",
    "Memory Module",
    "Simon Says Module",
];

/// Expert 两次轮询之间的间隔
const EXPERT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[command(name = "defusal-client", about = "Talk to a bomb server as a single role")]
struct Args {
    /// 设备服务地址（如 http://localhost:8080）
    #[arg(long)]
    url: String,

    /// 角色：Defuser / Expert / Resetter
    #[arg(long)]
    role: RoleKind,

    #[arg(long)]
    config: Option<PathBuf>,
}

type StdinLines = Lines<BufReader<Stdin>>;

async fn prompt_line(lines: &mut StdinLines, prompt: &str) -> anyhow::Result<Option<String>> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(prompt.as_bytes()).await?;
    stdout.flush().await?;
    Ok(lines.next_line().await?.map(|line| line.trim().to_string()))
}

async fn defuser_session(defuser: &Defuser, lines: &mut StdinLines) -> anyhow::Result<()> {
    let state = defuser.run("state").await.context("State smoke check failed")?;
    if !state.contains("BOMB STATE") {
        bail!("Defuser smoke check failed: unexpected state response:\n{}", state);
    }
    println!("{}", state);

    while let Some(action) = prompt_line(lines, "Enter action (or 'exit' to quit): ").await? {
        if action.eq_ignore_ascii_case("exit") {
            break;
        }
        let response = defuser.run(&action).await?;
        println!("Server response: {}", response);
    }
    Ok(())
}

/// `polls = None` 时一直轮询，直到外层被 Ctrl+C 取消
async fn expert_session(expert: &Expert, interval: Duration, polls: Option<usize>) -> anyhow::Result<()> {
    let manual = expert.run().await.context("Manual request failed")?;
    if !KNOWN_MANUAL_MARKERS.iter().any(|marker| manual.contains(marker)) {
        bail!("Expert smoke check failed: manual has no known module heading");
    }
    println!("{}", manual);

    println!("Listening for expert messages (Ctrl+C to stop)...");
    let mut polled = 0;
    while polls.map_or(true, |limit| polled < limit) {
        tokio::time::sleep(interval).await;
        let message = expert.run().await?;
        println!("Server message: {}", message);
        polled += 1;
    }
    Ok(())
}

async fn resetter_session(resetter: &Resetter, lines: &mut StdinLines) -> anyhow::Result<()> {
    let module = prompt_line(lines, "Enter module for bomb to have (empty for all modules): ")
        .await?
        .filter(|m| !m.is_empty());
    let response = resetter.run(module.as_deref()).await?;
    println!("Server message: {}", response);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();
    let args = Args::parse();
    let cfg = load_config(args.config).context("Failed to load config")?;
    let transport = create_transport_from_config(&cfg);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let mut defuser = Defuser::new(transport.clone());
    let mut expert = Expert::new(transport.clone());
    let mut resetter = Resetter::new(transport);

    let session = async {
        match args.role {
            RoleKind::Defuser => {
                defuser.connect(args.url.as_str());
                tracing::info!(url = %args.url, role = %args.role, "Connected");
                defuser_session(&defuser, &mut lines).await
            }
            RoleKind::Expert => {
                expert.connect(args.url.as_str());
                tracing::info!(url = %args.url, role = %args.role, "Connected");
                expert_session(&expert, EXPERT_POLL_INTERVAL, None).await
            }
            RoleKind::Resetter => {
                resetter.connect(args.url.as_str());
                tracing::info!(url = %args.url, role = %args.role, "Connected");
                resetter_session(&resetter, &mut lines).await
            }
        }
    };

    let outcome = tokio::select! {
        outcome = session => outcome,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted by user");
            Ok(())
        }
    };

    defuser.cleanup();
    expert.cleanup();
    resetter.cleanup();
    tracing::info!("Client shutdown complete");
    outcome
}
