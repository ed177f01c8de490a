//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `DEFUSAL__*` 覆盖（双下划线表示嵌套，如 `DEFUSAL__SERVER__URL=http://...`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::game::PromptMode;
use crate::llm::SamplingParams;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub llm: LlmSection,
    pub sampling: SamplingSection,
    pub run: RunSection,
    pub sweep: SweepSection,
}

/// [server] 段：设备服务地址与单次远程调用超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub url: String,
    /// 单次远程调用超时（秒），0 表示不限时
    pub call_timeout_secs: u64,
    /// MCP initialize 中上报的 clientInfo.name
    pub client_name: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8080".to_string(),
            call_timeout_secs: 60,
            client_name: "defusal".to_string(),
        }
    }
}

/// [llm] 段：后端选择
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：openai / mock
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "Qwen/Qwen3-0.6B".to_string(),
            base_url: None,
            api_key: None,
        }
    }
}

/// [sampling] 段：两个角色共用的采样参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplingSection {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub do_sample: bool,
}

impl Default for SamplingSection {
    fn default() -> Self {
        let params = SamplingParams::default();
        Self {
            max_new_tokens: params.max_new_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
            top_k: params.top_k,
            do_sample: params.do_sample,
        }
    }
}

impl From<&SamplingSection> for SamplingParams {
    fn from(s: &SamplingSection) -> Self {
        Self {
            max_new_tokens: s.max_new_tokens,
            temperature: s.temperature,
            top_p: s.top_p,
            top_k: s.top_k,
            do_sample: s.do_sample,
        }
    }
}

/// [run] 段：单局编排参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunSection {
    /// 回合上限，防止两个模型无限对话
    pub iteration_limit: usize,
    pub prompt_mode: PromptMode,
    /// 开局前是否先 reset 设备
    pub reset_before_run: bool,
    /// reset 的模块名；"all" 或空串表示重置全部模块（TOML 没有 null）
    pub reset_module: Option<String>,
    /// 为 true 时逐回合记录降为 debug
    pub quiet: bool,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            iteration_limit: 100,
            prompt_mode: PromptMode::Default,
            reset_before_run: true,
            reset_module: Some("wire".to_string()),
            quiet: false,
        }
    }
}

impl RunSection {
    /// 实际发给 Resetter 的模块名，None 表示全部模块
    pub fn reset_target(&self) -> Option<String> {
        self.reset_module
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty() && !m.eq_ignore_ascii_case("all"))
            .map(str::to_string)
    }
}

/// [sweep] 段：采样参数网格
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SweepSection {
    pub modes: Vec<PromptMode>,
    pub temperatures: Vec<f32>,
    pub top_ps: Vec<f32>,
    pub top_ks: Vec<u32>,
    /// 每个组合重复的局数
    pub attempts: usize,
    pub iteration_limit: usize,
    pub max_new_tokens: u32,
    /// 同时进行的局数；每局独占自己的会话，但设备状态是否隔离由服务端决定
    pub concurrency: usize,
}

impl Default for SweepSection {
    fn default() -> Self {
        Self {
            modes: vec![PromptMode::Natural, PromptMode::Markdown, PromptMode::Json],
            temperatures: vec![0.2, 0.7, 1.0],
            top_ps: vec![0.3, 0.6, 0.9],
            top_ks: vec![25, 50, 75],
            attempts: 1,
            iteration_limit: 3,
            max_new_tokens: 50,
            concurrency: 1,
        }
    }
}

/// 从 config 目录加载配置，环境变量 DEFUSAL__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 DEFUSAL__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        } else {
            tracing::warn!(path = %path.display(), "Config file not found, ignoring");
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("DEFUSAL")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server.url, "http://127.0.0.1:8080");
        assert_eq!(cfg.server.call_timeout_secs, 60);
        assert_eq!(cfg.run.iteration_limit, 100);
        assert_eq!(cfg.run.reset_module.as_deref(), Some("wire"));
        assert_eq!(cfg.sweep.modes.len(), 3);
        assert_eq!(SamplingParams::from(&cfg.sampling), SamplingParams::default());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
url = "http://10.0.0.5:9000"

[run]
iteration_limit = 7
prompt_mode = "json"
quiet = true

[sampling]
temperature = 0.2
top_k = 25
"#
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.server.url, "http://10.0.0.5:9000");
        assert_eq!(cfg.run.iteration_limit, 7);
        assert_eq!(cfg.run.prompt_mode, PromptMode::Json);
        assert!(cfg.run.quiet);
        assert_eq!(cfg.sampling.top_k, 25);
        assert!((cfg.sampling.temperature - 0.2).abs() < 1e-6);
        // 未出现的段落保持默认值
        assert_eq!(cfg.sweep.attempts, 1);
    }

    #[test]
    fn test_reset_all_modules_sentinel() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[run]\nreset_module = \"all\"").unwrap();
        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.run.reset_target(), None);

        let mut run = RunSection::default();
        assert_eq!(run.reset_target().as_deref(), Some("wire"));
        run.reset_module = Some("  ".to_string());
        assert_eq!(run.reset_target(), None);
        run.reset_module = None;
        assert_eq!(run.reset_target(), None);
    }

    #[test]
    fn test_unknown_prompt_mode_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[run]\nprompt_mode = \"haiku\"").unwrap();
        assert!(load_config(Some(file.path().to_path_buf())).is_err());
    }
}
