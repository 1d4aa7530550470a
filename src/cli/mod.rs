use crate::config::{Config, DEFAULT_CONFIG_FILE, LLMProvider, PromptConfig};
use crate::generator::workflow::LaunchMode;
use crate::i18n::TargetLanguage;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Startup Validator - 由Rust与AI驱动的创业想法验证服务
#[derive(Parser, Debug)]
#[command(name = "startup-validator")]
#[command(
    about = "Validates a startup idea with a staged AI analysis: idea understanding, market, competitors, risks, SWOT and a final advisor verdict."
)]
#[command(version)]
pub struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 只分析这一个想法并把结果输出到stdout，不启动HTTP服务
    #[arg(short, long)]
    pub idea: Option<String>,

    /// 监听地址
    #[arg(long)]
    pub host: Option<String>,

    /// 监听端口
    #[arg(short, long)]
    pub port: Option<u16>,

    /// 是否启用详细日志
    #[arg(short, long)]
    pub verbose: bool,

    /// 日志格式
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// 分析所使用的模型
    #[arg(short, long)]
    pub model: Option<String>,

    /// LLM API基地址
    #[arg(long)]
    pub llm_api_base_url: Option<String>,

    /// LLM API KEY
    #[arg(long)]
    pub llm_api_key: Option<String>,

    /// 最大tokens数
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// 温度参数
    #[arg(long)]
    pub temperature: Option<f64>,

    /// LLM Provider (openai, deepseek, openrouter, anthropic, gemini, ollama)
    #[arg(long)]
    pub llm_provider: Option<String>,

    /// 单次运行允许的最大状态转移次数
    #[arg(long)]
    pub max_steps: Option<usize>,

    /// Prompt模板目录
    #[arg(long)]
    pub prompts_dir: Option<PathBuf>,

    /// 目标语言 (zh, en, ja, de, fr, es)
    #[arg(long)]
    pub target_language: Option<String>,

    /// 所有阶段都不使用工具
    #[arg(long, default_value = "false", action = clap::ArgAction::SetTrue)]
    pub disable_preset_tools: bool,

    /// 跳过启动时的模型连接检查
    #[arg(long)]
    pub skip_connection_check: bool,
}

/// 未设置RUST_LOG时的默认日志过滤规则
pub fn default_log_filter(verbose: bool) -> &'static str {
    if verbose {
        "startup_validator=debug,tower_http=debug"
    } else {
        "startup_validator=info"
    }
}

/// 初始化日志，verbose来自合并后的配置，RUST_LOG优先
pub fn init_tracing(log_format: LogFormat, verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_filter(verbose)));

    // 日志写到stderr，stdout留给单次运行的JSON结果
    match log_format {
        LogFormat::Text => fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

impl Args {
    /// 启动方式
    pub fn launch_mode(&self) -> LaunchMode {
        match &self.idea {
            Some(startup_idea) => LaunchMode::Once {
                startup_idea: startup_idea.clone(),
            },
            None => LaunchMode::Serve,
        }
    }

    /// 将CLI参数转换为配置
    pub fn into_config(self) -> Result<Config> {
        let mut config = if let Some(config_path) = &self.config {
            // 显式指定的配置文件必须可读
            Config::from_file(config_path)
                .context(format!("无法读取配置文件 {:?}", config_path))?
        } else {
            let default_config_path = std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(DEFAULT_CONFIG_FILE);

            if default_config_path.exists() {
                Config::from_file(&default_config_path)
                    .context(format!("无法读取默认配置文件 {:?}", default_config_path))?
            } else {
                Config::default()
            }
        };

        // 覆盖LLM配置；日志在配置合并后才初始化，无效值直接报错
        if let Some(provider_str) = self.llm_provider {
            config.llm.provider = provider_str
                .parse::<LLMProvider>()
                .map_err(|e| anyhow::anyhow!("无效的 --llm-provider: {}", e))?;
        }
        if let Some(llm_api_base_url) = self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url;
        }
        if let Some(llm_api_key) = self.llm_api_key {
            config.llm.api_key = llm_api_key;
        }
        if let Some(model) = self.model {
            config.llm.model = model;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.llm.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            config.llm.temperature = temperature;
        }
        if self.disable_preset_tools {
            config.llm.disable_preset_tools = true;
        }

        // 流水线与模板
        if let Some(max_steps) = self.max_steps {
            config.pipeline.max_steps = max_steps;
        }
        if let Some(prompts_dir) = self.prompts_dir {
            config.prompts = PromptConfig::in_dir(&prompts_dir);
        }

        // 服务配置
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }

        // 目标语言配置
        if let Some(target_language_str) = self.target_language {
            config.target_language = target_language_str
                .parse::<TargetLanguage>()
                .map_err(|e| anyhow::anyhow!("无效的 --target-language: {}", e))?;
        }

        if self.verbose {
            config.verbose = true;
        }

        Ok(config)
    }
}
