use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::generator::router::StageId;
use crate::i18n::TargetLanguage;

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "validator.toml";

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum LLMProvider {
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "gemini")]
    #[default]
    Gemini,
    #[serde(rename = "ollama")]
    Ollama,
}

impl LLMProvider {
    /// 是否需要API KEY
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, LLMProvider::Ollama)
    }
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::DeepSeek => write!(f, "deepseek"),
            LLMProvider::OpenRouter => write!(f, "openrouter"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Gemini => write!(f, "gemini"),
            LLMProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "deepseek" => Ok(LLMProvider::DeepSeek),
            "openrouter" => Ok(LLMProvider::OpenRouter),
            "anthropic" => Ok(LLMProvider::Anthropic),
            "gemini" => Ok(LLMProvider::Gemini),
            "ollama" => Ok(LLMProvider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    /// LLM模型配置
    pub llm: LLMConfig,

    /// 各阶段的Prompt模板路径
    pub prompts: PromptConfig,

    /// 流水线执行配置
    pub pipeline: PipelineConfig,

    /// HTTP服务配置
    pub server: ServerConfig,

    /// 分析报告的输出语言
    pub target_language: TargetLanguage,

    /// 是否启用详细日志
    pub verbose: bool,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API KEY
    pub api_key: String,

    /// LLM API基地址
    pub api_base_url: String,

    /// 分析所使用的模型
    pub model: String,

    /// 最大tokens
    pub max_tokens: u32,

    /// 温度
    pub temperature: f64,

    /// 传输层的尝试次数，1表示不重试
    pub retry_attempts: u32,

    /// 重试间隔（毫秒）
    pub retry_delay_ms: u64,

    /// 为true时所有阶段都以direct模式调用模型
    pub disable_preset_tools: bool,
}

/// Prompt模板路径配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PromptConfig {
    pub idea_understanding: PathBuf,
    pub market_analysis: PathBuf,
    pub competitor_analysis: PathBuf,
    pub risk_assessment: PathBuf,
    pub swot_analysis: PathBuf,
    pub advisor: PathBuf,
}

impl PromptConfig {
    /// 获取阶段对应的模板路径
    pub fn path_for(&self, stage: StageId) -> &Path {
        match stage {
            StageId::Idea => &self.idea_understanding,
            StageId::Market => &self.market_analysis,
            StageId::Competitor => &self.competitor_analysis,
            StageId::Risk => &self.risk_assessment,
            StageId::Swot => &self.swot_analysis,
        }
    }

    /// 修改阶段对应的模板路径
    pub fn set_path(&mut self, stage: StageId, path: PathBuf) {
        match stage {
            StageId::Idea => self.idea_understanding = path,
            StageId::Market => self.market_analysis = path,
            StageId::Competitor => self.competitor_analysis = path,
            StageId::Risk => self.risk_assessment = path,
            StageId::Swot => self.swot_analysis = path,
        }
    }

    /// 以指定目录为根，使用默认文件名
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            idea_understanding: dir.join("idea_understanding.tpl"),
            market_analysis: dir.join("market_analysis.tpl"),
            competitor_analysis: dir.join("competitor_analysis.tpl"),
            risk_assessment: dir.join("risk_assessment.tpl"),
            swot_analysis: dir.join("swot_analysis.tpl"),
            advisor: dir.join("advisor.tpl"),
        }
    }
}

/// 流水线执行配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PipelineConfig {
    /// 单次运行允许的最大状态转移次数
    pub max_steps: usize,

    /// primary变体允许请求工具调用的阶段
    pub tool_augmented_stages: Vec<StageId>,

    /// 单次工具调用超时（秒）
    pub tool_timeout_seconds: u64,

    /// 单次运行超时（秒）
    pub run_timeout_seconds: u64,
}

impl PipelineConfig {
    pub fn allows_tools(&self, stage: StageId) -> bool {
        self.tool_augmented_stages.contains(&stage)
    }
}

/// HTTP服务配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 允许跨域的来源，包含"*"时允许任意来源
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// 检查运行所需的凭据
    pub fn validate(&self) -> Result<()> {
        if self.llm.provider.requires_api_key() && self.llm.api_key.trim().is_empty() {
            anyhow::bail!(
                "provider {} 需要API KEY，请设置 VALIDATOR_LLM_API_KEY 或在配置文件中提供 llm.api_key",
                self.llm.provider
            );
        }
        if self.pipeline.max_steps == 0 {
            anyhow::bail!("pipeline.max_steps 必须大于0");
        }
        Ok(())
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        let api_key = std::env::var("VALIDATOR_LLM_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .unwrap_or_default();

        Self {
            provider: LLMProvider::default(),
            api_key,
            api_base_url: String::from("https://generativelanguage.googleapis.com"),
            model: String::from("gemini-2.5-flash-lite"),
            max_tokens: 8192,
            temperature: 0.3,
            retry_attempts: 1,
            retry_delay_ms: 2000,
            disable_preset_tools: false,
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self::in_dir(Path::new("prompts"))
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_steps: 100,
            // market默认以direct模式运行，保证得到可用的文本结果
            tool_augmented_stages: vec![
                StageId::Idea,
                StageId::Competitor,
                StageId::Risk,
                StageId::Swot,
            ],
            tool_timeout_seconds: 30,
            run_timeout_seconds: 600,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 8000,
            allowed_origins: vec!["*".to_string()],
        }
    }
}
