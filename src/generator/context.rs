use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::{
    config::Config,
    llm::client::{ChatModel, LLMClient},
    llm::tools::{PresetTools, ToolInvoker},
};

/// 流水线共享的只读上下文，多个并发运行之间没有可变共享状态
#[derive(Clone)]
pub struct GeneratorContext {
    /// 配置
    pub config: Config,
    /// 模型协作方
    pub model: Arc<dyn ChatModel>,
    /// 工具协作方
    pub tools: Arc<dyn ToolInvoker>,
}

impl GeneratorContext {
    /// 使用rig客户端和预置工具创建上下文
    pub fn new(config: Config) -> Result<Self> {
        let tools = PresetTools::new(Duration::from_secs(config.pipeline.tool_timeout_seconds))?;
        let llm_client = LLMClient::new(config.clone(), tools.web_search().clone())?;
        Ok(Self::with_collaborators(
            config,
            Arc::new(llm_client),
            Arc::new(tools),
        ))
    }

    /// 注入自定义的模型与工具实现
    pub fn with_collaborators(
        config: Config,
        model: Arc<dyn ChatModel>,
        tools: Arc<dyn ToolInvoker>,
    ) -> Self {
        Self {
            config,
            model,
            tools,
        }
    }
}
