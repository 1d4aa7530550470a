//! LLM客户端 - 提供统一的LLM服务接口

use anyhow::Result;
use async_trait::async_trait;
use std::future::Future;

use crate::config::Config;
use crate::llm::tools::web_search::AgentToolWebSearch;

mod providers;
pub mod types;

use providers::{ProviderAgent, ProviderClient};
pub use types::{
    ChatModel, InvocationMode, ModelReply, ModelRequest, ToolCallRequest, ToolResultRecord,
};

/// LLM客户端 - 基于rig的模型协作方实现
#[derive(Clone)]
pub struct LLMClient {
    config: Config,
    client: ProviderClient,
    web_search: AgentToolWebSearch,
}

impl LLMClient {
    /// 创建新的LLM客户端
    pub fn new(config: Config, web_search: AgentToolWebSearch) -> Result<Self> {
        let client = ProviderClient::new(&config.llm)?;
        Ok(Self {
            client,
            config,
            web_search,
        })
    }

    /// 检查模型连接和功能是否正常
    async fn probe_connection(&self) -> Result<()> {
        tracing::info!("🔄 正在检查模型连接...");
        let agent = self.build_agent("You are a helpful assistant.", InvocationMode::Direct)?;
        match agent.prompt("Hello").await {
            Ok(_) => {
                tracing::info!("✅ 模型连接正常");
                Ok(())
            }
            Err(e) => {
                tracing::error!("❌ 模型连接失败: {}", e);
                Err(e)
            }
        }
    }

    fn build_agent(&self, system_prompt: &str, mode: InvocationMode) -> Result<ProviderAgent> {
        let llm_config = &self.config.llm;
        match mode {
            InvocationMode::Direct => {
                self.client
                    .create_agent(&llm_config.model, system_prompt, llm_config)
            }
            InvocationMode::ToolAugmented => self.client.create_agent_with_tools(
                &llm_config.model,
                system_prompt,
                llm_config,
                &self.web_search,
            ),
        }
    }

    /// 通用重试逻辑，用于处理模型服务的瞬时错误
    async fn retry_with_backoff<T, F, Fut>(&self, log_tag: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, anyhow::Error>>,
    {
        let llm_config = &self.config.llm;
        let max_attempts = llm_config.retry_attempts.max(1);
        let retry_delay_ms = llm_config.retry_delay_ms;
        let mut attempts = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    attempts += 1;
                    if attempts >= max_attempts {
                        return Err(err);
                    }
                    tracing::warn!(
                        "❌ [{}] 调用模型服务出错，重试中 (第 {} / {}次尝试): {}",
                        log_tag,
                        attempts,
                        max_attempts,
                        err
                    );
                    tokio::time::sleep(std::time::Duration::from_millis(retry_delay_ms)).await;
                }
            }
        }
    }
}

#[async_trait]
impl ChatModel for LLMClient {
    async fn invoke(&self, request: &ModelRequest) -> Result<ModelReply> {
        let agent = self.build_agent(&request.system_prompt, request.mode)?;
        let user_prompt = request.render_user_prompt();

        self.retry_with_backoff(&request.log_tag, || async {
            agent.complete(&user_prompt).await
        })
        .await
    }

    async fn check_connection(&self) -> Result<()> {
        self.probe_connection().await
    }
}
