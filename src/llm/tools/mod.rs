//! 工具协作方 - 执行模型请求的外部工具

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use rig::tool::Tool;
use std::time::Duration;

pub mod web_search;

use web_search::{AgentToolWebSearch, WebSearchArgs};

/// 工具执行接口。失败以Err返回，由调度方转换为失败标记
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(&self, name: &str, args: &serde_json::Value) -> Result<String>;
}

/// 预置工具集
#[derive(Debug, Clone)]
pub struct PresetTools {
    web_search: AgentToolWebSearch,
}

impl PresetTools {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            web_search: AgentToolWebSearch::new(timeout)?,
        })
    }

    pub fn web_search(&self) -> &AgentToolWebSearch {
        &self.web_search
    }
}

#[async_trait]
impl ToolInvoker for PresetTools {
    async fn invoke(&self, name: &str, args: &serde_json::Value) -> Result<String> {
        match name {
            AgentToolWebSearch::NAME => {
                let args: WebSearchArgs = serde_json::from_value(args.clone())
                    .map_err(|e| anyhow!("web_search参数无效: {}", e))?;
                let result = self.web_search.search(&args).await?;
                Ok(serde_json::to_string(&result)?)
            }
            other => Err(anyhow!("未知工具: {}", other)),
        }
    }
}
