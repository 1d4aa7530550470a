//! 模型协作方的请求与响应类型

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// 模型调用方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationMode {
    /// 只使用模型，不提供工具
    Direct,
    /// 模型可以返回工具调用请求代替最终答案
    ToolAugmented,
}

/// 模型响应中携带的工具调用请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub args: serde_json::Value,
}

/// 已完成的工具调用结果，回填给下一次模型调用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultRecord {
    pub name: String,
    pub content: String,
}

/// 一次模型调用的请求
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    /// 日志标签
    pub log_tag: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub mode: InvocationMode,
    pub tool_results: Vec<ToolResultRecord>,
}

impl ModelRequest {
    pub fn new(
        log_tag: impl Into<String>,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
        mode: InvocationMode,
    ) -> Self {
        Self {
            log_tag: log_tag.into(),
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            mode,
            tool_results: Vec::new(),
        }
    }

    pub fn with_tool_results(mut self, tool_results: Vec<ToolResultRecord>) -> Self {
        self.tool_results = tool_results;
        self
    }

    /// 拼接工具结果后的完整用户提示词
    pub fn render_user_prompt(&self) -> String {
        if self.tool_results.is_empty() {
            return self.user_prompt.clone();
        }

        let mut prompt = self.user_prompt.clone();
        prompt.push_str("\n\n## Tool results gathered so far\n");
        for (index, record) in self.tool_results.iter().enumerate() {
            prompt.push_str(&format!(
                "### {}. {}\n{}\n\n",
                index + 1,
                record.name,
                record.content
            ));
        }
        prompt.push_str(
            "Use the tool results above to produce your final answer. Do not request the same search again.",
        );
        prompt
    }
}

/// 模型的响应：文本，可能附带一个工具调用请求
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelReply {
    pub text: String,
    pub tool_call: Option<ToolCallRequest>,
}

impl ModelReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_call: None,
        }
    }

    pub fn tool_call(name: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            text: String::new(),
            tool_call: Some(ToolCallRequest {
                id: uuid::Uuid::new_v4().to_string(),
                name: name.into(),
                args,
            }),
        }
    }
}

/// 模型协作方。流水线只依赖这个接口，测试中可以替换为确定性的桩实现
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn invoke(&self, request: &ModelRequest) -> Result<ModelReply>;

    /// 启动时的连通性检查
    async fn check_connection(&self) -> Result<()> {
        Ok(())
    }
}
