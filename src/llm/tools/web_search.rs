//! 网络搜索工具

use anyhow::{Context, Result};
use rig::tool::Tool;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SEARCH_ENDPOINT: &str = "https://api.duckduckgo.com/";
const DEFAULT_MAX_RESULTS: usize = 5;
const MAX_RESULTS_LIMIT: usize = 10;

/// 网络搜索工具，基于DuckDuckGo即时答案接口
#[derive(Debug, Clone)]
pub struct AgentToolWebSearch {
    client: reqwest::Client,
}

/// 搜索参数
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct WebSearchArgs {
    /// 搜索关键词
    pub query: String,
    /// 返回结果的最大数量（默认5，最大10）
    pub max_results: Option<usize>,
}

/// 搜索结果
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct WebSearchResult {
    pub query: String,
    pub results: Vec<String>,
}

/// 搜索工具错误
#[derive(Debug, thiserror::Error)]
#[error("web search failed: {0}")]
pub struct WebSearchError(String);

impl AgentToolWebSearch {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("startup-validator/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client for web search")?;
        Ok(Self { client })
    }

    pub async fn search(&self, args: &WebSearchArgs) -> Result<WebSearchResult> {
        let query = args.query.trim();
        if query.is_empty() {
            anyhow::bail!("搜索关键词不能为空");
        }
        let max_results = args
            .max_results
            .unwrap_or(DEFAULT_MAX_RESULTS)
            .clamp(1, MAX_RESULTS_LIMIT);

        let body: serde_json::Value = self
            .client
            .get(SEARCH_ENDPOINT)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
            .context("Search request failed")?
            .error_for_status()
            .context("Search service returned an error status")?
            .json()
            .await
            .context("Failed to parse search response")?;

        Ok(WebSearchResult {
            query: query.to_string(),
            results: extract_results(&body, max_results),
        })
    }
}

/// 从即时答案接口的响应中提取摘要与相关条目
fn extract_results(body: &serde_json::Value, max_results: usize) -> Vec<String> {
    let mut results = Vec::new();

    if let Some(abstract_text) = body.get("AbstractText").and_then(|v| v.as_str())
        && !abstract_text.is_empty()
    {
        let source = body
            .get("AbstractSource")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown");
        let url = body
            .get("AbstractURL")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        results.push(format!("[{}] {}\n  URL: {}", source, abstract_text, url));
    }

    if let Some(topics) = body.get("RelatedTopics").and_then(|v| v.as_array()) {
        // 分组条目的子条目在Topics字段里
        let flattened = topics.iter().flat_map(|topic| {
            match topic.get("Topics").and_then(|v| v.as_array()) {
                Some(nested) => nested.iter().collect::<Vec<_>>(),
                None => vec![topic],
            }
        });

        for topic in flattened {
            if results.len() >= max_results {
                break;
            }
            if let Some(text) = topic.get("Text").and_then(|v| v.as_str()) {
                let url = topic.get("FirstURL").and_then(|v| v.as_str()).unwrap_or("");
                results.push(format!("{}\n  URL: {}", text, url));
            }
        }
    }

    results.truncate(max_results);
    results
}

impl Tool for AgentToolWebSearch {
    const NAME: &'static str = "web_search";

    type Error = WebSearchError;
    type Args = WebSearchArgs;
    type Output = WebSearchResult;

    async fn definition(&self, _prompt: String) -> rig::completion::ToolDefinition {
        rig::completion::ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Search the web for up-to-date information about markets, competitors, pricing, regulations and trends. Returns short snippets with source URLs.".to_string(),
            parameters: serde_json::to_value(schemars::schema_for!(WebSearchArgs))
                .unwrap_or_else(|_| serde_json::json!({"type": "object"})),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        tracing::debug!("🔧 tool called...web_search@{:?}", args);
        self.search(&args)
            .await
            .map_err(|e| WebSearchError(format!("{:#}", e)))
    }
}
