use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::generator::context::GeneratorContext;
use crate::generator::error::RunError;
use crate::generator::router::{StageId, StateField, Step};
use crate::generator::state::{Message, RunState, StateUpdate};
use crate::llm::client::{InvocationMode, ModelRequest};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").expect("placeholder pattern is valid"));

/// 模板中始终可用的日期占位符
pub const CURRENT_DATE_KEY: &str = "current_date";

/// 从文件加载的Prompt模板，占位符形如 `{startup_idea}`
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    source: PathBuf,
    text: String,
}

impl PromptTemplate {
    pub fn new(source: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }

    /// 加载模板文件，失败属于配置错误
    pub async fn load(path: &Path) -> Result<Self, RunError> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Ok(Self::new(path, text)),
            Err(e) => Err(RunError::Config(format!(
                "Prompt file missing at {}: {}",
                path.display(),
                e
            ))),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// 模板中出现的占位符名称
    pub fn placeholders(&self) -> Vec<&str> {
        PLACEHOLDER
            .captures_iter(&self.text)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect()
    }

    /// 单遍替换占位符，未知占位符原样保留，变量值中的花括号不会被再次替换
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
        PLACEHOLDER
            .replace_all(&self.text, |caps: &regex::Captures| {
                let key = &caps[1];
                if key == CURRENT_DATE_KEY {
                    return today.clone();
                }
                vars.iter()
                    .find(|(name, _)| *name == key)
                    .map(|(_, value)| value.to_string())
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

/// 阶段变体
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Primary,
    /// 工具失败后的唯一一次重试，始终以direct模式运行
    Fallback,
}

/// 分析阶段的统一契约：读取运行状态，调用一次模型，返回只包含本阶段结果字段的局部更新
#[async_trait]
pub trait StepForwardAgent: Send + Sync {
    fn stage(&self) -> StageId;

    /// 必需的输入字段，同时也是模板中的占位符
    fn required_inputs(&self) -> &'static [StateField];

    /// 系统提示词
    fn system_prompt(&self) -> &'static str;

    /// 是否把用户原始输入记入历史
    fn records_human_input(&self) -> bool {
        false
    }

    /// 本次调用使用的模式
    fn invocation_mode(&self, context: &GeneratorContext, variant: Variant) -> InvocationMode {
        let tools_allowed = !context.config.llm.disable_preset_tools
            && context.config.pipeline.allows_tools(self.stage());
        match variant {
            Variant::Primary if tools_allowed => InvocationMode::ToolAugmented,
            _ => InvocationMode::Direct,
        }
    }

    /// 默认实现的execute方法
    async fn execute(
        &self,
        context: &GeneratorContext,
        state: &RunState,
        variant: Variant,
    ) -> Result<StateUpdate, RunError> {
        let stage = self.stage();
        let step = match variant {
            Variant::Primary => Step::Primary(stage),
            Variant::Fallback => Step::Fallback(stage),
        };

        // 1. 加载模板，缺失时在调用模型前失败
        let template = PromptTemplate::load(context.config.prompts.path_for(stage)).await?;

        // 2. 检查必需的输入
        let mut vars = Vec::with_capacity(self.required_inputs().len());
        for field in self.required_inputs() {
            let value = state
                .field(*field)
                .ok_or_else(|| RunError::MissingInput {
                    stage: stage.to_string(),
                    field: field.key(),
                })?;
            vars.push((field.key(), value));
        }

        let placeholders = template.placeholders();
        for (key, _) in &vars {
            if !placeholders.contains(key) {
                tracing::warn!(
                    "⚠️ 模板 {} 中没有占位符 {{{}}}",
                    template.source().display(),
                    key
                );
            }
        }

        // 3. 构建prompt
        let user_prompt = template.render(&vars);
        let system_prompt = format!(
            "{}\n\n{}",
            self.system_prompt(),
            context.config.target_language.prompt_instruction()
        );
        let mode = self.invocation_mode(context, variant);
        let request = ModelRequest::new(step.to_string(), system_prompt, user_prompt, mode)
            .with_tool_results(state.tool_results_for(stage));

        tracing::debug!("[{}] prompt:\n{}", step, request.render_user_prompt());

        // 4. 调用一次模型
        let reply = context
            .model
            .invoke(&request)
            .await
            .map_err(|e| RunError::model(step, e))?;

        let mut update = StateUpdate::default();
        if self.records_human_input() && state.messages().is_empty() {
            update
                .messages
                .push(Message::human(state.startup_idea().to_string()));
        }

        // 5. 请求工具时只记录消息，结果字段保持为空，由工具调度后重新路由
        match (mode, reply.tool_call) {
            (InvocationMode::ToolAugmented, Some(call)) => {
                tracing::info!("🔧 [{}] 模型请求工具 {}", step, call.name);
                update
                    .messages
                    .push(Message::model(Some(stage), reply.text, Some(call)));
            }
            (_, tool_call) => {
                if let Some(call) = tool_call {
                    tracing::warn!(
                        "⚠️ [{}] direct模式下忽略模型的工具调用请求 {}",
                        step,
                        call.name
                    );
                }
                update
                    .messages
                    .push(Message::model(Some(stage), reply.text.clone(), None));
                update.result = Some((stage, reply.text));
                if variant == Variant::Fallback {
                    update.degraded = Some(stage);
                }
                tracing::info!("✅ Sub-Agent [{}]执行完成", step);
            }
        }

        Ok(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_replaces_known_placeholders() {
        let template = PromptTemplate::new(
            "inline",
            "Idea: {startup_idea}\nSummary: {idea_analysis}\nKeep {unknown}",
        );
        let rendered = template.render(&[
            ("startup_idea", "AI plant care"),
            ("idea_analysis", "waters plants"),
        ]);

        assert_eq!(
            rendered,
            "Idea: AI plant care\nSummary: waters plants\nKeep {unknown}"
        );
    }

    #[test]
    fn test_render_does_not_substitute_inside_values() {
        let template = PromptTemplate::new("inline", "{startup_idea} / {idea_analysis}");
        let rendered = template.render(&[
            ("startup_idea", "literal {idea_analysis}"),
            ("idea_analysis", "x"),
        ]);
        assert_eq!(rendered, "literal {idea_analysis} / x");
    }

    #[test]
    fn test_render_current_date() {
        let template = PromptTemplate::new("inline", "As of {current_date}");
        let rendered = template.render(&[]);
        assert!(!rendered.contains("{current_date}"));
        assert_eq!(rendered.len(), "As of ".len() + 10);
    }

    #[test]
    fn test_placeholders() {
        let template = PromptTemplate::new("inline", "{a_b} and {c} but not {Upper}");
        assert_eq!(template.placeholders(), vec!["a_b", "c"]);
    }

    #[tokio::test]
    async fn test_load_missing_template_is_config_error() {
        let err = PromptTemplate::load(Path::new("/no/such/template.tpl"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "configuration");
        assert!(err.to_string().contains("/no/such/template.tpl"));
    }

    #[tokio::test]
    async fn test_load_template_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("idea.tpl");
        std::fs::write(&path, "Analyse {startup_idea}").unwrap();

        let template = PromptTemplate::load(&path).await.unwrap();
        assert_eq!(template.source(), path.as_path());
        assert_eq!(template.render(&[("startup_idea", "x")]), "Analyse x");
    }
}
