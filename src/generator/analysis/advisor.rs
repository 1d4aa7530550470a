use serde::Deserialize;

use crate::generator::context::GeneratorContext;
use crate::generator::error::RunError;
use crate::generator::router::{StageId, Step};
use crate::generator::state::{AdvisorOutput, Message, RunState, StateUpdate};
use crate::generator::step_forward_agent::PromptTemplate;
use crate::llm::client::{InvocationMode, ModelRequest};

const SYSTEM_PROMPT: &str = r#"You are a startup advisor who has reviewed the complete research on a startup idea.

Respond with a single JSON object and nothing else:
{"advisor_recommendations": "<markdown: verdict, prioritised recommendations and next steps>", "advice": "<one short paragraph of candid advice for the founder>"}"#;

/// 顾问 - 终止阶段，综合五项分析给出最终建议
#[derive(Default)]
pub struct Advisor;

#[derive(Deserialize)]
struct AdvisorReply {
    advisor_recommendations: String,
    advice: String,
}

impl Advisor {
    /// 运行顺序保证五个结果字段都已写入
    pub async fn execute(
        &self,
        context: &GeneratorContext,
        state: &RunState,
    ) -> Result<StateUpdate, RunError> {
        let template = PromptTemplate::load(&context.config.prompts.advisor).await?;

        let mut vars = vec![("startup_idea", state.startup_idea())];
        for stage in StageId::ALL {
            let field = stage.output_field();
            vars.push((field.key(), state.field(field).unwrap_or_default()));
        }
        let user_prompt = template.render(&vars);
        let system_prompt = format!(
            "{}\n\n{}",
            SYSTEM_PROMPT,
            context.config.target_language.prompt_instruction()
        );

        let request = ModelRequest::new(
            Step::Advisor.to_string(),
            system_prompt,
            user_prompt,
            InvocationMode::Direct,
        );
        let reply = context
            .model
            .invoke(&request)
            .await
            .map_err(|e| RunError::model(Step::Advisor, e))?;

        let output = parse_advisor_reply(&reply.text);
        tracing::info!("✅ Advisor执行完成");

        Ok(StateUpdate {
            advisor: Some(output),
            messages: vec![Message::model(None, reply.text, None)],
            ..Default::default()
        })
    }
}

/// 解析顾问输出；不是合法JSON时全文作为建议，最后一段作为忠告
pub fn parse_advisor_reply(text: &str) -> AdvisorOutput {
    let trimmed = strip_code_fence(text.trim());

    if let Ok(reply) = serde_json::from_str::<AdvisorReply>(trimmed) {
        return AdvisorOutput {
            advisor_recommendations: reply.advisor_recommendations,
            advice: reply.advice,
        };
    }

    tracing::warn!("⚠️ 顾问输出不是预期的JSON，按纯文本处理");
    let advice = text
        .trim()
        .rsplit("\n\n")
        .map(str::trim)
        .find(|paragraph| !paragraph.is_empty())
        .unwrap_or_default()
        .to_string();

    AdvisorOutput {
        advisor_recommendations: text.trim().to_string(),
        advice,
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(body) = text.strip_prefix("```") else {
        return text;
    };
    // 去掉语言标记所在的第一行
    let body = body.split_once('\n').map(|(_, rest)| rest).unwrap_or(body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_reply() {
        let output = parse_advisor_reply(
            r#"{"advisor_recommendations": "Validate with 20 users", "advice": "Start small."}"#,
        );
        assert_eq!(output.advisor_recommendations, "Validate with 20 users");
        assert_eq!(output.advice, "Start small.");
    }

    #[test]
    fn test_parse_fenced_json_reply() {
        let text = "```json\n{\"advisor_recommendations\": \"R\", \"advice\": \"A\"}\n```";
        let output = parse_advisor_reply(text);
        assert_eq!(output.advisor_recommendations, "R");
        assert_eq!(output.advice, "A");
    }

    #[test]
    fn test_parse_plain_text_reply() {
        let text = "## Verdict\nPromising.\n\n## Next steps\nInterview growers.\n\nMove fast but test pricing first.\n";
        let output = parse_advisor_reply(text);
        assert_eq!(output.advisor_recommendations, text.trim());
        assert_eq!(output.advice, "Move fast but test pricing first.");
    }

    #[test]
    fn test_parse_single_paragraph_reply() {
        let output = parse_advisor_reply("Go for it");
        assert_eq!(output.advisor_recommendations, "Go for it");
        assert_eq!(output.advice, "Go for it");
    }
}
