use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::Instrument;

use crate::config::Config;
use crate::generator::analysis::{advisor::Advisor, agent_for};
use crate::generator::context::GeneratorContext;
use crate::generator::error::RunError;
use crate::generator::router::{StageId, Step, route};
use crate::generator::state::{RunState, ValidationReport};
use crate::generator::step_forward_agent::Variant;
use crate::generator::tool_dispatch;

/// 流水线驱动器 - 从idea阶段开始推进状态机，直到end或超过最大转移次数
pub struct PipelineDriver<'a> {
    context: &'a GeneratorContext,
}

impl<'a> PipelineDriver<'a> {
    pub fn new(context: &'a GeneratorContext) -> Self {
        Self { context }
    }

    /// 执行一次完整的运行
    pub async fn run(&self, startup_idea: &str) -> Result<ValidationReport, RunError> {
        let limit = self.context.config.pipeline.max_steps;
        let mut state = RunState::new(startup_idea);
        let mut step = Step::Primary(StageId::Idea);
        let mut executed = 0usize;

        while step != Step::End {
            executed += 1;
            if executed > limit {
                tracing::error!("❌ 超过最大状态转移次数 {}，中止运行", limit);
                return Err(RunError::CeilingExceeded { limit });
            }

            tracing::debug!("➡️ 第 {} 步: {}", executed, step);
            step = self.advance(&mut state, step).await?;
        }

        if !state.degraded_stages().is_empty() {
            tracing::warn!(
                "⚠️ 以下阶段的结果来自fallback: {:?}",
                state.degraded_stages()
            );
        }
        tracing::info!("🎉 分析完成，共执行 {} 步", executed);
        Ok(state.into_report())
    }

    /// 执行一步并返回下一步
    async fn advance(&self, state: &mut RunState, step: Step) -> Result<Step, RunError> {
        let context = self.context;
        let next = match step {
            Step::Primary(stage) => {
                tracing::info!("🤖 开始执行阶段 {}", step);
                let update = agent_for(stage)
                    .execute(context, state, Variant::Primary)
                    .await?;
                state.merge(update);
                match state.pending_tool_call() {
                    Some(_) => Step::ToolDispatch(stage),
                    None => route(state, state.last_message()).into(),
                }
            }
            Step::Fallback(stage) => {
                tracing::warn!("⚠️ 工具调用失败，阶段 {} 改用fallback", stage);
                let update = agent_for(stage)
                    .execute(context, state, Variant::Fallback)
                    .await?;
                state.merge(update);
                Step::after_fallback(stage)
            }
            Step::ToolDispatch(stage) => {
                if let Some(call) = state.pending_tool_call().cloned() {
                    let update = tool_dispatch::dispatch(context, stage, &call).await;
                    state.merge(update);
                }
                route(state, state.last_message()).into()
            }
            Step::Advisor => {
                tracing::info!("🧭 开始生成最终建议");
                let update = Advisor.execute(context, state).await?;
                state.merge(update);
                Step::End
            }
            Step::End => Step::End,
        };
        Ok(next)
    }
}

/// 运行一次流水线，整个运行受 `run_timeout_seconds` 限制
pub async fn run_pipeline(
    context: &GeneratorContext,
    startup_idea: &str,
) -> Result<ValidationReport, RunError> {
    let run_id = uuid::Uuid::new_v4();
    let seconds = context.config.pipeline.run_timeout_seconds;
    let span = tracing::info_span!("run", %run_id);

    let driver = PipelineDriver::new(context);
    let outcome = tokio::time::timeout(Duration::from_secs(seconds), driver.run(startup_idea))
        .instrument(span)
        .await;

    match outcome {
        Ok(result) => result,
        Err(_) => {
            tracing::error!("❌ 运行 {} 超过 {} 秒未完成", run_id, seconds);
            Err(RunError::Timeout { seconds })
        }
    }
}

/// 启动方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchMode {
    /// 启动HTTP服务
    Serve,
    /// 只分析一个想法，结果以JSON输出到stdout
    Once { startup_idea: String },
}

/// 启动验证器
pub async fn launch(config: &Config, mode: LaunchMode, check_connection: bool) -> Result<()> {
    config.validate()?;
    let context = GeneratorContext::new(config.clone())?;

    // 启动时检查模型连接
    if check_connection {
        context.model.check_connection().await?;
    }

    match mode {
        LaunchMode::Serve => crate::server::serve(Arc::new(context)).await,
        LaunchMode::Once { startup_idea } => {
            let report = run_pipeline(&context, &startup_idea).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

// Include tests
#[cfg(test)]
mod tests;
