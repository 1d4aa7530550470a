//! 工具调度 - 执行模型请求的工具调用，失败统一转换为失败标记

use std::time::Duration;

use crate::generator::context::GeneratorContext;
use crate::generator::router::StageId;
use crate::generator::state::{Message, StateUpdate};
use crate::llm::client::ToolCallRequest;

/// 执行一次工具调用。不会返回错误，失败被记录为失败标记消息
pub async fn dispatch(
    context: &GeneratorContext,
    stage: StageId,
    call: &ToolCallRequest,
) -> StateUpdate {
    let timeout = Duration::from_secs(context.config.pipeline.tool_timeout_seconds);
    tracing::info!("🔧 [{}] 执行工具 {} 参数 {}", stage, call.name, call.args);

    let outcome = tokio::time::timeout(timeout, context.tools.invoke(&call.name, &call.args)).await;

    let message = match outcome {
        Ok(Ok(content)) => {
            tracing::debug!("[{}] 工具 {} 返回 {} 字节", stage, call.name, content.len());
            Message::tool_result(&call.name, &call.id, content)
        }
        Ok(Err(e)) => {
            tracing::warn!("⚠️ [{}] 工具 {} 执行失败: {:#}", stage, call.name, e);
            Message::tool_failure(&call.name, &call.id)
        }
        Err(_) => {
            tracing::warn!(
                "⚠️ [{}] 工具 {} 超过 {} 秒未返回",
                stage,
                call.name,
                timeout.as_secs()
            );
            Message::tool_failure(&call.name, &call.id)
        }
    };

    StateUpdate::default().with_message(message)
}
