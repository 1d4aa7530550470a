use crate::generator::router::{StageId, StateField};
use crate::generator::step_forward_agent::StepForwardAgent;

/// 创意理解 - 提炼创意的核心价值主张、目标用户与商业模式
#[derive(Default)]
pub struct IdeaUnderstanding;

impl StepForwardAgent for IdeaUnderstanding {
    fn stage(&self) -> StageId {
        StageId::Idea
    }

    fn required_inputs(&self) -> &'static [StateField] {
        &[StateField::StartupIdea]
    }

    fn system_prompt(&self) -> &'static str {
        r#"You are a seasoned startup analyst. Your job is to understand a raw startup idea before anyone evaluates it.

Clarify:
1. The problem being solved and who experiences it
2. The proposed solution and its core value proposition
3. The target customer segments
4. The likely business model
5. Key assumptions that must hold for the idea to work

Be concrete and concise. Use web search only when a fact about the real world is needed."#
    }

    fn records_human_input(&self) -> bool {
        true
    }
}
