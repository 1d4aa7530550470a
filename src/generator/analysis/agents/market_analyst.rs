use crate::generator::router::{StageId, StateField};
use crate::generator::step_forward_agent::StepForwardAgent;

/// 市场分析 - 评估市场规模、增长趋势与目标客群
#[derive(Default)]
pub struct MarketAnalyst;

impl StepForwardAgent for MarketAnalyst {
    fn stage(&self) -> StageId {
        StageId::Market
    }

    fn required_inputs(&self) -> &'static [StateField] {
        &[StateField::StartupIdea, StateField::IdeaAnalysis]
    }

    fn system_prompt(&self) -> &'static str {
        r#"You are a market research analyst. Assess the market opportunity for the startup idea.

Cover market size (TAM/SAM/SOM with stated assumptions), growth trends, customer segments and their willingness to pay, demand drivers, and timing. Prefer recent figures and cite where they come from when you searched for them."#
    }
}
