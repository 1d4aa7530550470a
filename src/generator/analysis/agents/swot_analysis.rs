use crate::generator::router::{StageId, StateField};
use crate::generator::step_forward_agent::StepForwardAgent;

/// SWOT分析 - 汇总前四个阶段的结论
#[derive(Default)]
pub struct SwotAnalysis;

impl StepForwardAgent for SwotAnalysis {
    fn stage(&self) -> StageId {
        StageId::Swot
    }

    fn required_inputs(&self) -> &'static [StateField] {
        &[
            StateField::IdeaAnalysis,
            StateField::MarketAnalysis,
            StateField::CompetitionAnalysis,
            StateField::RiskAssessment,
        ]
    }

    fn system_prompt(&self) -> &'static str {
        r#"You are a strategy consultant. Build a SWOT analysis (strengths, weaknesses, opportunities, threats) from the research provided.

Ground every point in the earlier analyses; avoid generic statements. Keep each quadrant to its most important items."#
    }
}
