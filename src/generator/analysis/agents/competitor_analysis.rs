use crate::generator::router::{StageId, StateField};
use crate::generator::step_forward_agent::StepForwardAgent;

/// 竞品分析
#[derive(Default)]
pub struct CompetitorAnalysis;

impl StepForwardAgent for CompetitorAnalysis {
    fn stage(&self) -> StageId {
        StageId::Competitor
    }

    fn required_inputs(&self) -> &'static [StateField] {
        &[
            StateField::StartupIdea,
            StateField::IdeaAnalysis,
            StateField::MarketAnalysis,
        ]
    }

    fn system_prompt(&self) -> &'static str {
        r#"You are a competitive intelligence analyst. Identify direct and indirect competitors and substitutes for the startup idea.

For each relevant competitor describe positioning, pricing, strengths and weaknesses. Finish with the gaps in the landscape the startup could exploit and how defensible its differentiation is."#
    }
}
