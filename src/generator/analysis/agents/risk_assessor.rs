use crate::generator::router::{StageId, StateField};
use crate::generator::step_forward_agent::StepForwardAgent;

/// 风险评估
#[derive(Default)]
pub struct RiskAssessor;

impl StepForwardAgent for RiskAssessor {
    fn stage(&self) -> StageId {
        StageId::Risk
    }

    fn required_inputs(&self) -> &'static [StateField] {
        &[
            StateField::IdeaAnalysis,
            StateField::MarketAnalysis,
            StateField::CompetitionAnalysis,
        ]
    }

    fn system_prompt(&self) -> &'static str {
        r#"You are a venture risk assessor. Evaluate the risks facing the startup idea: market, execution, technical, financial, regulatory and competitive.

Rate each risk by likelihood and impact (low/medium/high) and propose a concrete mitigation. Do not prefix the answer with a label."#
    }
}
