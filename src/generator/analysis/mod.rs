// 五个分析阶段按固定顺序执行，每个阶段只写入一个结果字段
// idea       = startup_idea
// market     = startup_idea + idea_analysis
// competitor = startup_idea + idea_analysis + market_analysis
// risk       = idea_analysis + market_analysis + competition_analysis
// swot       = 前四项分析
// advisor    = 全部五项分析，终止阶段

use crate::generator::router::StageId;
use crate::generator::step_forward_agent::StepForwardAgent;

pub mod advisor;
pub mod agents;

use agents::competitor_analysis::CompetitorAnalysis;
use agents::idea_understanding::IdeaUnderstanding;
use agents::market_analyst::MarketAnalyst;
use agents::risk_assessor::RiskAssessor;
use agents::swot_analysis::SwotAnalysis;

/// 获取阶段对应的Agent
pub fn agent_for(stage: StageId) -> &'static dyn StepForwardAgent {
    match stage {
        StageId::Idea => &IdeaUnderstanding,
        StageId::Market => &MarketAnalyst,
        StageId::Competitor => &CompetitorAnalysis,
        StageId::Risk => &RiskAssessor,
        StageId::Swot => &SwotAnalysis,
    }
}
