//! 路由 - 根据运行状态与最后一条历史消息决定下一步

use serde::{Deserialize, Serialize};

use crate::generator::state::{Message, RunState};

/// 分析阶段，顺序固定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Idea,
    Market,
    Competitor,
    Risk,
    Swot,
}

impl StageId {
    pub const ALL: [StageId; 5] = [
        StageId::Idea,
        StageId::Market,
        StageId::Competitor,
        StageId::Risk,
        StageId::Swot,
    ];

    /// 阶段写入的结果字段
    pub fn output_field(self) -> StateField {
        match self {
            StageId::Idea => StateField::IdeaAnalysis,
            StageId::Market => StateField::MarketAnalysis,
            StageId::Competitor => StateField::CompetitionAnalysis,
            StageId::Risk => StateField::RiskAssessment,
            StageId::Swot => StateField::SwotAnalysis,
        }
    }

    /// 固定顺序中的下一个阶段
    pub fn next(self) -> Option<StageId> {
        match self {
            StageId::Idea => Some(StageId::Market),
            StageId::Market => Some(StageId::Competitor),
            StageId::Competitor => Some(StageId::Risk),
            StageId::Risk => Some(StageId::Swot),
            StageId::Swot => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StageId::Idea => "idea",
            StageId::Market => "market",
            StageId::Competitor => "competitor",
            StageId::Risk => "risk",
            StageId::Swot => "swot",
        }
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 运行状态中可作为阶段输入的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateField {
    StartupIdea,
    IdeaAnalysis,
    MarketAnalysis,
    CompetitionAnalysis,
    RiskAssessment,
    SwotAnalysis,
}

impl StateField {
    /// 模板占位符与序列化时使用的名称
    pub fn key(self) -> &'static str {
        match self {
            StateField::StartupIdea => "startup_idea",
            StateField::IdeaAnalysis => "idea_analysis",
            StateField::MarketAnalysis => "market_analysis",
            StateField::CompetitionAnalysis => "competition_analysis",
            StateField::RiskAssessment => "risk_assessment",
            StateField::SwotAnalysis => "swot_analysis",
        }
    }
}

/// Router的决策结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Primary(StageId),
    Fallback(StageId),
    Advisor,
}

/// Driver状态机中的一步
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Primary(StageId),
    Fallback(StageId),
    ToolDispatch(StageId),
    Advisor,
    End,
}

impl From<Route> for Step {
    fn from(route: Route) -> Self {
        match route {
            Route::Primary(stage) => Step::Primary(stage),
            Route::Fallback(stage) => Step::Fallback(stage),
            Route::Advisor => Step::Advisor,
        }
    }
}

impl Step {
    /// fallback变体的静态后继：下一阶段的primary，最后一个阶段之后是advisor
    pub fn after_fallback(stage: StageId) -> Step {
        match stage.next() {
            Some(next) => Step::Primary(next),
            None => Step::Advisor,
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Primary(stage) => write!(f, "{}:primary", stage),
            Step::Fallback(stage) => write!(f, "{}:fallback", stage),
            Step::ToolDispatch(stage) => write!(f, "{}:tool-dispatch", stage),
            Step::Advisor => write!(f, "advisor"),
            Step::End => write!(f, "end"),
        }
    }
}

/// 第一个尚未写入结果的阶段
pub fn pending_stage(state: &RunState) -> Option<StageId> {
    StageId::ALL
        .into_iter()
        .find(|stage| !state.is_complete(*stage))
}

/// 决定下一步要执行的阶段
pub fn route(state: &RunState, last_message: Option<&Message>) -> Route {
    let Some(pending) = pending_stage(state) else {
        return Route::Advisor;
    };

    match last_message {
        Some(message) if message.is_tool_failure() => Route::Fallback(pending),
        _ => Route::Primary(pending),
    }
}
