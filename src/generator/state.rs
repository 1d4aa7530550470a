//! 运行状态 - 单次流水线执行中贯穿所有阶段的可变记录

use serde::{Deserialize, Serialize};

use crate::generator::router::{StageId, StateField};
use crate::llm::client::{ToolCallRequest, ToolResultRecord};

/// 工具失败标记的内容值
pub const TOOL_FAILED_SENTINEL: &str = "tool_failed";

/// 历史消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// 用户输入
    Human { content: String },
    /// 模型响应，stage为None时来自advisor
    Model {
        stage: Option<StageId>,
        content: String,
        tool_call: Option<ToolCallRequest>,
    },
    /// 工具执行结果
    ToolResult {
        tool: String,
        call_id: String,
        content: String,
    },
    /// 工具执行失败的标记
    ToolFailure { tool: String, call_id: String },
}

impl Message {
    pub fn human(content: impl Into<String>) -> Self {
        Message::Human {
            content: content.into(),
        }
    }

    pub fn model(
        stage: Option<StageId>,
        content: impl Into<String>,
        tool_call: Option<ToolCallRequest>,
    ) -> Self {
        Message::Model {
            stage,
            content: content.into(),
            tool_call,
        }
    }

    pub fn tool_result(
        tool: impl Into<String>,
        call_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Message::ToolResult {
            tool: tool.into(),
            call_id: call_id.into(),
            content: content.into(),
        }
    }

    pub fn tool_failure(tool: impl Into<String>, call_id: impl Into<String>) -> Self {
        Message::ToolFailure {
            tool: tool.into(),
            call_id: call_id.into(),
        }
    }

    /// 消息内容；失败标记的内容固定为哨兵值
    pub fn content(&self) -> &str {
        match self {
            Message::Human { content }
            | Message::Model { content, .. }
            | Message::ToolResult { content, .. } => content,
            Message::ToolFailure { .. } => TOOL_FAILED_SENTINEL,
        }
    }

    pub fn is_tool_failure(&self) -> bool {
        matches!(self, Message::ToolFailure { .. })
    }
}

/// advisor的两个输出字段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisorOutput {
    pub advisor_recommendations: String,
    pub advice: String,
}

/// 阶段返回的局部更新
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    /// 阶段写入的唯一结果字段
    pub result: Option<(StageId, String)>,
    pub advisor: Option<AdvisorOutput>,
    /// 结果来自fallback变体
    pub degraded: Option<StageId>,
    /// 追加到历史末尾的消息
    pub messages: Vec<Message>,
}

impl StateUpdate {
    pub fn for_stage(stage: StageId, result: impl Into<String>) -> Self {
        Self {
            result: Some((stage, result.into())),
            ..Default::default()
        }
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }
}

/// 单次运行的状态
#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    startup_idea: String,
    idea_analysis: Option<String>,
    market_analysis: Option<String>,
    competition_analysis: Option<String>,
    risk_assessment: Option<String>,
    swot_analysis: Option<String>,
    advisor_recommendations: Option<String>,
    advice: Option<String>,
    degraded_stages: Vec<StageId>,
    messages: Vec<Message>,
}

impl RunState {
    /// 创建全新的运行状态，所有结果字段为空，历史为空
    pub fn new(startup_idea: impl Into<String>) -> Self {
        Self {
            startup_idea: startup_idea.into(),
            idea_analysis: None,
            market_analysis: None,
            competition_analysis: None,
            risk_assessment: None,
            swot_analysis: None,
            advisor_recommendations: None,
            advice: None,
            degraded_stages: Vec::new(),
            messages: Vec::new(),
        }
    }

    pub fn startup_idea(&self) -> &str {
        &self.startup_idea
    }

    fn result_slot(&mut self, stage: StageId) -> &mut Option<String> {
        match stage {
            StageId::Idea => &mut self.idea_analysis,
            StageId::Market => &mut self.market_analysis,
            StageId::Competitor => &mut self.competition_analysis,
            StageId::Risk => &mut self.risk_assessment,
            StageId::Swot => &mut self.swot_analysis,
        }
    }

    /// 读取字段值
    pub fn field(&self, field: StateField) -> Option<&str> {
        match field {
            StateField::StartupIdea => Some(self.startup_idea.as_str()),
            StateField::IdeaAnalysis => self.idea_analysis.as_deref(),
            StateField::MarketAnalysis => self.market_analysis.as_deref(),
            StateField::CompetitionAnalysis => self.competition_analysis.as_deref(),
            StateField::RiskAssessment => self.risk_assessment.as_deref(),
            StateField::SwotAnalysis => self.swot_analysis.as_deref(),
        }
    }

    pub fn result(&self, stage: StageId) -> Option<&str> {
        self.field(stage.output_field())
    }

    pub fn is_complete(&self, stage: StageId) -> bool {
        self.result(stage).is_some()
    }

    pub fn advisor_recommendations(&self) -> Option<&str> {
        self.advisor_recommendations.as_deref()
    }

    pub fn advice(&self) -> Option<&str> {
        self.advice.as_deref()
    }

    pub fn degraded_stages(&self) -> &[StageId] {
        &self.degraded_stages
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// 合并局部更新：只覆盖更新携带的字段，历史只追加
    pub fn merge(&mut self, update: StateUpdate) {
        if let Some((stage, result)) = update.result {
            *self.result_slot(stage) = Some(result);
        }
        if let Some(advisor) = update.advisor {
            self.advisor_recommendations = Some(advisor.advisor_recommendations);
            self.advice = Some(advisor.advice);
        }
        if let Some(stage) = update.degraded
            && !self.degraded_stages.contains(&stage)
        {
            self.degraded_stages.push(stage);
        }
        self.messages.extend(update.messages);
    }

    /// 最后一条消息若是携带工具调用请求的模型响应，返回该请求
    pub fn pending_tool_call(&self) -> Option<&ToolCallRequest> {
        match self.last_message() {
            Some(Message::Model {
                tool_call: Some(call),
                ..
            }) => Some(call),
            _ => None,
        }
    }

    /// 收集历史中属于某个阶段的成功工具结果
    pub fn tool_results_for(&self, stage: StageId) -> Vec<ToolResultRecord> {
        let mut owner: Option<StageId> = None;
        let mut records = Vec::new();

        for message in &self.messages {
            match message {
                Message::Model { stage: origin, .. } => owner = *origin,
                Message::ToolResult { tool, content, .. } if owner == Some(stage) => {
                    records.push(ToolResultRecord {
                        name: tool.clone(),
                        content: content.clone(),
                    });
                }
                _ => {}
            }
        }
        records
    }

    /// 去掉历史后的扁平报告
    pub fn into_report(self) -> ValidationReport {
        ValidationReport {
            startup_idea: self.startup_idea,
            idea_analysis: self.idea_analysis,
            market_analysis: self.market_analysis,
            competition_analysis: self.competition_analysis,
            risk_assessment: self.risk_assessment,
            swot_analysis: self.swot_analysis,
            advisor_recommendations: self.advisor_recommendations,
            advice: self.advice,
            degraded_stages: self.degraded_stages,
        }
    }
}

/// 返回给调用方的最终结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub startup_idea: String,
    pub idea_analysis: Option<String>,
    pub market_analysis: Option<String>,
    pub competition_analysis: Option<String>,
    pub risk_assessment: Option<String>,
    pub swot_analysis: Option<String>,
    pub advisor_recommendations: Option<String>,
    pub advice: Option<String>,
    pub degraded_stages: Vec<StageId>,
}
