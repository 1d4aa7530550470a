use thiserror::Error;

/// 流水线运行错误
#[derive(Debug, Error)]
pub enum RunError {
    /// 配置错误，例如模板文件缺失或凭据缺失
    #[error("配置错误: {0}")]
    Config(String),

    #[error("阶段 {stage} 缺少必需的输入字段 {field}")]
    MissingInput { stage: String, field: &'static str },

    /// 模型调用失败，不与其他未捕获错误区分
    #[error("{step} 调用模型失败: {cause:#}")]
    Model { step: String, cause: anyhow::Error },

    #[error("运行超过最大状态转移次数 {limit}，已中止")]
    CeilingExceeded { limit: usize },

    #[error("运行超过 {seconds} 秒未完成，已中止")]
    Timeout { seconds: u64 },
}

impl RunError {
    pub fn model(step: impl std::fmt::Display, cause: anyhow::Error) -> Self {
        RunError::Model {
            step: step.to_string(),
            cause,
        }
    }

    /// 稳定的错误类别标识
    pub fn kind(&self) -> &'static str {
        match self {
            RunError::Config(_) => "configuration",
            RunError::MissingInput { .. } => "missing_input",
            RunError::Model { .. } => "model",
            RunError::CeilingExceeded { .. } => "ceiling_exceeded",
            RunError::Timeout { .. } => "timeout",
        }
    }
}
