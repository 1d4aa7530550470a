//! HTTP服务 - 对外提供想法验证接口

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::generator::context::GeneratorContext;
use crate::generator::error::RunError;
use crate::generator::state::ValidationReport;
use crate::generator::workflow::run_pipeline;

/// 请求体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateRequest {
    pub startup_idea: String,
}

/// 错误响应体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
    pub kind: String,
}

struct ApiError(RunError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            detail: self.0.to_string(),
            kind: self.0.kind().to_string(),
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// 构建路由，所有请求共享同一个只读上下文
pub fn router(context: Arc<GeneratorContext>) -> Router {
    let cors = cors_layer(&context.config.server);
    Router::new()
        .route("/validate", post(validate))
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(context)
}

async fn validate(
    State(context): State<Arc<GeneratorContext>>,
    Json(request): Json<ValidateRequest>,
) -> Result<Json<ValidationReport>, ApiError> {
    match run_pipeline(&context, &request.startup_idea).await {
        Ok(report) => Ok(Json(report)),
        Err(e) => {
            tracing::error!("❌ 验证失败 [{}]: {}", e.kind(), e);
            Err(ApiError(e))
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.allowed_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("⚠️ 忽略无效的跨域来源: {}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// 启动HTTP服务
pub async fn serve(context: Arc<GeneratorContext>) -> Result<()> {
    let address = format!(
        "{}:{}",
        context.config.server.host, context.config.server.port
    );
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .context(format!("Failed to bind {}", address))?;

    tracing::info!("🚀 服务已启动: http://{}", address);
    axum::serve(listener, router(context))
        .await
        .context("HTTP server stopped unexpectedly")?;
    Ok(())
}
