use super::*;
use crate::config::PromptConfig;
use crate::generator::router::StageId;
use crate::generator::state::Message;
use crate::llm::client::{ChatModel, InvocationMode, ModelReply, ModelRequest};
use crate::llm::tools::ToolInvoker;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

type Script = dyn Fn(&ModelRequest) -> anyhow::Result<ModelReply> + Send + Sync;

/// 按脚本应答并记录每次请求的模型桩
struct ScriptedModel {
    script: Box<Script>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    fn new(
        script: impl Fn(&ModelRequest) -> anyhow::Result<ModelReply> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(script),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn tags(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|request| request.log_tag.clone())
            .collect()
    }

    fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn invoke(&self, request: &ModelRequest) -> anyhow::Result<ModelReply> {
        self.requests.lock().unwrap().push(request.clone());
        (self.script)(request)
    }
}

struct StubTools {
    succeed: bool,
    calls: AtomicUsize,
}

impl StubTools {
    fn new(succeed: bool) -> Arc<Self> {
        Arc::new(Self {
            succeed,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolInvoker for StubTools {
    async fn invoke(&self, name: &str, args: &serde_json::Value) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.succeed {
            Ok(format!("{} found: {}", name, args["query"]))
        } else {
            anyhow::bail!("search backend unavailable")
        }
    }
}

fn final_answer(request: &ModelRequest) -> anyhow::Result<ModelReply> {
    if request.log_tag == "advisor" {
        return Ok(ModelReply::text(
            r#"{"advisor_recommendations": "Run a pilot with 50 users", "advice": "Focus on retention."}"#,
        ));
    }
    Ok(ModelReply::text(format!("{} result", request.log_tag)))
}

fn search_request() -> anyhow::Result<ModelReply> {
    Ok(ModelReply::tool_call(
        "web_search",
        serde_json::json!({"query": "plant care app market size"}),
    ))
}

fn write_templates(dir: &Path) -> Config {
    let templates = [
        ("idea_understanding.tpl", "Analyse the idea: {startup_idea}"),
        (
            "market_analysis.tpl",
            "Idea: {startup_idea}\nUnderstanding: {idea_analysis}",
        ),
        (
            "competitor_analysis.tpl",
            "Idea: {startup_idea}\n{idea_analysis}\n{market_analysis}",
        ),
        (
            "risk_assessment.tpl",
            "{idea_analysis}\n{market_analysis}\n{competition_analysis}",
        ),
        (
            "swot_analysis.tpl",
            "{idea_analysis}\n{market_analysis}\n{competition_analysis}\n{risk_assessment}",
        ),
        (
            "advisor.tpl",
            "{startup_idea}\n{idea_analysis}\n{market_analysis}\n{competition_analysis}\n{risk_assessment}\n{swot_analysis}",
        ),
    ];
    for (name, text) in templates {
        std::fs::write(dir.join(name), text).unwrap();
    }

    Config {
        prompts: PromptConfig::in_dir(dir),
        ..Default::default()
    }
}

/// market默认是direct模式，需要工具的场景显式开启
fn with_market_tools(mut config: Config) -> Config {
    config.pipeline.tool_augmented_stages.push(StageId::Market);
    config
}

fn context_with(
    config: Config,
    model: &Arc<ScriptedModel>,
    tools: &Arc<StubTools>,
) -> GeneratorContext {
    GeneratorContext::with_collaborators(config, model.clone(), tools.clone())
}

const IDEA: &str = "AI-powered plant care app";

#[tokio::test]
async fn test_happy_path_runs_every_stage_once_in_order() {
    let temp_dir = TempDir::new().unwrap();
    let model = ScriptedModel::new(final_answer);
    let tools = StubTools::new(true);
    let context = context_with(write_templates(temp_dir.path()), &model, &tools);

    let report = run_pipeline(&context, IDEA).await.unwrap();

    assert_eq!(
        model.tags(),
        vec![
            "idea:primary",
            "market:primary",
            "competitor:primary",
            "risk:primary",
            "swot:primary",
            "advisor"
        ]
    );
    assert_eq!(report.startup_idea, IDEA);
    assert_eq!(report.idea_analysis.as_deref(), Some("idea:primary result"));
    assert_eq!(report.market_analysis.as_deref(), Some("market:primary result"));
    assert_eq!(
        report.competition_analysis.as_deref(),
        Some("competitor:primary result")
    );
    assert_eq!(report.risk_assessment.as_deref(), Some("risk:primary result"));
    assert_eq!(report.swot_analysis.as_deref(), Some("swot:primary result"));
    assert_eq!(
        report.advisor_recommendations.as_deref(),
        Some("Run a pilot with 50 users")
    );
    assert_eq!(report.advice.as_deref(), Some("Focus on retention."));
    assert!(report.degraded_stages.is_empty());
    assert_eq!(tools.calls(), 0);
}

#[tokio::test]
async fn test_prompts_carry_prior_results() {
    let temp_dir = TempDir::new().unwrap();
    let model = ScriptedModel::new(final_answer);
    let tools = StubTools::new(true);
    let context = context_with(write_templates(temp_dir.path()), &model, &tools);

    run_pipeline(&context, IDEA).await.unwrap();

    let requests = model.requests();
    assert_eq!(requests[0].user_prompt, format!("Analyse the idea: {}", IDEA));
    assert_eq!(
        requests[1].user_prompt,
        format!("Idea: {}\nUnderstanding: idea:primary result", IDEA)
    );
    assert_eq!(requests[0].mode, InvocationMode::ToolAugmented);
    assert_eq!(requests[1].mode, InvocationMode::Direct);

    let advisor = requests.last().unwrap();
    assert_eq!(advisor.mode, InvocationMode::Direct);
    for stage in StageId::ALL {
        assert!(
            advisor
                .user_prompt
                .contains(&format!("{}:primary result", stage)),
            "advisor prompt misses {}",
            stage
        );
    }
}

#[tokio::test]
async fn test_tool_failure_routes_to_fallback_then_next_stage() {
    let temp_dir = TempDir::new().unwrap();
    let model = ScriptedModel::new(|request| match request.log_tag.as_str() {
        "market:primary" => search_request(),
        _ => final_answer(request),
    });
    let tools = StubTools::new(false);
    let context = context_with(
        with_market_tools(write_templates(temp_dir.path())),
        &model,
        &tools,
    );

    let report = run_pipeline(&context, IDEA).await.unwrap();

    assert_eq!(
        model.tags(),
        vec![
            "idea:primary",
            "market:primary",
            "market:fallback",
            "competitor:primary",
            "risk:primary",
            "swot:primary",
            "advisor"
        ]
    );
    assert_eq!(tools.calls(), 1);
    assert_eq!(report.market_analysis.as_deref(), Some("market:fallback result"));
    assert_eq!(report.degraded_stages, vec![StageId::Market]);

    let fallback = &model.requests()[2];
    assert_eq!(fallback.mode, InvocationMode::Direct);
    assert!(fallback.tool_results.is_empty());
}

#[tokio::test]
async fn test_tool_success_reinvokes_primary_with_results() {
    let temp_dir = TempDir::new().unwrap();
    let market_calls = Arc::new(AtomicUsize::new(0));
    let counter = market_calls.clone();
    let model = ScriptedModel::new(move |request| {
        if request.log_tag == "market:primary" && counter.fetch_add(1, Ordering::SeqCst) == 0 {
            return search_request();
        }
        final_answer(request)
    });
    let tools = StubTools::new(true);
    let context = context_with(
        with_market_tools(write_templates(temp_dir.path())),
        &model,
        &tools,
    );

    let report = run_pipeline(&context, IDEA).await.unwrap();

    assert_eq!(
        model.tags(),
        vec![
            "idea:primary",
            "market:primary",
            "market:primary",
            "competitor:primary",
            "risk:primary",
            "swot:primary",
            "advisor"
        ]
    );
    assert_eq!(tools.calls(), 1);
    assert!(report.degraded_stages.is_empty());
    assert_eq!(report.market_analysis.as_deref(), Some("market:primary result"));

    let requests = model.requests();
    assert!(requests[1].tool_results.is_empty());
    assert_eq!(requests[2].tool_results.len(), 1);
    assert_eq!(requests[2].tool_results[0].name, "web_search");
    assert!(
        requests[2]
            .render_user_prompt()
            .contains("plant care app market size")
    );
    // 其他阶段看不到market的工具结果
    assert!(requests[3].tool_results.is_empty());
}

#[tokio::test]
async fn test_missing_template_fails_before_model_call() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_templates(temp_dir.path());
    std::fs::remove_file(temp_dir.path().join("risk_assessment.tpl")).unwrap();
    let model = ScriptedModel::new(final_answer);
    let tools = StubTools::new(true);
    let context = context_with(config, &model, &tools);

    let err = run_pipeline(&context, IDEA).await.unwrap_err();

    assert!(matches!(err, RunError::Config(_)));
    assert!(err.to_string().contains("risk_assessment.tpl"));
    assert_eq!(
        model.tags(),
        vec!["idea:primary", "market:primary", "competitor:primary"]
    );
}

#[tokio::test]
async fn test_endless_tool_requests_hit_ceiling() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = write_templates(temp_dir.path());
    config.pipeline.max_steps = 3;
    let model = ScriptedModel::new(|_| search_request());
    let tools = StubTools::new(true);
    let context = context_with(config, &model, &tools);

    let err = run_pipeline(&context, IDEA).await.unwrap_err();

    assert!(matches!(err, RunError::CeilingExceeded { limit: 3 }));
    assert_eq!(err.kind(), "ceiling_exceeded");
    assert_eq!(model.tags(), vec!["idea:primary", "idea:primary"]);
    assert_eq!(tools.calls(), 1);
}

#[tokio::test]
async fn test_model_error_propagates() {
    let temp_dir = TempDir::new().unwrap();
    let model = ScriptedModel::new(|request| match request.log_tag.as_str() {
        "competitor:primary" => anyhow::bail!("503 Service Unavailable"),
        _ => final_answer(request),
    });
    let tools = StubTools::new(true);
    let context = context_with(write_templates(temp_dir.path()), &model, &tools);

    let err = run_pipeline(&context, IDEA).await.unwrap_err();

    assert_eq!(err.kind(), "model");
    let message = err.to_string();
    assert!(message.contains("competitor:primary"));
    assert!(message.contains("503 Service Unavailable"));
    assert_eq!(model.tags().len(), 3);
}

#[tokio::test]
async fn test_disabled_tools_run_every_stage_direct() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = write_templates(temp_dir.path());
    config.llm.disable_preset_tools = true;
    // 即使模型返回工具调用，direct模式下也直接作为答案
    let model = ScriptedModel::new(|request| {
        let mut reply = final_answer(request)?;
        if request.log_tag != "advisor" {
            reply.tool_call = search_request()?.tool_call;
        }
        Ok(reply)
    });
    let tools = StubTools::new(true);
    let context = context_with(config, &model, &tools);

    let report = run_pipeline(&context, IDEA).await.unwrap();

    assert_eq!(model.tags().len(), 6);
    assert!(
        model
            .requests()
            .iter()
            .all(|request| request.mode == InvocationMode::Direct)
    );
    assert_eq!(tools.calls(), 0);
    assert_eq!(report.swot_analysis.as_deref(), Some("swot:primary result"));
}

#[tokio::test]
async fn test_stage_execution_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let model = ScriptedModel::new(final_answer);
    let tools = StubTools::new(true);
    let context = context_with(write_templates(temp_dir.path()), &model, &tools);

    let mut state = RunState::new(IDEA);
    state.merge(
        crate::generator::state::StateUpdate::for_stage(StageId::Idea, "understood")
            .with_message(Message::model(Some(StageId::Idea), "understood", None)),
    );

    let agent = agent_for(StageId::Market);
    let first = agent
        .execute(&context, &state, Variant::Primary)
        .await
        .unwrap();
    let second = agent
        .execute(&context, &state, Variant::Primary)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(
        first.result,
        Some((StageId::Market, "market:primary result".to_string()))
    );
    assert!(first.degraded.is_none());
}

#[tokio::test]
async fn test_idea_stage_records_human_input_once() {
    let temp_dir = TempDir::new().unwrap();
    let model = ScriptedModel::new(final_answer);
    let tools = StubTools::new(true);
    let context = context_with(write_templates(temp_dir.path()), &model, &tools);

    let state = RunState::new(IDEA);
    let update = agent_for(StageId::Idea)
        .execute(&context, &state, Variant::Primary)
        .await
        .unwrap();

    assert_eq!(update.messages[0], Message::human(IDEA));
    assert_eq!(update.messages.len(), 2);
}

#[tokio::test]
async fn test_run_timeout() {
    struct StalledModel;

    #[async_trait]
    impl ChatModel for StalledModel {
        async fn invoke(&self, _request: &ModelRequest) -> anyhow::Result<ModelReply> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(ModelReply::text("late"))
        }
    }

    let temp_dir = TempDir::new().unwrap();
    let mut config = write_templates(temp_dir.path());
    config.pipeline.run_timeout_seconds = 1;
    let context =
        GeneratorContext::with_collaborators(config, Arc::new(StalledModel), StubTools::new(true));

    let err = run_pipeline(&context, IDEA).await.unwrap_err();
    assert!(matches!(err, RunError::Timeout { seconds: 1 }));
}

#[tokio::test]
async fn test_market_runs_direct_by_default() {
    let temp_dir = TempDir::new().unwrap();
    let model = ScriptedModel::new(|request| match request.log_tag.as_str() {
        "market:primary" => {
            let mut reply = final_answer(request)?;
            reply.tool_call = search_request()?.tool_call;
            Ok(reply)
        }
        _ => final_answer(request),
    });
    let tools = StubTools::new(false);
    let context = context_with(write_templates(temp_dir.path()), &model, &tools);

    let report = run_pipeline(&context, IDEA).await.unwrap();

    assert_eq!(tools.calls(), 0);
    assert_eq!(report.market_analysis.as_deref(), Some("market:primary result"));
    assert!(report.degraded_stages.is_empty());
    assert_eq!(model.tags().len(), 6);
}
