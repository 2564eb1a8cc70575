//! 审计与评估 API 处理器
//!
//! 审计/评估记录的查询、规则干跑测试、开发期信号评估入口。

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use tracing::info;
use validator::Validate;

use automation_management::RequestContext;
use rule_engine::Signal;

use crate::{
    dto::{
        ApiResponse, AuditDto, EvaluateSignalRequest, EvaluationDto, EvaluationListQuery,
        SignalRequest, TestOutcomeDto, TestRuleRequest,
    },
    error::AdminError,
    state::AppState,
};

/// SignalRequest -> 引擎 Signal 的装配
///
/// 租户取调用方上下文，不信任请求体；id 省略时生成随机值。
fn signal_from_request(agency_id: &str, req: SignalRequest) -> Signal {
    let mut signal = Signal::new(agency_id, req.signal_type, req.payload);
    if let Some(id) = req.id {
        signal.id = id;
    }
    signal.category = req.category;
    signal.occurred_at = req.occurred_at.unwrap_or_else(Utc::now);
    signal
}

/// 列出规则的审计记录（最近的在前）
///
/// GET /api/automation/rules/{id}/audits
pub async fn list_audits(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(rule_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<AuditDto>>>, AdminError> {
    let audits = state.versioning.list_audits(rule_id, &ctx).await?;
    let items: Vec<AuditDto> = audits.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success(items)))
}

/// 列出规则的评估记录
///
/// GET /api/automation/rules/{id}/evaluations?limit=N
///
/// limit 缺省或不可解析时取 100，最近的在前。
pub async fn list_evaluations(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(rule_id): Path<i64>,
    Query(query): Query<EvaluationListQuery>,
) -> Result<Json<ApiResponse<Vec<EvaluationDto>>>, AdminError> {
    let evaluations = state
        .versioning
        .list_evaluations(rule_id, &ctx, query.parsed_limit())
        .await?;
    let items: Vec<EvaluationDto> = evaluations.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success(items)))
}

/// 规则干跑测试
///
/// POST /api/automation/rules/{id}/test
///
/// 用临时信号评估规则的生效版本，不派发动作、不落任何记录，
/// 用于保存规则前预览匹配行为。
pub async fn test_rule(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(rule_id): Path<i64>,
    Json(req): Json<TestRuleRequest>,
) -> Result<Json<ApiResponse<TestOutcomeDto>>, AdminError> {
    req.validate()?;

    let agency_id = ctx
        .agency_id
        .clone()
        .ok_or(AdminError::AgencyRequired)?;
    let signal = signal_from_request(&agency_id, req.signal);

    let outcome = state
        .evaluation
        .test_rule(rule_id, &ctx, signal, req.context)
        .await?;

    Ok(Json(ApiResponse::success(outcome.into())))
}

/// 信号评估（开发/联调入口）
///
/// POST /api/automation/signals/evaluate
///
/// 落库信号并评估调用方租户的全部候选规则。生产环境的信号
/// 由采集管道写入后触发评估，此端点用于联调与演示。
pub async fn evaluate_signal(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(req): Json<EvaluateSignalRequest>,
) -> Result<Json<ApiResponse<Vec<EvaluationDto>>>, AdminError> {
    req.validate()?;

    let agency_id = ctx
        .agency_id
        .clone()
        .ok_or(AdminError::AgencyRequired)?;
    let signal = signal_from_request(&agency_id, req.signal);
    let signal_id = signal.id.clone();

    let evaluations = state
        .evaluation
        .ingest_signal(signal, req.context)
        .await?;

    info!(
        signal_id = %signal_id,
        evaluations = evaluations.len(),
        "Signal evaluated"
    );

    let items: Vec<EvaluationDto> = evaluations.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success(items)))
}
