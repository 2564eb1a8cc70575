//! 规则 API 处理器
//!
//! 规则的租户范围 CRUD。调用方身份由上下文中间件注入，
//! 授权与审计在管理服务内完成。

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::info;
use validator::Validate;

use automation_management::RequestContext;

use crate::{
    dto::{ApiResponse, CreateRuleRequest, RuleDto, UpdateRuleRequest},
    error::AdminError,
    state::AppState,
};

/// 获取规则列表（调用方租户）
///
/// GET /api/automation/rules
pub async fn list_rules(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<ApiResponse<Vec<RuleDto>>>, AdminError> {
    let rules = state.definitions.list_rules(&ctx).await?;
    let items: Vec<RuleDto> = rules.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success(items)))
}

/// 创建规则
///
/// POST /api/automation/rules
pub async fn create_rule(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(req): Json<CreateRuleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RuleDto>>), AdminError> {
    req.validate()?;

    let rule = state.definitions.create_rule(&ctx, req.into()).await?;

    info!(rule_id = rule.id, "Rule created");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(rule.into()))))
}

/// 获取规则详情
///
/// GET /api/automation/rules/{id}
pub async fn get_rule(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<RuleDto>>, AdminError> {
    let rule = state.definitions.get_rule(id, &ctx).await?;
    Ok(Json(ApiResponse::success(rule.into())))
}

/// 更新规则
///
/// PUT /api/automation/rules/{id}
pub async fn update_rule(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateRuleRequest>,
) -> Result<Json<ApiResponse<RuleDto>>, AdminError> {
    req.validate()?;

    let rule = state.definitions.update_rule(id, &ctx, req.into()).await?;

    info!(rule_id = id, "Rule updated");
    Ok(Json(ApiResponse::success(rule.into())))
}

/// 删除规则
///
/// DELETE /api/automation/rules/{id}
pub async fn delete_rule(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AdminError> {
    state.definitions.delete_rule(id, &ctx).await?;

    info!(rule_id = id, "Rule deleted");
    Ok(StatusCode::NO_CONTENT)
}
