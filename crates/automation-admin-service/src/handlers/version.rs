//! 版本 API 处理器
//!
//! 版本创建（带有序条件/动作）、发布转换与有序读取。

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::info;

use automation_management::{CreateVersionPayload, RequestContext};

use crate::{
    dto::{ActionDto, ApiResponse, ConditionDto, VersionDto},
    error::AdminError,
    state::AppState,
};

/// 创建规则版本（草稿）
///
/// POST /api/automation/rules/{id}/versions
///
/// 条件/动作随版本一起提交，逐条验证；任何一条失败整个调用
/// 原子失败并返回逐条错误列表。
pub async fn create_version(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(rule_id): Path<i64>,
    Json(payload): Json<CreateVersionPayload>,
) -> Result<(StatusCode, Json<ApiResponse<VersionDto>>), AdminError> {
    let version = state
        .versioning
        .create_version(rule_id, &ctx, payload)
        .await?;

    info!(rule_id = rule_id, version_id = version.id, "Rule version created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(version.into())),
    ))
}

/// 发布版本并切换生效指针
///
/// POST /api/automation/versions/{id}/publish
pub async fn publish_version(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(version_id): Path<i64>,
) -> Result<Json<ApiResponse<VersionDto>>, AdminError> {
    let version = state.versioning.publish_version(version_id, &ctx).await?;

    info!(version_id = version_id, "Rule version published");
    Ok(Json(ApiResponse::success(version.into())))
}

/// 列出规则的版本
///
/// GET /api/automation/rules/{id}/versions
pub async fn list_versions(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(rule_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<VersionDto>>>, AdminError> {
    let versions = state.versioning.list_versions(rule_id, &ctx).await?;
    let items: Vec<VersionDto> = versions.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success(items)))
}

/// 列出版本的条件（评估顺序）
///
/// GET /api/automation/versions/{id}/conditions
pub async fn list_conditions(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(version_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<ConditionDto>>>, AdminError> {
    let conditions = state.versioning.list_conditions(version_id, &ctx).await?;
    let items: Vec<ConditionDto> = conditions.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success(items)))
}

/// 列出版本的动作（派发顺序）
///
/// GET /api/automation/versions/{id}/actions
pub async fn list_actions(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(version_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<ActionDto>>>, AdminError> {
    let actions = state.versioning.list_actions(version_id, &ctx).await?;
    let items: Vec<ActionDto> = actions.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success(items)))
}
