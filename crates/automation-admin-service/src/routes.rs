//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::{handlers, state::AppState};

/// 构建规则定义路由
///
/// 规则实体的租户范围 CRUD
fn rule_routes() -> Router<AppState> {
    Router::new()
        .route("/rules", get(handlers::rule::list_rules))
        .route("/rules", post(handlers::rule::create_rule))
        .route("/rules/{id}", get(handlers::rule::get_rule))
        .route("/rules/{id}", put(handlers::rule::update_rule))
        .route("/rules/{id}", delete(handlers::rule::delete_rule))
}

/// 构建版本管理路由
///
/// 版本创建（带有序条件/动作）、发布转换与有序读取
fn version_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/rules/{id}/versions",
            post(handlers::version::create_version),
        )
        .route(
            "/rules/{id}/versions",
            get(handlers::version::list_versions),
        )
        .route(
            "/versions/{id}/publish",
            post(handlers::version::publish_version),
        )
        .route(
            "/versions/{id}/conditions",
            get(handlers::version::list_conditions),
        )
        .route(
            "/versions/{id}/actions",
            get(handlers::version::list_actions),
        )
}

/// 构建审计与评估路由
///
/// 审计/评估记录查询、规则干跑测试、开发期信号评估入口
fn evaluation_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/rules/{id}/audits",
            get(handlers::evaluation::list_audits),
        )
        .route(
            "/rules/{id}/evaluations",
            get(handlers::evaluation::list_evaluations),
        )
        .route("/rules/{id}/test", post(handlers::evaluation::test_rule))
        .route(
            "/signals/evaluate",
            post(handlers::evaluation::evaluate_signal),
        )
}

/// 构建完整的 API 路由树
///
/// 挂载在 /api/automation 下
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(rule_routes())
        .merge(version_routes())
        .merge(evaluation_routes())
}
