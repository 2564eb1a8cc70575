//! 自动化规则管理后台服务入口
//!
//! 装配配置、数据库、引擎与三个核心服务，暴露 REST API。

use std::sync::Arc;
use std::time::Duration;

use axum::{Json, Router, middleware, routing::get};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

use automation_admin_service::{
    actions::{CreateInsightHandler, CreateTaskHandler, SendNotificationHandler},
    middleware::context_middleware,
    routes,
    state::AppState,
};
use automation_management::{
    EvaluationRepository, EvaluationService, RuleDefinitionService, RuleRepository,
    RuleVersioningService, SignalRepository, VersionRepository,
};
use automation_shared::{AppConfig, Database, observability};
use rule_engine::{
    ActionDispatchRegistry, AggregationRegistry, OperandResolver, OperatorRegistry, RuleExecutor,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 统一加载配置：config/{service_name}.toml + AUTOMATION_ 环境变量覆盖
    let config = AppConfig::load("automation-admin-service").unwrap_or_default();
    observability::init(&config.observability)?;

    info!("Starting automation-admin-service on {}", config.server_addr());

    let db = Database::connect(&config.database).await?;
    db.run_migrations().await?;
    let pool = db.pool().clone();

    // 引擎装配：操作符/聚合注册表 + 历史回溯 + 动作派发
    let operators = Arc::new(OperatorRegistry::with_defaults());
    let aggregations = Arc::new(AggregationRegistry::with_defaults());

    let signals = Arc::new(SignalRepository::new(pool.clone()));
    let resolver = OperandResolver::new(
        signals.clone(),
        Duration::from_millis(config.engine.lookback_timeout_ms),
    );
    let executor = RuleExecutor::new(operators.clone(), aggregations.clone(), resolver);

    let mut dispatch =
        ActionDispatchRegistry::new(Duration::from_millis(config.engine.dispatch_timeout_ms));
    dispatch
        .register(Arc::new(CreateInsightHandler))
        .register(Arc::new(SendNotificationHandler))
        .register(Arc::new(CreateTaskHandler));
    let dispatch = Arc::new(dispatch);
    info!(
        action_types = ?dispatch.registered_types(),
        "Action dispatch registry initialized"
    );

    // 三个核心服务
    let definitions = Arc::new(RuleDefinitionService::new(pool.clone()));
    let versioning = Arc::new(RuleVersioningService::new(
        pool.clone(),
        operators.clone(),
        aggregations.clone(),
        config.engine.version_alloc_retries,
    ));
    let evaluation = Arc::new(EvaluationService::new(
        Arc::new(RuleRepository::new(pool.clone())),
        Arc::new(VersionRepository::new(pool.clone())),
        Arc::new(EvaluationRepository::new(pool.clone())),
        signals,
        executor,
        dispatch,
    ));

    let state = AppState::new(pool, definitions, versioning, evaluation);

    let app = Router::new()
        .nest("/api/automation", routes::api_routes())
        .route("/healthz", get(health_check))
        .route(
            "/ready",
            get({
                let db_for_ready = db;
                move || readiness_check(db_for_ready.clone())
            }),
        )
        // 调用方身份由上游认证层的请求头注入
        .layer(middleware::from_fn(context_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .with_state(state);

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    // 优雅关闭：收到 SIGTERM 或 Ctrl+C 时停止接收新连接并等待
    // 已有请求处理完毕
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");

    Ok(())
}

/// 监听关闭信号
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("注册 Ctrl+C 处理器失败");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("注册 SIGTERM 处理器失败")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}

/// 存活探针：服务进程正常即返回 ok
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "automation-admin-service"
    }))
}

/// 就绪探针：检查数据库连接是否可用
async fn readiness_check(db: Database) -> Json<serde_json::Value> {
    let db_ok = db.health_check().await.is_ok();

    Json(serde_json::json!({
        "status": if db_ok { "ok" } else { "degraded" },
        "service": "automation-admin-service",
        "checks": {
            "database": if db_ok { "ok" } else { "fail" }
        }
    }))
}
