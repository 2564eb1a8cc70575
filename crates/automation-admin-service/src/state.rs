//! 应用状态定义
//!
//! 包含 Axum 路由共享的应用状态

use automation_management::{EvaluationService, RuleDefinitionService, RuleVersioningService};
use sqlx::PgPool;
use std::sync::Arc;

/// Axum 应用共享状态
///
/// 包含数据库连接池和三个核心服务，通过 Arc 在 handler 间共享
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL 连接池
    pub pool: PgPool,
    /// 规则定义服务
    pub definitions: Arc<RuleDefinitionService>,
    /// 规则版本服务
    pub versioning: Arc<RuleVersioningService>,
    /// 评估服务
    pub evaluation: Arc<EvaluationService>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        definitions: Arc<RuleDefinitionService>,
        versioning: Arc<RuleVersioningService>,
        evaluation: Arc<EvaluationService>,
    ) -> Self {
        Self {
            pool,
            definitions,
            versioning,
            evaluation,
        }
    }
}
