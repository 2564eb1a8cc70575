//! 自动化规则管理服务
//!
//! 租户隔离的规则引擎核心：带版本状态机的规则定义存储，
//! 对入站信号的条件评估与动作派发，以及覆盖每次定义变更和
//! 每次评估结果的不可变审计/评估日志。
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `error`: 错误类型定义
//! - `repository`: 数据库仓储层（RuleStore）
//! - `audit`: 审计记录器（变更与审计同事务写入的唯一入口）
//! - `service`: 业务服务层（定义 / 版本 / 评估）

pub mod audit;
pub mod error;
pub mod models;
pub mod repository;
pub mod service;

pub use audit::AuditRecorder;
pub use error::{AutomationError, ItemError, Result};
pub use models::*;
pub use repository::{
    AuditRepository, EvaluationRepository, RuleRepository, SignalRepository, VersionRepository,
};
pub use service::dto::{
    ActionPayload, ConditionPayload, CreateRulePayload, CreateVersionPayload, UpdateRulePayload,
};
pub use service::{
    DEFAULT_EVALUATION_LIMIT, EvaluationService, RuleDefinitionService, RuleVersioningService,
};
