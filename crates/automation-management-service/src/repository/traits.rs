//! 仓储 Trait 定义
//!
//! 定义仓储的读取/简单写入接口，便于服务层依赖抽象而非具体实现，
//! 支持 mock 测试。事务内的批量写入（版本分配、审计同事务写入）
//! 属于具体仓储的事务方法，由数据库集成测试覆盖。

use async_trait::async_trait;
use rule_engine::Signal;

use crate::error::Result;
use crate::models::{
    NewRuleEvaluation, Rule, RuleAction, RuleAudit, RuleCondition, RuleEvaluation, RuleVersion,
};

/// 规则仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RuleRepositoryTrait: Send + Sync {
    async fn get_rule(&self, id: i64) -> Result<Option<Rule>>;
    async fn list_rules(&self, agency_id: &str) -> Result<Vec<Rule>>;
    /// 评估候选集：启用且已设置生效版本的规则
    async fn list_enabled_with_default(&self, agency_id: &str) -> Result<Vec<Rule>>;
}

/// 版本仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VersionRepositoryTrait: Send + Sync {
    async fn get_version(&self, id: i64) -> Result<Option<RuleVersion>>;
    async fn list_versions(&self, rule_id: i64) -> Result<Vec<RuleVersion>>;
    /// 按 sort_order 升序
    async fn list_conditions(&self, version_id: i64) -> Result<Vec<RuleCondition>>;
    /// 按 sort_order 升序
    async fn list_actions(&self, version_id: i64) -> Result<Vec<RuleAction>>;
}

/// 审计仓储接口（只读；写入统一走 AuditRecorder）
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditRepositoryTrait: Send + Sync {
    /// 按时间倒序
    async fn list_by_rule(&self, rule_id: i64) -> Result<Vec<RuleAudit>>;
}

/// 评估记录仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EvaluationRepositoryTrait: Send + Sync {
    async fn find(
        &self,
        rule_id: i64,
        rule_version_id: i64,
        signal_id: &str,
    ) -> Result<Option<RuleEvaluation>>;
    /// 幂等写入：已存在同 (rule, version, signal) 的记录时返回已有行
    async fn insert_idempotent(&self, new: &NewRuleEvaluation) -> Result<RuleEvaluation>;
    /// 按时间倒序，最多 limit 条
    async fn list_by_rule(&self, rule_id: i64, limit: i64) -> Result<Vec<RuleEvaluation>>;
}

/// 信号仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignalRepositoryTrait: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Signal>>;
    async fn insert(&self, signal: &Signal) -> Result<()>;
}
