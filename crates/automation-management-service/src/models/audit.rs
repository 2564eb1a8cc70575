//! 审计记录实体定义
//!
//! 规则与版本的每次变更写入一条不可变审计记录，用于追溯。

use super::enums::ChangeType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 审计记录
///
/// 追加写入，永不更新或删除。rule_id 不设外键，规则删除后
/// 审计记录仍然保留最后状态。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RuleAudit {
    pub id: i64,
    pub rule_id: i64,
    #[sqlx(default)]
    pub rule_version_id: Option<i64>,
    /// 操作人（系统动作为空）
    #[sqlx(default)]
    pub actor_id: Option<String>,
    pub change_type: ChangeType,
    pub change_summary: String,
    /// 变更前快照（创建时为空）
    #[sqlx(default)]
    pub previous_state: Option<Value>,
    /// 变更后快照（删除时为空）
    #[sqlx(default)]
    pub new_state: Option<Value>,
    pub created_at: DateTime<Utc>,
}

/// 待写入的审计条目
///
/// 构建后交给 AuditRecorder 在变更事务内写入。
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub rule_id: i64,
    pub rule_version_id: Option<i64>,
    pub actor_id: Option<String>,
    pub change_type: ChangeType,
    pub change_summary: String,
    pub previous_state: Option<Value>,
    pub new_state: Option<Value>,
}

impl AuditEntry {
    pub fn new(rule_id: i64, change_type: ChangeType, summary: impl Into<String>) -> Self {
        Self {
            rule_id,
            rule_version_id: None,
            actor_id: None,
            change_type,
            change_summary: summary.into(),
            previous_state: None,
            new_state: None,
        }
    }

    pub fn with_version(mut self, version_id: i64) -> Self {
        self.rule_version_id = Some(version_id);
        self
    }

    pub fn with_actor(mut self, actor_id: Option<String>) -> Self {
        self.actor_id = actor_id;
        self
    }

    /// 设置变更前后快照
    pub fn with_states(mut self, previous: Option<Value>, new: Option<Value>) -> Self {
        self.previous_state = previous;
        self.new_state = new;
        self
    }
}
