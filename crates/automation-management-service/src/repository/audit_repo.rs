//! 审计仓储（只读）
//!
//! 审计记录的写入统一经过 AuditRecorder，这里只提供查询。

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::AuditRepositoryTrait;
use crate::error::Result;
use crate::models::RuleAudit;

/// 审计仓储
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 按规则列出审计记录（最近的在前）
    pub async fn list_by_rule(&self, rule_id: i64) -> Result<Vec<RuleAudit>> {
        let audits = sqlx::query_as::<_, RuleAudit>(
            "SELECT id, rule_id, rule_version_id, actor_id, change_type, change_summary, \
                    previous_state, new_state, created_at \
             FROM rule_audits \
             WHERE rule_id = $1 \
             ORDER BY created_at DESC, id DESC",
        )
        .bind(rule_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(audits)
    }
}

#[async_trait]
impl AuditRepositoryTrait for AuditRepository {
    async fn list_by_rule(&self, rule_id: i64) -> Result<Vec<RuleAudit>> {
        self.list_by_rule(rule_id).await
    }
}
