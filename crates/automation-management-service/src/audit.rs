//! 审计记录器
//!
//! 所有规则/版本变更的唯一审计写入点。审计行和它描述的变更在
//! 同一个事务内提交：变更不会在缺少审计行的情况下落库。服务层
//! 的每条变更路径都必须经过这里，不允许内联审计 SQL。

use crate::error::Result;
use crate::models::AuditEntry;
use sqlx::PgConnection;
use tracing::debug;

/// 审计记录器
#[derive(Debug, Clone, Default)]
pub struct AuditRecorder;

impl AuditRecorder {
    pub fn new() -> Self {
        Self
    }

    /// 在调用方事务内写入一条审计记录
    ///
    /// 写入失败会让整个变更事务回滚，这是有意为之：
    /// 审计是强制性的，不允许"变更成功但审计丢失"。
    pub async fn record(&self, conn: &mut PgConnection, entry: &AuditEntry) -> Result<()> {
        sqlx::query(
            "INSERT INTO rule_audits \
                 (rule_id, rule_version_id, actor_id, change_type, change_summary, \
                  previous_state, new_state) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(entry.rule_id)
        .bind(entry.rule_version_id)
        .bind(&entry.actor_id)
        .bind(entry.change_type.as_str())
        .bind(&entry.change_summary)
        .bind(&entry.previous_state)
        .bind(&entry.new_state)
        .execute(conn)
        .await?;

        debug!(
            rule_id = entry.rule_id,
            change_type = entry.change_type.as_str(),
            "审计记录已写入"
        );

        Ok(())
    }
}
