//! 版本仓储
//!
//! 规则版本及其条件/动作的数据访问。版本号分配与条目批量写入
//! 必须在服务层开启的同一个事务内完成。

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgConnection, PgPool};

use super::traits::VersionRepositoryTrait;
use crate::error::Result;
use crate::models::{
    NewRuleAction, NewRuleCondition, RuleAction, RuleCondition, RuleConditionRow, RuleVersion,
    RuleVersionRow,
};

const VERSION_COLUMNS: &str = "id, rule_id, version, status, condition_logic, \
     threshold_config, lifecycle_config, anomaly_config, created_by, created_at";

const CONDITION_COLUMNS: &str = "id, rule_version_id, sort_order, field_path, operator, \
     comparison_value, scope, window_config";

/// 版本仓储
pub struct VersionRepository {
    pool: PgPool,
}

impl VersionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 获取单个版本
    pub async fn get_version(&self, id: i64) -> Result<Option<RuleVersion>> {
        let sql = format!("SELECT {} FROM rule_versions WHERE id = $1", VERSION_COLUMNS);
        let row = sqlx::query_as::<_, RuleVersionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(RuleVersion::try_from).transpose()
    }

    /// 列出规则的全部版本（版本号升序）
    pub async fn list_versions(&self, rule_id: i64) -> Result<Vec<RuleVersion>> {
        let sql = format!(
            "SELECT {} FROM rule_versions WHERE rule_id = $1 ORDER BY version ASC",
            VERSION_COLUMNS
        );
        let rows = sqlx::query_as::<_, RuleVersionRow>(&sql)
            .bind(rule_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(RuleVersion::try_from).collect()
    }

    /// 列出版本的条件（评估顺序）
    pub async fn list_conditions(&self, version_id: i64) -> Result<Vec<RuleCondition>> {
        let sql = format!(
            "SELECT {} FROM rule_conditions WHERE rule_version_id = $1 ORDER BY sort_order ASC",
            CONDITION_COLUMNS
        );
        let rows = sqlx::query_as::<_, RuleConditionRow>(&sql)
            .bind(version_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(RuleCondition::try_from).collect()
    }

    /// 列出版本的动作（派发顺序）
    pub async fn list_actions(&self, version_id: i64) -> Result<Vec<RuleAction>> {
        let actions = sqlx::query_as::<_, RuleAction>(
            "SELECT id, rule_version_id, sort_order, action_type, action_config \
             FROM rule_actions WHERE rule_version_id = $1 ORDER BY sort_order ASC",
        )
        .bind(version_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(actions)
    }

    // ==================== 事务方法 ====================

    /// 事务内计算下一个版本号（无版本时为 1）
    ///
    /// 分配结果依赖 (rule_id, version) 唯一约束兜底：
    /// 并发分配到同一号码时插入会冲突，由服务层重试。
    pub async fn next_version_number(&self, conn: &mut PgConnection, rule_id: i64) -> Result<i32> {
        let next: (i32,) = sqlx::query_as(
            "SELECT COALESCE(MAX(version), 0) + 1 FROM rule_versions WHERE rule_id = $1",
        )
        .bind(rule_id)
        .fetch_one(conn)
        .await?;

        Ok(next.0)
    }

    /// 事务内插入版本（状态固定为 draft）
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_version(
        &self,
        conn: &mut PgConnection,
        rule_id: i64,
        version: i32,
        condition_logic: &str,
        threshold_config: Option<&Value>,
        lifecycle_config: Option<&Value>,
        anomaly_config: Option<&Value>,
        created_by: &str,
    ) -> Result<RuleVersion> {
        let sql = format!(
            "INSERT INTO rule_versions \
                 (rule_id, version, status, condition_logic, threshold_config, \
                  lifecycle_config, anomaly_config, created_by) \
             VALUES ($1, $2, 'draft', $3, $4, $5, $6, $7) \
             RETURNING {}",
            VERSION_COLUMNS
        );
        let row = sqlx::query_as::<_, RuleVersionRow>(&sql)
            .bind(rule_id)
            .bind(version)
            .bind(condition_logic)
            .bind(threshold_config)
            .bind(lifecycle_config)
            .bind(anomaly_config)
            .bind(created_by)
            .fetch_one(conn)
            .await?;

        RuleVersion::try_from(row)
    }

    /// 事务内批量插入条件（按已解析的 sort_order）
    pub async fn insert_conditions(
        &self,
        conn: &mut PgConnection,
        version_id: i64,
        conditions: &[NewRuleCondition],
    ) -> Result<()> {
        for condition in conditions {
            let window_config = condition
                .window_config
                .as_ref()
                .map(serde_json::to_value)
                .transpose()?;

            sqlx::query(
                "INSERT INTO rule_conditions \
                     (rule_version_id, sort_order, field_path, operator, \
                      comparison_value, scope, window_config) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(version_id)
            .bind(condition.sort_order)
            .bind(&condition.field_path)
            .bind(&condition.operator)
            .bind(&condition.comparison_value)
            .bind(condition.scope.to_string())
            .bind(window_config)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// 事务内批量插入动作
    pub async fn insert_actions(
        &self,
        conn: &mut PgConnection,
        version_id: i64,
        actions: &[NewRuleAction],
    ) -> Result<()> {
        for action in actions {
            sqlx::query(
                "INSERT INTO rule_actions \
                     (rule_version_id, sort_order, action_type, action_config) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(version_id)
            .bind(action.sort_order)
            .bind(&action.action_type)
            .bind(&action.action_config)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// 事务内将版本标记为已发布
    ///
    /// 发布是单向转换，不存在回退到 draft 的路径。
    pub async fn mark_published(
        &self,
        conn: &mut PgConnection,
        version_id: i64,
    ) -> Result<RuleVersion> {
        let sql = format!(
            "UPDATE rule_versions SET status = 'published' WHERE id = $1 RETURNING {}",
            VERSION_COLUMNS
        );
        let row = sqlx::query_as::<_, RuleVersionRow>(&sql)
            .bind(version_id)
            .fetch_one(conn)
            .await?;

        RuleVersion::try_from(row)
    }
}

#[async_trait]
impl VersionRepositoryTrait for VersionRepository {
    async fn get_version(&self, id: i64) -> Result<Option<RuleVersion>> {
        self.get_version(id).await
    }

    async fn list_versions(&self, rule_id: i64) -> Result<Vec<RuleVersion>> {
        self.list_versions(rule_id).await
    }

    async fn list_conditions(&self, version_id: i64) -> Result<Vec<RuleCondition>> {
        self.list_conditions(version_id).await
    }

    async fn list_actions(&self, version_id: i64) -> Result<Vec<RuleAction>> {
        self.list_actions(version_id).await
    }
}
