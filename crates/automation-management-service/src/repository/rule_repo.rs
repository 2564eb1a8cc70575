//! 规则仓储
//!
//! 规则实体的数据访问。纯 CRUD，不含业务判断；
//! 事务方法由服务层在变更事务内调用。

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use super::traits::RuleRepositoryTrait;
use crate::error::Result;
use crate::models::Rule;

const RULE_COLUMNS: &str = "id, agency_id, name, description, enabled, \
     default_version_id, created_by, created_at, updated_at";

/// 规则仓储
pub struct RuleRepository {
    pool: PgPool,
}

impl RuleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 获取单个规则
    pub async fn get_rule(&self, id: i64) -> Result<Option<Rule>> {
        let sql = format!("SELECT {} FROM rules WHERE id = $1", RULE_COLUMNS);
        let rule = sqlx::query_as::<_, Rule>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(rule)
    }

    /// 列出租户的全部规则
    pub async fn list_rules(&self, agency_id: &str) -> Result<Vec<Rule>> {
        let sql = format!(
            "SELECT {} FROM rules WHERE agency_id = $1 ORDER BY created_at DESC, id DESC",
            RULE_COLUMNS
        );
        let rules = sqlx::query_as::<_, Rule>(&sql)
            .bind(agency_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rules)
    }

    /// 评估候选集：启用且已设置生效版本的规则
    pub async fn list_enabled_with_default(&self, agency_id: &str) -> Result<Vec<Rule>> {
        let sql = format!(
            "SELECT {} FROM rules \
             WHERE agency_id = $1 AND enabled = true AND default_version_id IS NOT NULL \
             ORDER BY id ASC",
            RULE_COLUMNS
        );
        let rules = sqlx::query_as::<_, Rule>(&sql)
            .bind(agency_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rules)
    }

    // ==================== 事务方法 ====================

    /// 事务内读取规则并加行锁
    pub async fn get_rule_for_update(
        &self,
        conn: &mut PgConnection,
        id: i64,
    ) -> Result<Option<Rule>> {
        let sql = format!("SELECT {} FROM rules WHERE id = $1 FOR UPDATE", RULE_COLUMNS);
        let rule = sqlx::query_as::<_, Rule>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(rule)
    }

    /// 事务内插入规则
    pub async fn insert_rule(
        &self,
        conn: &mut PgConnection,
        agency_id: &str,
        name: &str,
        description: Option<&str>,
        enabled: bool,
        created_by: &str,
    ) -> Result<Rule> {
        let sql = format!(
            "INSERT INTO rules (agency_id, name, description, enabled, created_by) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {}",
            RULE_COLUMNS
        );
        let rule = sqlx::query_as::<_, Rule>(&sql)
            .bind(agency_id)
            .bind(name)
            .bind(description)
            .bind(enabled)
            .bind(created_by)
            .fetch_one(conn)
            .await?;

        Ok(rule)
    }

    /// 事务内部分更新规则（None 字段保持原值）
    pub async fn update_rule(
        &self,
        conn: &mut PgConnection,
        id: i64,
        name: Option<&str>,
        description: Option<&str>,
        enabled: Option<bool>,
    ) -> Result<Rule> {
        let sql = format!(
            "UPDATE rules SET \
                 name = COALESCE($2, name), \
                 description = COALESCE($3, description), \
                 enabled = COALESCE($4, enabled), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {}",
            RULE_COLUMNS
        );
        let rule = sqlx::query_as::<_, Rule>(&sql)
            .bind(id)
            .bind(name)
            .bind(description)
            .bind(enabled)
            .fetch_one(conn)
            .await?;

        Ok(rule)
    }

    /// 事务内删除规则
    pub async fn delete_rule(&self, conn: &mut PgConnection, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM rules WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;

        Ok(())
    }

    /// 事务内更新生效版本指针
    pub async fn set_default_version(
        &self,
        conn: &mut PgConnection,
        rule_id: i64,
        version_id: i64,
    ) -> Result<Rule> {
        let sql = format!(
            "UPDATE rules SET default_version_id = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {}",
            RULE_COLUMNS
        );
        let rule = sqlx::query_as::<_, Rule>(&sql)
            .bind(rule_id)
            .bind(version_id)
            .fetch_one(conn)
            .await?;

        Ok(rule)
    }
}

#[async_trait]
impl RuleRepositoryTrait for RuleRepository {
    async fn get_rule(&self, id: i64) -> Result<Option<Rule>> {
        self.get_rule(id).await
    }

    async fn list_rules(&self, agency_id: &str) -> Result<Vec<Rule>> {
        self.list_rules(agency_id).await
    }

    async fn list_enabled_with_default(&self, agency_id: &str) -> Result<Vec<Rule>> {
        self.list_enabled_with_default(agency_id).await
    }
}
