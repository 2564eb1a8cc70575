//! 评估记录仓储
//!
//! 追加写入。(rule_id, rule_version_id, signal_id) 唯一约束保证
//! 同一评估单元只落一行；并发写入时后来者拿到已有行。

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use super::traits::EvaluationRepositoryTrait;
use crate::error::{AutomationError, Result};
use crate::models::{NewRuleEvaluation, RuleEvaluation};

const EVALUATION_COLUMNS: &str = "id, rule_id, rule_version_id, signal_id, matched, \
     condition_results, actions_triggered, created_at";

/// 评估记录仓储
pub struct EvaluationRepository {
    pool: PgPool,
}

impl EvaluationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 查找指定评估单元的记录
    pub async fn find(
        &self,
        rule_id: i64,
        rule_version_id: i64,
        signal_id: &str,
    ) -> Result<Option<RuleEvaluation>> {
        let sql = format!(
            "SELECT {} FROM rule_evaluations \
             WHERE rule_id = $1 AND rule_version_id = $2 AND signal_id = $3",
            EVALUATION_COLUMNS
        );
        let evaluation = sqlx::query_as::<_, RuleEvaluation>(&sql)
            .bind(rule_id)
            .bind(rule_version_id)
            .bind(signal_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(evaluation)
    }

    /// 幂等写入评估记录
    ///
    /// 并发评估同一 (rule, version, signal) 时，唯一约束让后写入者
    /// 插入 0 行，此时回查并返回已有记录。
    pub async fn insert_idempotent(&self, new: &NewRuleEvaluation) -> Result<RuleEvaluation> {
        let sql = format!(
            "INSERT INTO rule_evaluations \
                 (rule_id, rule_version_id, signal_id, matched, condition_results, actions_triggered) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (rule_id, rule_version_id, signal_id) DO NOTHING \
             RETURNING {}",
            EVALUATION_COLUMNS
        );
        let inserted = sqlx::query_as::<_, RuleEvaluation>(&sql)
            .bind(new.rule_id)
            .bind(new.rule_version_id)
            .bind(&new.signal_id)
            .bind(new.matched)
            .bind(&new.condition_results)
            .bind(&new.actions_triggered)
            .fetch_optional(&self.pool)
            .await?;

        match inserted {
            Some(evaluation) => Ok(evaluation),
            None => {
                debug!(
                    rule_id = new.rule_id,
                    signal_id = %new.signal_id,
                    "评估记录已存在，返回已有行"
                );
                self.find(new.rule_id, new.rule_version_id, &new.signal_id)
                    .await?
                    .ok_or_else(|| {
                        AutomationError::Internal("评估记录冲突后回查为空".to_string())
                    })
            }
        }
    }

    /// 按规则列出评估记录（最近的在前，最多 limit 条）
    pub async fn list_by_rule(&self, rule_id: i64, limit: i64) -> Result<Vec<RuleEvaluation>> {
        let sql = format!(
            "SELECT {} FROM rule_evaluations \
             WHERE rule_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2",
            EVALUATION_COLUMNS
        );
        let evaluations = sqlx::query_as::<_, RuleEvaluation>(&sql)
            .bind(rule_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(evaluations)
    }
}

#[async_trait]
impl EvaluationRepositoryTrait for EvaluationRepository {
    async fn find(
        &self,
        rule_id: i64,
        rule_version_id: i64,
        signal_id: &str,
    ) -> Result<Option<RuleEvaluation>> {
        self.find(rule_id, rule_version_id, signal_id).await
    }

    async fn insert_idempotent(&self, new: &NewRuleEvaluation) -> Result<RuleEvaluation> {
        self.insert_idempotent(new).await
    }

    async fn list_by_rule(&self, rule_id: i64, limit: i64) -> Result<Vec<RuleEvaluation>> {
        self.list_by_rule(rule_id, limit).await
    }
}
