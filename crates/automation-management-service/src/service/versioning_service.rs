//! 规则版本服务
//!
//! 草稿创建、条件/动作有序挂载、发布转换、生效版本指针管理。
//!
//! ## 版本号分配
//!
//! 应用层 max+1 在并发下存在竞态，因此分配与插入在同一事务内执行，
//! 并依赖 (rule_id, version) 唯一约束兜底；冲突时整体重试，次数
//! 有限（默认 3 次），耗尽后返回 VersionConflict。

use std::sync::Arc;

use sqlx::PgPool;
use tracing::{info, instrument, warn};

use crate::audit::AuditRecorder;
use crate::error::{AutomationError, Result};
use crate::models::{
    AuditEntry, ChangeType, RequestContext, Rule, RuleAction, RuleAudit, RuleCondition,
    RuleEvaluation, RuleVersion, VersionStatus,
};
use crate::repository::{
    AuditRepository, EvaluationRepository, RuleRepository, VersionRepository,
};
use crate::service::definition_service::ensure_rule_access;
use crate::service::dto::{
    CreateVersionPayload, resolve_actions, resolve_conditions, validate_version_configs,
};
use rule_engine::{AggregationRegistry, ConditionLogic, OperatorRegistry};

/// 评估记录列表的默认条数上限
pub const DEFAULT_EVALUATION_LIMIT: i64 = 100;

/// 规则版本服务
pub struct RuleVersioningService {
    pool: PgPool,
    rules: RuleRepository,
    versions: VersionRepository,
    audits: AuditRepository,
    evaluations: EvaluationRepository,
    recorder: AuditRecorder,
    operators: Arc<OperatorRegistry>,
    aggregations: Arc<AggregationRegistry>,
    /// 版本号分配冲突的最大重试次数
    alloc_retries: u32,
}

impl RuleVersioningService {
    pub fn new(
        pool: PgPool,
        operators: Arc<OperatorRegistry>,
        aggregations: Arc<AggregationRegistry>,
        alloc_retries: u32,
    ) -> Self {
        Self {
            rules: RuleRepository::new(pool.clone()),
            versions: VersionRepository::new(pool.clone()),
            audits: AuditRepository::new(pool.clone()),
            evaluations: EvaluationRepository::new(pool.clone()),
            recorder: AuditRecorder::new(),
            operators,
            aggregations,
            alloc_retries,
            pool,
        }
    }

    /// 创建规则版本（草稿）
    ///
    /// 版本行、条件、动作与审计行在同一事务内写入：任何一条条目
    /// 验证失败或写入失败，整个调用原子回滚，不会留下缺少条目的
    /// 半成品版本。
    #[instrument(skip(self, ctx, payload), fields(conditions = payload.conditions.len(), actions = payload.actions.len()))]
    pub async fn create_version(
        &self,
        rule_id: i64,
        ctx: &RequestContext,
        payload: CreateVersionPayload,
    ) -> Result<RuleVersion> {
        let rule = self.rules.get_rule(rule_id).await?;
        let rule = ensure_rule_access(rule, rule_id, ctx)?;

        // 版本级配置与条目验证都在进事务之前完成
        validate_version_configs(&payload)?;
        let conditions = resolve_conditions(&payload.conditions, &self.operators, &self.aggregations)?;
        let actions = resolve_actions(&payload.actions)?;

        let logic = match payload.condition_logic {
            ConditionLogic::All => "all",
            ConditionLogic::Any => "any",
        };
        let created_by = ctx.actor_id.clone().unwrap_or_else(|| "system".to_string());

        let mut attempt = 0u32;
        loop {
            attempt += 1;

            let result = self
                .try_create_version(&rule, logic, &payload, &conditions, &actions, &created_by, ctx)
                .await;

            match result {
                Ok(version) => {
                    info!(
                        rule_id = rule_id,
                        version_id = version.id,
                        version = version.version,
                        "Rule version created"
                    );
                    return Ok(version);
                }
                Err(AutomationError::Database(e))
                    if AutomationError::is_unique_violation(&e) && attempt <= self.alloc_retries =>
                {
                    warn!(
                        rule_id = rule_id,
                        attempt = attempt,
                        "版本号分配冲突，重试"
                    );
                    continue;
                }
                Err(AutomationError::Database(e)) if AutomationError::is_unique_violation(&e) => {
                    return Err(AutomationError::VersionConflict);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// 单次版本创建尝试（一个完整事务）
    #[allow(clippy::too_many_arguments)]
    async fn try_create_version(
        &self,
        rule: &Rule,
        logic: &str,
        payload: &CreateVersionPayload,
        conditions: &[crate::models::NewRuleCondition],
        actions: &[crate::models::NewRuleAction],
        created_by: &str,
        ctx: &RequestContext,
    ) -> Result<RuleVersion> {
        let mut tx = self.pool.begin().await?;

        let next = self.versions.next_version_number(&mut tx, rule.id).await?;
        let version = self
            .versions
            .insert_version(
                &mut tx,
                rule.id,
                next,
                logic,
                payload.threshold_config.as_ref(),
                payload.lifecycle_config.as_ref(),
                payload.anomaly_config.as_ref(),
                created_by,
            )
            .await?;

        self.versions
            .insert_conditions(&mut tx, version.id, conditions)
            .await?;
        self.versions
            .insert_actions(&mut tx, version.id, actions)
            .await?;

        let entry = AuditEntry::new(
            rule.id,
            ChangeType::Created,
            format!("创建版本 v{}", version.version),
        )
        .with_version(version.id)
        .with_actor(ctx.actor_id.clone())
        .with_states(None, Some(serde_json::to_value(&version)?));
        self.recorder.record(&mut tx, &entry).await?;

        tx.commit().await?;
        Ok(version)
    }

    /// 发布版本并切换生效指针
    ///
    /// published 标记版本冻结可用；规则同时可存在多个 published
    /// 版本，实际参与评估的只有 default_version_id 指向的那个。
    /// 发布不可逆，不存在回退到 draft 的路径。
    #[instrument(skip(self, ctx))]
    pub async fn publish_version(
        &self,
        version_id: i64,
        ctx: &RequestContext,
    ) -> Result<RuleVersion> {
        let version = self
            .versions
            .get_version(version_id)
            .await?
            .ok_or(AutomationError::VersionNotFound(version_id))?;

        let mut tx = self.pool.begin().await?;

        // 经由所属规则做租户授权，并锁行防止指针并发切换
        let rule = self.rules.get_rule_for_update(&mut tx, version.rule_id).await?;
        let rule = ensure_rule_access(rule, version.rule_id, ctx)?;

        // 重复发布当前生效版本是无意义操作，按冲突处理
        if rule.default_version_id == Some(version_id) {
            return Err(AutomationError::AlreadyDefault(version_id));
        }

        let published = if version.status == VersionStatus::Published {
            // 已发布的历史版本允许重新成为生效版本，状态无需再变
            version
        } else {
            self.versions.mark_published(&mut tx, version_id).await?
        };

        let rule = self
            .rules
            .set_default_version(&mut tx, rule.id, version_id)
            .await?;

        let entry = AuditEntry::new(
            rule.id,
            ChangeType::Published,
            format!("发布版本 v{}", published.version),
        )
        .with_version(version_id)
        .with_actor(ctx.actor_id.clone())
        .with_states(None, Some(serde_json::to_value(&published)?));
        self.recorder.record(&mut tx, &entry).await?;

        tx.commit().await?;

        info!(
            rule_id = rule.id,
            version_id = version_id,
            "Rule version published"
        );
        Ok(published)
    }

    /// 列出版本的条件（有序）
    ///
    /// versionId 本身不可信，必须经所属规则重新校验租户归属。
    pub async fn list_conditions(
        &self,
        version_id: i64,
        ctx: &RequestContext,
    ) -> Result<Vec<RuleCondition>> {
        self.authorize_version(version_id, ctx).await?;
        self.versions.list_conditions(version_id).await
    }

    /// 列出版本的动作（有序）
    pub async fn list_actions(
        &self,
        version_id: i64,
        ctx: &RequestContext,
    ) -> Result<Vec<RuleAction>> {
        self.authorize_version(version_id, ctx).await?;
        self.versions.list_actions(version_id).await
    }

    /// 列出规则的版本
    pub async fn list_versions(
        &self,
        rule_id: i64,
        ctx: &RequestContext,
    ) -> Result<Vec<RuleVersion>> {
        let rule = self.rules.get_rule(rule_id).await?;
        ensure_rule_access(rule, rule_id, ctx)?;
        self.versions.list_versions(rule_id).await
    }

    /// 列出规则的审计记录（最近的在前）
    pub async fn list_audits(&self, rule_id: i64, ctx: &RequestContext) -> Result<Vec<RuleAudit>> {
        let rule = self.rules.get_rule(rule_id).await?;
        ensure_rule_access(rule, rule_id, ctx)?;
        self.audits.list_by_rule(rule_id).await
    }

    /// 列出规则的评估记录（最近的在前，最多 limit 条）
    ///
    /// limit 缺省或不可解析时取 100。
    pub async fn list_evaluations(
        &self,
        rule_id: i64,
        ctx: &RequestContext,
        limit: Option<i64>,
    ) -> Result<Vec<RuleEvaluation>> {
        let rule = self.rules.get_rule(rule_id).await?;
        ensure_rule_access(rule, rule_id, ctx)?;

        let limit = match limit {
            Some(n) if n > 0 => n,
            _ => DEFAULT_EVALUATION_LIMIT,
        };
        self.evaluations.list_by_rule(rule_id, limit).await
    }

    /// 经所属规则校验版本归属
    async fn authorize_version(&self, version_id: i64, ctx: &RequestContext) -> Result<RuleVersion> {
        let version = self
            .versions
            .get_version(version_id)
            .await?
            .ok_or(AutomationError::VersionNotFound(version_id))?;

        let rule = self.rules.get_rule(version.rule_id).await?;
        ensure_rule_access(rule, version.rule_id, ctx)?;
        Ok(version)
    }
}
