//! 规则定义服务
//!
//! 租户授权范围内的规则 CRUD。每条变更路径都在单个事务内完成
//! "变更 + 审计"，经由 AuditRecorder 统一写入审计行。
//!
//! ## 授权检查顺序
//!
//! 先查行是否存在（404），再比对租户（403）。顺序固定，
//! 避免通过状态码差异向其他租户泄露行的存在性。

use sqlx::PgPool;
use tracing::{info, instrument};

use crate::audit::AuditRecorder;
use crate::error::{AutomationError, Result};
use crate::models::{AuditEntry, ChangeType, RequestContext, Rule};
use crate::repository::RuleRepository;
use crate::service::dto::{CreateRulePayload, UpdateRulePayload, validate_rule_name};

/// 校验访问权限：行存在性检查先于租户检查
pub(crate) fn ensure_rule_access(
    rule: Option<Rule>,
    rule_id: i64,
    ctx: &RequestContext,
) -> Result<Rule> {
    let rule = rule.ok_or(AutomationError::RuleNotFound(rule_id))?;
    if !ctx.can_access(&rule.agency_id) {
        return Err(AutomationError::AccessDenied);
    }
    Ok(rule)
}

/// 规则定义服务
pub struct RuleDefinitionService {
    pool: PgPool,
    rules: RuleRepository,
    recorder: AuditRecorder,
}

impl RuleDefinitionService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            rules: RuleRepository::new(pool.clone()),
            recorder: AuditRecorder::new(),
            pool,
        }
    }

    /// 列出调用方租户的全部规则
    pub async fn list_rules(&self, ctx: &RequestContext) -> Result<Vec<Rule>> {
        let agency_id = ctx.require_agency()?;
        self.rules.list_rules(agency_id).await
    }

    /// 获取单个规则（带授权）
    pub async fn get_rule(&self, rule_id: i64, ctx: &RequestContext) -> Result<Rule> {
        let rule = self.rules.get_rule(rule_id).await?;
        ensure_rule_access(rule, rule_id, ctx)
    }

    /// 创建规则
    #[instrument(skip(self, ctx, payload), fields(agency_id = tracing::field::Empty))]
    pub async fn create_rule(
        &self,
        ctx: &RequestContext,
        payload: CreateRulePayload,
    ) -> Result<Rule> {
        let agency_id = ctx.require_agency()?.to_string();
        tracing::Span::current().record("agency_id", agency_id.as_str());
        validate_rule_name(&payload.name)?;

        let created_by = ctx.actor_id.clone().unwrap_or_else(|| "system".to_string());

        let mut tx = self.pool.begin().await?;
        let rule = self
            .rules
            .insert_rule(
                &mut tx,
                &agency_id,
                payload.name.trim(),
                payload.description.as_deref(),
                payload.enabled.unwrap_or(true),
                &created_by,
            )
            .await?;

        let entry = AuditEntry::new(rule.id, ChangeType::Created, format!("创建规则 {}", rule.name))
            .with_actor(ctx.actor_id.clone())
            .with_states(None, Some(serde_json::to_value(&rule)?));
        self.recorder.record(&mut tx, &entry).await?;
        tx.commit().await?;

        info!(rule_id = rule.id, agency_id = %rule.agency_id, "Rule created");
        Ok(rule)
    }

    /// 更新规则（部分更新）
    #[instrument(skip(self, ctx, payload))]
    pub async fn update_rule(
        &self,
        rule_id: i64,
        ctx: &RequestContext,
        payload: UpdateRulePayload,
    ) -> Result<Rule> {
        if let Some(name) = &payload.name {
            validate_rule_name(name)?;
        }

        let mut tx = self.pool.begin().await?;

        // 加行锁取变更前快照，授权与更新基于同一行状态
        let existing = self.rules.get_rule_for_update(&mut tx, rule_id).await?;
        let existing = ensure_rule_access(existing, rule_id, ctx)?;
        let previous_state = serde_json::to_value(&existing)?;

        let updated = self
            .rules
            .update_rule(
                &mut tx,
                rule_id,
                payload.name.as_deref().map(str::trim),
                payload.description.as_deref(),
                payload.enabled,
            )
            .await?;

        let entry = AuditEntry::new(rule_id, ChangeType::Updated, format!("更新规则 {}", updated.name))
            .with_actor(ctx.actor_id.clone())
            .with_states(Some(previous_state), Some(serde_json::to_value(&updated)?));
        self.recorder.record(&mut tx, &entry).await?;
        tx.commit().await?;

        info!(rule_id = rule_id, "Rule updated");
        Ok(updated)
    }

    /// 删除规则
    ///
    /// 审计行先于删除写入（同一事务），保证审计始终持有
    /// 该行的最后已知状态。
    #[instrument(skip(self, ctx))]
    pub async fn delete_rule(&self, rule_id: i64, ctx: &RequestContext) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let existing = self.rules.get_rule_for_update(&mut tx, rule_id).await?;
        let existing = ensure_rule_access(existing, rule_id, ctx)?;

        let entry = AuditEntry::new(
            rule_id,
            ChangeType::Deleted,
            format!("删除规则 {}", existing.name),
        )
        .with_actor(ctx.actor_id.clone())
        .with_states(Some(serde_json::to_value(&existing)?), None);
        self.recorder.record(&mut tx, &entry).await?;

        self.rules.delete_rule(&mut tx, rule_id).await?;
        tx.commit().await?;

        info!(rule_id = rule_id, "Rule deleted");
        Ok(())
    }
}
