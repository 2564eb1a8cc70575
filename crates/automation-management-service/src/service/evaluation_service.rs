//! 评估服务
//!
//! 引擎编排：入站信号 -> 候选规则 -> 条件评估 -> 动作派发 -> 评估落库。
//!
//! 每个 (规则, 信号) 评估单元相互独立：单个规则评估失败只记录日志，
//! 不影响同一信号的其余规则。落库前先做幂等检查，同一
//! (规则, 版本, 信号) 的重复评估直接返回已有记录，不会重复派发动作。

use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info, instrument};

use crate::error::{AutomationError, Result};
use crate::models::{NewRuleEvaluation, RequestContext, Rule, RuleEvaluation};
use crate::repository::traits::{
    EvaluationRepositoryTrait, RuleRepositoryTrait, SignalRepositoryTrait, VersionRepositoryTrait,
};
use crate::service::definition_service::ensure_rule_access;
use rule_engine::{
    ActionDispatchRegistry, ActionSpec, ConditionSpec, EvaluationInput, EvaluationOutcome,
    RuleExecutor, Signal,
};

/// 评估服务
pub struct EvaluationService {
    rules: Arc<dyn RuleRepositoryTrait>,
    versions: Arc<dyn VersionRepositoryTrait>,
    evaluations: Arc<dyn EvaluationRepositoryTrait>,
    signals: Arc<dyn SignalRepositoryTrait>,
    executor: RuleExecutor,
    dispatch: Arc<ActionDispatchRegistry>,
}

impl EvaluationService {
    pub fn new(
        rules: Arc<dyn RuleRepositoryTrait>,
        versions: Arc<dyn VersionRepositoryTrait>,
        evaluations: Arc<dyn EvaluationRepositoryTrait>,
        signals: Arc<dyn SignalRepositoryTrait>,
        executor: RuleExecutor,
        dispatch: Arc<ActionDispatchRegistry>,
    ) -> Self {
        Self {
            rules,
            versions,
            evaluations,
            signals,
            executor,
            dispatch,
        }
    }

    /// 落库信号并评估
    ///
    /// 开发/联调入口；生产环境信号由采集管道写入后再触发评估。
    pub async fn ingest_signal(
        &self,
        signal: Signal,
        context: Value,
    ) -> Result<Vec<RuleEvaluation>> {
        self.signals.insert(&signal).await?;
        self.evaluate_signal(&signal, context).await
    }

    /// 对一个入站信号评估租户的全部候选规则
    ///
    /// 候选集：启用且已设置生效版本的规则。每条规则独立评估，
    /// 单条失败不中断整体。
    #[instrument(skip(self, signal, context), fields(signal_id = %signal.id, agency_id = %signal.agency_id))]
    pub async fn evaluate_signal(
        &self,
        signal: &Signal,
        context: Value,
    ) -> Result<Vec<RuleEvaluation>> {
        let candidates = self
            .rules
            .list_enabled_with_default(&signal.agency_id)
            .await?;

        info!(candidates = candidates.len(), "开始评估信号");

        let mut results = Vec::with_capacity(candidates.len());
        for rule in &candidates {
            match self.evaluate_rule(rule, signal, &context).await {
                Ok(evaluation) => results.push(evaluation),
                Err(e) => {
                    // 单条规则失败不影响其余规则
                    error!(
                        rule_id = rule.id,
                        signal_id = %signal.id,
                        error = %e,
                        "规则评估失败"
                    );
                }
            }
        }

        Ok(results)
    }

    /// 评估单条规则（一个评估单元）
    async fn evaluate_rule(
        &self,
        rule: &Rule,
        signal: &Signal,
        context: &Value,
    ) -> Result<RuleEvaluation> {
        let version_id = rule.default_version_id.ok_or_else(|| {
            AutomationError::Internal(format!("候选规则缺少生效版本: {}", rule.id))
        })?;

        // 幂等检查：已有记录直接返回，不重复派发动作
        if let Some(existing) = self.evaluations.find(rule.id, version_id, &signal.id).await? {
            info!(
                rule_id = rule.id,
                signal_id = %signal.id,
                "评估记录已存在，跳过重复评估"
            );
            return Ok(existing);
        }

        let (condition_specs, action_specs, logic) = self.load_version_specs(version_id).await?;

        let input = EvaluationInput::new(signal.clone()).with_context(context.clone());
        let (matched, condition_results) =
            self.executor.evaluate(logic, &condition_specs, &input).await;

        // 仅匹配时按顺序派发动作；单个动作失败不阻断后续动作
        let actions_triggered = if matched {
            self.dispatch.dispatch_all(&action_specs, signal).await
        } else {
            Vec::new()
        };

        let new = NewRuleEvaluation {
            rule_id: rule.id,
            rule_version_id: version_id,
            signal_id: signal.id.clone(),
            matched,
            condition_results: serde_json::to_value(&condition_results)?,
            actions_triggered: serde_json::to_value(&actions_triggered)?,
        };

        let evaluation = self.evaluations.insert_idempotent(&new).await?;

        info!(
            rule_id = rule.id,
            signal_id = %signal.id,
            matched = matched,
            actions = actions_triggered.len(),
            "评估完成"
        );
        Ok(evaluation)
    }

    /// 干跑测试：对临时信号评估规则的生效版本
    ///
    /// 不派发动作、不落任何记录，用于保存规则前预览匹配行为。
    pub async fn test_rule(
        &self,
        rule_id: i64,
        ctx: &RequestContext,
        signal: Signal,
        context: Value,
    ) -> Result<EvaluationOutcome> {
        let rule = self.rules.get_rule(rule_id).await?;
        let rule = ensure_rule_access(rule, rule_id, ctx)?;

        let version_id = rule.default_version_id.ok_or_else(|| {
            AutomationError::Validation("规则尚未发布生效版本，无法测试".to_string())
        })?;

        let (condition_specs, _actions, logic) = self.load_version_specs(version_id).await?;

        let input = EvaluationInput::new(signal).with_context(context);
        let (matched, condition_results) =
            self.executor.evaluate(logic, &condition_specs, &input).await;

        Ok(EvaluationOutcome {
            matched,
            condition_results,
            actions_triggered: Vec::new(),
        })
    }

    /// 装配版本的条件/动作规格
    async fn load_version_specs(
        &self,
        version_id: i64,
    ) -> Result<(Vec<ConditionSpec>, Vec<ActionSpec>, rule_engine::ConditionLogic)> {
        let version = self
            .versions
            .get_version(version_id)
            .await?
            .ok_or(AutomationError::VersionNotFound(version_id))?;

        let conditions = self
            .versions
            .list_conditions(version_id)
            .await?
            .iter()
            .map(|c| c.to_spec())
            .collect();
        let actions = self
            .versions
            .list_actions(version_id)
            .await?
            .iter()
            .map(|a| a.to_spec())
            .collect();

        Ok((conditions, actions, version.condition_logic))
    }
}
