//! 规则执行器
//!
//! 按 order 顺序评估一个版本的全部条件并组合结果。
//!
//! 与短路求值不同，这里每个条件都会被评估：评估记录是"规则为何
//! （没有）触发"的主要观测面，必须包含每个条件各自的结果。

use crate::aggregation::AggregationRegistry;
use crate::models::{ConditionLogic, ConditionOutcome, ConditionSpec, EvaluationInput};
use crate::operators::OperatorRegistry;
use crate::resolver::OperandResolver;
use std::sync::Arc;
use tracing::instrument;

/// 规则执行器
pub struct RuleExecutor {
    operators: Arc<OperatorRegistry>,
    aggregations: Arc<AggregationRegistry>,
    resolver: OperandResolver,
    /// 零条件版本的匹配策略，默认不匹配（fail-closed）
    match_on_empty: bool,
}

impl RuleExecutor {
    pub fn new(
        operators: Arc<OperatorRegistry>,
        aggregations: Arc<AggregationRegistry>,
        resolver: OperandResolver,
    ) -> Self {
        Self {
            operators,
            aggregations,
            resolver,
            match_on_empty: false,
        }
    }

    /// 允许零条件版本匹配（显式开启）
    pub fn with_match_on_empty(mut self) -> Self {
        self.match_on_empty = true;
        self
    }

    /// 评估一组有序条件并按逻辑组合
    ///
    /// 返回 (是否匹配, 每个条件的结果)。条件按 order 升序逐个评估，
    /// 不短路；单个条件的取值失败记录在该条件的结果里。
    #[instrument(skip(self, conditions, input), fields(conditions = conditions.len(), logic = %logic))]
    pub async fn evaluate(
        &self,
        logic: ConditionLogic,
        conditions: &[ConditionSpec],
        input: &EvaluationInput,
    ) -> (bool, Vec<ConditionOutcome>) {
        if conditions.is_empty() {
            return (self.match_on_empty, Vec::new());
        }

        let mut ordered: Vec<&ConditionSpec> = conditions.iter().collect();
        ordered.sort_by_key(|c| c.order);

        let mut outcomes = Vec::with_capacity(ordered.len());
        for condition in ordered {
            outcomes.push(self.evaluate_condition(condition, input).await);
        }

        let matched = match logic {
            ConditionLogic::All => outcomes.iter().all(|o| o.matched),
            ConditionLogic::Any => outcomes.iter().any(|o| o.matched),
        };

        (matched, outcomes)
    }

    /// 评估单个条件
    async fn evaluate_condition(
        &self,
        condition: &ConditionSpec,
        input: &EvaluationInput,
    ) -> ConditionOutcome {
        let resolved = self
            .resolver
            .resolve(condition, input, &self.aggregations)
            .await;

        let matched = self.operators.evaluate(
            &condition.operator,
            resolved.value.as_ref(),
            &condition.comparison_value,
        );

        ConditionOutcome {
            order: condition.order,
            field_path: condition.field_path.clone(),
            operator: condition.operator.clone(),
            scope: condition.scope,
            matched,
            error: resolved.error,
        }
    }
}
