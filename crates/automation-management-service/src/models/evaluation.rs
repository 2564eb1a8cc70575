//! 评估记录实体定义

use chrono::{DateTime, Utc};
use rule_engine::{ActionOutcome, ConditionOutcome};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 评估记录
///
/// 一条规则对一个信号的一次引擎运行结果，无论是否匹配都会写入。
/// (rule_id, rule_version_id, signal_id) 唯一，保证评估幂等。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RuleEvaluation {
    pub id: i64,
    pub rule_id: i64,
    pub rule_version_id: i64,
    pub signal_id: String,
    pub matched: bool,
    /// 每个条件各自的评估结果（JSON 数组）
    pub condition_results: Value,
    /// 每个动作的派发结果（JSON 数组，未匹配时为空数组）
    pub actions_triggered: Value,
    pub created_at: DateTime<Utc>,
}

impl RuleEvaluation {
    /// 反序列化条件结果
    pub fn condition_outcomes(&self) -> Vec<ConditionOutcome> {
        serde_json::from_value(self.condition_results.clone()).unwrap_or_default()
    }

    /// 反序列化动作结果
    pub fn action_outcomes(&self) -> Vec<ActionOutcome> {
        serde_json::from_value(self.actions_triggered.clone()).unwrap_or_default()
    }
}

/// 待写入的评估记录
#[derive(Debug, Clone)]
pub struct NewRuleEvaluation {
    pub rule_id: i64,
    pub rule_version_id: i64,
    pub signal_id: String,
    pub matched: bool,
    pub condition_results: Value,
    pub actions_triggered: Value,
}
