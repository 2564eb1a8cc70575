//! 响应 DTO 定义
//!
//! 所有 REST API 的响应体结构，统一 {success, code, message, data} 信封。

use automation_management::{Rule, RuleAction, RuleAudit, RuleCondition, RuleEvaluation, RuleVersion};
use chrono::{DateTime, Utc};
use rule_engine::{ActionOutcome, ConditionOutcome, EvaluationOutcome};
use serde::Serialize;
use serde_json::Value;

/// API 统一响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: "操作成功".to_string(),
            data: Some(data),
        }
    }
}

/// 规则响应 DTO
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDto {
    pub id: i64,
    pub agency_id: String,
    pub name: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub default_version_id: Option<i64>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Rule> for RuleDto {
    fn from(rule: Rule) -> Self {
        Self {
            id: rule.id,
            agency_id: rule.agency_id,
            name: rule.name,
            description: rule.description,
            enabled: rule.enabled,
            default_version_id: rule.default_version_id,
            created_by: rule.created_by,
            created_at: rule.created_at,
            updated_at: rule.updated_at,
        }
    }
}

/// 版本响应 DTO
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDto {
    pub id: i64,
    pub rule_id: i64,
    pub version: i32,
    pub status: String,
    pub condition_logic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_config: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifecycle_config: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomaly_config: Option<Value>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl From<RuleVersion> for VersionDto {
    fn from(version: RuleVersion) -> Self {
        Self {
            id: version.id,
            rule_id: version.rule_id,
            version: version.version,
            status: version.status.as_str().to_string(),
            condition_logic: version.condition_logic.to_string(),
            threshold_config: version.threshold_config,
            lifecycle_config: version.lifecycle_config,
            anomaly_config: version.anomaly_config,
            created_by: version.created_by,
            created_at: version.created_at,
        }
    }
}

/// 条件响应 DTO
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionDto {
    pub id: i64,
    pub rule_version_id: i64,
    pub order: i32,
    pub field_path: String,
    pub operator: String,
    pub comparison_value: Value,
    pub scope: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_config: Option<Value>,
}

impl From<RuleCondition> for ConditionDto {
    fn from(condition: RuleCondition) -> Self {
        let window_config = condition
            .window_config
            .as_ref()
            .and_then(|w| serde_json::to_value(w).ok());
        Self {
            id: condition.id,
            rule_version_id: condition.rule_version_id,
            order: condition.sort_order,
            field_path: condition.field_path,
            operator: condition.operator,
            comparison_value: condition.comparison_value,
            scope: condition.scope.to_string(),
            window_config,
        }
    }
}

/// 动作响应 DTO
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDto {
    pub id: i64,
    pub rule_version_id: i64,
    pub order: i32,
    pub action_type: String,
    pub action_config: Value,
}

impl From<RuleAction> for ActionDto {
    fn from(action: RuleAction) -> Self {
        Self {
            id: action.id,
            rule_version_id: action.rule_version_id,
            order: action.sort_order,
            action_type: action.action_type,
            action_config: action.action_config,
        }
    }
}

/// 审计记录响应 DTO
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditDto {
    pub id: i64,
    pub rule_id: i64,
    pub rule_version_id: Option<i64>,
    pub actor_id: Option<String>,
    pub change_type: String,
    pub change_summary: String,
    pub previous_state: Option<Value>,
    pub new_state: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl From<RuleAudit> for AuditDto {
    fn from(audit: RuleAudit) -> Self {
        Self {
            id: audit.id,
            rule_id: audit.rule_id,
            rule_version_id: audit.rule_version_id,
            actor_id: audit.actor_id,
            change_type: audit.change_type.as_str().to_string(),
            change_summary: audit.change_summary,
            previous_state: audit.previous_state,
            new_state: audit.new_state,
            created_at: audit.created_at,
        }
    }
}

/// 评估记录响应 DTO
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationDto {
    pub id: i64,
    pub rule_id: i64,
    pub rule_version_id: i64,
    pub signal_id: String,
    pub matched: bool,
    pub condition_results: Value,
    pub actions_triggered: Value,
    pub created_at: DateTime<Utc>,
}

impl From<RuleEvaluation> for EvaluationDto {
    fn from(evaluation: RuleEvaluation) -> Self {
        Self {
            id: evaluation.id,
            rule_id: evaluation.rule_id,
            rule_version_id: evaluation.rule_version_id,
            signal_id: evaluation.signal_id,
            matched: evaluation.matched,
            condition_results: evaluation.condition_results,
            actions_triggered: evaluation.actions_triggered,
            created_at: evaluation.created_at,
        }
    }
}

/// 干跑测试结果 DTO
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestOutcomeDto {
    pub matched: bool,
    pub condition_results: Vec<ConditionOutcome>,
    pub actions_triggered: Vec<ActionOutcome>,
}

impl From<EvaluationOutcome> for TestOutcomeDto {
    fn from(outcome: EvaluationOutcome) -> Self {
        Self {
            matched: outcome.matched,
            condition_results: outcome.condition_results,
            actions_triggered: outcome.actions_triggered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use automation_management::VersionStatus;
    use rule_engine::{ConditionLogic, ConditionScope};
    use serde_json::json;

    #[test]
    fn test_api_response_success_shape() {
        let response = ApiResponse::success(json!({"id": 1}));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["code"], "SUCCESS");
        assert_eq!(value["data"]["id"], 1);
    }

    #[test]
    fn test_version_dto_conversion() {
        let version = RuleVersion {
            id: 22,
            rule_id: 10,
            version: 2,
            status: VersionStatus::Published,
            condition_logic: ConditionLogic::Any,
            threshold_config: None,
            lifecycle_config: None,
            anomaly_config: None,
            created_by: "user-1".to_string(),
            created_at: Utc::now(),
        };

        let dto: VersionDto = version.into();
        assert_eq!(dto.status, "published");
        assert_eq!(dto.condition_logic, "any");
    }

    #[test]
    fn test_condition_dto_exposes_order() {
        let condition = RuleCondition {
            id: 1,
            rule_version_id: 22,
            sort_order: 3,
            field_path: "sessions".to_string(),
            operator: "lt".to_string(),
            comparison_value: json!(50),
            scope: ConditionScope::Signal,
            window_config: None,
        };

        let dto: ConditionDto = condition.into();
        assert_eq!(dto.order, 3);
        assert_eq!(dto.scope, "signal");

        let value = serde_json::to_value(&dto).unwrap();
        assert_eq!(value["order"], 3);
        assert!(value.get("windowConfig").is_none());
    }
}
