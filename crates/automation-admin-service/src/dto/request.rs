//! 请求 DTO 定义
//!
//! REST API 的请求体结构。版本创建的条件/动作条目直接复用管理
//! 服务的 payload 类型，逐条验证在服务层完成。

use automation_management::{CreateRulePayload, UpdateRulePayload};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

/// 创建规则请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRuleRequest {
    #[validate(length(min = 1, max = 100, message = "规则名称长度必须在1-100个字符之间"))]
    pub name: String,
    pub description: Option<String>,
    pub enabled: Option<bool>,
}

impl From<CreateRuleRequest> for CreateRulePayload {
    fn from(req: CreateRuleRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            enabled: req.enabled,
        }
    }
}

/// 更新规则请求（部分更新）
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRuleRequest {
    #[validate(length(min = 1, max = 100, message = "规则名称长度必须在1-100个字符之间"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub enabled: Option<bool>,
}

impl From<UpdateRuleRequest> for UpdateRulePayload {
    fn from(req: UpdateRuleRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            enabled: req.enabled,
        }
    }
}

/// 评估记录列表查询参数
///
/// limit 按宽松方式解析：缺省或不可解析时由服务层取默认值 100。
#[derive(Debug, Default, Deserialize)]
pub struct EvaluationListQuery {
    pub limit: Option<String>,
}

impl EvaluationListQuery {
    /// 解析 limit，失败时返回 None（服务层取默认值）
    pub fn parsed_limit(&self) -> Option<i64> {
        self.limit.as_deref().and_then(|v| v.parse().ok())
    }
}

/// 临时信号（干跑测试 / 开发期评估入口）
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignalRequest {
    /// 省略时生成随机 ID
    pub id: Option<String>,
    #[validate(length(min = 1, max = 100, message = "信号类型不能为空"))]
    pub signal_type: String,
    pub category: Option<String>,
    #[serde(default)]
    pub payload: Value,
    pub occurred_at: Option<DateTime<Utc>>,
}

/// 规则干跑测试请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TestRuleRequest {
    #[validate(nested)]
    pub signal: SignalRequest,
    /// context 作用域的数据
    #[serde(default)]
    pub context: Value,
}

/// 信号评估请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateSignalRequest {
    #[validate(nested)]
    pub signal: SignalRequest,
    #[serde(default)]
    pub context: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_rule_request_validation() {
        let valid = CreateRuleRequest {
            name: "High churn risk".to_string(),
            description: None,
            enabled: Some(true),
        };
        assert!(valid.validate().is_ok());

        let invalid = CreateRuleRequest {
            name: "".to_string(),
            description: None,
            enabled: None,
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_evaluation_list_query_lenient_parse() {
        let query = EvaluationListQuery {
            limit: Some("25".to_string()),
        };
        assert_eq!(query.parsed_limit(), Some(25));

        // 不可解析 -> None，由服务层取默认值
        let query = EvaluationListQuery {
            limit: Some("abc".to_string()),
        };
        assert_eq!(query.parsed_limit(), None);

        let query = EvaluationListQuery { limit: None };
        assert_eq!(query.parsed_limit(), None);
    }

    #[test]
    fn test_test_rule_request_deserialization() {
        let json = json!({
            "signal": {
                "signalType": "low_sessions",
                "payload": {"sessions": 10}
            },
            "context": {"owner": {"workload": 3}}
        });

        let req: TestRuleRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.signal.signal_type, "low_sessions");
        assert!(req.signal.id.is_none());
        assert_eq!(req.context["owner"]["workload"], 3);
    }
}
