//! 服务层请求/响应 DTO 定义
//!
//! 条件/动作条目的验证在这里完成：任何单条失败都会使整个
//! 版本创建调用失败，并返回结构化的逐条错误列表。

use crate::error::{AutomationError, ItemError, Result};
use crate::models::{AnomalyConfig, LifecycleConfig, NewRuleAction, NewRuleCondition, ThresholdConfig};
use rule_engine::{AggregationRegistry, ConditionLogic, ConditionScope, OperatorRegistry, WindowConfig};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;

/// 创建规则请求
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRulePayload {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// 缺省启用
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// 更新规则请求（部分更新，None 字段不变）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRulePayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// 创建版本时的单个条件
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionPayload {
    /// 省略时取数组下标
    #[serde(default)]
    pub order: Option<i32>,
    pub field_path: String,
    pub operator: String,
    pub comparison_value: Value,
    pub scope: ConditionScope,
    #[serde(default)]
    pub window: Option<WindowConfig>,
}

/// 创建版本时的单个动作
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionPayload {
    #[serde(default)]
    pub order: Option<i32>,
    pub action_type: String,
    #[serde(default)]
    pub action_config: Option<Value>,
}

/// 创建版本请求
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVersionPayload {
    pub condition_logic: ConditionLogic,
    #[serde(default)]
    pub threshold_config: Option<Value>,
    #[serde(default)]
    pub lifecycle_config: Option<Value>,
    #[serde(default)]
    pub anomaly_config: Option<Value>,
    #[serde(default)]
    pub conditions: Vec<ConditionPayload>,
    #[serde(default)]
    pub actions: Vec<ActionPayload>,
}

/// 规则名称长度上限
const NAME_MAX_LEN: usize = 100;

/// 验证规则创建/更新字段
pub fn validate_rule_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AutomationError::Validation("规则名称不能为空".to_string()));
    }
    if trimmed.len() > NAME_MAX_LEN {
        return Err(AutomationError::Validation(format!(
            "规则名称长度不能超过 {} 个字符",
            NAME_MAX_LEN
        )));
    }
    Ok(())
}

/// 验证版本级配置（threshold / lifecycle / anomaly）
///
/// 独立于条件/动作条目验证：配置按各自的类型化变体解析，
/// 评估逻辑内部不再接触裸 JSON。
pub fn validate_version_configs(payload: &CreateVersionPayload) -> Result<()> {
    if let Some(config) = &payload.threshold_config {
        serde_json::from_value::<ThresholdConfig>(config.clone()).map_err(|e| {
            AutomationError::Validation(format!("无效的阈值配置: {}", e))
        })?;
    }
    if let Some(config) = &payload.lifecycle_config {
        serde_json::from_value::<LifecycleConfig>(config.clone()).map_err(|e| {
            AutomationError::Validation(format!("无效的生命周期配置: {}", e))
        })?;
    }
    if let Some(config) = &payload.anomaly_config {
        serde_json::from_value::<AnomalyConfig>(config.clone()).map_err(|e| {
            AutomationError::Validation(format!("无效的异常检测配置: {}", e))
        })?;
    }
    Ok(())
}

/// 逐条验证条件并解析 sort_order
///
/// order 省略时取数组下标，在此处一次性确定，下游不再有歧义。
/// 任何一条失败都返回完整的错误列表，不做部分写入。
pub fn resolve_conditions(
    conditions: &[ConditionPayload],
    operators: &OperatorRegistry,
    aggregations: &AggregationRegistry,
) -> Result<Vec<NewRuleCondition>> {
    let mut errors = Vec::new();
    let mut resolved = Vec::with_capacity(conditions.len());
    let mut seen_orders = HashSet::new();

    for (index, condition) in conditions.iter().enumerate() {
        if condition.field_path.trim().is_empty() {
            errors.push(ItemError::new(index, "fieldPath", "不能为空"));
        }

        if !operators.contains(&condition.operator) {
            errors.push(ItemError::new(
                index,
                "operator",
                format!("未注册的操作符: {}", condition.operator),
            ));
        }

        match condition.scope {
            ConditionScope::History | ConditionScope::Aggregated => match &condition.window {
                None => {
                    errors.push(ItemError::new(
                        index,
                        "window",
                        format!("{} 作用域必须提供窗口配置", condition.scope),
                    ));
                }
                Some(window) => {
                    if window.duration_seconds <= 0 {
                        errors.push(ItemError::new(
                            index,
                            "window.durationSeconds",
                            "回溯时长必须为正数",
                        ));
                    }
                    if condition.scope == ConditionScope::Aggregated {
                        match &window.aggregation {
                            None => errors.push(ItemError::new(
                                index,
                                "window.aggregation",
                                "aggregated 作用域必须指定聚合函数",
                            )),
                            Some(name) if !aggregations.contains(name) => {
                                errors.push(ItemError::new(
                                    index,
                                    "window.aggregation",
                                    format!("未注册的聚合函数: {}", name),
                                ));
                            }
                            Some(_) => {}
                        }
                    }
                }
            },
            ConditionScope::Signal | ConditionScope::Context => {}
        }

        let sort_order = condition.order.unwrap_or(index as i32);
        if !seen_orders.insert(sort_order) {
            errors.push(ItemError::new(
                index,
                "order",
                format!("order 在版本内必须唯一: {}", sort_order),
            ));
        }

        resolved.push(NewRuleCondition {
            sort_order,
            field_path: condition.field_path.trim().to_string(),
            operator: condition.operator.clone(),
            comparison_value: condition.comparison_value.clone(),
            scope: condition.scope,
            window_config: condition.window.clone(),
        });
    }

    if errors.is_empty() {
        Ok(resolved)
    } else {
        Err(AutomationError::ItemValidation(errors))
    }
}

/// 逐条验证动作并解析 sort_order
pub fn resolve_actions(actions: &[ActionPayload]) -> Result<Vec<NewRuleAction>> {
    let mut errors = Vec::new();
    let mut resolved = Vec::with_capacity(actions.len());
    let mut seen_orders = HashSet::new();

    for (index, action) in actions.iter().enumerate() {
        if action.action_type.trim().is_empty() {
            errors.push(ItemError::new(index, "actionType", "不能为空"));
        }

        let sort_order = action.order.unwrap_or(index as i32);
        if !seen_orders.insert(sort_order) {
            errors.push(ItemError::new(
                index,
                "order",
                format!("order 在版本内必须唯一: {}", sort_order),
            ));
        }

        resolved.push(NewRuleAction {
            sort_order,
            action_type: action.action_type.trim().to_string(),
            action_config: action
                .action_config
                .clone()
                .unwrap_or(Value::Object(Default::default())),
        });
    }

    if errors.is_empty() {
        Ok(resolved)
    } else {
        Err(AutomationError::ItemValidation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn operators() -> OperatorRegistry {
        OperatorRegistry::with_defaults()
    }

    fn aggregations() -> AggregationRegistry {
        AggregationRegistry::with_defaults()
    }

    fn signal_condition(order: Option<i32>, field: &str, operator: &str) -> ConditionPayload {
        ConditionPayload {
            order,
            field_path: field.to_string(),
            operator: operator.to_string(),
            comparison_value: json!(50),
            scope: ConditionScope::Signal,
            window: None,
        }
    }

    #[test]
    fn test_validate_rule_name() {
        assert!(validate_rule_name("High churn risk").is_ok());
        assert!(validate_rule_name("  ").is_err());
        assert!(validate_rule_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_omitted_order_uses_array_index() {
        let conditions = vec![
            signal_condition(None, "a", "eq"),
            signal_condition(None, "b", "eq"),
            signal_condition(None, "c", "eq"),
        ];

        let resolved = resolve_conditions(&conditions, &operators(), &aggregations()).unwrap();
        let orders: Vec<i32> = resolved.iter().map(|c| c.sort_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn test_explicit_order_wins() {
        let conditions = vec![
            signal_condition(Some(5), "a", "eq"),
            signal_condition(None, "b", "eq"),
        ];

        let resolved = resolve_conditions(&conditions, &operators(), &aggregations()).unwrap();
        assert_eq!(resolved[0].sort_order, 5);
        assert_eq!(resolved[1].sort_order, 1);
    }

    #[test]
    fn test_duplicate_order_rejected() {
        let conditions = vec![
            signal_condition(Some(1), "a", "eq"),
            signal_condition(Some(1), "b", "eq"),
        ];

        let err = resolve_conditions(&conditions, &operators(), &aggregations()).unwrap_err();
        match err {
            AutomationError::ItemValidation(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].index, 1);
                assert_eq!(items[0].field, "order");
            }
            other => panic!("期望 ItemValidation，实际: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_operator_rejected_with_index() {
        let conditions = vec![
            signal_condition(None, "a", "eq"),
            signal_condition(None, "b", "no_such_op"),
        ];

        let err = resolve_conditions(&conditions, &operators(), &aggregations()).unwrap_err();
        match err {
            AutomationError::ItemValidation(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].index, 1);
                assert_eq!(items[0].field, "operator");
            }
            other => panic!("期望 ItemValidation，实际: {:?}", other),
        }
    }

    #[test]
    fn test_history_scope_requires_window() {
        let conditions = vec![ConditionPayload {
            order: None,
            field_path: "sessions".to_string(),
            operator: "lt".to_string(),
            comparison_value: json!(50),
            scope: ConditionScope::History,
            window: None,
        }];

        let err = resolve_conditions(&conditions, &operators(), &aggregations()).unwrap_err();
        assert!(matches!(err, AutomationError::ItemValidation(_)));
    }

    #[test]
    fn test_aggregated_scope_requires_known_aggregation() {
        let conditions = vec![ConditionPayload {
            order: None,
            field_path: "sessions".to_string(),
            operator: "lt".to_string(),
            comparison_value: json!(50),
            scope: ConditionScope::Aggregated,
            window: Some(WindowConfig {
                duration_seconds: 3600,
                aggregation: Some("median".to_string()),
                select: Default::default(),
                signal_type: None,
            }),
        }];

        let err = resolve_conditions(&conditions, &operators(), &aggregations()).unwrap_err();
        match err {
            AutomationError::ItemValidation(items) => {
                assert_eq!(items[0].field, "window.aggregation");
            }
            other => panic!("期望 ItemValidation，实际: {:?}", other),
        }
    }

    #[test]
    fn test_multiple_errors_collected() {
        let conditions = vec![
            signal_condition(None, "", "eq"),
            signal_condition(None, "b", "bogus"),
        ];

        let err = resolve_conditions(&conditions, &operators(), &aggregations()).unwrap_err();
        match err {
            AutomationError::ItemValidation(items) => assert_eq!(items.len(), 2),
            other => panic!("期望 ItemValidation，实际: {:?}", other),
        }
    }

    #[test]
    fn test_resolve_actions_defaults() {
        let actions = vec![
            ActionPayload {
                order: None,
                action_type: "create_insight".to_string(),
                action_config: None,
            },
            ActionPayload {
                order: None,
                action_type: "send_notification".to_string(),
                action_config: Some(json!({"channel": "email"})),
            },
        ];

        let resolved = resolve_actions(&actions).unwrap();
        assert_eq!(resolved[0].sort_order, 0);
        assert_eq!(resolved[0].action_config, json!({}));
        assert_eq!(resolved[1].sort_order, 1);
        assert_eq!(resolved[1].action_config, json!({"channel": "email"}));
    }

    #[test]
    fn test_empty_action_type_rejected() {
        let actions = vec![ActionPayload {
            order: None,
            action_type: "  ".to_string(),
            action_config: None,
        }];

        assert!(matches!(
            resolve_actions(&actions),
            Err(AutomationError::ItemValidation(_))
        ));
    }

    #[test]
    fn test_version_config_validation() {
        let payload = CreateVersionPayload {
            condition_logic: ConditionLogic::All,
            threshold_config: Some(json!({"metric": "sessions", "value": 50.0})),
            lifecycle_config: None,
            anomaly_config: None,
            conditions: vec![],
            actions: vec![],
        };
        assert!(validate_version_configs(&payload).is_ok());

        let payload = CreateVersionPayload {
            condition_logic: ConditionLogic::All,
            // 缺少必填的 value 字段
            threshold_config: Some(json!({"metric": "sessions"})),
            lifecycle_config: None,
            anomaly_config: None,
            conditions: vec![],
            actions: vec![],
        };
        assert!(validate_version_configs(&payload).is_err());
    }
}
