//! 规则版本、条件与动作实体定义
//!
//! 数据库行以字符串/JSONB 存储作用域、组合逻辑和窗口配置；
//! 仓储层在读出时转换为引擎的强类型，评估逻辑内部不再接触裸数据。

use super::enums::VersionStatus;
use crate::error::{AutomationError, Result};
use chrono::{DateTime, Utc};
use rule_engine::{ActionSpec, ConditionLogic, ConditionScope, ConditionSpec, WindowConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 阈值配置（版本级，opaque 配置之一）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdConfig {
    /// 关注的指标名
    pub metric: String,
    /// 阈值
    pub value: f64,
    /// 告警方向：above / below
    #[serde(default)]
    pub direction: Option<String>,
}

/// 生命周期配置（版本级）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleConfig {
    #[serde(default)]
    pub from_stage: Option<String>,
    #[serde(default)]
    pub to_stage: Option<String>,
    /// 在当前阶段停留的最少天数
    #[serde(default)]
    pub min_days_in_stage: Option<i64>,
}

/// 异常检测配置（版本级）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyConfig {
    /// 基线窗口（天）
    pub baseline_days: i64,
    /// 偏离倍数
    pub deviation_factor: f64,
    #[serde(default)]
    pub min_samples: Option<i64>,
}

/// 规则版本
///
/// 发布后不可变的评估逻辑快照。(rule_id, version) 唯一，
/// 版本号从 1 起连续递增。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleVersion {
    pub id: i64,
    pub rule_id: i64,
    pub version: i32,
    pub status: VersionStatus,
    pub condition_logic: ConditionLogic,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_config: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifecycle_config: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomaly_config: Option<Value>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// 规则版本数据库行
#[derive(Debug, sqlx::FromRow)]
pub struct RuleVersionRow {
    pub id: i64,
    pub rule_id: i64,
    pub version: i32,
    pub status: VersionStatus,
    pub condition_logic: String,
    pub threshold_config: Option<Value>,
    pub lifecycle_config: Option<Value>,
    pub anomaly_config: Option<Value>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// 解析条件组合逻辑
pub fn parse_condition_logic(s: &str) -> Option<ConditionLogic> {
    match s {
        "all" => Some(ConditionLogic::All),
        "any" => Some(ConditionLogic::Any),
        _ => None,
    }
}

/// 解析条件作用域
pub fn parse_condition_scope(s: &str) -> Option<ConditionScope> {
    match s {
        "signal" => Some(ConditionScope::Signal),
        "context" => Some(ConditionScope::Context),
        "history" => Some(ConditionScope::History),
        "aggregated" => Some(ConditionScope::Aggregated),
        _ => None,
    }
}

impl TryFrom<RuleVersionRow> for RuleVersion {
    type Error = AutomationError;

    fn try_from(row: RuleVersionRow) -> Result<Self> {
        let condition_logic = parse_condition_logic(&row.condition_logic).ok_or_else(|| {
            AutomationError::Internal(format!("无效的条件组合逻辑: {}", row.condition_logic))
        })?;

        Ok(Self {
            id: row.id,
            rule_id: row.rule_id,
            version: row.version,
            status: row.status,
            condition_logic,
            threshold_config: row.threshold_config,
            lifecycle_config: row.lifecycle_config,
            anomaly_config: row.anomaly_config,
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

/// 规则条件
///
/// 一个版本内的单条评估谓词，sort_order 定义评估与读取顺序。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    pub id: i64,
    pub rule_version_id: i64,
    #[serde(rename = "order")]
    pub sort_order: i32,
    pub field_path: String,
    pub operator: String,
    pub comparison_value: Value,
    pub scope: ConditionScope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_config: Option<WindowConfig>,
}

impl RuleCondition {
    /// 转换为引擎条件规格
    pub fn to_spec(&self) -> ConditionSpec {
        ConditionSpec {
            order: self.sort_order,
            field_path: self.field_path.clone(),
            operator: self.operator.clone(),
            comparison_value: self.comparison_value.clone(),
            scope: self.scope,
            window: self.window_config.clone(),
        }
    }
}

/// 规则条件数据库行
#[derive(Debug, sqlx::FromRow)]
pub struct RuleConditionRow {
    pub id: i64,
    pub rule_version_id: i64,
    pub sort_order: i32,
    pub field_path: String,
    pub operator: String,
    pub comparison_value: Value,
    pub scope: String,
    pub window_config: Option<Value>,
}

impl TryFrom<RuleConditionRow> for RuleCondition {
    type Error = AutomationError;

    fn try_from(row: RuleConditionRow) -> Result<Self> {
        let scope = parse_condition_scope(&row.scope)
            .ok_or_else(|| AutomationError::Internal(format!("无效的条件作用域: {}", row.scope)))?;

        let window_config = row
            .window_config
            .map(serde_json::from_value::<WindowConfig>)
            .transpose()
            .map_err(|e| AutomationError::Internal(format!("无效的窗口配置: {}", e)))?;

        Ok(Self {
            id: row.id,
            rule_version_id: row.rule_version_id,
            sort_order: row.sort_order,
            field_path: row.field_path,
            operator: row.operator,
            comparison_value: row.comparison_value,
            scope,
            window_config,
        })
    }
}

/// 待写入的规则条件
///
/// 经过验证、sort_order 已解析（显式值或数组下标）的条件。
#[derive(Debug, Clone)]
pub struct NewRuleCondition {
    pub sort_order: i32,
    pub field_path: String,
    pub operator: String,
    pub comparison_value: Value,
    pub scope: ConditionScope,
    pub window_config: Option<WindowConfig>,
}

/// 待写入的规则动作
#[derive(Debug, Clone)]
pub struct NewRuleAction {
    pub sort_order: i32,
    pub action_type: String,
    pub action_config: Value,
}

/// 规则动作
///
/// 一个版本内的单个派发步骤，sort_order 定义严格的派发顺序。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RuleAction {
    pub id: i64,
    pub rule_version_id: i64,
    #[serde(rename = "order")]
    pub sort_order: i32,
    pub action_type: String,
    pub action_config: Value,
}

impl RuleAction {
    /// 转换为引擎动作规格
    pub fn to_spec(&self) -> ActionSpec {
        ActionSpec {
            order: self.sort_order,
            action_type: self.action_type.clone(),
            config: self.action_config.clone(),
        }
    }
}
