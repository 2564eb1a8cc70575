//! 规则引擎领域模型
//!
//! 信号、条件/动作规格、评估输入与评估结果。
//! 引擎本身不依赖持久化，所有规格由调用方（管理服务）从存储装配。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// 信号 - 引擎评估的外部事件记录
///
/// 由采集管道产生，对本引擎只读。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    pub id: String,
    /// 所属租户
    pub agency_id: String,
    /// 信号类型，如 "low_sessions"、"deal_stalled"
    pub signal_type: String,
    /// 可选的信号分类
    #[serde(default)]
    pub category: Option<String>,
    /// 信号载荷
    pub payload: Value,
    #[serde(default = "Utc::now")]
    pub occurred_at: DateTime<Utc>,
}

impl Signal {
    pub fn new(
        agency_id: impl Into<String>,
        signal_type: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            agency_id: agency_id.into(),
            signal_type: signal_type.into(),
            category: None,
            payload,
            occurred_at: Utc::now(),
        }
    }

    /// 读取信号字段（支持点号分隔路径）
    ///
    /// 优先查载荷；载荷中不存在时，`type` / `signal_type` / `category`
    /// 回退到信号元数据，便于条件直接按信号类型过滤。
    pub fn get_field(&self, path: &str) -> Option<Value> {
        if let Some(v) = lookup_path(&self.payload, path) {
            return Some(v.clone());
        }

        match path {
            "type" | "signal_type" => Some(Value::String(self.signal_type.clone())),
            "category" => self.category.clone().map(Value::String),
            _ => None,
        }
    }
}

/// 评估输入：信号 + 调用方提供的上下文数据
#[derive(Debug, Clone)]
pub struct EvaluationInput {
    pub signal: Signal,
    /// 调用方上下文（context 作用域的取值来源）
    pub context: Value,
}

impl EvaluationInput {
    pub fn new(signal: Signal) -> Self {
        Self {
            signal,
            context: Value::Null,
        }
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    /// 读取上下文字段（支持点号分隔路径）
    pub fn get_context_field(&self, path: &str) -> Option<Value> {
        lookup_path(&self.context, path).cloned()
    }
}

/// 按点号分隔路径读取 JSON 值（如 "deal.amount" 或 "items.0.name"）
pub fn lookup_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }

    let mut current = root;
    for part in path.split('.') {
        match current {
            Value::Object(map) => {
                current = map.get(part)?;
            }
            Value::Array(arr) => {
                let index: usize = part.parse().ok()?;
                current = arr.get(index)?;
            }
            _ => return None,
        }
    }

    Some(current)
}

/// 条件取值作用域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionScope {
    /// 直接读取信号载荷
    Signal,
    /// 读取调用方上下文数据
    Context,
    /// 历史回溯，取窗口内的单个值
    History,
    /// 窗口聚合计算
    Aggregated,
}

impl std::fmt::Display for ConditionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Signal => "signal",
            Self::Context => "context",
            Self::History => "history",
            Self::Aggregated => "aggregated",
        };
        write!(f, "{}", s)
    }
}

/// 条件组合逻辑
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionLogic {
    /// 所有条件都满足
    All,
    /// 至少一个条件满足
    Any,
}

impl std::fmt::Display for ConditionLogic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Any => write!(f, "any"),
        }
    }
}

/// 历史窗口取值方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSelect {
    /// 窗口内最近一条（默认）
    #[default]
    Latest,
    /// 窗口内最早一条
    Oldest,
    /// 整个序列（按时间升序的数组，供 crosses_* 等操作符使用）
    Series,
}

/// 窗口配置
///
/// history / aggregated 作用域必须提供；其余作用域忽略。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowConfig {
    /// 回溯时长（秒）
    pub duration_seconds: i64,
    /// 聚合函数名（aggregated 作用域必填，见 AggregationRegistry）
    #[serde(default)]
    pub aggregation: Option<String>,
    /// 取值方式（history 作用域使用）
    #[serde(default)]
    pub select: ValueSelect,
    /// 回溯的信号类型，缺省为当前信号的类型
    #[serde(default)]
    pub signal_type: Option<String>,
}

/// 一条评估条件
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionSpec {
    /// 评估顺序（版本内唯一）
    pub order: i32,
    /// 取值路径
    pub field_path: String,
    /// 操作符名（见 OperatorRegistry）
    pub operator: String,
    /// 期望值
    pub comparison_value: Value,
    pub scope: ConditionScope,
    #[serde(default)]
    pub window: Option<WindowConfig>,
}

/// 一个派发动作
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSpec {
    /// 派发顺序（严格顺序执行）
    pub order: i32,
    pub action_type: String,
    pub config: Value,
}

/// 单个条件的评估结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionOutcome {
    pub order: i32,
    pub field_path: String,
    pub operator: String,
    pub scope: ConditionScope,
    pub matched: bool,
    /// 取值失败时的原因（字段缺失、回溯超时等）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 动作派发状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// 已成功派发
    Dispatched,
    /// 派发失败（失败不阻断后续动作）
    Failed,
}

/// 单个动作的派发结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    pub order: i32,
    pub action_type: String,
    pub status: ActionStatus,
    /// 处理器返回的详情
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 一次规则评估的完整结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationOutcome {
    pub matched: bool,
    pub condition_results: Vec<ConditionOutcome>,
    pub actions_triggered: Vec<ActionOutcome>,
}
