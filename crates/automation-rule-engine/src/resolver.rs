//! 条件操作数解析器
//!
//! 按条件的作用域把 field_path 解析成待比较的操作数：
//! - `signal`：读取当前信号载荷
//! - `context`：读取调用方上下文数据
//! - `history`：回溯窗口内的历史信号，按 select 取单值或序列
//! - `aggregated`：对窗口内采到的字段值执行聚合函数
//!
//! 历史回溯是唯一的外部调用，受超时约束；超时或失败降级为
//! 未解析出操作数（条件按不匹配处理），绝不挂起评估。

use crate::aggregation::AggregationRegistry;
use crate::error::{EngineError, Result};
use crate::models::{
    ConditionScope, ConditionSpec, EvaluationInput, Signal, ValueSelect, WindowConfig, lookup_path,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// 历史信号查询能力
///
/// 由持久化层实现；引擎只依赖此抽象。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignalHistory: Send + Sync {
    /// 查询租户在 `[before - window, before)` 内给定类型的信号，按时间升序
    async fn signals_in_window(
        &self,
        agency_id: &str,
        signal_type: &str,
        window: Duration,
        before: DateTime<Utc>,
    ) -> Result<Vec<Signal>>;
}

/// 操作数解析结果
///
/// value 为 None 表示未解析出（字段缺失、回溯失败等），此时 error
/// 记录原因供评估记录留痕。
#[derive(Debug, Clone)]
pub struct ResolvedOperand {
    pub value: Option<Value>,
    pub error: Option<String>,
}

impl ResolvedOperand {
    fn found(value: Value) -> Self {
        Self {
            value: Some(value),
            error: None,
        }
    }

    fn missing() -> Self {
        Self {
            value: None,
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            value: None,
            error: Some(error.into()),
        }
    }
}

/// 操作数解析器
pub struct OperandResolver {
    history: Arc<dyn SignalHistory>,
    /// 历史回溯超时
    lookback_timeout: std::time::Duration,
}

impl OperandResolver {
    pub fn new(history: Arc<dyn SignalHistory>, lookback_timeout: std::time::Duration) -> Self {
        Self {
            history,
            lookback_timeout,
        }
    }

    /// 解析一个条件的操作数
    pub async fn resolve(
        &self,
        condition: &ConditionSpec,
        input: &EvaluationInput,
        aggregations: &AggregationRegistry,
    ) -> ResolvedOperand {
        match condition.scope {
            ConditionScope::Signal => match input.signal.get_field(&condition.field_path) {
                Some(v) => ResolvedOperand::found(v),
                None => ResolvedOperand::missing(),
            },
            ConditionScope::Context => match input.get_context_field(&condition.field_path) {
                Some(v) => ResolvedOperand::found(v),
                None => ResolvedOperand::missing(),
            },
            ConditionScope::History => self.resolve_history(condition, input).await,
            ConditionScope::Aggregated => {
                self.resolve_aggregated(condition, input, aggregations).await
            }
        }
    }

    /// history 作用域：按 select 从窗口取单值或整个序列
    async fn resolve_history(
        &self,
        condition: &ConditionSpec,
        input: &EvaluationInput,
    ) -> ResolvedOperand {
        let Some(window) = &condition.window else {
            return ResolvedOperand::failed("history 作用域缺少窗口配置");
        };

        let signals = match self.lookback(window, input).await {
            Ok(signals) => signals,
            Err(e) => return ResolvedOperand::failed(e.to_string()),
        };

        let values: Vec<Value> = signals
            .iter()
            .filter_map(|s| extract_field(s, &condition.field_path))
            .collect();

        match window.select {
            ValueSelect::Latest => match values.last() {
                Some(v) => ResolvedOperand::found(v.clone()),
                None => ResolvedOperand::missing(),
            },
            ValueSelect::Oldest => match values.first() {
                Some(v) => ResolvedOperand::found(v.clone()),
                None => ResolvedOperand::missing(),
            },
            ValueSelect::Series => ResolvedOperand::found(Value::Array(values)),
        }
    }

    /// aggregated 作用域：窗口采样 + 聚合函数
    async fn resolve_aggregated(
        &self,
        condition: &ConditionSpec,
        input: &EvaluationInput,
        aggregations: &AggregationRegistry,
    ) -> ResolvedOperand {
        let Some(window) = &condition.window else {
            return ResolvedOperand::failed("aggregated 作用域缺少窗口配置");
        };
        let Some(agg_name) = &window.aggregation else {
            return ResolvedOperand::failed("aggregated 作用域缺少聚合函数名");
        };

        let signals = match self.lookback(window, input).await {
            Ok(signals) => signals,
            Err(e) => return ResolvedOperand::failed(e.to_string()),
        };

        let values: Vec<Value> = signals
            .iter()
            .filter_map(|s| extract_field(s, &condition.field_path))
            .collect();

        match aggregations.apply(agg_name, &values) {
            Some(v) => ResolvedOperand::found(v),
            None => ResolvedOperand::failed(format!("聚合无结果: {}", agg_name)),
        }
    }

    /// 带超时的历史回溯
    async fn lookback(
        &self,
        window: &WindowConfig,
        input: &EvaluationInput,
    ) -> Result<Vec<Signal>> {
        if window.duration_seconds <= 0 {
            return Err(EngineError::InvalidWindow(format!(
                "回溯时长必须为正数: {}",
                window.duration_seconds
            )));
        }

        let signal_type = window
            .signal_type
            .as_deref()
            .unwrap_or(&input.signal.signal_type);
        let duration = Duration::seconds(window.duration_seconds);

        let lookup = self.history.signals_in_window(
            &input.signal.agency_id,
            signal_type,
            duration,
            input.signal.occurred_at,
        );

        match tokio::time::timeout(self.lookback_timeout, lookup).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    agency_id = %input.signal.agency_id,
                    signal_type = signal_type,
                    timeout_ms = self.lookback_timeout.as_millis() as u64,
                    "历史回溯查询超时"
                );
                Err(EngineError::LookbackTimeout(
                    self.lookback_timeout.as_millis() as u64,
                ))
            }
        }
    }
}

/// 从历史信号中取字段采样
///
/// `*` 表示按信号个数采样（配合 count 统计窗口内信号总数）。
fn extract_field(signal: &Signal, field_path: &str) -> Option<Value> {
    if field_path == "*" {
        return Some(Value::Bool(true));
    }
    lookup_path(&signal.payload, field_path).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConditionScope;
    use serde_json::json;
    use std::time::Duration as StdDuration;

    fn condition(scope: ConditionScope, field: &str, window: Option<WindowConfig>) -> ConditionSpec {
        ConditionSpec {
            order: 0,
            field_path: field.to_string(),
            operator: "eq".to_string(),
            comparison_value: json!(null),
            scope,
            window,
        }
    }

    fn window(seconds: i64, aggregation: Option<&str>, select: ValueSelect) -> WindowConfig {
        WindowConfig {
            duration_seconds: seconds,
            aggregation: aggregation.map(String::from),
            select,
            signal_type: None,
        }
    }

    fn history_with(signals: Vec<Signal>) -> Arc<MockSignalHistory> {
        let mut mock = MockSignalHistory::new();
        mock.expect_signals_in_window()
            .returning(move |_, _, _, _| Ok(signals.clone()));
        Arc::new(mock)
    }

    fn past_signal(sessions: i64) -> Signal {
        Signal::new("agency-a", "low_sessions", json!({ "sessions": sessions }))
    }

    fn input() -> EvaluationInput {
        EvaluationInput::new(Signal::new(
            "agency-a",
            "low_sessions",
            json!({"sessions": 10}),
        ))
        .with_context(json!({"owner": {"workload": 7}}))
    }

    #[tokio::test]
    async fn test_signal_scope() {
        let resolver = OperandResolver::new(
            history_with(vec![]),
            StdDuration::from_millis(100),
        );
        let aggs = AggregationRegistry::with_defaults();

        let resolved = resolver
            .resolve(&condition(ConditionScope::Signal, "sessions", None), &input(), &aggs)
            .await;
        assert_eq!(resolved.value, Some(json!(10)));

        let resolved = resolver
            .resolve(&condition(ConditionScope::Signal, "missing", None), &input(), &aggs)
            .await;
        assert_eq!(resolved.value, None);
        assert!(resolved.error.is_none());
    }

    #[tokio::test]
    async fn test_context_scope() {
        let resolver = OperandResolver::new(
            history_with(vec![]),
            StdDuration::from_millis(100),
        );
        let aggs = AggregationRegistry::with_defaults();

        let resolved = resolver
            .resolve(
                &condition(ConditionScope::Context, "owner.workload", None),
                &input(),
                &aggs,
            )
            .await;
        assert_eq!(resolved.value, Some(json!(7)));
    }

    #[tokio::test]
    async fn test_history_latest_and_series() {
        let signals = vec![past_signal(30), past_signal(45), past_signal(60)];
        let resolver = OperandResolver::new(
            history_with(signals),
            StdDuration::from_millis(100),
        );
        let aggs = AggregationRegistry::with_defaults();

        let resolved = resolver
            .resolve(
                &condition(
                    ConditionScope::History,
                    "sessions",
                    Some(window(3600, None, ValueSelect::Latest)),
                ),
                &input(),
                &aggs,
            )
            .await;
        assert_eq!(resolved.value, Some(json!(60)));

        let resolved = resolver
            .resolve(
                &condition(
                    ConditionScope::History,
                    "sessions",
                    Some(window(3600, None, ValueSelect::Series)),
                ),
                &input(),
                &aggs,
            )
            .await;
        assert_eq!(resolved.value, Some(json!([30, 45, 60])));
    }

    #[tokio::test]
    async fn test_history_without_window_is_error() {
        let resolver = OperandResolver::new(
            history_with(vec![]),
            StdDuration::from_millis(100),
        );
        let aggs = AggregationRegistry::with_defaults();

        let resolved = resolver
            .resolve(&condition(ConditionScope::History, "sessions", None), &input(), &aggs)
            .await;
        assert!(resolved.value.is_none());
        assert!(resolved.error.is_some());
    }

    #[tokio::test]
    async fn test_aggregated_avg() {
        let signals = vec![past_signal(10), past_signal(20), past_signal(30)];
        let resolver = OperandResolver::new(
            history_with(signals),
            StdDuration::from_millis(100),
        );
        let aggs = AggregationRegistry::with_defaults();

        let resolved = resolver
            .resolve(
                &condition(
                    ConditionScope::Aggregated,
                    "sessions",
                    Some(window(3600, Some("avg"), ValueSelect::Latest)),
                ),
                &input(),
                &aggs,
            )
            .await;
        assert_eq!(resolved.value, Some(json!(20.0)));
    }

    #[tokio::test]
    async fn test_aggregated_count_star() {
        let signals = vec![past_signal(1), past_signal(2)];
        let resolver = OperandResolver::new(
            history_with(signals),
            StdDuration::from_millis(100),
        );
        let aggs = AggregationRegistry::with_defaults();

        let resolved = resolver
            .resolve(
                &condition(
                    ConditionScope::Aggregated,
                    "*",
                    Some(window(3600, Some("count"), ValueSelect::Latest)),
                ),
                &input(),
                &aggs,
            )
            .await;
        assert_eq!(resolved.value, Some(json!(2)));
    }

    #[tokio::test]
    async fn test_lookback_failure_degrades() {
        let mut mock = MockSignalHistory::new();
        mock.expect_signals_in_window()
            .returning(|_, _, _, _| Err(EngineError::LookbackFailed("connection lost".into())));
        let resolver = OperandResolver::new(Arc::new(mock), StdDuration::from_millis(100));
        let aggs = AggregationRegistry::with_defaults();

        let resolved = resolver
            .resolve(
                &condition(
                    ConditionScope::History,
                    "sessions",
                    Some(window(3600, None, ValueSelect::Latest)),
                ),
                &input(),
                &aggs,
            )
            .await;
        assert!(resolved.value.is_none());
        assert!(resolved.error.unwrap().contains("connection lost"));
    }

    /// 响应缓慢的历史查询，用于验证超时降级
    struct SlowHistory;

    #[async_trait]
    impl SignalHistory for SlowHistory {
        async fn signals_in_window(
            &self,
            _agency_id: &str,
            _signal_type: &str,
            _window: Duration,
            _before: DateTime<Utc>,
        ) -> Result<Vec<Signal>> {
            tokio::time::sleep(StdDuration::from_secs(5)).await;
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_lookback_timeout_degrades() {
        let resolver = OperandResolver::new(Arc::new(SlowHistory), StdDuration::from_millis(20));
        let aggs = AggregationRegistry::with_defaults();

        let resolved = resolver
            .resolve(
                &condition(
                    ConditionScope::History,
                    "sessions",
                    Some(window(3600, None, ValueSelect::Latest)),
                ),
                &input(),
                &aggs,
            )
            .await;
        assert!(resolved.value.is_none());
        assert!(resolved.error.unwrap().contains("超时"));
    }

    #[tokio::test]
    async fn test_nonpositive_window_rejected() {
        let resolver = OperandResolver::new(
            history_with(vec![]),
            StdDuration::from_millis(100),
        );
        let aggs = AggregationRegistry::with_defaults();

        let resolved = resolver
            .resolve(
                &condition(
                    ConditionScope::History,
                    "sessions",
                    Some(window(0, None, ValueSelect::Latest)),
                ),
                &input(),
                &aggs,
            )
            .await;
        assert!(resolved.error.is_some());
    }
}
