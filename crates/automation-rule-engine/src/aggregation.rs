//! 聚合函数注册表
//!
//! aggregated 作用域用窗口内采到的一组值计算出单个操作数。
//! 与操作符一致，聚合实现为 `名称 -> 函数` 的注册表。
//!
//! 内置聚合函数（完整列表）：
//!
//! | 名称    | 语义                                   |
//! |---------|----------------------------------------|
//! | `count` | 采样个数（包含非数值采样）             |
//! | `sum`   | 数值采样求和（无数值采样时为 0）       |
//! | `avg`   | 数值采样平均值（无数值采样时无结果）   |
//! | `min`   | 数值采样最小值（无数值采样时无结果）   |
//! | `max`   | 数值采样最大值（无数值采样时无结果）   |
//!
//! 返回 None 表示聚合无结果，对应条件按不匹配处理。

use crate::operators::as_f64;
use serde_json::{Number, Value};
use std::collections::HashMap;
use tracing::debug;

/// 聚合函数签名
pub type AggregationFn = fn(&[Value]) -> Option<Value>;

/// 聚合函数注册表
pub struct AggregationRegistry {
    fns: HashMap<String, AggregationFn>,
}

impl AggregationRegistry {
    pub fn new() -> Self {
        Self {
            fns: HashMap::new(),
        }
    }

    /// 创建带全部内置聚合函数的注册表
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("count", agg_count);
        registry.register("sum", agg_sum);
        registry.register("avg", agg_avg);
        registry.register("min", agg_min);
        registry.register("max", agg_max);
        registry
    }

    /// 注册聚合函数（同名覆盖）
    pub fn register(&mut self, name: impl Into<String>, f: AggregationFn) -> &mut Self {
        self.fns.insert(name.into(), f);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fns.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.fns.keys().map(String::as_str).collect()
    }

    /// 执行聚合；未知函数名返回 None
    pub fn apply(&self, name: &str, values: &[Value]) -> Option<Value> {
        match self.fns.get(name) {
            Some(f) => f(values),
            None => {
                debug!(aggregation = name, "未注册的聚合函数");
                None
            }
        }
    }
}

impl Default for AggregationRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn numeric(values: &[Value]) -> Vec<f64> {
    values.iter().filter_map(as_f64).collect()
}

fn to_value(n: f64) -> Option<Value> {
    Number::from_f64(n).map(Value::Number)
}

fn agg_count(values: &[Value]) -> Option<Value> {
    Some(Value::Number(Number::from(values.len())))
}

fn agg_sum(values: &[Value]) -> Option<Value> {
    to_value(numeric(values).iter().sum())
}

fn agg_avg(values: &[Value]) -> Option<Value> {
    let nums = numeric(values);
    if nums.is_empty() {
        return None;
    }
    to_value(nums.iter().sum::<f64>() / nums.len() as f64)
}

fn agg_min(values: &[Value]) -> Option<Value> {
    numeric(values)
        .into_iter()
        .reduce(f64::min)
        .and_then(to_value)
}

fn agg_max(values: &[Value]) -> Option<Value> {
    numeric(values)
        .into_iter()
        .reduce(f64::max)
        .and_then(to_value)
}
