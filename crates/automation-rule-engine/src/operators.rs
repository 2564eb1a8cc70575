//! 条件操作符注册表
//!
//! 操作符实现为 `名称 -> 函数` 的注册表而非封闭枚举，便于调用方按需
//! 扩展。评估永不抛错：未知操作符、字段缺失、类型不匹配一律返回 false。
//!
//! 内置操作符（完整列表）：
//!
//! | 名称            | 语义                                                 |
//! |-----------------|------------------------------------------------------|
//! | `eq`            | 相等（数值统一转 f64 比较）                          |
//! | `neq`           | 不等                                                 |
//! | `gt`            | 大于                                                 |
//! | `gte`           | 大于等于                                             |
//! | `lt`            | 小于                                                 |
//! | `lte`           | 小于等于                                             |
//! | `between`       | 闭区间，期望值为 `[min, max]`                        |
//! | `in`            | 字段值在期望数组中                                   |
//! | `not_in`        | 字段值不在期望数组中                                 |
//! | `contains`      | 字符串包含子串 / 数组包含元素                        |
//! | `starts_with`   | 字符串前缀                                           |
//! | `ends_with`     | 字符串后缀                                           |
//! | `regex`         | 正则匹配                                             |
//! | `is_empty`      | 值缺失 / null / 空串 / 空数组 / 空对象               |
//! | `is_not_empty`  | is_empty 取反                                        |
//! | `crosses_above` | 序列操作数中相邻两点自下而上越过阈值                 |
//! | `crosses_below` | 序列操作数中相邻两点自上而下跌破阈值                 |
//!
//! `crosses_*` 要求字段值为按时间升序的数值序列（history 作用域配合
//! `select = series` 产出），期望值为阈值。

use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// 操作符函数签名
///
/// 第一个参数是解析出的字段值（None 表示未解析出），第二个是规则中
/// 定义的期望值。
pub type OperatorFn = fn(Option<&Value>, &Value) -> bool;

/// 条件操作符注册表
pub struct OperatorRegistry {
    ops: HashMap<String, OperatorFn>,
}

impl OperatorRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self {
            ops: HashMap::new(),
        }
    }

    /// 创建带全部内置操作符的注册表
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("eq", op_eq);
        registry.register("neq", op_neq);
        registry.register("gt", op_gt);
        registry.register("gte", op_gte);
        registry.register("lt", op_lt);
        registry.register("lte", op_lte);
        registry.register("between", op_between);
        registry.register("in", op_in);
        registry.register("not_in", op_not_in);
        registry.register("contains", op_contains);
        registry.register("starts_with", op_starts_with);
        registry.register("ends_with", op_ends_with);
        registry.register("regex", op_regex);
        registry.register("is_empty", op_is_empty);
        registry.register("is_not_empty", op_is_not_empty);
        registry.register("crosses_above", op_crosses_above);
        registry.register("crosses_below", op_crosses_below);
        registry
    }

    /// 注册操作符（同名覆盖）
    pub fn register(&mut self, name: impl Into<String>, f: OperatorFn) -> &mut Self {
        self.ops.insert(name.into(), f);
        self
    }

    /// 操作符是否已注册
    pub fn contains(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }

    /// 已注册的操作符名列表
    pub fn names(&self) -> Vec<&str> {
        self.ops.keys().map(String::as_str).collect()
    }

    /// 执行一次比较
    ///
    /// 未知操作符返回 false，不抛错。
    pub fn evaluate(&self, name: &str, field: Option<&Value>, expected: &Value) -> bool {
        match self.ops.get(name) {
            Some(f) => f(field, expected),
            None => {
                debug!(operator = name, "未注册的操作符，条件按不匹配处理");
                false
            }
        }
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// 尝试将 Value 转换为 f64（数值或数值字符串）
pub(crate) fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// 相等比较：数值统一转浮点数，避免 100 与 100.0 比较失败
fn values_equal(field: &Value, expected: &Value) -> bool {
    if let (Some(f1), Some(f2)) = (as_f64(field), as_f64(expected)) {
        return (f1 - f2).abs() < f64::EPSILON;
    }
    field == expected
}

fn numeric_cmp(field: Option<&Value>, expected: &Value, cmp: fn(f64, f64) -> bool) -> bool {
    let Some(field) = field else { return false };
    match (as_f64(field), as_f64(expected)) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

fn op_eq(field: Option<&Value>, expected: &Value) -> bool {
    field.is_some_and(|f| values_equal(f, expected))
}

fn op_neq(field: Option<&Value>, expected: &Value) -> bool {
    field.is_some_and(|f| !values_equal(f, expected))
}

fn op_gt(field: Option<&Value>, expected: &Value) -> bool {
    numeric_cmp(field, expected, |a, b| a > b)
}

fn op_gte(field: Option<&Value>, expected: &Value) -> bool {
    numeric_cmp(field, expected, |a, b| a >= b)
}

fn op_lt(field: Option<&Value>, expected: &Value) -> bool {
    numeric_cmp(field, expected, |a, b| a < b)
}

fn op_lte(field: Option<&Value>, expected: &Value) -> bool {
    numeric_cmp(field, expected, |a, b| a <= b)
}

/// 闭区间检查，期望值为 [min, max]
fn op_between(field: Option<&Value>, expected: &Value) -> bool {
    let Some(field) = field else { return false };
    let Some(arr) = expected.as_array() else {
        return false;
    };
    if arr.len() != 2 {
        return false;
    }

    match (as_f64(field), as_f64(&arr[0]), as_f64(&arr[1])) {
        (Some(v), Some(min), Some(max)) => v >= min && v <= max,
        _ => false,
    }
}

fn op_in(field: Option<&Value>, expected: &Value) -> bool {
    let Some(field) = field else { return false };
    expected
        .as_array()
        .is_some_and(|arr| arr.iter().any(|item| values_equal(field, item)))
}

fn op_not_in(field: Option<&Value>, expected: &Value) -> bool {
    let Some(field) = field else { return false };
    expected
        .as_array()
        .is_some_and(|arr| !arr.iter().any(|item| values_equal(field, item)))
}

/// 字符串包含子串，或数组包含元素
fn op_contains(field: Option<&Value>, expected: &Value) -> bool {
    match field {
        Some(Value::String(s)) => expected.as_str().is_some_and(|sub| s.contains(sub)),
        Some(Value::Array(arr)) => arr.iter().any(|item| values_equal(item, expected)),
        _ => false,
    }
}

fn op_starts_with(field: Option<&Value>, expected: &Value) -> bool {
    match (field.and_then(Value::as_str), expected.as_str()) {
        (Some(s), Some(prefix)) => s.starts_with(prefix),
        _ => false,
    }
}

fn op_ends_with(field: Option<&Value>, expected: &Value) -> bool {
    match (field.and_then(Value::as_str), expected.as_str()) {
        (Some(s), Some(suffix)) => s.ends_with(suffix),
        _ => false,
    }
}

/// 正则匹配（每次编译，规则量大时可加 LRU 缓存）
fn op_regex(field: Option<&Value>, expected: &Value) -> bool {
    let (Some(s), Some(pattern)) = (field.and_then(Value::as_str), expected.as_str()) else {
        return false;
    };
    match Regex::new(pattern) {
        Ok(regex) => regex.is_match(s),
        Err(e) => {
            debug!(pattern = pattern, error = %e, "无效的正则表达式");
            false
        }
    }
}

fn op_is_empty(field: Option<&Value>, _expected: &Value) -> bool {
    match field {
        None => true,
        Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(arr)) => arr.is_empty(),
        Some(Value::Object(obj)) => obj.is_empty(),
        _ => false,
    }
}

fn op_is_not_empty(field: Option<&Value>, expected: &Value) -> bool {
    !op_is_empty(field, expected)
}

/// 序列中是否存在相邻两点 (prev, curr) 满足 prev <= 阈值 < curr
fn op_crosses_above(field: Option<&Value>, expected: &Value) -> bool {
    crosses(field, expected, |prev, curr, t| prev <= t && curr > t)
}

/// 序列中是否存在相邻两点 (prev, curr) 满足 prev >= 阈值 > curr
fn op_crosses_below(field: Option<&Value>, expected: &Value) -> bool {
    crosses(field, expected, |prev, curr, t| prev >= t && curr < t)
}

fn crosses(field: Option<&Value>, expected: &Value, check: fn(f64, f64, f64) -> bool) -> bool {
    let Some(threshold) = as_f64(expected) else {
        return false;
    };
    let Some(series) = field.and_then(Value::as_array) else {
        return false;
    };

    let points: Vec<f64> = series.iter().filter_map(as_f64).collect();
    points
        .windows(2)
        .any(|pair| check(pair[0], pair[1], threshold))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> OperatorRegistry {
        OperatorRegistry::with_defaults()
    }

    #[test]
    fn test_eq_numbers_mixed_types() {
        let r = registry();
        assert!(r.evaluate("eq", Some(&json!(100)), &json!(100)));
        assert!(r.evaluate("eq", Some(&json!(100.0)), &json!(100)));
        assert!(r.evaluate("eq", Some(&json!("100")), &json!(100)));
        assert!(!r.evaluate("eq", Some(&json!(100)), &json!(200)));
    }

    #[test]
    fn test_eq_strings() {
        let r = registry();
        assert!(r.evaluate("eq", Some(&json!("hello")), &json!("hello")));
        assert!(!r.evaluate("eq", Some(&json!("hello")), &json!("world")));
    }

    #[test]
    fn test_neq() {
        let r = registry();
        assert!(r.evaluate("neq", Some(&json!("a")), &json!("b")));
        assert!(!r.evaluate("neq", Some(&json!("a")), &json!("a")));
        // 字段缺失 -> false（不是"不等于"）
        assert!(!r.evaluate("neq", None, &json!("a")));
    }

    #[test]
    fn test_numeric_comparisons() {
        let r = registry();
        assert!(r.evaluate("gt", Some(&json!(100)), &json!(50)));
        assert!(r.evaluate("gte", Some(&json!(100)), &json!(100)));
        assert!(r.evaluate("lt", Some(&json!(10)), &json!(50)));
        assert!(r.evaluate("lte", Some(&json!(50)), &json!(50)));
        assert!(!r.evaluate("gt", Some(&json!("abc")), &json!(50)));
    }

    #[test]
    fn test_between() {
        let r = registry();
        assert!(r.evaluate("between", Some(&json!(50)), &json!([0, 100])));
        assert!(!r.evaluate("between", Some(&json!(150)), &json!([0, 100])));
        // 非 [min, max] 形状 -> false 而非报错
        assert!(!r.evaluate("between", Some(&json!(50)), &json!([0])));
        assert!(!r.evaluate("between", Some(&json!(50)), &json!("0-100")));
    }

    #[test]
    fn test_in_and_not_in() {
        let r = registry();
        assert!(r.evaluate("in", Some(&json!("a")), &json!(["a", "b"])));
        assert!(!r.evaluate("in", Some(&json!("c")), &json!(["a", "b"])));
        assert!(r.evaluate("not_in", Some(&json!("c")), &json!(["a", "b"])));
        assert!(!r.evaluate("not_in", None, &json!(["a", "b"])));
    }

    #[test]
    fn test_contains() {
        let r = registry();
        assert!(r.evaluate("contains", Some(&json!("hello world")), &json!("world")));
        assert!(r.evaluate("contains", Some(&json!(["a", "b"])), &json!("b")));
        assert!(!r.evaluate("contains", Some(&json!(42)), &json!("4")));
    }

    #[test]
    fn test_string_affixes() {
        let r = registry();
        assert!(r.evaluate("starts_with", Some(&json!("hello world")), &json!("hello")));
        assert!(r.evaluate("ends_with", Some(&json!("hello world")), &json!("world")));
    }

    #[test]
    fn test_regex() {
        let r = registry();
        assert!(r.evaluate(
            "regex",
            Some(&json!("user@example.com")),
            &json!(r"^[\w.-]+@[\w.-]+\.\w+$")
        ));
        // 非法正则 -> false 而非报错
        assert!(!r.evaluate("regex", Some(&json!("abc")), &json!("(")));
    }

    #[test]
    fn test_is_empty() {
        let r = registry();
        assert!(r.evaluate("is_empty", None, &json!(null)));
        assert!(r.evaluate("is_empty", Some(&json!("")), &json!(null)));
        assert!(r.evaluate("is_empty", Some(&json!([])), &json!(null)));
        assert!(!r.evaluate("is_empty", Some(&json!("x")), &json!(null)));
        assert!(r.evaluate("is_not_empty", Some(&json!("x")), &json!(null)));
    }

    #[test]
    fn test_crosses_above() {
        let r = registry();
        // 序列自下而上越过 50
        assert!(r.evaluate("crosses_above", Some(&json!([30, 45, 60])), &json!(50)));
        // 一直在阈值之上，没有"越过"动作
        assert!(!r.evaluate("crosses_above", Some(&json!([60, 70, 80])), &json!(50)));
        // 单点序列无相邻对
        assert!(!r.evaluate("crosses_above", Some(&json!([60])), &json!(50)));
    }

    #[test]
    fn test_crosses_below() {
        let r = registry();
        assert!(r.evaluate("crosses_below", Some(&json!([80, 55, 40])), &json!(50)));
        assert!(!r.evaluate("crosses_below", Some(&json!([40, 30])), &json!(50)));
    }

    #[test]
    fn test_unknown_operator_is_false() {
        let r = registry();
        assert!(!r.evaluate("no_such_op", Some(&json!(1)), &json!(1)));
    }

    #[test]
    fn test_custom_registration() {
        let mut r = OperatorRegistry::new();
        r.register("always", |_, _| true);
        assert!(r.contains("always"));
        assert!(r.evaluate("always", None, &json!(null)));
    }

    #[test]
    fn test_missing_field_is_false_for_most_ops() {
        let r = registry();
        for op in ["eq", "gt", "lt", "between", "in", "contains", "regex"] {
            assert!(!r.evaluate(op, None, &json!(1)), "operator: {}", op);
        }
    }
}
