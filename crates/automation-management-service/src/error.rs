//! 管理服务错误类型定义

use thiserror::Error;

/// 单个条目（条件/动作）的验证错误
///
/// 批量创建时逐条定位问题，作为结构化错误列表整体返回。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemError {
    /// 条目在请求数组中的下标
    pub index: usize,
    /// 出错字段
    pub field: String,
    pub message: String,
}

impl ItemError {
    pub fn new(index: usize, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            index,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ItemError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}].{}: {}", self.index, self.field, self.message)
    }
}

/// 管理服务错误类型
#[derive(Debug, Error)]
pub enum AutomationError {
    // 请求上下文错误
    #[error("缺少租户标识")]
    AgencyRequired,

    // 验证错误
    #[error("参数验证失败: {0}")]
    Validation(String),
    #[error("条目验证失败: {} 个条目存在错误", .0.len())]
    ItemValidation(Vec<ItemError>),

    // 资源不存在
    #[error("规则不存在: {0}")]
    RuleNotFound(i64),
    #[error("规则版本不存在: {0}")]
    VersionNotFound(i64),
    #[error("信号不存在: {0}")]
    SignalNotFound(String),

    // 权限错误
    #[error("无权访问该资源")]
    AccessDenied,

    // 业务冲突
    #[error("版本号分配冲突，重试次数已用尽")]
    VersionConflict,
    #[error("版本已是当前生效版本: {0}")]
    AlreadyDefault(i64),

    // 系统错误
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("内部错误: {0}")]
    Internal(String),
}

impl AutomationError {
    /// 判断 sqlx 错误是否为唯一约束冲突（Postgres 23505）
    ///
    /// 版本号分配依赖 (rule_id, version) 唯一约束 + 有限重试。
    pub fn is_unique_violation(err: &sqlx::Error) -> bool {
        matches!(
            err,
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505")
        )
    }
}

/// 从 JSON 序列化错误转换
impl From<serde_json::Error> for AutomationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON 处理错误: {}", err))
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, AutomationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_error_display() {
        let err = ItemError::new(2, "operator", "未注册的操作符: foo");
        assert_eq!(err.to_string(), "[2].operator: 未注册的操作符: foo");
    }

    #[test]
    fn test_item_validation_display_counts_items() {
        let err = AutomationError::ItemValidation(vec![
            ItemError::new(0, "fieldPath", "不能为空"),
            ItemError::new(1, "operator", "未注册"),
        ]);
        assert!(err.to_string().contains("2 个条目"));
    }

    #[test]
    fn test_display_contains_context() {
        assert!(AutomationError::RuleNotFound(42).to_string().contains("42"));
        assert!(
            AutomationError::VersionNotFound(7)
                .to_string()
                .contains("7")
        );
        assert!(
            AutomationError::SignalNotFound("sig-1".into())
                .to_string()
                .contains("sig-1")
        );
        assert!(
            AutomationError::AlreadyDefault(3)
                .to_string()
                .contains("3")
        );
    }

    #[test]
    fn test_unique_violation_detection_negative() {
        assert!(!AutomationError::is_unique_violation(
            &sqlx::Error::RowNotFound
        ));
    }

    #[test]
    fn test_item_error_serializes_camel_case() {
        let err = ItemError::new(1, "actionType", "不能为空");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["index"], 1);
        assert_eq!(json["field"], "actionType");
    }
}
