//! 管理后台错误类型定义
//!
//! 状态码即契约：400 验证失败 / 403 越权 / 404 不存在 / 409 冲突。
//! 系统级错误只返回通用提示，细节仅记日志。

use automation_management::{AutomationError, ItemError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// 管理后台错误类型
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    // 请求上下文 / 验证错误
    #[error("缺少租户标识")]
    AgencyRequired,
    #[error("参数验证失败: {0}")]
    Validation(String),
    #[error("条目验证失败")]
    ItemValidation(Vec<ItemError>),

    // 权限错误
    #[error("无权访问该资源")]
    AccessDenied,

    // 资源不存在
    #[error("规则不存在: {0}")]
    RuleNotFound(i64),
    #[error("规则版本不存在: {0}")]
    VersionNotFound(i64),
    #[error("信号不存在: {0}")]
    SignalNotFound(String),

    // 业务冲突
    #[error("版本号分配冲突，请重试")]
    VersionConflict,
    #[error("版本已是当前生效版本: {0}")]
    AlreadyDefault(i64),

    // 系统错误
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("内部错误: {0}")]
    Internal(String),
}

impl AdminError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AgencyRequired | Self::Validation(_) | Self::ItemValidation(_) => {
                StatusCode::BAD_REQUEST
            }

            Self::AccessDenied => StatusCode::FORBIDDEN,

            Self::RuleNotFound(_) | Self::VersionNotFound(_) | Self::SignalNotFound(_) => {
                StatusCode::NOT_FOUND
            }

            Self::VersionConflict | Self::AlreadyDefault(_) => StatusCode::CONFLICT,

            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AgencyRequired => "AGENCY_REQUIRED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::ItemValidation(_) => "ITEM_VALIDATION_ERROR",
            Self::AccessDenied => "ACCESS_DENIED",
            Self::RuleNotFound(_) => "RULE_NOT_FOUND",
            Self::VersionNotFound(_) => "VERSION_NOT_FOUND",
            Self::SignalNotFound(_) => "SIGNAL_NOT_FOUND",
            Self::VersionConflict => "VERSION_CONFLICT",
            Self::AlreadyDefault(_) => "ALREADY_DEFAULT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志，防止信息泄露
        let message = match &self {
            Self::Database(e) => {
                tracing::error!(error = %e, "数据库操作失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        // 逐条错误列表随 data 字段返回，便于前端逐项定位
        let data = match &self {
            Self::ItemValidation(items) => {
                serde_json::to_value(items).unwrap_or(serde_json::Value::Null)
            }
            _ => serde_json::Value::Null,
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": data
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 从管理服务错误转换
impl From<AutomationError> for AdminError {
    fn from(err: AutomationError) -> Self {
        match err {
            AutomationError::AgencyRequired => Self::AgencyRequired,
            AutomationError::Validation(msg) => Self::Validation(msg),
            AutomationError::ItemValidation(items) => Self::ItemValidation(items),
            AutomationError::RuleNotFound(id) => Self::RuleNotFound(id),
            AutomationError::VersionNotFound(id) => Self::VersionNotFound(id),
            AutomationError::SignalNotFound(id) => Self::SignalNotFound(id),
            AutomationError::AccessDenied => Self::AccessDenied,
            AutomationError::VersionConflict => Self::VersionConflict,
            AutomationError::AlreadyDefault(id) => Self::AlreadyDefault(id),
            AutomationError::Database(e) => Self::Database(e),
            AutomationError::Internal(msg) => Self::Internal(msg),
        }
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for AdminError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// 从 JSON 序列化错误转换
impl From<serde_json::Error> for AdminError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON 处理错误: {}", err))
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, AdminError>;
