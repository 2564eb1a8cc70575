//! 规则实体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 自动化规则
///
/// 租户拥有的自动化单元。具体评估逻辑存放在版本里，
/// `default_version_id` 指向当前生效的版本。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: i64,
    /// 所属租户
    pub agency_id: String,
    pub name: String,
    #[sqlx(default)]
    pub description: Option<String>,
    /// 是否参与评估
    pub enabled: bool,
    /// 当前生效版本（为空表示尚未发布过）
    #[sqlx(default)]
    pub default_version_id: Option<i64>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
