//! 枚举类型定义
//!
//! 所有枚举都支持数据库（sqlx）和 JSON（serde）序列化

use serde::{Deserialize, Serialize};

/// 规则版本状态
///
/// 版本一经发布即冻结：published 状态不可回退为 draft，也不可删除。
/// 同一规则允许多个 published 版本并存，实际生效的只有被
/// `rules.default_version_id` 指向的那一个。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum VersionStatus {
    /// 草稿 - 可编辑，不参与评估
    #[default]
    Draft,
    /// 已发布 - 冻结，可被指定为生效版本
    Published,
}

impl VersionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }
}

/// 审计变更类型
///
/// 每次对规则或版本的变更写入一条审计记录
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum ChangeType {
    /// 创建（previous_state 为空）
    Created,
    /// 更新
    Updated,
    /// 删除（new_state 为空）
    Deleted,
    /// 发布
    Published,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::Published => "published",
        }
    }
}
