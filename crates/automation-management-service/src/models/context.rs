//! 请求上下文
//!
//! 由上游认证/授权层提供的调用方身份信息，管理服务只消费不生产。

use crate::error::{AutomationError, Result};
use serde::{Deserialize, Serialize};

/// 调用方请求上下文
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    /// 调用方所属租户
    pub agency_id: Option<String>,
    /// 操作人（系统动作时为空）
    pub actor_id: Option<String>,
    /// 超级管理员可跨租户读写
    pub is_super_admin: bool,
}

impl RequestContext {
    pub fn new(agency_id: impl Into<String>) -> Self {
        Self {
            agency_id: Some(agency_id.into()),
            actor_id: None,
            is_super_admin: false,
        }
    }

    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    pub fn super_admin() -> Self {
        Self {
            agency_id: None,
            actor_id: None,
            is_super_admin: true,
        }
    }

    /// 取租户标识，缺失时返回 AgencyRequired
    pub fn require_agency(&self) -> Result<&str> {
        self.agency_id
            .as_deref()
            .ok_or(AutomationError::AgencyRequired)
    }

    /// 判断调用方能否访问给定租户的资源
    pub fn can_access(&self, agency_id: &str) -> bool {
        self.is_super_admin || self.agency_id.as_deref() == Some(agency_id)
    }
}
