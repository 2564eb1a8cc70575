//! 动作派发
//!
//! 管理所有 ActionHandler 实例，按动作类型索引，规则匹配后按
//! sort_order 严格顺序逐个派发。
//!
//! ## 设计说明
//!
//! 派发是逐动作尽力而为：单个动作失败、超时或无对应处理器时记入
//! 该动作的结果，不阻断同一列表中的后续动作，也不会把错误抛给
//! 引擎调用方。具体动作（创建洞察、发送通知、创建任务等）由外部
//! 系统实现并注入。

use crate::error::Result;
use crate::models::{ActionOutcome, ActionSpec, ActionStatus, Signal};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// 一次动作执行请求
#[derive(Debug, Clone)]
pub struct ActionRequest {
    /// 触发动作的信号
    pub signal: Signal,
    /// 动作配置（RuleAction.action_config）
    pub config: Value,
}

/// 动作处理器
///
/// 外部能力的接入点，按 action_type 路由。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// 处理器负责的动作类型
    fn action_type(&self) -> &str;

    /// 执行动作，返回可记录的执行详情
    async fn execute(&self, request: &ActionRequest) -> Result<Value>;
}

/// 动作派发注册表
///
/// 以 action_type 为 key 路由到处理器；所有处理器通过 Arc 共享。
pub struct ActionDispatchRegistry {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
    /// 单个动作的执行超时
    dispatch_timeout: Duration,
}

impl ActionDispatchRegistry {
    pub fn new(dispatch_timeout: Duration) -> Self {
        Self {
            handlers: HashMap::new(),
            dispatch_timeout,
        }
    }

    /// 注册处理器（同类型覆盖）
    pub fn register(&mut self, handler: Arc<dyn ActionHandler>) -> &mut Self {
        let action_type = handler.action_type().to_string();
        debug!(action_type = %action_type, "注册动作处理器");
        self.handlers.insert(action_type, handler);
        self
    }

    pub fn contains(&self, action_type: &str) -> bool {
        self.handlers.contains_key(action_type)
    }

    /// 已注册的动作类型
    pub fn registered_types(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    /// 按顺序派发一组动作
    ///
    /// 动作按 order 升序执行；每个动作的结果独立记录。
    pub async fn dispatch_all(&self, actions: &[ActionSpec], signal: &Signal) -> Vec<ActionOutcome> {
        let mut ordered: Vec<&ActionSpec> = actions.iter().collect();
        ordered.sort_by_key(|a| a.order);

        let mut outcomes = Vec::with_capacity(ordered.len());
        for action in ordered {
            outcomes.push(self.dispatch_one(action, signal).await);
        }
        outcomes
    }

    /// 派发单个动作
    async fn dispatch_one(&self, action: &ActionSpec, signal: &Signal) -> ActionOutcome {
        let Some(handler) = self.handlers.get(&action.action_type) else {
            warn!(action_type = %action.action_type, "无对应的动作处理器");
            return ActionOutcome {
                order: action.order,
                action_type: action.action_type.clone(),
                status: ActionStatus::Failed,
                detail: None,
                error: Some(format!("未注册的动作类型: {}", action.action_type)),
            };
        };

        let request = ActionRequest {
            signal: signal.clone(),
            config: action.config.clone(),
        };

        match tokio::time::timeout(self.dispatch_timeout, handler.execute(&request)).await {
            Ok(Ok(detail)) => ActionOutcome {
                order: action.order,
                action_type: action.action_type.clone(),
                status: ActionStatus::Dispatched,
                detail: Some(detail),
                error: None,
            },
            Ok(Err(e)) => {
                warn!(action_type = %action.action_type, error = %e, "动作执行失败");
                ActionOutcome {
                    order: action.order,
                    action_type: action.action_type.clone(),
                    status: ActionStatus::Failed,
                    detail: None,
                    error: Some(e.to_string()),
                }
            }
            Err(_) => {
                warn!(
                    action_type = %action.action_type,
                    timeout_ms = self.dispatch_timeout.as_millis() as u64,
                    "动作执行超时"
                );
                ActionOutcome {
                    order: action.order,
                    action_type: action.action_type.clone(),
                    status: ActionStatus::Failed,
                    detail: None,
                    error: Some(format!(
                        "动作执行超时（{} 毫秒）",
                        self.dispatch_timeout.as_millis()
                    )),
                }
            }
        }
    }
}
