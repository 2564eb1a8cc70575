//! 内置动作处理器
//!
//! 规则匹配后的具体动作（创建洞察、发送通知、创建任务）由下游系统
//! 执行；生产部署时替换为对接真实系统的实现并注入派发注册表。
//! 这里提供的处理器把动作意图记入结构化日志并返回可落库的执行详情，
//! 用于开发联调和评估链路的端到端验证。

use async_trait::async_trait;
use rule_engine::{ActionHandler, ActionRequest};
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

/// "创建洞察" 处理器
///
/// 下游为智能分析管道，这里只生成洞察标识并记录意图。
pub struct CreateInsightHandler;

#[async_trait]
impl ActionHandler for CreateInsightHandler {
    fn action_type(&self) -> &str {
        "create_insight"
    }

    async fn execute(&self, request: &ActionRequest) -> rule_engine::Result<Value> {
        let insight_id = Uuid::new_v4().to_string();
        info!(
            agency_id = %request.signal.agency_id,
            signal_id = %request.signal.id,
            insight_id = %insight_id,
            "创建洞察"
        );
        Ok(json!({
            "insightId": insight_id,
            "signalType": request.signal.signal_type,
            "config": request.config,
        }))
    }
}

/// "发送通知" 处理器
pub struct SendNotificationHandler;

#[async_trait]
impl ActionHandler for SendNotificationHandler {
    fn action_type(&self) -> &str {
        "send_notification"
    }

    async fn execute(&self, request: &ActionRequest) -> rule_engine::Result<Value> {
        let channel = request
            .config
            .get("channel")
            .and_then(Value::as_str)
            .unwrap_or("in_app");
        info!(
            agency_id = %request.signal.agency_id,
            signal_id = %request.signal.id,
            channel = channel,
            "发送通知"
        );
        Ok(json!({ "channel": channel, "delivered": true }))
    }
}

/// "创建任务" 处理器
pub struct CreateTaskHandler;

#[async_trait]
impl ActionHandler for CreateTaskHandler {
    fn action_type(&self) -> &str {
        "create_task"
    }

    async fn execute(&self, request: &ActionRequest) -> rule_engine::Result<Value> {
        let task_id = Uuid::new_v4().to_string();
        info!(
            agency_id = %request.signal.agency_id,
            signal_id = %request.signal.id,
            task_id = %task_id,
            "创建跟进任务"
        );
        Ok(json!({
            "taskId": task_id,
            "title": request.config.get("title").cloned().unwrap_or(Value::Null),
        }))
    }
}
