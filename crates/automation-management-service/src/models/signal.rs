//! 信号存储模型
//!
//! 信号由采集管道写入，对规则引擎只读；这里只做行与引擎
//! 领域类型之间的转换。

use chrono::{DateTime, Utc};
use rule_engine::Signal;
use serde_json::Value;

/// 信号数据库行
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SignalRecord {
    pub id: String,
    pub agency_id: String,
    pub signal_type: String,
    pub category: Option<String>,
    pub payload: Value,
    pub occurred_at: DateTime<Utc>,
}

impl From<SignalRecord> for Signal {
    fn from(record: SignalRecord) -> Self {
        Self {
            id: record.id,
            agency_id: record.agency_id,
            signal_type: record.signal_type,
            category: record.category,
            payload: record.payload,
            occurred_at: record.occurred_at,
        }
    }
}

impl From<&Signal> for SignalRecord {
    fn from(signal: &Signal) -> Self {
        Self {
            id: signal.id.clone(),
            agency_id: signal.agency_id.clone(),
            signal_type: signal.signal_type.clone(),
            category: signal.category.clone(),
            payload: signal.payload.clone(),
            occurred_at: signal.occurred_at,
        }
    }
}
