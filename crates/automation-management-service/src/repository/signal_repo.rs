//! 信号仓储
//!
//! 信号由采集管道写入，对规则引擎只读。这里同时实现引擎的
//! `SignalHistory`，为 history / aggregated 作用域提供窗口查询。

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rule_engine::{EngineError, Signal, SignalHistory};
use sqlx::PgPool;

use super::traits::SignalRepositoryTrait;
use crate::error::Result;
use crate::models::SignalRecord;

const SIGNAL_COLUMNS: &str = "id, agency_id, signal_type, category, payload, occurred_at";

/// 信号仓储
pub struct SignalRepository {
    pool: PgPool,
}

impl SignalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 获取单个信号
    pub async fn get(&self, id: &str) -> Result<Option<Signal>> {
        let sql = format!("SELECT {} FROM signals WHERE id = $1", SIGNAL_COLUMNS);
        let record = sqlx::query_as::<_, SignalRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record.map(Signal::from))
    }

    /// 写入信号（幂等：同 id 重复写入忽略）
    pub async fn insert(&self, signal: &Signal) -> Result<()> {
        sqlx::query(
            "INSERT INTO signals (id, agency_id, signal_type, category, payload, occurred_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(&signal.id)
        .bind(&signal.agency_id)
        .bind(&signal.signal_type)
        .bind(&signal.category)
        .bind(&signal.payload)
        .bind(signal.occurred_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// 查询窗口内的历史信号（时间升序）
    pub async fn signals_in_window(
        &self,
        agency_id: &str,
        signal_type: &str,
        window: Duration,
        before: DateTime<Utc>,
    ) -> Result<Vec<Signal>> {
        let since = before - window;
        let sql = format!(
            "SELECT {} FROM signals \
             WHERE agency_id = $1 AND signal_type = $2 \
               AND occurred_at >= $3 AND occurred_at < $4 \
             ORDER BY occurred_at ASC",
            SIGNAL_COLUMNS
        );
        let records = sqlx::query_as::<_, SignalRecord>(&sql)
            .bind(agency_id)
            .bind(signal_type)
            .bind(since)
            .bind(before)
            .fetch_all(&self.pool)
            .await?;

        Ok(records.into_iter().map(Signal::from).collect())
    }
}

#[async_trait]
impl SignalRepositoryTrait for SignalRepository {
    async fn get(&self, id: &str) -> Result<Option<Signal>> {
        self.get(id).await
    }

    async fn insert(&self, signal: &Signal) -> Result<()> {
        self.insert(signal).await
    }
}

#[async_trait]
impl SignalHistory for SignalRepository {
    async fn signals_in_window(
        &self,
        agency_id: &str,
        signal_type: &str,
        window: Duration,
        before: DateTime<Utc>,
    ) -> rule_engine::Result<Vec<Signal>> {
        self.signals_in_window(agency_id, signal_type, window, before)
            .await
            .map_err(|e| EngineError::LookbackFailed(e.to_string()))
    }
}
