//! 运行期错误日志仓储

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{error, warn};

use super::traits::OperationalErrorLog;

/// 写入 operational_error_logs 表，同时输出 error 级别日志
pub struct PgOperationalErrorLog {
    pool: PgPool,
    source: String,
}

impl PgOperationalErrorLog {
    pub fn new(pool: PgPool, source: impl Into<String>) -> Self {
        Self {
            pool,
            source: source.into(),
        }
    }
}

#[async_trait]
impl OperationalErrorLog for PgOperationalErrorLog {
    async fn record(&self, message: &str) {
        error!(source = %self.source, message = %message, "记录运行期错误");

        let result = sqlx::query(
            "INSERT INTO operational_error_logs (source, message) VALUES ($1, $2)",
        )
        .bind(&self.source)
        .bind(message)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            warn!(error = %e, "运行期错误日志写入失败，已忽略");
        }
    }
}
