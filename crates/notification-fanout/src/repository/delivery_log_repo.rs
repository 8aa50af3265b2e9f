//! 投递日志仓储
//!
//! 每类收件人一张日志表，另有一张管理员汇总表；只追加，不更新不删除。

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::DeliveryLogStore;
use crate::error::{FanoutError, Result};
use crate::models::{DeliveryLogEntry, LogStream, RecipientCategory};

pub struct PgDeliveryLogStore {
    pool: PgPool,
}

impl PgDeliveryLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn category_table(category: RecipientCategory) -> &'static str {
    match category {
        RecipientCategory::Customer => "customer_notification_logs",
        RecipientCategory::Merchant => "merchant_notification_logs",
        RecipientCategory::Driver => "driver_notification_logs",
    }
}

#[async_trait]
impl DeliveryLogStore for PgDeliveryLogStore {
    async fn append(&self, category: RecipientCategory, entry: &DeliveryLogEntry) -> Result<()> {
        let recipient_id = entry.recipient_id.as_deref().ok_or_else(|| {
            FanoutError::Internal(format!("{} 日志缺少收件人", category))
        })?;

        let sql = format!(
            r#"
            INSERT INTO {}
                (notification_id, recipient_id, title, description, image_url, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
            category_table(category)
        );

        sqlx::query(&sql)
            .bind(entry.notification_id)
            .bind(recipient_id)
            .bind(&entry.title)
            .bind(&entry.description)
            .bind(&entry.image_url)
            .bind(entry.created_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn append_admin_summary(&self, entry: &DeliveryLogEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO admin_notification_logs
                (notification_id, title, description, image_url, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.notification_id)
        .bind(&entry.title)
        .bind(&entry.description)
        .bind(&entry.image_url)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(
        &self,
        stream: LogStream,
        notification_id: i64,
        limit: i64,
    ) -> Result<Vec<DeliveryLogEntry>> {
        let sql = match stream {
            LogStream::Category(category) => format!(
                r#"
                SELECT notification_id, recipient_id, title, description, image_url, created_at
                FROM {}
                WHERE notification_id = $1
                ORDER BY id ASC
                LIMIT $2
                "#,
                category_table(category)
            ),
            LogStream::AdminSummary => r#"
                SELECT notification_id, NULL::TEXT AS recipient_id, title, description,
                       image_url, created_at
                FROM admin_notification_logs
                WHERE notification_id = $1
                ORDER BY id ASC
                LIMIT $2
                "#
            .to_string(),
        };

        let rows = sqlx::query_as::<_, DeliveryLogEntry>(&sql)
            .bind(notification_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }
}
