//! 通知定义仓储

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::NotificationRepository;
use crate::error::Result;
use crate::models::{NewNotification, NotificationDefinition};

const NOTIFICATION_COLUMNS: &str = r#"
    id, title, description, image_url, geofence_ids,
    targets_merchant, targets_driver, targets_customer, created_at
"#;

pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<NotificationDefinition>> {
        let sql = format!("SELECT {} FROM notifications WHERE id = $1", NOTIFICATION_COLUMNS);

        let notification = sqlx::query_as::<_, NotificationDefinition>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(notification)
    }

    async fn create(&self, notification: &NewNotification) -> Result<NotificationDefinition> {
        let sql = format!(
            r#"
            INSERT INTO notifications
                (title, description, image_url, geofence_ids,
                 targets_merchant, targets_driver, targets_customer)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        );

        let created = sqlx::query_as::<_, NotificationDefinition>(&sql)
            .bind(&notification.title)
            .bind(&notification.description)
            .bind(&notification.image_url)
            .bind(&notification.geofence_ids)
            .bind(notification.targets_merchant)
            .bind(notification.targets_driver)
            .bind(notification.targets_customer)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<NotificationDefinition>> {
        let sql = format!(
            "SELECT {} FROM notifications ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
            NOTIFICATION_COLUMNS
        );

        let rows = sqlx::query_as::<_, NotificationDefinition>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn count(&self) -> Result<i64> {
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM notifications")
            .fetch_one(&self.pool)
            .await?;
        Ok(total.0)
    }
}
