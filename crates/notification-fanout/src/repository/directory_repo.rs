//! 收件人目录仓储
//!
//! 三类收件人分别存放在 customers / merchants / agents 表中，
//! 通过数组交集运算符 `&&` 匹配地理围栏。

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use super::traits::AudienceDirectory;
use crate::error::Result;
use crate::fanout::AudienceDirectories;
use crate::models::{DirectoryMember, RecipientCategory};

pub struct PgAudienceDirectory {
    pool: PgPool,
    category: RecipientCategory,
}

impl PgAudienceDirectory {
    pub fn new(pool: PgPool, category: RecipientCategory) -> Self {
        Self { pool, category }
    }

    /// 骑手目录沿用 agents 表
    fn table_name(&self) -> &'static str {
        match self.category {
            RecipientCategory::Customer => "customers",
            RecipientCategory::Merchant => "merchants",
            RecipientCategory::Driver => "agents",
        }
    }
}

#[async_trait]
impl AudienceDirectory for PgAudienceDirectory {
    async fn members_by_geofence(&self, geofence_ids: &[String]) -> Result<Vec<DirectoryMember>> {
        let sql = format!(
            "SELECT id FROM {} WHERE geofence_ids && $1 ORDER BY id",
            self.table_name()
        );

        let members = sqlx::query_as::<_, DirectoryMember>(&sql)
            .bind(geofence_ids.to_vec())
            .fetch_all(&self.pool)
            .await?;

        Ok(members)
    }
}

/// 基于同一连接池构建三类收件人目录
pub fn pg_directories(pool: PgPool) -> AudienceDirectories {
    AudienceDirectories::new(
        Arc::new(PgAudienceDirectory::new(pool.clone(), RecipientCategory::Customer)),
        Arc::new(PgAudienceDirectory::new(pool.clone(), RecipientCategory::Merchant)),
        Arc::new(PgAudienceDirectory::new(pool, RecipientCategory::Driver)),
    )
}
