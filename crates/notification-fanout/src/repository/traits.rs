//! 仓储 Trait 定义
//!
//! 扇出引擎只依赖这些抽象，便于替换为内存实现或 mock 测试

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    DeliveryLogEntry, DirectoryMember, LogStream, NewNotification, NotificationDefinition,
    RecipientCategory,
};

/// 通知定义仓储
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<NotificationDefinition>>;
    async fn create(&self, notification: &NewNotification) -> Result<NotificationDefinition>;
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<NotificationDefinition>>;
    async fn count(&self) -> Result<i64>;
}

/// 收件人目录（只读）
///
/// 每个收件人类别一个实例，返回地理围栏与给定集合有交集的成员。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudienceDirectory: Send + Sync {
    async fn members_by_geofence(&self, geofence_ids: &[String]) -> Result<Vec<DirectoryMember>>;
}

/// 投递日志存储（仅追加）
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeliveryLogStore: Send + Sync {
    async fn append(&self, category: RecipientCategory, entry: &DeliveryLogEntry) -> Result<()>;
    async fn append_admin_summary(&self, entry: &DeliveryLogEntry) -> Result<()>;
    async fn list(
        &self,
        stream: LogStream,
        notification_id: i64,
        limit: i64,
    ) -> Result<Vec<DeliveryLogEntry>>;
}

/// 运行期错误日志
///
/// 尽力而为：写入失败由实现自行吞掉，不向调用方传播。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OperationalErrorLog: Send + Sync {
    async fn record(&self, message: &str);
}
