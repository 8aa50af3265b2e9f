//! 仓储层
//!
//! 定义扇出引擎依赖的存储接口，并提供基于 PostgreSQL 的实现。

mod delivery_log_repo;
mod directory_repo;
mod error_log_repo;
mod notification_repo;
pub mod traits;

pub use delivery_log_repo::PgDeliveryLogStore;
pub use directory_repo::{PgAudienceDirectory, pg_directories};
pub use error_log_repo::PgOperationalErrorLog;
pub use notification_repo::PgNotificationRepository;
pub use traits::{AudienceDirectory, DeliveryLogStore, NotificationRepository, OperationalErrorLog};
