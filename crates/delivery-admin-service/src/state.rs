//! 应用状态定义
//!
//! 包含 Axum 路由共享的应用状态

use std::sync::Arc;

use notification_fanout::FanoutOrchestrator;
use notification_fanout::repository::{DeliveryLogStore, NotificationRepository};

/// Axum 应用共享状态
///
/// 只持有扇出引擎暴露的抽象，handler 不直接访问连接池
#[derive(Clone)]
pub struct AppState {
    /// 通知定义仓储
    pub notifications: Arc<dyn NotificationRepository>,
    /// 投递日志存储（只读查询）
    pub delivery_logs: Arc<dyn DeliveryLogStore>,
    /// 发送编排器
    pub orchestrator: Arc<FanoutOrchestrator>,
}

impl AppState {
    pub fn new(
        notifications: Arc<dyn NotificationRepository>,
        delivery_logs: Arc<dyn DeliveryLogStore>,
        orchestrator: Arc<FanoutOrchestrator>,
    ) -> Self {
        Self {
            notifications,
            delivery_logs,
            orchestrator,
        }
    }
}
