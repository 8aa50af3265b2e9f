//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射

use axum::{
    Router,
    routing::{get, post},
};

use crate::{handlers, state::AppState};

/// 构建通知管理路由
fn notification_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications",
            post(handlers::notification::create_notification)
                .get(handlers::notification::list_notifications),
        )
        .route(
            "/notifications/{id}",
            get(handlers::notification::get_notification),
        )
        .route(
            "/notifications/{id}/send",
            post(handlers::notification::send_notification),
        )
        .route(
            "/notifications/{id}/delivery-logs",
            get(handlers::notification::list_delivery_logs),
        )
}

/// 构建管理后台 API 路由，挂载在 /api/admin 下
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(notification_routes())
}
