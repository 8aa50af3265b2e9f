//! 通知管理 API 处理器
//!
//! 通知定义的创建与查询、触发发送、投递日志查询

use axum::{
    Json,
    extract::{Path, Query, State},
};
use notification_fanout::TriggerOutcome;
use notification_fanout::models::{LogStream, NewNotification};
use tracing::info;
use validator::Validate;

use crate::{
    dto::{
        ApiResponse, CreateNotificationRequest, DeliveryLogDto, DeliveryLogQuery,
        NotificationDto, PageResponse, PaginationParams, SendAcceptedDto,
    },
    error::AdminError,
    state::AppState,
};

/// 创建通知
///
/// POST /api/admin/notifications
pub async fn create_notification(
    State(state): State<AppState>,
    Json(req): Json<CreateNotificationRequest>,
) -> Result<Json<ApiResponse<NotificationDto>>, AdminError> {
    req.validate()?;

    if !req.has_any_target() {
        return Err(AdminError::Validation(
            "至少需要选择一类接收对象".to_string(),
        ));
    }
    if req.has_blank_text() {
        return Err(AdminError::Validation("标题和描述不能为空白".to_string()));
    }
    if req.has_blank_geofence() {
        return Err(AdminError::Validation("地理围栏标识不能为空".to_string()));
    }

    let new_notification = NewNotification::from(req);
    let created = state.notifications.create(&new_notification).await?;

    info!(notification_id = created.id, title = %created.title, "Notification created");

    Ok(Json(ApiResponse::success(NotificationDto::from(created))))
}

/// 获取通知列表
///
/// GET /api/admin/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PageResponse<NotificationDto>>>, AdminError> {
    let total = state.notifications.count().await?;
    let items = state
        .notifications
        .list(params.limit(), params.offset())
        .await?
        .into_iter()
        .map(NotificationDto::from)
        .collect();

    Ok(Json(ApiResponse::success(PageResponse::new(
        items,
        total,
        params.page,
        params.limit(),
    ))))
}

/// 获取通知详情
///
/// GET /api/admin/notifications/{id}
pub async fn get_notification(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<NotificationDto>>, AdminError> {
    let definition = state
        .notifications
        .find_by_id(id)
        .await?
        .ok_or(AdminError::NotificationNotFound(id))?;

    Ok(Json(ApiResponse::success(NotificationDto::from(definition))))
}

/// 触发发送
///
/// POST /api/admin/notifications/{id}/send
///
/// 只校验通知是否存在；受理后立即返回，解析与投递的结果不会反馈到本次响应。
pub async fn send_notification(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<SendAcceptedDto>>, AdminError> {
    match state.orchestrator.trigger_send(id).await? {
        TriggerOutcome::Accepted(handle) => {
            info!(notification_id = handle.notification_id(), "Notification send accepted");
            Ok(Json(ApiResponse::success_with_message(
                SendAcceptedDto {
                    notification_id: id,
                    accepted: true,
                },
                "发送请求已受理",
            )))
        }
        TriggerOutcome::NotFound => Err(AdminError::NotificationNotFound(id)),
    }
}

/// 查询投递日志
///
/// GET /api/admin/notifications/{id}/delivery-logs?category=customer|merchant|driver|admin&limit=
pub async fn list_delivery_logs(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<DeliveryLogQuery>,
) -> Result<Json<ApiResponse<Vec<DeliveryLogDto>>>, AdminError> {
    let stream: LogStream = query.category.parse().map_err(AdminError::Validation)?;

    if state.notifications.find_by_id(id).await?.is_none() {
        return Err(AdminError::NotificationNotFound(id));
    }

    let logs = state
        .delivery_logs
        .list(stream, id, query.limit())
        .await?
        .into_iter()
        .map(DeliveryLogDto::from)
        .collect();

    Ok(Json(ApiResponse::success(logs)))
}
