//! 响应 DTO 定义
//!
//! 所有 REST API 的响应体结构

use chrono::{DateTime, Utc};
use notification_fanout::models::{DeliveryLogEntry, NotificationDefinition};
use serde::{Deserialize, Serialize};

/// 分页响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl<T> PageResponse<T> {
    pub fn new(items: Vec<T>, total: i64, page: i64, page_size: i64) -> Self {
        let total_pages = if page_size > 0 {
            (total + page_size - 1) / page_size
        } else {
            0
        };

        Self {
            items,
            total,
            page,
            page_size,
            total_pages,
        }
    }
}

/// API 统一响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self::success_with_message(data, "操作成功")
    }

    /// 创建成功响应（自定义消息）
    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: message.into(),
            data: Some(data),
        }
    }
}

/// 通知定义响应 DTO
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDto {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub geofence_ids: Vec<String>,
    pub targets_merchant: bool,
    pub targets_driver: bool,
    pub targets_customer: bool,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationDefinition> for NotificationDto {
    fn from(definition: NotificationDefinition) -> Self {
        Self {
            id: definition.id,
            title: definition.title,
            description: definition.description,
            image_url: definition.image_url,
            geofence_ids: definition.geofence_ids,
            targets_merchant: definition.targets_merchant,
            targets_driver: definition.targets_driver,
            targets_customer: definition.targets_customer,
            created_at: definition.created_at,
        }
    }
}

/// 发送受理响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendAcceptedDto {
    pub notification_id: i64,
    pub accepted: bool,
}

/// 投递日志响应 DTO
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryLogDto {
    pub notification_id: i64,
    /// 管理员汇总日志没有收件人
    pub recipient_id: Option<String>,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

impl From<DeliveryLogEntry> for DeliveryLogDto {
    fn from(entry: DeliveryLogEntry) -> Self {
        Self {
            notification_id: entry.notification_id,
            recipient_id: entry.recipient_id,
            title: entry.title,
            description: entry.description,
            image_url: entry.image_url,
            created_at: entry.created_at,
        }
    }
}
