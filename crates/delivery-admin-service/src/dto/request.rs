//! 请求 DTO 定义

use notification_fanout::models::NewNotification;
use serde::Deserialize;
use validator::Validate;

/// 创建通知请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    #[validate(length(min = 1, max = 200, message = "标题长度必须在1-200个字符之间"))]
    pub title: String,
    #[validate(length(min = 1, max = 2000, message = "描述长度必须在1-2000个字符之间"))]
    pub description: String,
    #[validate(url(message = "图片地址必须是有效的URL"))]
    pub image_url: String,
    #[validate(length(min = 1, message = "至少需要一个地理围栏"))]
    pub geofence_ids: Vec<String>,
    #[serde(default)]
    pub targets_merchant: bool,
    #[serde(default)]
    pub targets_driver: bool,
    #[serde(default)]
    pub targets_customer: bool,
}

impl CreateNotificationRequest {
    pub fn has_any_target(&self) -> bool {
        self.targets_merchant || self.targets_driver || self.targets_customer
    }

    /// 长度校验不排除纯空白，标题和描述需单独检查
    pub fn has_blank_text(&self) -> bool {
        self.title.trim().is_empty() || self.description.trim().is_empty()
    }

    pub fn has_blank_geofence(&self) -> bool {
        self.geofence_ids.iter().any(|g| g.trim().is_empty())
    }
}

impl From<CreateNotificationRequest> for NewNotification {
    fn from(req: CreateNotificationRequest) -> Self {
        Self {
            title: req.title,
            description: req.description,
            image_url: req.image_url,
            geofence_ids: req.geofence_ids,
            targets_merchant: req.targets_merchant,
            targets_driver: req.targets_driver,
            targets_customer: req.targets_customer,
        }
    }
}

/// 分页查询参数
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    20
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl PaginationParams {
    /// 计算数据库查询的 offset
    pub fn offset(&self) -> i64 {
        (self.page - 1).max(0) * self.limit()
    }

    /// 获取限制条数（最大100）
    pub fn limit(&self) -> i64 {
        self.page_size.clamp(1, 100)
    }
}

/// 投递日志查询参数
///
/// `category` 取值 customer / merchant / driver / admin
#[derive(Debug, Deserialize)]
pub struct DeliveryLogQuery {
    pub category: String,
    pub limit: Option<i64>,
}

impl DeliveryLogQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(100).clamp(1, 1000)
    }
}
