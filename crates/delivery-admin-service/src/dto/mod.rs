//! DTO 模块
//!
//! 包含所有请求和响应的数据传输对象

pub mod request;
pub mod response;

pub use request::{CreateNotificationRequest, DeliveryLogQuery, PaginationParams};
pub use response::{ApiResponse, DeliveryLogDto, NotificationDto, PageResponse, SendAcceptedDto};
