//! 配送平台管理后台服务
//!
//! 提供通知定义管理、触发发送和投递日志查询等 REST API。
//!
//! ## 核心功能
//!
//! - **通知管理**：创建、查询通知定义
//! - **触发发送**：校验通知存在后立即受理，扇出在后台完成
//! - **投递日志**：按收件人类别或管理员汇总查询投递记录
//!
//! ## 模块结构
//!
//! - `dto`: 请求和响应的数据传输对象
//! - `error`: 错误类型定义
//! - `handlers`: HTTP 请求处理器
//! - `routes`: 路由配置
//! - `state`: 应用状态
//!
//! ## 技术栈
//!
//! - Web 框架：Axum
//! - 数据验证：validator
//! - 序列化：serde (camelCase)

pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use dto::{
    ApiResponse, CreateNotificationRequest, DeliveryLogDto, DeliveryLogQuery, NotificationDto,
    PageResponse, PaginationParams, SendAcceptedDto,
};
pub use error::{AdminError, Result};
