//! 投递渠道
//!
//! 定义推送服务与实时消息两类渠道的 trait，并提供具体实现。
//!
//! ## 支持的渠道
//!
//! - **Push**: HTTP 推送网关；未配置网关时退化为仅记录日志的模拟推送
//! - **Realtime**: 基于 Redis pub/sub 的实时广播，每个收件人一个频道

mod push;
mod realtime;

pub use push::{HttpPushChannel, LoggingPushChannel, push_channel_from_config};
pub use realtime::RedisRealtimeChannel;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{PushPayload, RealtimePayload};

/// 推送渠道使用的事件类型
pub const PUSH_EVENT_TYPE: &str = "notification";

/// 实时广播使用的事件名
pub const REALTIME_EVENT_NAME: &str = "notification";

/// 推送服务渠道
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PushChannel: Send + Sync {
    /// 向单个收件人推送，失败以 Err 返回
    async fn send(&self, recipient_id: &str, event_type: &str, payload: &PushPayload)
    -> Result<()>;
}

/// 实时消息渠道
///
/// 发出即忘：实现内部处理传输错误，不向调用方返回失败。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RealtimeChannel: Send + Sync {
    async fn broadcast(&self, recipient_id: &str, event_name: &str, payload: &RealtimePayload);
}
