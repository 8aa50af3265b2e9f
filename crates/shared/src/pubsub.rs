//! Redis 客户端模块
//!
//! 提供 Redis 连接管理、健康检查以及 pub/sub 消息发布封装。

use crate::config::RedisConfig;
use crate::error::{PlatformError, Result};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use serde::Serialize;
use tracing::{info, instrument};

/// Redis 客户端
#[derive(Clone)]
pub struct RedisClient {
    client: Client,
}

impl RedisClient {
    /// 创建 Redis 客户端（惰性连接，首次使用时才建立连接）
    pub fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        info!("Redis client created");
        Ok(Self { client })
    }

    /// 获取连接
    async fn get_conn(&self) -> Result<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(PlatformError::from)
    }

    /// 健康检查
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.get_conn().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(PlatformError::from)
    }

    /// 以 JSON 形式发布消息到指定频道，返回收到消息的订阅者数量
    #[instrument(skip(self, message))]
    pub async fn publish_json<T: Serialize>(&self, channel: &str, message: &T) -> Result<i64> {
        let serialized = serde_json::to_string(message)
            .map_err(|e| PlatformError::Internal(format!("消息序列化失败: {}", e)))?;

        let mut conn = self.get_conn().await?;
        let receivers: i64 = conn.publish(channel, serialized).await?;
        Ok(receivers)
    }
}
