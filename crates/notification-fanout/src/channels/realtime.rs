//! 实时消息渠道实现

use async_trait::async_trait;
use delivery_shared::pubsub::RedisClient;
use serde::Serialize;
use tracing::{debug, warn};

use super::RealtimeChannel;
use crate::models::RealtimePayload;

/// 发布到 Redis 的消息信封
#[derive(Debug, Serialize)]
struct RealtimeEnvelope<'a> {
    event: &'a str,
    payload: &'a RealtimePayload,
}

/// Redis pub/sub 实时渠道
///
/// 每个收件人（包括管理后台频道）对应一个 `{prefix}{recipient_id}` 频道，
/// 由网关层的 WebSocket 连接订阅后转发给客户端。
pub struct RedisRealtimeChannel {
    client: RedisClient,
    channel_prefix: String,
}

impl RedisRealtimeChannel {
    pub fn new(client: RedisClient, channel_prefix: impl Into<String>) -> Self {
        Self {
            client,
            channel_prefix: channel_prefix.into(),
        }
    }

    fn channel_for(&self, recipient_id: &str) -> String {
        format!("{}{}", self.channel_prefix, recipient_id)
    }
}

#[async_trait]
impl RealtimeChannel for RedisRealtimeChannel {
    async fn broadcast(&self, recipient_id: &str, event_name: &str, payload: &RealtimePayload) {
        let channel = self.channel_for(recipient_id);
        let envelope = RealtimeEnvelope {
            event: event_name,
            payload,
        };

        match self.client.publish_json(&channel, &envelope).await {
            Ok(receivers) => {
                debug!(channel = %channel, receivers, "实时消息已广播");
            }
            Err(e) => {
                warn!(channel = %channel, error = %e, "实时消息广播失败，已忽略");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use delivery_shared::config::RedisConfig;

    fn make_channel() -> RedisRealtimeChannel {
        let client = RedisClient::new(&RedisConfig {
            // 不可达端口，用于验证广播失败不会向外传播
            url: "redis://127.0.0.1:1".to_string(),
            pool_size: 1,
        })
        .unwrap();
        RedisRealtimeChannel::new(client, "notifications:")
    }

    #[test]
    fn test_channel_name() {
        let channel = make_channel();
        assert_eq!(channel.channel_for("c1"), "notifications:c1");
        assert_eq!(channel.channel_for("admin"), "notifications:admin");
    }

    #[test]
    fn test_envelope_shape() {
        let payload = RealtimePayload {
            title: "t".to_string(),
            description: "d".to_string(),
            image_url: "i".to_string(),
            created_at: Utc::now(),
        };
        let envelope = RealtimeEnvelope {
            event: "notification",
            payload: &payload,
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["event"], "notification");
        assert_eq!(json["payload"]["imageUrl"], "i");
    }

    #[tokio::test]
    async fn test_broadcast_swallows_transport_errors() {
        let channel = make_channel();
        let payload = RealtimePayload {
            title: "t".to_string(),
            description: "d".to_string(),
            image_url: "i".to_string(),
            created_at: Utc::now(),
        };
        // 连接失败只记录日志，不 panic
        channel.broadcast("c1", "notification", &payload).await;
    }
}
