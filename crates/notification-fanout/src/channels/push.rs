//! 推送服务渠道实现

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use delivery_shared::config::PushConfig;
use delivery_shared::error::PlatformError;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::PushChannel;
use crate::error::{FanoutError, Result};
use crate::models::PushPayload;

/// 推送网关请求体
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PushRequest<'a> {
    recipient_id: &'a str,
    event_type: &'a str,
    notification: &'a PushPayload,
}

/// HTTP 推送渠道
///
/// 以 JSON POST 调用推送网关，非 2xx 响应视为失败。
pub struct HttpPushChannel {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpPushChannel {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FanoutError::Internal(format!("创建推送 HTTP 客户端失败: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }
}

#[async_trait]
impl PushChannel for HttpPushChannel {
    async fn send(
        &self,
        recipient_id: &str,
        event_type: &str,
        payload: &PushPayload,
    ) -> Result<()> {
        let body = PushRequest {
            recipient_id,
            event_type,
            notification: payload,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FanoutError::Shared(PlatformError::ExternalServiceTimeout {
                    service: "push-gateway".to_string(),
                })
            } else {
                FanoutError::PushTransport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FanoutError::PushRejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(recipient_id = %recipient_id, status = status.as_u16(), "推送网关已接收");
        Ok(())
    }
}

/// 模拟推送渠道
///
/// 未配置推送网关时使用，只记录日志并视为成功。
pub struct LoggingPushChannel;

#[async_trait]
impl PushChannel for LoggingPushChannel {
    async fn send(
        &self,
        recipient_id: &str,
        event_type: &str,
        payload: &PushPayload,
    ) -> Result<()> {
        let message_id = Uuid::now_v7().to_string();

        info!(
            channel = "PUSH",
            recipient_id = %recipient_id,
            event_type = %event_type,
            message_id = %message_id,
            title = %payload.title,
            "模拟发送推送通知"
        );

        Ok(())
    }
}

/// 根据配置选择推送渠道
pub fn push_channel_from_config(config: &PushConfig) -> Result<Arc<dyn PushChannel>> {
    match &config.endpoint {
        Some(endpoint) => {
            info!(endpoint = %endpoint, "使用 HTTP 推送网关");
            Ok(Arc::new(HttpPushChannel::new(
                endpoint.clone(),
                config.api_key.clone(),
                Duration::from_millis(config.timeout_ms),
            )?))
        }
        None => {
            info!("未配置推送网关，使用模拟推送");
            Ok(Arc::new(LoggingPushChannel))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::HeaderMap, http::StatusCode, routing::post};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    fn make_payload() -> PushPayload {
        PushPayload {
            title: "夜宵上线".to_string(),
            body: "22 点后下单免配送费".to_string(),
            image: "https://cdn.example.com/night.png".to_string(),
        }
    }

    /// 启动本地推送网关，返回地址和收到的请求
    async fn spawn_gateway(
        status: StatusCode,
    ) -> (String, mpsc::UnboundedReceiver<(Option<String>, serde_json::Value)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = Router::new().route(
            "/push",
            post(move |headers: HeaderMap, Json(body): Json<serde_json::Value>| {
                let tx = tx.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(String::from);
                    let _ = tx.send((auth, body));
                    (status, "gateway says hi")
                }
            }),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/push", addr), rx)
    }

    #[tokio::test]
    async fn test_http_push_success() {
        let (endpoint, mut rx) = spawn_gateway(StatusCode::OK).await;
        let channel = HttpPushChannel::new(
            endpoint,
            Some("secret-key".to_string()),
            Duration::from_secs(2),
        )
        .unwrap();

        channel
            .send("c1", "notification", &make_payload())
            .await
            .expect("推送应成功");

        let (auth, body) = rx.recv().await.expect("网关应收到请求");
        assert_eq!(auth.as_deref(), Some("Bearer secret-key"));
        assert_eq!(body["recipientId"], "c1");
        assert_eq!(body["eventType"], "notification");
        assert_eq!(body["notification"]["body"], "22 点后下单免配送费");
    }

    #[tokio::test]
    async fn test_http_push_rejected() {
        let (endpoint, _rx) = spawn_gateway(StatusCode::SERVICE_UNAVAILABLE).await;
        let channel = HttpPushChannel::new(endpoint, None, Duration::from_secs(2)).unwrap();

        let err = channel
            .send("c1", "notification", &make_payload())
            .await
            .expect_err("非 2xx 应失败");

        match err {
            FanoutError::PushRejected { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "gateway says hi");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_logging_push_always_succeeds() {
        let result = LoggingPushChannel
            .send("m1", "notification", &make_payload())
            .await;
        assert!(result.is_ok());
    }

    #[test]
    fn test_push_channel_from_config() {
        assert!(push_channel_from_config(&PushConfig::default()).is_ok());

        let config = PushConfig {
            endpoint: Some("http://127.0.0.1:1/push".to_string()),
            ..Default::default()
        };
        assert!(push_channel_from_config(&config).is_ok());
    }
}
