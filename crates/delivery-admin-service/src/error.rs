//! 管理后台错误类型定义

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use delivery_shared::error::PlatformError;
use notification_fanout::FanoutError;
use serde_json::json;

/// 管理后台错误类型
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    // 验证错误
    #[error("参数验证失败: {0}")]
    Validation(String),

    // 资源不存在
    #[error("通知不存在: {0}")]
    NotificationNotFound(i64),

    // 系统错误
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("内部错误: {0}")]
    Internal(String),
}

impl AdminError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotificationNotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotificationNotFound(_) => "NOTIFICATION_NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = match &self {
            Self::Database(e) => {
                tracing::error!(error = %e, "数据库操作失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for AdminError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// 从扇出引擎错误转换
impl From<FanoutError> for AdminError {
    fn from(err: FanoutError) -> Self {
        match err {
            FanoutError::NotificationNotFound(id) => Self::NotificationNotFound(id),
            FanoutError::Database(e) | FanoutError::Shared(PlatformError::Database(e)) => {
                Self::Database(e)
            }
            FanoutError::Shared(PlatformError::Validation(msg)) => Self::Validation(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, AdminError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AdminError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AdminError::NotificationNotFound(1).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AdminError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_into_response_body_structure() {
        let response = AdminError::NotificationNotFound(42).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("读取响应体失败");
        let body: serde_json::Value =
            serde_json::from_slice(&body_bytes).expect("响应体不是合法 JSON");

        assert_eq!(body["success"], json!(false));
        assert_eq!(body["code"], json!("NOTIFICATION_NOT_FOUND"));
        assert_eq!(body["message"], json!("通知不存在: 42"));
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn test_system_errors_hide_internal_details() {
        let response = AdminError::Internal("redis://10.0.0.1:6379 refused".into()).into_response();

        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("读取响应体失败");
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

        let message = body["message"].as_str().unwrap_or_default();
        assert!(!message.contains("10.0.0.1"));
        assert_eq!(body["code"], json!("INTERNAL_ERROR"));
    }

    #[test]
    fn test_from_fanout_error() {
        assert!(matches!(
            AdminError::from(FanoutError::NotificationNotFound(9)),
            AdminError::NotificationNotFound(9)
        ));
        assert!(matches!(
            AdminError::from(FanoutError::Shared(PlatformError::Validation("空标题".into()))),
            AdminError::Validation(_)
        ));
        assert!(matches!(
            AdminError::from(FanoutError::Database(sqlx::Error::RowNotFound)),
            AdminError::Database(_)
        ));
        assert!(matches!(
            AdminError::from(FanoutError::PushTransport("reset".into())),
            AdminError::Internal(_)
        ));
    }
}
