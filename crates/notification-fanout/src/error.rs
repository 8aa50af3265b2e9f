//! 扇出引擎错误类型
//!
//! 区分受理前的同步错误（通知不存在）与后台阶段的解析、投递错误，
//! 后者只会写入运行期错误日志，不会回到调用方。

use delivery_shared::error::PlatformError;
use thiserror::Error;

use crate::models::{DispatchStep, RecipientCategory, RecipientFailure};

#[derive(Debug, Error)]
pub enum FanoutError {
    #[error("通知不存在: {0}")]
    NotificationNotFound(i64),

    #[error("收件人解析失败: 类别={category}, 原因={reason}")]
    ResolutionFailed {
        category: RecipientCategory,
        reason: String,
    },

    #[error("通知投递失败: 收件人={recipient_id}, 步骤={step}, 原因={reason}")]
    DispatchFailed {
        recipient_id: String,
        step: DispatchStep,
        reason: String,
    },

    /// 汇总日志写入失败；`failures` 保留隔离策略下已发生的收件人失败
    #[error("管理员汇总日志写入失败: {reason}")]
    AdminSummaryFailed {
        failures: Vec<RecipientFailure>,
        reason: String,
    },

    #[error("推送服务拒绝请求: 状态码={status}, 响应={body}")]
    PushRejected { status: u16, body: String },

    #[error("推送请求失败: {0}")]
    PushTransport(String),

    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("内部错误: {0}")]
    Internal(String),

    #[error(transparent)]
    Shared(#[from] PlatformError),
}

pub type Result<T> = std::result::Result<T, FanoutError>;

impl From<RecipientFailure> for FanoutError {
    fn from(failure: RecipientFailure) -> Self {
        Self::DispatchFailed {
            recipient_id: failure.recipient_id,
            step: failure.step,
            reason: failure.reason,
        }
    }
}

impl FanoutError {
    /// 随错误一起返回、尚未记录的收件人失败
    pub fn isolated_failures(&self) -> &[RecipientFailure] {
        match self {
            Self::AdminSummaryFailed { failures, .. } => failures,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let not_found = FanoutError::NotificationNotFound(42);
        assert_eq!(not_found.to_string(), "通知不存在: 42");

        let resolution = FanoutError::ResolutionFailed {
            category: RecipientCategory::Merchant,
            reason: "连接被拒绝".to_string(),
        };
        assert_eq!(
            resolution.to_string(),
            "收件人解析失败: 类别=merchant, 原因=连接被拒绝"
        );

        let rejected = FanoutError::PushRejected {
            status: 503,
            body: "busy".to_string(),
        };
        assert_eq!(rejected.to_string(), "推送服务拒绝请求: 状态码=503, 响应=busy");
    }

    #[test]
    fn test_isolated_failures_of_failed_summary() {
        let err = FanoutError::AdminSummaryFailed {
            failures: vec![RecipientFailure {
                recipient_id: "c1".to_string(),
                category: RecipientCategory::Customer,
                step: DispatchStep::Push,
                reason: "503".to_string(),
            }],
            reason: "表不存在".to_string(),
        };
        assert_eq!(err.isolated_failures().len(), 1);
        assert_eq!(err.to_string(), "管理员汇总日志写入失败: 表不存在");

        assert!(FanoutError::Internal("x".to_string()).isolated_failures().is_empty());
    }

    #[test]
    fn test_from_recipient_failure() {
        let failure = RecipientFailure {
            recipient_id: "d9".to_string(),
            category: RecipientCategory::Driver,
            step: DispatchStep::LogWrite,
            reason: "磁盘已满".to_string(),
        };
        let err = FanoutError::from(failure);
        assert_eq!(
            err.to_string(),
            "通知投递失败: 收件人=d9, 步骤=log_write, 原因=磁盘已满"
        );
    }
}
