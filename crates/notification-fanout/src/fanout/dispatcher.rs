//! 投递调度
//!
//! 按解析顺序逐个处理收件人：写类别日志 → 推送 → 实时广播（本人频道 + 管理后台频道），
//! 一个收件人完整处理完才开始下一个。循环结束后写一条管理员汇总日志。

use std::sync::Arc;

use chrono::Utc;
use delivery_shared::config::{FailurePolicy, FanoutConfig};
use delivery_shared::observability::metrics;
use tracing::{debug, info, instrument, warn};

use crate::channels::{PUSH_EVENT_TYPE, PushChannel, REALTIME_EVENT_NAME, RealtimeChannel};
use crate::error::{FanoutError, Result};
use crate::models::{
    DeliveryLogEntry, DispatchReport, DispatchStep, NotificationDefinition, PushPayload,
    RealtimePayload, RecipientFailure, ResolvedRecipient,
};
use crate::repository::DeliveryLogStore;

pub struct FanoutDispatcher {
    log_store: Arc<dyn DeliveryLogStore>,
    push: Arc<dyn PushChannel>,
    realtime: Arc<dyn RealtimeChannel>,
    admin_channel_id: String,
    policy: FailurePolicy,
}

impl FanoutDispatcher {
    pub fn new(
        log_store: Arc<dyn DeliveryLogStore>,
        push: Arc<dyn PushChannel>,
        realtime: Arc<dyn RealtimeChannel>,
        config: &FanoutConfig,
    ) -> Self {
        Self {
            log_store,
            push,
            realtime,
            admin_channel_id: config.admin_channel_id.clone(),
            policy: config.failure_policy,
        }
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// 向已解析的收件人投递通知
    ///
    /// - `IsolatePerRecipient`：失败的收件人记入报告，继续处理后续收件人，汇总日志照常写入
    /// - `AbortOnFirstFailure`：首个失败直接返回错误，后续收件人和汇总日志都不再处理
    ///
    /// 汇总日志写入失败在两种策略下都作为错误返回，已隔离的收件人失败随
    /// `FanoutError::AdminSummaryFailed` 一起带回。
    #[instrument(
        skip(self, definition, recipients),
        fields(notification_id = definition.id, recipients = recipients.len(), policy = ?self.policy)
    )]
    pub async fn dispatch(
        &self,
        definition: &NotificationDefinition,
        recipients: &[ResolvedRecipient],
    ) -> Result<DispatchReport> {
        let mut report = DispatchReport::new(recipients.len());
        let push_payload = PushPayload::from(definition);

        for (index, recipient) in recipients.iter().enumerate() {
            match self.deliver_one(definition, recipient, &push_payload).await {
                Ok(()) => {
                    report.delivered += 1;
                    metrics::record_delivery(recipient.category.as_str(), "delivered");
                }
                Err(failure) => {
                    metrics::record_delivery(recipient.category.as_str(), "failed");

                    match self.policy {
                        FailurePolicy::AbortOnFirstFailure => {
                            warn!(
                                recipient_id = %failure.recipient_id,
                                step = %failure.step,
                                reason = %failure.reason,
                                skipped = recipients.len() - index - 1,
                                "收件人投递失败，终止本次发送"
                            );
                            return Err(failure.into());
                        }
                        FailurePolicy::IsolatePerRecipient => {
                            warn!(
                                recipient_id = %failure.recipient_id,
                                step = %failure.step,
                                reason = %failure.reason,
                                "收件人投递失败，继续处理后续收件人"
                            );
                            report.failures.push(failure);
                        }
                    }
                }
            }
        }

        let summary = DeliveryLogEntry::admin_summary(definition, Utc::now());
        if let Err(e) = self.log_store.append_admin_summary(&summary).await {
            return Err(FanoutError::AdminSummaryFailed {
                failures: report.failures,
                reason: e.to_string(),
            });
        }

        info!(
            delivered = report.delivered,
            failed = report.failures.len(),
            "投递循环完成，已写入管理员汇总日志"
        );

        Ok(report)
    }

    /// 处理单个收件人，返回失败的步骤和原因
    async fn deliver_one(
        &self,
        definition: &NotificationDefinition,
        recipient: &ResolvedRecipient,
        push_payload: &PushPayload,
    ) -> std::result::Result<(), RecipientFailure> {
        let failure = |step: DispatchStep, reason: String| RecipientFailure {
            recipient_id: recipient.recipient_id.clone(),
            category: recipient.category,
            step,
            reason,
        };

        let entry = DeliveryLogEntry::for_recipient(definition, &recipient.recipient_id, Utc::now());
        self.log_store
            .append(recipient.category, &entry)
            .await
            .map_err(|e| failure(DispatchStep::LogWrite, e.to_string()))?;

        self.push
            .send(&recipient.recipient_id, PUSH_EVENT_TYPE, push_payload)
            .await
            .map_err(|e| failure(DispatchStep::Push, e.to_string()))?;

        let realtime_payload = RealtimePayload::from(&entry);
        self.realtime
            .broadcast(&recipient.recipient_id, REALTIME_EVENT_NAME, &realtime_payload)
            .await;
        self.realtime
            .broadcast(&self.admin_channel_id, REALTIME_EVENT_NAME, &realtime_payload)
            .await;

        debug!(
            recipient_id = %recipient.recipient_id,
            category = %recipient.category,
            "收件人投递完成"
        );

        Ok(())
    }
}
