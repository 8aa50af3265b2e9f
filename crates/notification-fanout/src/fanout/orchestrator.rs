//! 发送编排
//!
//! `trigger_send` 只做同步的存在性校验，随后把解析与投递交给后台任务并立即返回。
//! 调用方拿到的 `FanoutHandle` 可以观察后台任务的状态，也可以直接丢弃。
//! 后台任务由一个监督任务等待，任务 panic 时同样会写入运行期错误日志并进入 Failed。

use std::sync::Arc;
use std::time::Instant;

use delivery_shared::observability::metrics;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, instrument, warn};

use super::{AudienceResolver, FanoutDispatcher};
use crate::error::Result;
use crate::models::{DispatchSummary, NotificationDefinition, RecipientFailure};
use crate::repository::{NotificationRepository, OperationalErrorLog};

/// 单次发送的生命周期状态
///
/// Idle → Validating → Acknowledged → Resolving → Dispatching → Completed | Failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum FanoutState {
    Idle,
    Validating,
    Acknowledged,
    Resolving,
    Dispatching,
    Completed(DispatchSummary),
    Failed(String),
}

impl FanoutState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_))
    }
}

/// 触发结果
#[derive(Debug)]
pub enum TriggerOutcome {
    /// 已受理，后台任务已启动
    Accepted(FanoutHandle),
    /// 通知不存在，未产生任何副作用
    NotFound,
}

impl TriggerOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// 后台扇出任务的句柄
#[derive(Debug)]
pub struct FanoutHandle {
    notification_id: i64,
    state: watch::Receiver<FanoutState>,
    task: JoinHandle<()>,
}

impl FanoutHandle {
    pub fn notification_id(&self) -> i64 {
        self.notification_id
    }

    /// 当前状态快照
    pub fn state(&self) -> FanoutState {
        self.state.borrow().clone()
    }

    /// 等待后台任务结束，返回终态
    pub async fn wait(self) -> FanoutState {
        if let Err(e) = self.task.await {
            error!(notification_id = self.notification_id, error = %e, "扇出任务异常退出");
            return FanoutState::Failed(format!("扇出任务异常退出: {e}"));
        }
        self.state.borrow().clone()
    }
}

pub struct FanoutOrchestrator {
    repository: Arc<dyn NotificationRepository>,
    resolver: Arc<AudienceResolver>,
    dispatcher: Arc<FanoutDispatcher>,
    error_log: Arc<dyn OperationalErrorLog>,
}

impl FanoutOrchestrator {
    pub fn new(
        repository: Arc<dyn NotificationRepository>,
        resolver: Arc<AudienceResolver>,
        dispatcher: Arc<FanoutDispatcher>,
        error_log: Arc<dyn OperationalErrorLog>,
    ) -> Self {
        Self {
            repository,
            resolver,
            dispatcher,
            error_log,
        }
    }

    /// 触发一次发送
    ///
    /// 通知不存在时返回 `NotFound`；存在时启动后台任务并立即返回 `Accepted`。
    /// 查询通知定义本身出错时返回 Err。
    ///
    /// 受理结果只由存在性校验决定，不等待后台任务的任何进度。
    /// 多线程运行时上后台任务可能在本函数返回之前就已开始解析，
    /// 因此调用方只能依赖“受理不晚于完成”，不能假设返回时尚无投递日志。
    #[instrument(skip(self))]
    pub async fn trigger_send(&self, notification_id: i64) -> Result<TriggerOutcome> {
        let (state_tx, state_rx) = watch::channel(FanoutState::Idle);
        state_tx.send_replace(FanoutState::Validating);

        let Some(definition) = self.repository.find_by_id(notification_id).await? else {
            info!("通知不存在，拒绝发送");
            metrics::record_fanout("not_found", 0.0);
            return Ok(TriggerOutcome::NotFound);
        };

        state_tx.send_replace(FanoutState::Acknowledged);
        info!(title = %definition.title, "发送请求已受理");

        let state_tx = Arc::new(state_tx);
        let run = FanoutRun {
            resolver: self.resolver.clone(),
            dispatcher: self.dispatcher.clone(),
            error_log: self.error_log.clone(),
            state: state_tx.clone(),
        };

        let span = info_span!("notification_fanout", notification_id);
        let started = Instant::now();
        let inner = tokio::spawn(run.execute(definition).instrument(span.clone()));
        let task = tokio::spawn(
            supervise(
                notification_id,
                inner,
                started,
                state_tx,
                self.error_log.clone(),
            )
            .instrument(span),
        );

        Ok(TriggerOutcome::Accepted(FanoutHandle {
            notification_id,
            state: state_rx,
            task,
        }))
    }
}

/// 等待后台扇出结束；任务 panic 或被取消时补记失败
async fn supervise(
    notification_id: i64,
    run: JoinHandle<()>,
    started: Instant,
    state: Arc<watch::Sender<FanoutState>>,
    error_log: Arc<dyn OperationalErrorLog>,
) {
    let Err(e) = run.await else {
        return;
    };

    metrics::record_fanout("failed", started.elapsed().as_secs_f64());
    error!(error = %e, "扇出任务异常退出");
    let message = format!("通知 {notification_id} 发送任务异常退出: {e}");
    error_log.record(&message).await;
    state.send_replace(FanoutState::Failed(message));
}

/// 单次后台扇出
struct FanoutRun {
    resolver: Arc<AudienceResolver>,
    dispatcher: Arc<FanoutDispatcher>,
    error_log: Arc<dyn OperationalErrorLog>,
    state: Arc<watch::Sender<FanoutState>>,
}

impl FanoutRun {
    async fn execute(self, definition: NotificationDefinition) {
        let started = Instant::now();

        match self.resolve_and_dispatch(&definition).await {
            Ok(summary) => {
                let outcome = if summary.failed == 0 {
                    "completed"
                } else {
                    "partial"
                };
                metrics::record_fanout(outcome, started.elapsed().as_secs_f64());
                info!(
                    recipients = summary.recipients,
                    delivered = summary.delivered,
                    failed = summary.failed,
                    "通知发送完成"
                );
                self.transition(FanoutState::Completed(summary));
            }
            Err(e) => {
                self.record_failures(definition.id, e.isolated_failures()).await;
                metrics::record_fanout("failed", started.elapsed().as_secs_f64());
                self.error_log
                    .record(&format!("通知 {} 发送失败: {}", definition.id, e))
                    .await;
                self.transition(FanoutState::Failed(e.to_string()));
            }
        }
    }

    async fn resolve_and_dispatch(
        &self,
        definition: &NotificationDefinition,
    ) -> Result<DispatchSummary> {
        self.transition(FanoutState::Resolving);
        let recipients = self.resolver.resolve(definition).await?;

        self.transition(FanoutState::Dispatching);
        let report = self.dispatcher.dispatch(definition, &recipients).await?;

        self.record_failures(definition.id, &report.failures).await;

        Ok(report.summary())
    }

    async fn record_failures(&self, notification_id: i64, failures: &[RecipientFailure]) {
        for failure in failures {
            warn!(%failure, "收件人投递失败已隔离");
            self.error_log
                .record(&format!("通知 {notification_id} 投递失败: {failure}"))
                .await;
        }
    }

    fn transition(&self, next: FanoutState) {
        debug!(state = ?next, "扇出状态变更");
        self.state.send_replace(next);
    }
}
