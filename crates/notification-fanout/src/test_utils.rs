//! 测试工具模块
//!
//! 提供各存储接口与投递渠道的内存实现、测试数据生成器，以及一键组装的扇出测试夹具。
//! 所有内存实现可以共享同一个 `EventJournal`，用来断言跨组件的调用顺序。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use delivery_shared::config::{FailurePolicy, FanoutConfig};
use tokio::sync::RwLock;

use crate::channels::{PushChannel, RealtimeChannel};
use crate::error::{FanoutError, Result};
use crate::fanout::{AudienceDirectories, AudienceResolver, FanoutDispatcher, FanoutOrchestrator};
use crate::models::{
    DeliveryLogEntry, DirectoryMember, LogStream, NewNotification, NotificationDefinition,
    PushPayload, RealtimePayload, RecipientCategory,
};
use crate::repository::{
    AudienceDirectory, DeliveryLogStore, NotificationRepository, OperationalErrorLog,
};

// ==================== 事件日志 ====================

/// 跨组件的调用记录
///
/// 事件格式：`log:{category}:{recipient}`、`log:admin`、`push:{recipient}`、`realtime:{channel}`
#[derive(Debug, Clone, Default)]
pub struct EventJournal {
    events: Arc<RwLock<Vec<String>>>,
}

impl EventJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, event: impl Into<String>) {
        self.events.write().await.push(event.into());
    }

    pub async fn events(&self) -> Vec<String> {
        self.events.read().await.clone()
    }
}

async fn journal(journal: &Option<EventJournal>, event: String) {
    if let Some(journal) = journal {
        journal.push(event).await;
    }
}

// ==================== 测试数据生成器 ====================

pub struct TestDataGenerator;

impl TestDataGenerator {
    /// 只面向顾客、覆盖围栏 G1 的通知
    pub fn notification(id: i64) -> NotificationDefinition {
        NotificationDefinition {
            id,
            title: format!("测试通知 {id}"),
            description: "周末全场满 50 减 10".to_string(),
            image_url: format!("https://cdn.example.com/notifications/{id}.png"),
            geofence_ids: vec!["G1".to_string()],
            targets_merchant: false,
            targets_driver: false,
            targets_customer: true,
            created_at: Utc::now(),
        }
    }

    /// 三类收件人全部面向的通知
    pub fn broadcast_notification(id: i64) -> NotificationDefinition {
        NotificationDefinition {
            targets_merchant: true,
            targets_driver: true,
            targets_customer: true,
            ..Self::notification(id)
        }
    }

    pub fn new_notification(title: &str) -> NewNotification {
        NewNotification {
            title: title.to_string(),
            description: "新品上架".to_string(),
            image_url: "https://cdn.example.com/notifications/new.png".to_string(),
            geofence_ids: vec!["G1".to_string()],
            targets_merchant: true,
            targets_driver: false,
            targets_customer: true,
        }
    }
}

// ==================== 通知定义仓储 ====================

#[derive(Debug, Default)]
pub struct InMemoryNotificationRepository {
    notifications: RwLock<Vec<NotificationDefinition>>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_notifications(notifications: Vec<NotificationDefinition>) -> Self {
        Self {
            notifications: RwLock::new(notifications),
        }
    }

    pub async fn insert(&self, notification: NotificationDefinition) {
        self.notifications.write().await.push(notification);
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<NotificationDefinition>> {
        let notifications = self.notifications.read().await;
        Ok(notifications.iter().find(|n| n.id == id).cloned())
    }

    async fn create(&self, notification: &NewNotification) -> Result<NotificationDefinition> {
        let mut notifications = self.notifications.write().await;
        let id = notifications.iter().map(|n| n.id).max().unwrap_or(0) + 1;

        let created = NotificationDefinition {
            id,
            title: notification.title.clone(),
            description: notification.description.clone(),
            image_url: notification.image_url.clone(),
            geofence_ids: notification.geofence_ids.clone(),
            targets_merchant: notification.targets_merchant,
            targets_driver: notification.targets_driver,
            targets_customer: notification.targets_customer,
            created_at: Utc::now(),
        };
        notifications.push(created.clone());

        Ok(created)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<NotificationDefinition>> {
        let notifications = self.notifications.read().await;
        let mut sorted: Vec<_> = notifications.iter().cloned().collect();
        sorted.sort_by(|a, b| b.id.cmp(&a.id));

        Ok(sorted
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.notifications.read().await.len() as i64)
    }
}

// ==================== 收件人目录 ====================

/// 固定成员的收件人目录
///
/// 按插入顺序返回与查询围栏有交集的成员，可配置查询延迟或查询失败。
#[derive(Debug, Default)]
pub struct StaticDirectory {
    members: Vec<(String, Vec<String>)>,
    delay: Option<Duration>,
    failure: Option<String>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_member(mut self, id: &str, geofence_ids: &[&str]) -> Self {
        self.members.push((
            id.to_string(),
            geofence_ids.iter().map(|g| g.to_string()).collect(),
        ));
        self
    }

    /// 所有成员都位于同一个围栏
    pub fn with_members_in(mut self, geofence_id: &str, ids: &[&str]) -> Self {
        for id in ids {
            self = self.with_member(id, &[geofence_id]);
        }
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing(mut self, reason: &str) -> Self {
        self.failure = Some(reason.to_string());
        self
    }
}

#[async_trait]
impl AudienceDirectory for StaticDirectory {
    async fn members_by_geofence(&self, geofence_ids: &[String]) -> Result<Vec<DirectoryMember>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = &self.failure {
            return Err(FanoutError::Internal(reason.clone()));
        }

        Ok(self
            .members
            .iter()
            .filter(|(_, fences)| fences.iter().any(|f| geofence_ids.contains(f)))
            .map(|(id, _)| DirectoryMember::new(id.clone()))
            .collect())
    }
}

// ==================== 投递日志 ====================

#[derive(Debug, Default)]
pub struct InMemoryDeliveryLogStore {
    streams: RwLock<HashMap<LogStream, Vec<DeliveryLogEntry>>>,
    failing_recipients: HashSet<String>,
    fail_admin_summary: bool,
    journal: Option<EventJournal>,
}

impl InMemoryDeliveryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(mut self, journal: EventJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// 写入该收件人的日志时返回错误
    pub fn failing_for(mut self, recipient_id: &str) -> Self {
        self.failing_recipients.insert(recipient_id.to_string());
        self
    }

    pub fn failing_admin_summary(mut self) -> Self {
        self.fail_admin_summary = true;
        self
    }

    pub async fn entries(&self, stream: LogStream) -> Vec<DeliveryLogEntry> {
        self.streams
            .read()
            .await
            .get(&stream)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn recipients(&self, category: RecipientCategory) -> Vec<String> {
        self.entries(LogStream::Category(category))
            .await
            .into_iter()
            .filter_map(|e| e.recipient_id)
            .collect()
    }

    /// 所有日志流的记录总数（含管理员汇总）
    pub async fn total(&self) -> usize {
        self.streams.read().await.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl DeliveryLogStore for InMemoryDeliveryLogStore {
    async fn append(&self, category: RecipientCategory, entry: &DeliveryLogEntry) -> Result<()> {
        let recipient_id = entry.recipient_id.clone().unwrap_or_default();
        if self.failing_recipients.contains(&recipient_id) {
            return Err(FanoutError::Internal(format!("写入 {recipient_id} 日志失败")));
        }

        self.streams
            .write()
            .await
            .entry(LogStream::Category(category))
            .or_default()
            .push(entry.clone());
        journal(&self.journal, format!("log:{category}:{recipient_id}")).await;

        Ok(())
    }

    async fn append_admin_summary(&self, entry: &DeliveryLogEntry) -> Result<()> {
        if self.fail_admin_summary {
            return Err(FanoutError::Internal("写入管理员汇总日志失败".to_string()));
        }

        self.streams
            .write()
            .await
            .entry(LogStream::AdminSummary)
            .or_default()
            .push(entry.clone());
        journal(&self.journal, "log:admin".to_string()).await;

        Ok(())
    }

    async fn list(
        &self,
        stream: LogStream,
        notification_id: i64,
        limit: i64,
    ) -> Result<Vec<DeliveryLogEntry>> {
        Ok(self
            .entries(stream)
            .await
            .into_iter()
            .filter(|e| e.notification_id == notification_id)
            .take(limit.max(0) as usize)
            .collect())
    }
}

// ==================== 投递渠道 ====================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushRecord {
    pub recipient_id: String,
    pub event_type: String,
    pub payload: PushPayload,
}

/// 记录所有推送调用的推送渠道
#[derive(Debug, Default)]
pub struct RecordingPushChannel {
    sent: RwLock<Vec<PushRecord>>,
    failing_recipients: HashSet<String>,
    panicking_recipients: HashSet<String>,
    journal: Option<EventJournal>,
}

impl RecordingPushChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(mut self, journal: EventJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// 推送给该收件人时返回错误（调用仍会被记录）
    pub fn failing_for(mut self, recipient_id: &str) -> Self {
        self.failing_recipients.insert(recipient_id.to_string());
        self
    }

    /// 推送给该收件人时直接 panic，用于模拟后台任务崩溃
    pub fn panicking_for(mut self, recipient_id: &str) -> Self {
        self.panicking_recipients.insert(recipient_id.to_string());
        self
    }

    pub async fn sent(&self) -> Vec<PushRecord> {
        self.sent.read().await.clone()
    }

    pub async fn sent_to(&self, recipient_id: &str) -> usize {
        self.sent
            .read()
            .await
            .iter()
            .filter(|r| r.recipient_id == recipient_id)
            .count()
    }
}

#[async_trait]
impl PushChannel for RecordingPushChannel {
    async fn send(
        &self,
        recipient_id: &str,
        event_type: &str,
        payload: &PushPayload,
    ) -> Result<()> {
        self.sent.write().await.push(PushRecord {
            recipient_id: recipient_id.to_string(),
            event_type: event_type.to_string(),
            payload: payload.clone(),
        });
        journal(&self.journal, format!("push:{recipient_id}")).await;

        if self.panicking_recipients.contains(recipient_id) {
            panic!("推送客户端崩溃: {recipient_id}");
        }
        if self.failing_recipients.contains(recipient_id) {
            return Err(FanoutError::PushRejected {
                status: 503,
                body: "推送网关不可用".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeRecord {
    pub channel: String,
    pub event_name: String,
    pub payload: RealtimePayload,
}

/// 记录所有实时广播的实时渠道
#[derive(Debug, Default)]
pub struct RecordingRealtimeChannel {
    broadcasts: RwLock<Vec<RealtimeRecord>>,
    journal: Option<EventJournal>,
}

impl RecordingRealtimeChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(mut self, journal: EventJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub async fn broadcasts(&self) -> Vec<RealtimeRecord> {
        self.broadcasts.read().await.clone()
    }

    pub async fn broadcasts_to(&self, channel: &str) -> usize {
        self.broadcasts
            .read()
            .await
            .iter()
            .filter(|r| r.channel == channel)
            .count()
    }
}

#[async_trait]
impl RealtimeChannel for RecordingRealtimeChannel {
    async fn broadcast(&self, recipient_id: &str, event_name: &str, payload: &RealtimePayload) {
        self.broadcasts.write().await.push(RealtimeRecord {
            channel: recipient_id.to_string(),
            event_name: event_name.to_string(),
            payload: payload.clone(),
        });
        journal(&self.journal, format!("realtime:{recipient_id}")).await;
    }
}

// ==================== 运行期错误日志 ====================

#[derive(Debug, Default)]
pub struct RecordingErrorLog {
    messages: RwLock<Vec<String>>,
}

impl RecordingErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn messages(&self) -> Vec<String> {
        self.messages.read().await.clone()
    }
}

#[async_trait]
impl OperationalErrorLog for RecordingErrorLog {
    async fn record(&self, message: &str) {
        self.messages.write().await.push(message.to_string());
    }
}

// ==================== 测试夹具 ====================

/// 扇出测试夹具
///
/// 先用 `with_*` 配置各组件，再调用 `build` 得到共享同一事件日志的完整编排器。
pub struct FanoutFixture {
    notifications: Vec<NotificationDefinition>,
    customers: StaticDirectory,
    merchants: StaticDirectory,
    agents: StaticDirectory,
    log_store: InMemoryDeliveryLogStore,
    push: RecordingPushChannel,
    config: FanoutConfig,
}

impl FanoutFixture {
    pub fn new() -> Self {
        Self {
            notifications: Vec::new(),
            customers: StaticDirectory::new(),
            merchants: StaticDirectory::new(),
            agents: StaticDirectory::new(),
            log_store: InMemoryDeliveryLogStore::new(),
            push: RecordingPushChannel::new(),
            config: FanoutConfig::default(),
        }
    }

    pub fn with_notification(mut self, notification: NotificationDefinition) -> Self {
        self.notifications.push(notification);
        self
    }

    pub fn with_customers(mut self, directory: StaticDirectory) -> Self {
        self.customers = directory;
        self
    }

    pub fn with_merchants(mut self, directory: StaticDirectory) -> Self {
        self.merchants = directory;
        self
    }

    pub fn with_agents(mut self, directory: StaticDirectory) -> Self {
        self.agents = directory;
        self
    }

    pub fn with_log_store(mut self, log_store: InMemoryDeliveryLogStore) -> Self {
        self.log_store = log_store;
        self
    }

    pub fn with_push(mut self, push: RecordingPushChannel) -> Self {
        self.push = push;
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    pub fn with_admin_channel(mut self, admin_channel_id: &str) -> Self {
        self.config.admin_channel_id = admin_channel_id.to_string();
        self
    }

    pub fn build(self) -> FanoutHarness {
        let journal = EventJournal::new();

        let repository = Arc::new(InMemoryNotificationRepository::with_notifications(
            self.notifications,
        ));
        let log_store = Arc::new(self.log_store.with_journal(journal.clone()));
        let push = Arc::new(self.push.with_journal(journal.clone()));
        let realtime = Arc::new(RecordingRealtimeChannel::new().with_journal(journal.clone()));
        let error_log = Arc::new(RecordingErrorLog::new());

        let directories = AudienceDirectories::new(
            Arc::new(self.customers),
            Arc::new(self.merchants),
            Arc::new(self.agents),
        );
        let dispatcher = FanoutDispatcher::new(
            log_store.clone(),
            push.clone(),
            realtime.clone(),
            &self.config,
        );
        let orchestrator = FanoutOrchestrator::new(
            repository.clone(),
            Arc::new(AudienceResolver::new(directories)),
            Arc::new(dispatcher),
            error_log.clone(),
        );

        FanoutHarness {
            orchestrator: Arc::new(orchestrator),
            repository,
            log_store,
            push,
            realtime,
            error_log,
            journal,
        }
    }
}

impl Default for FanoutFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// 组装完成的扇出编排器及其全部内存依赖
pub struct FanoutHarness {
    pub orchestrator: Arc<FanoutOrchestrator>,
    pub repository: Arc<InMemoryNotificationRepository>,
    pub log_store: Arc<InMemoryDeliveryLogStore>,
    pub push: Arc<RecordingPushChannel>,
    pub realtime: Arc<RecordingRealtimeChannel>,
    pub error_log: Arc<RecordingErrorLog>,
    pub journal: EventJournal,
}
