//! 扇出引擎数据模型
//!
//! 通知定义由仓储持有，扇出过程中只读；收件人列表和投递报告只在单次发送内存活。

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 收件人类别
///
/// 决定使用哪个收件人目录以及写入哪张投递日志表。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientCategory {
    Customer,
    Merchant,
    Driver,
}

impl RecipientCategory {
    /// 固定的解析顺序：顾客 → 商户 → 骑手
    pub const ALL: [RecipientCategory; 3] = [Self::Customer, Self::Merchant, Self::Driver];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Merchant => "merchant",
            Self::Driver => "driver",
        }
    }
}

impl fmt::Display for RecipientCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecipientCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "merchant" => Ok(Self::Merchant),
            "driver" => Ok(Self::Driver),
            other => Err(format!("未知的收件人类别: {other}")),
        }
    }
}

/// 通知定义
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct NotificationDefinition {
    pub id: i64,
    pub title: String,
    pub description: String,
    /// 已上传图片资源的地址
    pub image_url: String,
    pub geofence_ids: Vec<String>,
    pub targets_merchant: bool,
    pub targets_driver: bool,
    pub targets_customer: bool,
    pub created_at: DateTime<Utc>,
}

impl NotificationDefinition {
    /// 是否面向指定类别发送
    pub fn targets(&self, category: RecipientCategory) -> bool {
        match category {
            RecipientCategory::Customer => self.targets_customer,
            RecipientCategory::Merchant => self.targets_merchant,
            RecipientCategory::Driver => self.targets_driver,
        }
    }

    pub fn has_any_target(&self) -> bool {
        RecipientCategory::ALL.iter().any(|c| self.targets(*c))
    }
}

/// 新建通知定义所需的字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNotification {
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub geofence_ids: Vec<String>,
    pub targets_merchant: bool,
    pub targets_driver: bool,
    pub targets_customer: bool,
}

/// 收件人目录中的一条成员记录
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct DirectoryMember {
    pub id: String,
}

impl DirectoryMember {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// 解析后的收件人
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRecipient {
    pub recipient_id: String,
    pub category: RecipientCategory,
}

impl ResolvedRecipient {
    pub fn new(recipient_id: impl Into<String>, category: RecipientCategory) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            category,
        }
    }
}

/// 投递日志记录
///
/// 保存发送时刻通知内容的快照。管理员汇总日志没有 recipient_id。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryLogEntry {
    pub notification_id: i64,
    pub recipient_id: Option<String>,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

impl DeliveryLogEntry {
    pub fn for_recipient(
        definition: &NotificationDefinition,
        recipient_id: &str,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            recipient_id: Some(recipient_id.to_string()),
            ..Self::admin_summary(definition, created_at)
        }
    }

    pub fn admin_summary(definition: &NotificationDefinition, created_at: DateTime<Utc>) -> Self {
        Self {
            notification_id: definition.id,
            recipient_id: None,
            title: definition.title.clone(),
            description: definition.description.clone(),
            image_url: definition.image_url.clone(),
            created_at,
        }
    }
}

/// 投递日志流：三类收件人各一张表，外加管理员汇总表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogStream {
    Category(RecipientCategory),
    AdminSummary,
}

impl FromStr for LogStream {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::AdminSummary),
            other => other.parse().map(Self::Category),
        }
    }
}

/// 推送服务负载
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub image: String,
}

impl From<&NotificationDefinition> for PushPayload {
    fn from(definition: &NotificationDefinition) -> Self {
        Self {
            title: definition.title.clone(),
            body: definition.description.clone(),
            image: definition.image_url.clone(),
        }
    }
}

/// 实时消息负载
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimePayload {
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

impl From<&DeliveryLogEntry> for RealtimePayload {
    fn from(entry: &DeliveryLogEntry) -> Self {
        Self {
            title: entry.title.clone(),
            description: entry.description.clone(),
            image_url: entry.image_url.clone(),
            created_at: entry.created_at,
        }
    }
}

/// 单个收件人投递中失败的步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStep {
    LogWrite,
    Push,
}

impl fmt::Display for DispatchStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LogWrite => f.write_str("log_write"),
            Self::Push => f.write_str("push"),
        }
    }
}

/// 单个收件人的投递失败
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientFailure {
    pub recipient_id: String,
    pub category: RecipientCategory,
    pub step: DispatchStep,
    pub reason: String,
}

impl fmt::Display for RecipientFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "收件人={} 类别={} 步骤={} 原因={}",
            self.recipient_id, self.category, self.step, self.reason
        )
    }
}

/// 一次投递循环的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub recipients: usize,
    pub delivered: usize,
    pub failures: Vec<RecipientFailure>,
}

impl DispatchReport {
    pub fn new(recipients: usize) -> Self {
        Self {
            recipients,
            ..Default::default()
        }
    }

    pub fn summary(&self) -> DispatchSummary {
        DispatchSummary {
            recipients: self.recipients,
            delivered: self.delivered,
            failed: self.failures.len(),
        }
    }
}

/// 投递结果计数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub recipients: usize,
    pub delivered: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_definition() -> NotificationDefinition {
        NotificationDefinition {
            id: 7,
            title: "午餐满减".to_string(),
            description: "今日午餐满 30 减 5".to_string(),
            image_url: "https://cdn.example.com/banners/lunch.png".to_string(),
            geofence_ids: vec!["G1".to_string()],
            targets_merchant: false,
            targets_driver: true,
            targets_customer: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_targets_by_category() {
        let definition = make_definition();
        assert!(definition.targets(RecipientCategory::Customer));
        assert!(!definition.targets(RecipientCategory::Merchant));
        assert!(definition.targets(RecipientCategory::Driver));
        assert!(definition.has_any_target());
    }

    #[test]
    fn test_no_target() {
        let definition = NotificationDefinition {
            targets_customer: false,
            targets_driver: false,
            ..make_definition()
        };
        assert!(!definition.has_any_target());
    }

    #[test]
    fn test_category_order_and_codes() {
        let codes: Vec<_> = RecipientCategory::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(codes, vec!["customer", "merchant", "driver"]);
        assert_eq!("driver".parse(), Ok(RecipientCategory::Driver));
        assert!("agent".parse::<RecipientCategory>().is_err());
    }

    #[test]
    fn test_log_stream_parse() {
        assert_eq!("admin".parse(), Ok(LogStream::AdminSummary));
        assert_eq!(
            "merchant".parse(),
            Ok(LogStream::Category(RecipientCategory::Merchant))
        );
        assert!("everyone".parse::<LogStream>().is_err());
    }

    #[test]
    fn test_log_entries_snapshot_definition() {
        let definition = make_definition();
        let now = Utc::now();

        let entry = DeliveryLogEntry::for_recipient(&definition, "c1", now);
        assert_eq!(entry.recipient_id.as_deref(), Some("c1"));
        assert_eq!(entry.notification_id, 7);
        assert_eq!(entry.title, "午餐满减");
        assert_eq!(entry.created_at, now);

        let summary = DeliveryLogEntry::admin_summary(&definition, now);
        assert!(summary.recipient_id.is_none());
        assert_eq!(summary.image_url, definition.image_url);
    }

    #[test]
    fn test_payload_shapes() {
        let definition = make_definition();
        let push = PushPayload::from(&definition);
        let json = serde_json::to_value(&push).unwrap();
        assert_eq!(json["body"], "今日午餐满 30 减 5");
        assert_eq!(json["image"], "https://cdn.example.com/banners/lunch.png");

        let entry = DeliveryLogEntry::for_recipient(&definition, "c1", Utc::now());
        let realtime = RealtimePayload::from(&entry);
        let json = serde_json::to_value(&realtime).unwrap();
        assert!(json.get("imageUrl").is_some());
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_report_summary() {
        let mut report = DispatchReport::new(3);
        report.delivered = 2;
        report.failures.push(RecipientFailure {
            recipient_id: "m1".to_string(),
            category: RecipientCategory::Merchant,
            step: DispatchStep::Push,
            reason: "网关超时".to_string(),
        });

        assert_eq!(
            report.summary(),
            DispatchSummary {
                recipients: 3,
                delivered: 2,
                failed: 1
            }
        );
        assert_eq!(
            report.failures[0].to_string(),
            "收件人=m1 类别=merchant 步骤=push 原因=网关超时"
        );
    }
}
