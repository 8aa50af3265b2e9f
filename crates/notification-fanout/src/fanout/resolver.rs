//! 收件人解析
//!
//! 按固定顺序（顾客 → 商户 → 骑手）查询各类目录，拼接成一个有序的收件人列表。

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::{FanoutError, Result};
use crate::models::{NotificationDefinition, RecipientCategory, ResolvedRecipient};
use crate::repository::AudienceDirectory;

/// 三类收件人目录
///
/// 类别到目录的映射在构造时即完整，不存在"某类别未注册目录"的情况。
#[derive(Clone)]
pub struct AudienceDirectories {
    customers: Arc<dyn AudienceDirectory>,
    merchants: Arc<dyn AudienceDirectory>,
    agents: Arc<dyn AudienceDirectory>,
}

impl AudienceDirectories {
    pub fn new(
        customers: Arc<dyn AudienceDirectory>,
        merchants: Arc<dyn AudienceDirectory>,
        agents: Arc<dyn AudienceDirectory>,
    ) -> Self {
        Self {
            customers,
            merchants,
            agents,
        }
    }

    pub fn for_category(&self, category: RecipientCategory) -> &Arc<dyn AudienceDirectory> {
        match category {
            RecipientCategory::Customer => &self.customers,
            RecipientCategory::Merchant => &self.merchants,
            RecipientCategory::Driver => &self.agents,
        }
    }
}

pub struct AudienceResolver {
    directories: AudienceDirectories,
}

impl AudienceResolver {
    pub fn new(directories: AudienceDirectories) -> Self {
        Self { directories }
    }

    /// 解析通知的全部收件人
    ///
    /// 不分页，一次取回全部匹配成员。某类别无匹配成员不是错误。
    #[instrument(skip(self, definition), fields(notification_id = definition.id))]
    pub async fn resolve(
        &self,
        definition: &NotificationDefinition,
    ) -> Result<Vec<ResolvedRecipient>> {
        let mut recipients = Vec::new();

        for category in RecipientCategory::ALL {
            if !definition.targets(category) {
                continue;
            }

            let members = self
                .directories
                .for_category(category)
                .members_by_geofence(&definition.geofence_ids)
                .await
                .map_err(|e| FanoutError::ResolutionFailed {
                    category,
                    reason: e.to_string(),
                })?;

            debug!(category = %category, count = members.len(), "目录查询完成");

            recipients.extend(
                members
                    .into_iter()
                    .map(|member| ResolvedRecipient::new(member.id, category)),
            );
        }

        Ok(recipients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DirectoryMember;
    use crate::repository::traits::MockAudienceDirectory;
    use chrono::Utc;

    fn make_definition(customer: bool, merchant: bool, driver: bool) -> NotificationDefinition {
        NotificationDefinition {
            id: 1,
            title: "周末特惠".to_string(),
            description: "全场八折".to_string(),
            image_url: "https://cdn.example.com/weekend.png".to_string(),
            geofence_ids: vec!["G1".to_string(), "G2".to_string()],
            targets_merchant: merchant,
            targets_driver: driver,
            targets_customer: customer,
            created_at: Utc::now(),
        }
    }

    fn directory_returning(ids: &'static [&'static str]) -> Arc<dyn AudienceDirectory> {
        let mut mock = MockAudienceDirectory::new();
        mock.expect_members_by_geofence()
            .withf(|geofences| geofences.iter().map(String::as_str).eq(["G1", "G2"]))
            .times(1)
            .returning(move |_| Ok(ids.iter().map(|id| DirectoryMember::new(*id)).collect()));
        Arc::new(mock)
    }

    fn directory_never_called() -> Arc<dyn AudienceDirectory> {
        let mut mock = MockAudienceDirectory::new();
        mock.expect_members_by_geofence().times(0);
        Arc::new(mock)
    }

    #[tokio::test]
    async fn test_resolve_orders_customer_merchant_driver() {
        let resolver = AudienceResolver::new(AudienceDirectories::new(
            directory_returning(&["c2", "c1"]),
            directory_returning(&["m1"]),
            directory_returning(&["d1"]),
        ));

        let recipients = resolver
            .resolve(&make_definition(true, true, true))
            .await
            .unwrap();

        assert_eq!(
            recipients,
            vec![
                ResolvedRecipient::new("c2", RecipientCategory::Customer),
                ResolvedRecipient::new("c1", RecipientCategory::Customer),
                ResolvedRecipient::new("m1", RecipientCategory::Merchant),
                ResolvedRecipient::new("d1", RecipientCategory::Driver),
            ]
        );
    }

    #[tokio::test]
    async fn test_resolve_skips_untargeted_categories() {
        let resolver = AudienceResolver::new(AudienceDirectories::new(
            directory_never_called(),
            directory_returning(&["m1", "m2"]),
            directory_never_called(),
        ));

        let recipients = resolver
            .resolve(&make_definition(false, true, false))
            .await
            .unwrap();

        assert_eq!(recipients.len(), 2);
        assert!(
            recipients
                .iter()
                .all(|r| r.category == RecipientCategory::Merchant)
        );
    }

    #[tokio::test]
    async fn test_resolve_no_targets_is_empty() {
        let resolver = AudienceResolver::new(AudienceDirectories::new(
            directory_never_called(),
            directory_never_called(),
            directory_never_called(),
        ));

        let recipients = resolver
            .resolve(&make_definition(false, false, false))
            .await
            .unwrap();

        assert!(recipients.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_empty_directory_is_not_error() {
        let resolver = AudienceResolver::new(AudienceDirectories::new(
            directory_returning(&[]),
            directory_never_called(),
            directory_returning(&["d1"]),
        ));

        let recipients = resolver
            .resolve(&make_definition(true, false, true))
            .await
            .unwrap();

        assert_eq!(
            recipients,
            vec![ResolvedRecipient::new("d1", RecipientCategory::Driver)]
        );
    }

    #[tokio::test]
    async fn test_resolve_directory_failure() {
        let mut failing = MockAudienceDirectory::new();
        failing
            .expect_members_by_geofence()
            .returning(|_| Err(FanoutError::Internal("连接被拒绝".to_string())));

        let resolver = AudienceResolver::new(AudienceDirectories::new(
            directory_returning(&["c1"]),
            Arc::new(failing),
            directory_never_called(),
        ));

        let err = resolver
            .resolve(&make_definition(true, true, true))
            .await
            .unwrap_err();

        match err {
            FanoutError::ResolutionFailed { category, reason } => {
                assert_eq!(category, RecipientCategory::Merchant);
                assert!(reason.contains("连接被拒绝"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
