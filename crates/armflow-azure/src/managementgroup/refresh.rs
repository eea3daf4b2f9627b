//! Convergence probes for management groups

use super::CACHE_CONTROL;
use crate::api::{GetGroupOptions, ManagementGroupsApi};
use armflow_cloud::{
    CloudError, ManagementGroupSubscriptionAssociationId, RefreshState, Refreshed, StateRefresh,
};
use async_trait::async_trait;

/// Probes a freshly created group until it becomes readable.
///
/// A 403 is how the service answers while the group is still propagating,
/// so it counts as `pending`. Any other error fails the wait.
pub struct ManagementGroupCreateRefresh<'a> {
    api: &'a dyn ManagementGroupsApi,
    name: String,
}

impl<'a> ManagementGroupCreateRefresh<'a> {
    pub fn new(api: &'a dyn ManagementGroupsApi, name: impl Into<String>) -> Self {
        Self {
            api,
            name: name.into(),
        }
    }
}

#[async_trait]
impl StateRefresh for ManagementGroupCreateRefresh<'_> {
    fn describe(&self) -> String {
        format!("creation of Management Group {:?}", self.name)
    }

    async fn refresh(&self) -> armflow_cloud::Result<Refreshed> {
        match self
            .api
            .get(&self.name, GetGroupOptions::recursive(CACHE_CONTROL))
            .await
        {
            Ok(_) => Ok(Refreshed::state(RefreshState::Succeeded)),
            Err(e) if e.was_forbidden() => Ok(Refreshed::state(RefreshState::Pending)),
            Err(e) => Ok(Refreshed::failed(e.into())),
        }
    }
}

/// Reports whether a subscription is currently a direct child of a group.
///
/// Every fetch error is fatal, 403 included.
pub struct SubscriptionAssociationRefresh<'a> {
    api: &'a dyn ManagementGroupsApi,
    id: ManagementGroupSubscriptionAssociationId,
}

impl<'a> SubscriptionAssociationRefresh<'a> {
    pub fn new(
        api: &'a dyn ManagementGroupsApi,
        id: ManagementGroupSubscriptionAssociationId,
    ) -> Self {
        Self { api, id }
    }
}

#[async_trait]
impl StateRefresh for SubscriptionAssociationRefresh<'_> {
    fn describe(&self) -> String {
        self.id.to_string()
    }

    async fn refresh(&self) -> armflow_cloud::Result<Refreshed> {
        let group = self
            .api
            .get(&self.id.management_group, GetGroupOptions::direct())
            .await
            .map_err(|e| {
                CloudError::from(e.context(format!(
                    "reading Management Group {:?} for Subscription Associations",
                    self.id.management_group
                )))
            })?;

        let found = group.child_entries().is_some_and(|children| {
            children
                .iter()
                .any(|child| child.is_subscription_named(&self.id.subscription_id))
        });

        Ok(Refreshed::state(if found {
            RefreshState::Exists
        } else {
            RefreshState::NotFound
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AzureError;
    use crate::testing::{FakeGroups, group, group_child, subscription_child};

    #[tokio::test]
    async fn test_create_probe_forbidden_is_pending() {
        let api = FakeGroups::default();
        api.fail_next_get(AzureError::Forbidden("mg1".to_string()));
        let probe = ManagementGroupCreateRefresh::new(&api, "mg1");

        let observed = probe.refresh().await.unwrap();
        assert_eq!(observed.state, RefreshState::Pending);
        assert!(observed.error.is_none());
        assert_eq!(
            api.calls(),
            vec!["get mg1 recurse=true cache=\"no-cache\"".to_string()]
        );
    }

    #[tokio::test]
    async fn test_create_probe_other_error_fails() {
        let api = FakeGroups::default();
        api.fail_next_get(AzureError::Status {
            context: "mg1".to_string(),
            status: 500,
            body: "boom".to_string(),
        });
        let probe = ManagementGroupCreateRefresh::new(&api, "mg1");

        let observed = probe.refresh().await.unwrap();
        assert_eq!(observed.state, RefreshState::Failed);
        assert!(matches!(observed.error, Some(CloudError::Api(_))));

        // plain 404 is not special-cased either
        let observed = probe.refresh().await.unwrap();
        assert_eq!(observed.state, RefreshState::Failed);
    }

    #[tokio::test]
    async fn test_create_probe_success() {
        let api = FakeGroups::with_group(group("mg1", vec![]));
        let observed = ManagementGroupCreateRefresh::new(&api, "mg1")
            .refresh()
            .await
            .unwrap();
        assert_eq!(observed.state, RefreshState::Succeeded);
    }

    fn association(sub: &str) -> ManagementGroupSubscriptionAssociationId {
        ManagementGroupSubscriptionAssociationId::new("mg1", sub)
    }

    #[tokio::test]
    async fn test_association_probe_exists() {
        let api = FakeGroups::with_group(group("mg1", vec![subscription_child("sub-a")]));
        let observed = SubscriptionAssociationRefresh::new(&api, association("sub-a"))
            .refresh()
            .await
            .unwrap();
        assert_eq!(observed.state, RefreshState::Exists);
        assert_eq!(
            api.calls(),
            vec!["get mg1 recurse=false cache=\"\"".to_string()]
        );
    }

    #[tokio::test]
    async fn test_association_probe_ignores_groups_and_case() {
        let api = FakeGroups::with_group(group(
            "mg1",
            vec![group_child("sub-a"), subscription_child("SUB-A")],
        ));
        let observed = SubscriptionAssociationRefresh::new(&api, association("sub-a"))
            .refresh()
            .await
            .unwrap();
        assert_eq!(observed.state, RefreshState::NotFound);
    }

    #[tokio::test]
    async fn test_association_probe_forbidden_is_fatal() {
        let api = FakeGroups::default();
        api.fail_next_get(AzureError::Forbidden("mg1".to_string()));
        let err = SubscriptionAssociationRefresh::new(&api, association("sub-a"))
            .refresh()
            .await
            .unwrap_err();
        assert!(
            matches!(err, CloudError::Forbidden(msg) if msg.contains("Subscription Associations"))
        );
    }
}
