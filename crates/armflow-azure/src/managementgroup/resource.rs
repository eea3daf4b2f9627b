//! `azurerm_management_group`

use super::refresh::ManagementGroupCreateRefresh;
use super::{CACHE_CONTROL, MANAGEMENT_GROUP_RESOURCE};
use crate::api::{GetGroupOptions, ManagementGroupsApi};
use crate::error::{AzureError, Result};
use crate::models::{
    CreateManagementGroupDetails, CreateManagementGroupProperties, CreateManagementGroupRequest,
    CreateParentGroupInfo,
};
use armflow_cloud::ids::{validate_management_group_name, validate_uuid};
use armflow_cloud::{
    ActionType, ApplyResult, ManagementGroupId, Plan, RefreshState, ResourceState,
    StateChangeConf, flatten_subscription_ids, plan_membership, subscriptions_to_remove,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

const CREATE_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Desired configuration of a management group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManagementGroupConfig {
    /// Generated when absent
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub parent_management_group_id: Option<String>,
    #[serde(default)]
    pub subscription_ids: BTreeSet<String>,
}

impl ManagementGroupConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validate_management_group_name(name)?;
        }
        if let Some(parent) = &self.parent_management_group_id {
            ManagementGroupId::parse(parent)?;
        }
        for id in &self.subscription_ids {
            validate_uuid(id)?;
        }
        Ok(())
    }

    fn request(&self) -> CreateManagementGroupRequest {
        CreateManagementGroupRequest {
            properties: CreateManagementGroupProperties {
                display_name: self.display_name.clone(),
                details: self
                    .parent_management_group_id
                    .clone()
                    .map(|id| CreateManagementGroupDetails {
                        parent: CreateParentGroupInfo { id },
                    }),
            },
        }
    }
}

pub fn expand_subscription_ids(config: &ManagementGroupConfig) -> Vec<String> {
    config.subscription_ids.iter().cloned().collect()
}

/// Refresh `state` from the remote group.
///
/// A group that is gone, or that the caller may no longer see, is dropped
/// from state rather than reported as an error.
pub async fn read(api: &dyn ManagementGroupsApi, state: &mut ResourceState) -> Result<()> {
    let id = ManagementGroupId::parse(&state.id)?;

    let group = match api
        .get(&id.name, GetGroupOptions::recursive(CACHE_CONTROL))
        .await
    {
        Ok(group) => group,
        Err(e) if e.was_not_found() || e.was_forbidden() => {
            tracing::info!(
                "Management Group {:?} doesn't exist - removing from state",
                state.id
            );
            state.clear_id();
            return Ok(());
        }
        Err(e) => {
            return Err(e.context(format!("unable to read Management Group {:?}", state.id)));
        }
    };

    state.set("name", &id.name)?;

    if let Some(props) = &group.properties {
        state.set("display_name", &props.display_name)?;

        let children = group.child_entries().unwrap_or_default();
        let subscription_ids = flatten_subscription_ids(&children)
            .map_err(|e| AzureError::from(e).context("unable to flatten `subscription_ids`"))?;
        state.set("subscription_ids", &subscription_ids)?;

        let parent_id = props
            .details
            .as_ref()
            .and_then(|d| d.parent.as_ref())
            .and_then(|p| p.id.clone())
            .unwrap_or_default();
        state.set("parent_management_group_id", parent_id)?;
    }

    state.touch();
    Ok(())
}

/// Make the group's subscriptions exactly `desired`: add every desired
/// subscription, then remove the ones no longer wanted.
pub async fn update_membership(
    api: &dyn ManagementGroupsApi,
    name: &str,
    desired: &BTreeSet<String>,
) -> Result<()> {
    let group = api
        .get(name, GetGroupOptions::recursive(CACHE_CONTROL))
        .await
        .map_err(|e| e.context(format!("unable to read Management Group {:?}", name)))?;
    let existing = group.child_entries().unwrap_or_default();
    let to_remove = subscriptions_to_remove(&existing, desired).map_err(|e| {
        AzureError::from(e).context("unable to determine which subscriptions should be removed")
    })?;

    for subscription_id in desired {
        tracing::debug!(
            "Adding Subscription {:?} to Management Group {:?}",
            subscription_id,
            name
        );
        api.add_subscription(name, subscription_id)
            .await
            .map_err(|e| {
                e.context(format!(
                    "adding Subscription {:?} to Management Group {:?}",
                    subscription_id, name
                ))
            })?;
    }

    for subscription_id in &to_remove {
        tracing::debug!(
            "Removing Subscription {:?} from Management Group {:?}",
            subscription_id,
            name
        );
        api.remove_subscription(name, subscription_id)
            .await
            .map_err(|e| {
                e.context(format!(
                    "removing Subscription {:?} from Management Group {:?}",
                    subscription_id, name
                ))
            })?;
    }

    Ok(())
}

/// Fetch the group and plan its membership changes without applying them
pub async fn plan(
    api: &dyn ManagementGroupsApi,
    name: &str,
    desired: &BTreeSet<String>,
) -> Result<Plan> {
    let group = api
        .get(name, GetGroupOptions::recursive(CACHE_CONTROL))
        .await
        .map_err(|e| e.context(format!("unable to read Management Group {:?}", name)))?;
    let existing = group.child_entries().unwrap_or_default();
    Ok(plan_membership(&ManagementGroupId::new(name), &existing, desired)?)
}

/// Execute the create and delete actions of a membership plan.
///
/// Failures are recorded per action; later actions still run.
pub async fn apply_plan(api: &dyn ManagementGroupsApi, plan: &Plan) -> ApplyResult {
    let started = std::time::Instant::now();
    let mut result = ApplyResult::new();

    for action in plan.changes() {
        let Some(group) = action.detail_str("management_group") else {
            result.add_failure(&action.id, "action has no management group");
            continue;
        };

        let outcome = match action.action_type {
            ActionType::Create => api.add_subscription(group, &action.resource_id).await,
            ActionType::Delete => api.remove_subscription(group, &action.resource_id).await,
            _ => continue,
        };

        match outcome {
            Ok(()) => {
                tracing::info!("{}", action.description);
                result.add_success(&action.id, action.description.clone());
            }
            Err(e) => {
                tracing::warn!("{} failed: {}", action.description, e);
                result.add_failure(&action.id, e.to_string());
            }
        }
    }

    result.duration_ms = started.elapsed().as_millis() as u64;
    result
}

/// Create the group, wait until it is readable, then attach subscriptions
pub async fn create(
    api: &dyn ManagementGroupsApi,
    config: &ManagementGroupConfig,
    timeout: Duration,
) -> Result<ResourceState> {
    config.validate()?;

    let name = config
        .name
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let id = ManagementGroupId::new(&name);

    match api
        .get(&name, GetGroupOptions::recursive(CACHE_CONTROL))
        .await
    {
        Ok(_) => {
            return Err(AzureError::InvalidConfig(format!(
                "{} already exists and needs to be imported",
                id.id()
            )));
        }
        Err(e) if e.was_not_found() || e.was_forbidden() => {}
        Err(e) => {
            return Err(e.context(format!("checking for presence of existing {}", id)));
        }
    }

    tracing::info!("Creating {}", id);
    api.create_or_update(&name, &config.request())
        .await
        .map_err(|e| e.context(format!("creating {}", id)))?;

    StateChangeConf::new(
        vec![RefreshState::Pending],
        vec![RefreshState::Succeeded],
        timeout,
    )
    .with_poll_interval(CREATE_POLL_INTERVAL)
    .wait_for_state(&ManagementGroupCreateRefresh::new(api, &name))
    .await?;

    update_membership(api, &name, &config.subscription_ids).await?;

    let mut state = ResourceState::new(MANAGEMENT_GROUP_RESOURCE, id.id());
    read(api, &mut state).await?;
    Ok(state)
}

/// Push display name and parent, then reconcile membership
pub async fn update(
    api: &dyn ManagementGroupsApi,
    state: &mut ResourceState,
    config: &ManagementGroupConfig,
) -> Result<()> {
    config.validate()?;
    let id = ManagementGroupId::parse(&state.id)?;

    api.create_or_update(&id.name, &config.request())
        .await
        .map_err(|e| e.context(format!("updating {}", id)))?;
    update_membership(api, &id.name, &config.subscription_ids).await?;

    read(api, state).await
}

/// Detach all subscriptions, then delete the group
pub async fn delete(api: &dyn ManagementGroupsApi, state: &mut ResourceState) -> Result<()> {
    let id = ManagementGroupId::parse(&state.id)?;

    let group = match api
        .get(&id.name, GetGroupOptions::recursive(CACHE_CONTROL))
        .await
    {
        Ok(group) => group,
        Err(e) if e.was_not_found() => {
            state.clear_id();
            return Ok(());
        }
        Err(e) => return Err(e.context(format!("retrieving {}", id))),
    };

    let children = group.child_entries().unwrap_or_default();
    for subscription_id in flatten_subscription_ids(&children)? {
        tracing::debug!("De-associating Subscription {:?} from {}", subscription_id, id);
        api.remove_subscription(&id.name, &subscription_id)
            .await
            .map_err(|e| {
                e.context(format!(
                    "de-associating Subscription {:?} from {}",
                    subscription_id, id
                ))
            })?;
    }

    tracing::info!("Deleting {}", id);
    api.delete(&id.name)
        .await
        .map_err(|e| e.context(format!("deleting {}", id)))?;
    state.clear_id();
    Ok(())
}
