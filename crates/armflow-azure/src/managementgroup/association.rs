//! `azurerm_management_group_subscription_association`
//!
//! The management API has no object for the association itself; it exists
//! while the subscription is a direct child of the group.

use super::ASSOCIATION_RESOURCE;
use super::refresh::SubscriptionAssociationRefresh;
use crate::api::{GetGroupOptions, ManagementGroupsApi};
use crate::error::{AzureError, Result};
use armflow_cloud::{
    ManagementGroupId, ManagementGroupSubscriptionAssociationId, RefreshState, ResourceState,
    StateChangeConf, StateRefresh, SubscriptionId,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssociationConfig {
    /// ARM id of the group
    pub management_group_id: String,
    /// `/subscriptions/{id}`
    pub subscription_id: String,
}

impl AssociationConfig {
    /// Validate both ids and derive the association id
    pub fn association_id(&self) -> Result<ManagementGroupSubscriptionAssociationId> {
        let group = ManagementGroupId::parse(&self.management_group_id)?;
        let subscription = SubscriptionId::parse(&self.subscription_id)?;
        Ok(ManagementGroupSubscriptionAssociationId::new(
            group.name,
            subscription.subscription_id,
        ))
    }
}

fn wait_conf(pending: RefreshState, target: RefreshState, timeout: Duration) -> StateChangeConf {
    StateChangeConf::new(vec![pending], vec![target], timeout).with_poll_interval(POLL_INTERVAL)
}

pub async fn read(api: &dyn ManagementGroupsApi, state: &mut ResourceState) -> Result<()> {
    let id = ManagementGroupSubscriptionAssociationId::parse(&state.id)?;

    let group = api
        .get(&id.management_group, GetGroupOptions::direct())
        .await
        .map_err(|e| {
            e.context(format!(
                "reading Management Group {:?} for Subscription Associations",
                id.management_group
            ))
        })?;

    if group.properties.is_none() {
        return Ok(());
    }

    let Some(children) = group.child_entries() else {
        return Err(AzureError::UnexpectedResponse(format!(
            "could not read properties for Management Group {:?}",
            id.management_group
        )));
    };

    if !children
        .iter()
        .any(|child| child.is_subscription_named(&id.subscription_id))
    {
        tracing::info!(
            "Subscription {:?} not found in Management group {:?}, removing from state",
            id.subscription_id,
            id.management_group
        );
        state.clear_id();
        return Ok(());
    }

    state.set(
        "management_group_id",
        ManagementGroupId::new(&id.management_group).id(),
    )?;
    state.set(
        "subscription_id",
        SubscriptionId::new(&id.subscription_id).id(),
    )?;
    state.touch();
    Ok(())
}

/// Move the subscription into the group and wait until the group lists it
pub async fn create(
    api: &dyn ManagementGroupsApi,
    config: &AssociationConfig,
    timeout: Duration,
) -> Result<ResourceState> {
    let id = config.association_id()?;
    let probe = SubscriptionAssociationRefresh::new(api, id.clone());

    if probe.refresh().await?.state == RefreshState::Exists {
        return Err(AzureError::InvalidConfig(format!(
            "{} already exists and needs to be imported",
            id.id()
        )));
    }

    tracing::info!("Creating {}", id);
    api.add_subscription(&id.management_group, &id.subscription_id)
        .await
        .map_err(|e| e.context(format!("creating {}", id)))?;

    wait_conf(RefreshState::NotFound, RefreshState::Exists, timeout)
        .wait_for_state(&probe)
        .await?;

    let mut state = ResourceState::new(ASSOCIATION_RESOURCE, id.id());
    read(api, &mut state).await?;
    Ok(state)
}

/// Move the subscription out of the group and wait until it is gone
pub async fn delete(
    api: &dyn ManagementGroupsApi,
    state: &mut ResourceState,
    timeout: Duration,
) -> Result<()> {
    let id = ManagementGroupSubscriptionAssociationId::parse(&state.id)?;

    tracing::info!("Deleting {}", id);
    api.remove_subscription(&id.management_group, &id.subscription_id)
        .await
        .map_err(|e| e.context(format!("deleting {}", id)))?;

    wait_conf(RefreshState::Exists, RefreshState::NotFound, timeout)
        .wait_for_state(&SubscriptionAssociationRefresh::new(api, id))
        .await?;

    state.clear_id();
    Ok(())
}
