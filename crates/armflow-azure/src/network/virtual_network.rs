//! `azurerm_virtual_network`

use super::refresh::{SUCCEEDED, UPDATING, VirtualNetworkProvisioningRefresh};
use super::{
    VIRTUAL_NETWORK_RESOURCE, expand_edge_zone, flatten_edge_zone, normalize_location,
    normalize_location_opt,
};
use crate::api::{SubnetsApi, VirtualNetworksApi};
use crate::error::{AzureError, Result};
use crate::models::{
    AddressSpace, DhcpOptions, Subnet, SubResource, SubnetPropertiesFormat, VirtualNetwork,
    VirtualNetworkBgpCommunities, VirtualNetworkPropertiesFormat,
};
use armflow_cloud::{RefreshState, ResourceState, StateChangeConf, SubnetId, VirtualNetworkId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VirtualNetworkConfig {
    pub name: String,
    pub resource_group_name: String,
    pub location: String,
    pub address_space: Vec<String>,
    #[serde(default)]
    pub dns_servers: Vec<String>,
    #[serde(default)]
    pub edge_zone: Option<String>,
    #[serde(default)]
    pub flow_timeout_in_minutes: Option<i32>,
    #[serde(default)]
    pub subnet: Vec<InlineSubnet>,
    #[serde(default)]
    pub ddos_protection_plan: Option<DdosProtectionPlan>,
    #[serde(default)]
    pub bgp_community: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// A subnet declared inside the virtual network
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineSubnet {
    pub name: String,
    pub address_prefix: String,
    #[serde(default)]
    pub security_group: String,
    /// Computed
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
}

/// Identity of an inline subnet within the set
pub fn subnet_set_key(subnet: &InlineSubnet) -> String {
    format!(
        "{}{}{}",
        subnet.name, subnet.address_prefix, subnet.security_group
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DdosProtectionPlan {
    pub id: String,
    pub enable: bool,
}

impl VirtualNetworkConfig {
    pub fn id(&self, subscription_id: &str) -> VirtualNetworkId {
        VirtualNetworkId::new(subscription_id, &self.resource_group_name, &self.name)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(AzureError::InvalidConfig("`name` must not be empty".to_string()));
        }
        if self.address_space.is_empty() || self.address_space.iter().any(String::is_empty) {
            return Err(AzureError::InvalidConfig(
                "`address_space` needs at least one non-empty prefix".to_string(),
            ));
        }
        if self.dns_servers.iter().any(String::is_empty) {
            return Err(AzureError::InvalidConfig(
                "`dns_servers` entries must not be empty".to_string(),
            ));
        }
        if let Some(minutes) = self
            .flow_timeout_in_minutes
            .filter(|m| !(4..=30).contains(m))
        {
            return Err(AzureError::InvalidConfig(format!(
                "`flow_timeout_in_minutes` must be between 4 and 30, got {}",
                minutes
            )));
        }
        for subnet in &self.subnet {
            if subnet.name.is_empty() || subnet.address_prefix.is_empty() {
                return Err(AzureError::InvalidConfig(
                    "inline subnets need a `name` and an `address_prefix`".to_string(),
                ));
            }
        }
        Ok(())
    }
}

pub async fn read(api: &dyn VirtualNetworksApi, state: &mut ResourceState) -> Result<()> {
    let id = VirtualNetworkId::parse(&state.id)?;

    let vnet = match api.get(&id).await {
        Ok(vnet) => vnet,
        Err(e) if e.was_not_found() => {
            tracing::info!("{} doesn't exist - removing from state", id);
            state.clear_id();
            return Ok(());
        }
        Err(e) => return Err(e.context(format!("retrieving {}", id))),
    };

    state.set("name", &id.name)?;
    state.set("resource_group_name", &id.resource_group)?;
    state.set("location", normalize_location_opt(vnet.location.as_deref()))?;
    state.set("edge_zone", flatten_edge_zone(vnet.extended_location.as_ref()))?;

    if let Some(props) = &vnet.properties {
        state.set("guid", &props.resource_guid)?;
        state.set("flow_timeout_in_minutes", props.flow_timeout_in_minutes)?;

        if let Some(space) = &props.address_space {
            state.set(
                "address_space",
                space.address_prefixes.clone().unwrap_or_default(),
            )?;
        }

        state.set("ddos_protection_plan", flatten_ddos_protection_plan(props))?;
        state.set("subnet", flatten_subnets(props.subnets.as_deref()))?;
        state.set("dns_servers", flatten_dns_servers(props.dhcp_options.as_ref()))?;

        let bgp_community = props
            .bgp_communities
            .as_ref()
            .and_then(|b| b.virtual_network_community.clone())
            .unwrap_or_default();
        state.set("bgp_community", bgp_community)?;
    }

    state.set("tags", vnet.tags.clone().unwrap_or_default())?;
    state.touch();
    Ok(())
}

/// Fetch a subnet so that settings managed elsewhere survive the vnet PUT.
/// A missing subnet yields an empty one.
async fn existing_subnet(api: &dyn SubnetsApi, id: &SubnetId) -> Result<Subnet> {
    match api.get(id).await {
        Ok(subnet) => Ok(subnet),
        Err(e) if e.was_not_found() => Ok(Subnet::default()),
        Err(e) => Err(e.context(format!("retrieving {}", id))),
    }
}

/// Build the request properties for a create or update
pub async fn expand_properties(
    subnets_api: &dyn SubnetsApi,
    id: &VirtualNetworkId,
    config: &VirtualNetworkConfig,
) -> Result<VirtualNetworkPropertiesFormat> {
    let mut subnets = Vec::with_capacity(config.subnet.len());

    for inline in &config.subnet {
        tracing::info!("setting subnets inside vNet, processing {:?}", inline.name);
        let subnet_id = SubnetId::new(
            &id.subscription_id,
            &id.resource_group,
            &id.name,
            &inline.name,
        );
        let mut subnet = existing_subnet(subnets_api, &subnet_id).await?;

        subnet.name = Some(inline.name.clone());
        let props = subnet
            .properties
            .get_or_insert_with(SubnetPropertiesFormat::default);
        props.address_prefix = Some(inline.address_prefix.clone());
        props.network_security_group = if inline.security_group.is_empty() {
            None
        } else {
            Some(SubResource::new(&inline.security_group))
        };

        subnets.push(subnet);
    }

    let mut properties = VirtualNetworkPropertiesFormat {
        address_space: Some(AddressSpace {
            address_prefixes: Some(config.address_space.clone()),
        }),
        dhcp_options: Some(DhcpOptions {
            dns_servers: Some(config.dns_servers.clone()),
        }),
        subnets: Some(subnets),
        flow_timeout_in_minutes: config.flow_timeout_in_minutes,
        ..Default::default()
    };

    if let Some(plan) = &config.ddos_protection_plan {
        properties.ddos_protection_plan = Some(SubResource::new(&plan.id));
        properties.enable_ddos_protection = Some(plan.enable);
    }

    if let Some(community) = config.bgp_community.as_ref().filter(|c| !c.is_empty()) {
        properties.bgp_communities = Some(VirtualNetworkBgpCommunities {
            virtual_network_community: Some(community.clone()),
        });
    }

    Ok(properties)
}

/// Reported only when both the plan id and the enable flag are present
pub fn flatten_ddos_protection_plan(
    props: &VirtualNetworkPropertiesFormat,
) -> Option<DdosProtectionPlan> {
    let id = props.ddos_protection_plan.as_ref()?.id.clone()?;
    let enable = props.enable_ddos_protection?;
    Some(DdosProtectionPlan { id, enable })
}

/// Inline subnets as a set keyed by [`subnet_set_key`]
pub fn flatten_subnets(subnets: Option<&[Subnet]>) -> Vec<InlineSubnet> {
    let mut set = BTreeMap::new();

    for subnet in subnets.unwrap_or_default() {
        let props = subnet.properties.as_ref();
        let inline = InlineSubnet {
            name: subnet.name.clone().unwrap_or_default(),
            address_prefix: props
                .and_then(|p| p.address_prefix.clone())
                .unwrap_or_default(),
            security_group: props
                .and_then(|p| p.network_security_group.as_ref())
                .and_then(|nsg| nsg.id.clone())
                .unwrap_or_default(),
            id: subnet.id.clone().unwrap_or_default(),
        };
        set.insert(subnet_set_key(&inline), inline);
    }

    set.into_values().collect()
}

pub fn flatten_dns_servers(options: Option<&DhcpOptions>) -> Vec<String> {
    options
        .and_then(|o| o.dns_servers.clone())
        .unwrap_or_default()
}

/// PUT the network and wait for it to settle
pub async fn create_or_update(
    vnets: &dyn VirtualNetworksApi,
    subnets: &dyn SubnetsApi,
    subscription_id: &str,
    config: &VirtualNetworkConfig,
    timeout: Duration,
) -> Result<ResourceState> {
    config.validate()?;
    let id = config.id(subscription_id);

    let body = VirtualNetwork {
        location: Some(normalize_location(&config.location)),
        extended_location: expand_edge_zone(config.edge_zone.as_deref()),
        tags: Some(config.tags.clone()),
        properties: Some(expand_properties(subnets, &id, config).await?),
        ..Default::default()
    };

    tracing::info!("Creating/updating {}", id);
    vnets
        .create_or_update(&id, &body)
        .await
        .map_err(|e| e.context(format!("creating/updating {}", id)))?;

    StateChangeConf::new(
        vec![RefreshState::provisioning(UPDATING)],
        vec![RefreshState::provisioning(SUCCEEDED)],
        timeout,
    )
    .with_poll_interval(POLL_INTERVAL)
    .wait_for_state(&VirtualNetworkProvisioningRefresh::new(vnets, id.clone()))
    .await?;

    let mut state = ResourceState::new(VIRTUAL_NETWORK_RESOURCE, id.id());
    read(vnets, &mut state).await?;
    Ok(state)
}

pub async fn delete(api: &dyn VirtualNetworksApi, state: &mut ResourceState) -> Result<()> {
    let id = VirtualNetworkId::parse(&state.id)?;

    tracing::info!("Deleting {}", id);
    match api.delete(&id).await {
        Ok(()) => {}
        Err(e) if e.was_not_found() => {}
        Err(e) => return Err(e.context(format!("deleting {}", id))),
    }

    state.clear_id();
    Ok(())
}
