//! `azurerm_subnet`

use super::SUBNET_RESOURCE;
use super::refresh::{SUCCEEDED, SubnetProvisioningRefresh, UPDATING};
use crate::api::SubnetsApi;
use crate::error::{AzureError, Result};
use crate::models::{
    Delegation, ServiceDelegationPropertiesFormat, ServiceEndpointPropertiesFormat, SubResource,
    Subnet, SubnetPropertiesFormat,
};
use armflow_cloud::{RefreshState, ResourceState, StateChangeConf, SubnetId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_secs(10);

const POLICIES_ENABLED: &str = "Enabled";
const POLICIES_DISABLED: &str = "Disabled";

/// Services a subnet may be delegated to
pub const SUBNET_DELEGATION_SERVICE_NAMES: [&str; 34] = [
    "Microsoft.ApiManagement/service",
    "Microsoft.AzureCosmosDB/clusters",
    "Microsoft.BareMetal/AzureVMware",
    "Microsoft.BareMetal/CrayServers",
    "Microsoft.Batch/batchAccounts",
    "Microsoft.ContainerInstance/containerGroups",
    "Microsoft.ContainerService/managedClusters",
    "Microsoft.Databricks/workspaces",
    "Microsoft.DBforMySQL/flexibleServers",
    "Microsoft.DBforMySQL/serversv2",
    "Microsoft.DBforPostgreSQL/flexibleServers",
    "Microsoft.DBforPostgreSQL/serversv2",
    "Microsoft.DBforPostgreSQL/singleServers",
    "Microsoft.HardwareSecurityModules/dedicatedHSMs",
    "Microsoft.Kusto/clusters",
    "Microsoft.Logic/integrationServiceEnvironments",
    "Microsoft.LabServices/labplans",
    "Microsoft.MachineLearningServices/workspaces",
    "Microsoft.Netapp/volumes",
    "Microsoft.Network/dnsResolvers",
    "Microsoft.Network/managedResolvers",
    "Microsoft.PowerPlatform/vnetaccesslinks",
    "Microsoft.ServiceFabricMesh/networks",
    "Microsoft.Sql/managedInstances",
    "Microsoft.Sql/servers",
    "Microsoft.StoragePool/diskPools",
    "Microsoft.StreamAnalytics/streamingJobs",
    "Microsoft.Synapse/workspaces",
    "Microsoft.Web/hostingEnvironments",
    "Microsoft.Web/serverFarms",
    "Microsoft.Orbital/orbitalGateways",
    "NGINX.NGINXPLUS/nginxDeployments",
    "PaloAltoNetworks.Cloudngfw/firewalls",
    "Qumulo.Storage/fileSystems",
];

/// Actions a delegation may grant
pub const SUBNET_DELEGATION_ACTIONS: [&str; 8] = [
    "Microsoft.Network/networkinterfaces/*",
    "Microsoft.Network/publicIPAddresses/join/action",
    "Microsoft.Network/publicIPAddresses/read",
    "Microsoft.Network/virtualNetworks/read",
    "Microsoft.Network/virtualNetworks/subnets/action",
    "Microsoft.Network/virtualNetworks/subnets/join/action",
    "Microsoft.Network/virtualNetworks/subnets/prepareNetworkPolicies/action",
    "Microsoft.Network/virtualNetworks/subnets/unprepareNetworkPolicies/action",
];

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubnetConfig {
    pub name: String,
    pub resource_group_name: String,
    pub virtual_network_name: String,
    pub address_prefixes: Vec<String>,
    #[serde(default)]
    pub service_endpoints: BTreeSet<String>,
    #[serde(default)]
    pub service_endpoint_policy_ids: BTreeSet<String>,
    #[serde(default)]
    pub delegation: Vec<SubnetDelegation>,
    #[serde(default)]
    pub private_endpoint_network_policies_enabled: bool,
    #[serde(default = "default_true")]
    pub private_link_service_network_policies_enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetDelegation {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub service_delegation: ServiceDelegation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDelegation {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub actions: Vec<String>,
}

impl SubnetConfig {
    pub fn id(&self, subscription_id: &str) -> SubnetId {
        SubnetId::new(
            subscription_id,
            &self.resource_group_name,
            &self.virtual_network_name,
            &self.name,
        )
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() || self.virtual_network_name.is_empty() {
            return Err(AzureError::InvalidConfig(
                "`name` and `virtual_network_name` must not be empty".to_string(),
            ));
        }
        if self.address_prefixes.is_empty() || self.address_prefixes.iter().any(String::is_empty)
        {
            return Err(AzureError::InvalidConfig(
                "`address_prefixes` needs at least one non-empty prefix".to_string(),
            ));
        }
        if self.service_endpoint_policy_ids.iter().any(String::is_empty) {
            return Err(AzureError::InvalidConfig(
                "`service_endpoint_policy_ids` entries must not be empty".to_string(),
            ));
        }

        for delegation in &self.delegation {
            let service = &delegation.service_delegation;
            if !SUBNET_DELEGATION_SERVICE_NAMES.contains(&service.name.as_str()) {
                return Err(AzureError::InvalidConfig(format!(
                    "delegation {:?}: unsupported service {:?}",
                    delegation.name, service.name
                )));
            }
            if let Some(action) = service
                .actions
                .iter()
                .find(|a| !SUBNET_DELEGATION_ACTIONS.contains(&a.as_str()))
            {
                return Err(AzureError::InvalidConfig(format!(
                    "delegation {:?}: unsupported action {:?}",
                    delegation.name, action
                )));
            }
        }

        Ok(())
    }
}

pub fn expand_network_policy(enabled: bool) -> &'static str {
    if enabled {
        POLICIES_ENABLED
    } else {
        POLICIES_DISABLED
    }
}

pub fn flatten_network_policy(value: &str) -> bool {
    value.eq_ignore_ascii_case(POLICIES_ENABLED)
}

pub fn expand_service_endpoints(
    services: &BTreeSet<String>,
) -> Vec<ServiceEndpointPropertiesFormat> {
    services
        .iter()
        .map(|service| ServiceEndpointPropertiesFormat {
            service: Some(service.clone()),
            locations: None,
        })
        .collect()
}

pub fn flatten_service_endpoints(
    endpoints: Option<&[ServiceEndpointPropertiesFormat]>,
) -> Vec<String> {
    endpoints
        .unwrap_or_default()
        .iter()
        .filter_map(|e| e.service.clone())
        .collect()
}

pub fn expand_service_endpoint_policies(ids: &BTreeSet<String>) -> Vec<SubResource> {
    ids.iter().map(SubResource::new).collect()
}

/// Policy ids; a policy without an id is kept as ""
pub fn flatten_service_endpoint_policies(policies: Option<&[SubResource]>) -> Vec<String> {
    policies
        .unwrap_or_default()
        .iter()
        .map(|p| p.id.clone().unwrap_or_default())
        .collect()
}

pub fn expand_delegations(delegations: &[SubnetDelegation]) -> Vec<Delegation> {
    delegations
        .iter()
        .map(|d| Delegation {
            name: Some(d.name.clone()),
            properties: Some(ServiceDelegationPropertiesFormat {
                service_name: Some(d.service_delegation.name.clone()),
                actions: Some(d.service_delegation.actions.clone()),
            }),
        })
        .collect()
}

/// The service reports names in whatever case it stored; map them back onto
/// the canonical spelling where one is known.
pub fn flatten_delegations(delegations: Option<&[Delegation]>) -> Vec<SubnetDelegation> {
    delegations
        .unwrap_or_default()
        .iter()
        .map(|d| {
            let props = d.properties.as_ref();
            let name = props
                .and_then(|p| p.service_name.as_deref())
                .map(canonical_service_name)
                .unwrap_or_default();
            SubnetDelegation {
                name: d.name.clone().unwrap_or_default(),
                service_delegation: ServiceDelegation {
                    name,
                    actions: props.and_then(|p| p.actions.clone()).unwrap_or_default(),
                },
            }
        })
        .collect()
}

fn canonical_service_name(name: &str) -> String {
    SUBNET_DELEGATION_SERVICE_NAMES
        .iter()
        .find(|known| known.eq_ignore_ascii_case(name))
        .map_or_else(|| name.to_string(), |known| known.to_string())
}

/// Address prefixes, falling back to the single-prefix field older subnets
/// report
fn flatten_address_prefixes(props: &SubnetPropertiesFormat) -> Vec<String> {
    match &props.address_prefixes {
        Some(prefixes) => prefixes.clone(),
        None => props
            .address_prefix
            .iter()
            .filter(|p| !p.is_empty())
            .cloned()
            .collect(),
    }
}

/// Overlay the configuration onto `subnet`, leaving unmanaged settings
/// (route table, NSG, NAT gateway) as the service reported them
pub fn expand_subnet(config: &SubnetConfig, mut subnet: Subnet) -> Subnet {
    subnet.name = Some(config.name.clone());
    let props = subnet
        .properties
        .get_or_insert_with(SubnetPropertiesFormat::default);

    if let [single] = config.address_prefixes.as_slice() {
        props.address_prefix = Some(single.clone());
        props.address_prefixes = None;
    } else {
        props.address_prefix = None;
        props.address_prefixes = Some(config.address_prefixes.clone());
    }

    props.service_endpoints = Some(expand_service_endpoints(&config.service_endpoints));
    props.service_endpoint_policies = Some(expand_service_endpoint_policies(
        &config.service_endpoint_policy_ids,
    ));
    props.delegations = Some(expand_delegations(&config.delegation));
    props.private_endpoint_network_policies = Some(
        expand_network_policy(config.private_endpoint_network_policies_enabled).to_string(),
    );
    props.private_link_service_network_policies = Some(
        expand_network_policy(config.private_link_service_network_policies_enabled).to_string(),
    );
    props.provisioning_state = None;

    subnet
}

pub async fn read(api: &dyn SubnetsApi, state: &mut ResourceState) -> Result<()> {
    let id = SubnetId::parse(&state.id)?;

    let subnet = match api.get(&id).await {
        Ok(subnet) => subnet,
        Err(e) if e.was_not_found() => {
            tracing::info!("{} doesn't exist - removing from state", id);
            state.clear_id();
            return Ok(());
        }
        Err(e) => return Err(e.context(format!("retrieving {}", id))),
    };

    state.set("name", &id.name)?;
    state.set("virtual_network_name", &id.virtual_network_name)?;
    state.set("resource_group_name", &id.resource_group)?;

    if let Some(props) = &subnet.properties {
        state.set("address_prefixes", flatten_address_prefixes(props))?;
        state.set(
            "delegation",
            flatten_delegations(props.delegations.as_deref()),
        )?;
        state.set(
            "private_endpoint_network_policies_enabled",
            flatten_network_policy(
                props
                    .private_endpoint_network_policies
                    .as_deref()
                    .unwrap_or_default(),
            ),
        )?;
        state.set(
            "private_link_service_network_policies_enabled",
            flatten_network_policy(
                props
                    .private_link_service_network_policies
                    .as_deref()
                    .unwrap_or_default(),
            ),
        )?;
        state.set(
            "service_endpoints",
            flatten_service_endpoints(props.service_endpoints.as_deref()),
        )?;
        state.set(
            "service_endpoint_policy_ids",
            flatten_service_endpoint_policies(props.service_endpoint_policies.as_deref()),
        )?;
    }

    state.touch();
    Ok(())
}

/// PUT the subnet and wait for it to settle
pub async fn create_or_update(
    api: &dyn SubnetsApi,
    subscription_id: &str,
    config: &SubnetConfig,
    timeout: Duration,
) -> Result<ResourceState> {
    config.validate()?;
    let id = config.id(subscription_id);

    let existing = match api.get(&id).await {
        Ok(subnet) => subnet,
        Err(e) if e.was_not_found() => Subnet::default(),
        Err(e) => return Err(e.context(format!("retrieving {}", id))),
    };

    tracing::info!("Creating/updating {}", id);
    api.create_or_update(&id, &expand_subnet(config, existing))
        .await
        .map_err(|e| e.context(format!("creating/updating {}", id)))?;

    StateChangeConf::new(
        vec![RefreshState::provisioning(UPDATING)],
        vec![RefreshState::provisioning(SUCCEEDED)],
        timeout,
    )
    .with_poll_interval(POLL_INTERVAL)
    .wait_for_state(&SubnetProvisioningRefresh::new(api, id.clone()))
    .await?;

    let mut state = ResourceState::new(SUBNET_RESOURCE, id.id());
    read(api, &mut state).await?;
    Ok(state)
}

pub async fn delete(api: &dyn SubnetsApi, state: &mut ResourceState) -> Result<()> {
    let id = SubnetId::parse(&state.id)?;

    tracing::info!("Deleting {}", id);
    match api.delete(&id).await {
        Ok(()) => {}
        Err(e) if e.was_not_found() => {}
        Err(e) => return Err(e.context(format!("deleting {}", id))),
    }

    state.clear_id();
    Ok(())
}
