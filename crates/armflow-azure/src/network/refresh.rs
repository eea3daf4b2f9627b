//! Provisioning-state probes for network resources

use crate::api::{SubnetsApi, VirtualNetworksApi};
use armflow_cloud::{CloudError, RefreshState, Refreshed, StateRefresh, SubnetId, VirtualNetworkId};
use async_trait::async_trait;

/// Provisioning state the service reports once a write has settled
pub const SUCCEEDED: &str = "Succeeded";
pub const UPDATING: &str = "Updating";

pub struct VirtualNetworkProvisioningRefresh<'a> {
    api: &'a dyn VirtualNetworksApi,
    id: VirtualNetworkId,
}

impl<'a> VirtualNetworkProvisioningRefresh<'a> {
    pub fn new(api: &'a dyn VirtualNetworksApi, id: VirtualNetworkId) -> Self {
        Self { api, id }
    }
}

#[async_trait]
impl StateRefresh for VirtualNetworkProvisioningRefresh<'_> {
    fn describe(&self) -> String {
        self.id.to_string()
    }

    async fn refresh(&self) -> armflow_cloud::Result<Refreshed> {
        let vnet = self
            .api
            .get(&self.id)
            .await
            .map_err(|e| CloudError::from(e.context(format!("polling for {}", self.id))))?;

        let state = vnet
            .properties
            .and_then(|p| p.provisioning_state)
            .unwrap_or_default();
        Ok(Refreshed::state(RefreshState::provisioning(state)))
    }
}

pub struct SubnetProvisioningRefresh<'a> {
    api: &'a dyn SubnetsApi,
    id: SubnetId,
}

impl<'a> SubnetProvisioningRefresh<'a> {
    pub fn new(api: &'a dyn SubnetsApi, id: SubnetId) -> Self {
        Self { api, id }
    }
}

#[async_trait]
impl StateRefresh for SubnetProvisioningRefresh<'_> {
    fn describe(&self) -> String {
        self.id.to_string()
    }

    async fn refresh(&self) -> armflow_cloud::Result<Refreshed> {
        let subnet = self
            .api
            .get(&self.id)
            .await
            .map_err(|e| CloudError::from(e.context(format!("polling for {}", self.id))))?;

        let state = subnet
            .properties
            .and_then(|p| p.provisioning_state)
            .unwrap_or_default();
        Ok(Refreshed::state(RefreshState::provisioning(state)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Subnet, SubnetPropertiesFormat};
    use crate::testing::FakeNetworks;

    #[tokio::test]
    async fn test_subnet_probe_reports_raw_state() {
        let api = FakeNetworks::default();
        let id = SubnetId::new("sub", "rg", "vnet", "default");
        api.insert_subnet(
            &id,
            Subnet {
                properties: Some(SubnetPropertiesFormat {
                    provisioning_state: Some(UPDATING.to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );

        let observed = SubnetProvisioningRefresh::new(&api, id)
            .refresh()
            .await
            .unwrap();
        assert_eq!(observed.state, RefreshState::provisioning("Updating"));
    }

    #[tokio::test]
    async fn test_vnet_probe_missing_is_fatal() {
        let api = FakeNetworks::default();
        let id = VirtualNetworkId::new("sub", "rg", "vnet");
        let err = VirtualNetworkProvisioningRefresh::new(&api, id)
            .refresh()
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::NotFound(msg) if msg.starts_with("polling for")));
    }
}
