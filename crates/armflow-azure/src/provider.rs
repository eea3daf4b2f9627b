//! Service registrations for the resources this crate manages

use crate::managementgroup::{ASSOCIATION_RESOURCE, MANAGEMENT_GROUP_RESOURCE};
use crate::network::{SUBNET_RESOURCE, VIRTUAL_NETWORK_RESOURCE};
use armflow_cloud::{
    ManagementGroupId, ManagementGroupSubscriptionAssociationId, ResourceDefinition,
    ServiceRegistration, SubnetId, Timeouts, VirtualNetworkId, find_resource,
};

pub struct ManagementGroupService;

impl ServiceRegistration for ManagementGroupService {
    fn name(&self) -> &str {
        "Management Group"
    }

    fn resources(&self) -> Vec<ResourceDefinition> {
        vec![
            ResourceDefinition {
                type_name: MANAGEMENT_GROUP_RESOURCE,
                timeouts: Timeouts::long_running(),
                import_validator: |id| ManagementGroupId::parse(id).map(|_| ()),
            },
            ResourceDefinition {
                type_name: ASSOCIATION_RESOURCE,
                timeouts: Timeouts::short_lived(),
                import_validator: |id| {
                    ManagementGroupSubscriptionAssociationId::parse(id).map(|_| ())
                },
            },
        ]
    }
}

pub struct NetworkService;

impl ServiceRegistration for NetworkService {
    fn name(&self) -> &str {
        "Network"
    }

    fn resources(&self) -> Vec<ResourceDefinition> {
        vec![
            ResourceDefinition {
                type_name: VIRTUAL_NETWORK_RESOURCE,
                timeouts: Timeouts::long_running(),
                import_validator: |id| VirtualNetworkId::parse(id).map(|_| ()),
            },
            ResourceDefinition {
                type_name: SUBNET_RESOURCE,
                timeouts: Timeouts::long_running(),
                import_validator: |id| SubnetId::parse(id).map(|_| ()),
            },
        ]
    }
}

pub fn supported_services() -> Vec<Box<dyn ServiceRegistration>> {
    vec![Box::new(ManagementGroupService), Box::new(NetworkService)]
}

pub fn supported_resources() -> Vec<ResourceDefinition> {
    supported_services()
        .iter()
        .flat_map(|s| s.resources())
        .collect()
}

pub fn resource_definition(type_name: &str) -> armflow_cloud::Result<ResourceDefinition> {
    find_resource(&supported_services(), type_name)
}

/// Check that `id` is importable as `type_name`
pub fn validate_import_id(type_name: &str, id: &str) -> armflow_cloud::Result<()> {
    resource_definition(type_name)?.validate_import(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_resources() {
        let names: Vec<_> = supported_resources().iter().map(|r| r.type_name).collect();
        assert_eq!(
            names,
            vec![
                "azurerm_management_group",
                "azurerm_management_group_subscription_association",
                "azurerm_virtual_network",
                "azurerm_subnet",
            ]
        );
    }

    #[test]
    fn test_association_has_no_update() {
        let def = resource_definition(ASSOCIATION_RESOURCE).unwrap();
        assert!(def.timeouts.update.is_none());
        assert_eq!(def.timeouts.create.as_secs(), 300);

        let def = resource_definition(SUBNET_RESOURCE).unwrap();
        assert_eq!(def.timeouts.create.as_secs(), 1800);
        assert_eq!(def.timeouts.read.as_secs(), 300);
    }

    #[test]
    fn test_validate_import_id() {
        assert!(
            validate_import_id(
                SUBNET_RESOURCE,
                "/subscriptions/s1/resourceGroups/rg1/providers/Microsoft.Network/virtualNetworks/v1/subnets/default"
            )
            .is_ok()
        );
        assert!(
            validate_import_id(
                VIRTUAL_NETWORK_RESOURCE,
                "/subscriptions/s1/resourceGroups/rg1/providers/Microsoft.Network/virtualNetworks/v1/subnets/default"
            )
            .is_err()
        );
        assert!(validate_import_id("azurerm_storage_account", "/x").is_err());
    }
}
