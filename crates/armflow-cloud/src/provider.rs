//! Resource and service registration

use crate::error::{CloudError, Result};
use crate::timeouts::Timeouts;

/// Registration for a single resource type
#[derive(Debug, Clone)]
pub struct ResourceDefinition {
    /// Type name as written in configuration (e.g. `azurerm_subnet`)
    pub type_name: &'static str,

    pub timeouts: Timeouts,

    /// Validates an id passed to `import`
    pub import_validator: fn(&str) -> Result<()>,
}

impl ResourceDefinition {
    pub fn validate_import(&self, id: &str) -> Result<()> {
        (self.import_validator)(id)
    }
}

/// A service groups the resource types backed by one API family
pub trait ServiceRegistration: Send + Sync {
    fn name(&self) -> &str;

    fn resources(&self) -> Vec<ResourceDefinition>;
}

/// Find a resource definition by type name across services
pub fn find_resource(
    services: &[Box<dyn ServiceRegistration>],
    type_name: &str,
) -> Result<ResourceDefinition> {
    services
        .iter()
        .flat_map(|s| s.resources())
        .find(|r| r.type_name == type_name)
        .ok_or_else(|| {
            CloudError::InvalidConfig(format!("unsupported resource type {:?}", type_name))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ManagementGroupId;

    struct Groups;

    impl ServiceRegistration for Groups {
        fn name(&self) -> &str {
            "Management"
        }

        fn resources(&self) -> Vec<ResourceDefinition> {
            vec![ResourceDefinition {
                type_name: "azurerm_management_group",
                timeouts: Timeouts::long_running(),
                import_validator: |id| ManagementGroupId::parse(id).map(|_| ()),
            }]
        }
    }

    #[test]
    fn test_find_resource() {
        let services: Vec<Box<dyn ServiceRegistration>> = vec![Box::new(Groups)];
        let def = find_resource(&services, "azurerm_management_group").unwrap();
        assert!(
            def.validate_import("/providers/Microsoft.Management/managementGroups/mg1")
                .is_ok()
        );
        assert!(def.validate_import("/subscriptions/abc").is_err());
        assert!(find_resource(&services, "azurerm_nope").is_err());
    }
}
