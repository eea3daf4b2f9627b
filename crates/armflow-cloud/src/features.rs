//! Provider feature flags
//!
//! Behavioural switches chosen by the user in the provider configuration.
//! They are resolved once and handed to each adapter explicitly.

use serde::{Deserialize, Serialize};

/// Resolved feature flags. `Default` is what applies when the configuration
/// has no `features` block; nested groups are always fully populated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFeatures {
    pub key_vault: KeyVaultFeatures,
    pub resource_group: ResourceGroupFeatures,
    pub template_deployment: TemplateDeploymentFeatures,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyVaultFeatures {
    pub purge_soft_delete_on_destroy: bool,
    pub purge_soft_deleted_keys_on_destroy: bool,
    pub purge_soft_deleted_certs_on_destroy: bool,
    pub purge_soft_deleted_secrets_on_destroy: bool,
    pub purge_soft_deleted_hsms_on_destroy: bool,
    pub recover_soft_deleted_key_vaults: bool,
    pub recover_soft_deleted_keys: bool,
    pub recover_soft_deleted_certs: bool,
    pub recover_soft_deleted_secrets: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGroupFeatures {
    pub prevent_deletion_if_contains_resources: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDeploymentFeatures {
    pub delete_nested_items_during_deletion: bool,
}

impl Default for KeyVaultFeatures {
    fn default() -> Self {
        Self {
            purge_soft_delete_on_destroy: true,
            purge_soft_deleted_keys_on_destroy: true,
            purge_soft_deleted_certs_on_destroy: true,
            purge_soft_deleted_secrets_on_destroy: true,
            purge_soft_deleted_hsms_on_destroy: true,
            recover_soft_deleted_key_vaults: true,
            recover_soft_deleted_keys: true,
            recover_soft_deleted_certs: true,
            recover_soft_deleted_secrets: true,
        }
    }
}

/// Default for `prevent_deletion_if_contains_resources` when a
/// `resource_group` block omits it: on, except under acceptance tests.
pub fn prevent_deletion_default() -> bool {
    std::env::var("TF_ACC").map(|v| v.is_empty()).unwrap_or(true)
}
