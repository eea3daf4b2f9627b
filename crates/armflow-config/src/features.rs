//! The `features` block of the provider configuration

use armflow_cloud::UserFeatures;
use armflow_cloud::features::prevent_deletion_default;
use serde::Deserialize;

/// Raw `features` block; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeaturesBlock {
    pub key_vault: Option<KeyVaultBlock>,
    pub resource_group: Option<ResourceGroupBlock>,
    pub template_deployment: Option<TemplateDeploymentBlock>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyVaultBlock {
    pub purge_soft_delete_on_destroy: Option<bool>,
    pub purge_soft_deleted_certificates_on_destroy: Option<bool>,
    pub purge_soft_deleted_keys_on_destroy: Option<bool>,
    pub purge_soft_deleted_secrets_on_destroy: Option<bool>,
    pub purge_soft_deleted_hardware_security_modules_on_destroy: Option<bool>,
    pub recover_soft_deleted_certificates: Option<bool>,
    pub recover_soft_deleted_key_vaults: Option<bool>,
    pub recover_soft_deleted_keys: Option<bool>,
    pub recover_soft_deleted_secrets: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceGroupBlock {
    pub prevent_deletion_if_contains_resources: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateDeploymentBlock {
    pub delete_nested_items_during_deletion: bool,
}

/// Resolve a `features` block against the defaults.
///
/// Only keys present in the block override [`UserFeatures::default`].
pub fn expand_features(block: Option<&FeaturesBlock>) -> UserFeatures {
    let mut features = UserFeatures::default();

    let Some(block) = block else {
        return features;
    };

    if let Some(kv) = &block.key_vault {
        let target = &mut features.key_vault;
        let overrides = [
            (kv.purge_soft_delete_on_destroy, &mut target.purge_soft_delete_on_destroy),
            (
                kv.purge_soft_deleted_certificates_on_destroy,
                &mut target.purge_soft_deleted_certs_on_destroy,
            ),
            (
                kv.purge_soft_deleted_keys_on_destroy,
                &mut target.purge_soft_deleted_keys_on_destroy,
            ),
            (
                kv.purge_soft_deleted_secrets_on_destroy,
                &mut target.purge_soft_deleted_secrets_on_destroy,
            ),
            (
                kv.purge_soft_deleted_hardware_security_modules_on_destroy,
                &mut target.purge_soft_deleted_hsms_on_destroy,
            ),
            (
                kv.recover_soft_deleted_certificates,
                &mut target.recover_soft_deleted_certs,
            ),
            (
                kv.recover_soft_deleted_key_vaults,
                &mut target.recover_soft_deleted_key_vaults,
            ),
            (kv.recover_soft_deleted_keys, &mut target.recover_soft_deleted_keys),
            (
                kv.recover_soft_deleted_secrets,
                &mut target.recover_soft_deleted_secrets,
            ),
        ];
        for (value, slot) in overrides {
            if let Some(v) = value {
                *slot = v;
            }
        }
    }

    if let Some(td) = &block.template_deployment {
        features.template_deployment.delete_nested_items_during_deletion =
            td.delete_nested_items_during_deletion;
    }

    if let Some(rg) = &block.resource_group {
        features.resource_group.prevent_deletion_if_contains_resources = rg
            .prevent_deletion_if_contains_resources
            .unwrap_or_else(prevent_deletion_default);
    }

    features
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn parse(yaml: &str) -> FeaturesBlock {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_missing_block_gives_defaults() {
        assert_eq!(expand_features(None), UserFeatures::default());
        assert_eq!(
            expand_features(Some(&FeaturesBlock::default())),
            UserFeatures::default()
        );
    }

    #[test]
    fn test_key_vault_overrides() {
        let block = parse(
            r#"
key_vault:
  purge_soft_delete_on_destroy: false
  purge_soft_deleted_certificates_on_destroy: false
  recover_soft_deleted_keys: false
"#,
        );
        let features = expand_features(Some(&block));
        assert!(!features.key_vault.purge_soft_delete_on_destroy);
        assert!(!features.key_vault.purge_soft_deleted_certs_on_destroy);
        assert!(!features.key_vault.recover_soft_deleted_keys);
        // untouched keys keep their defaults
        assert!(features.key_vault.purge_soft_deleted_secrets_on_destroy);
        assert!(features.key_vault.recover_soft_deleted_key_vaults);
    }

    #[test]
    fn test_template_deployment() {
        let block = parse("template_deployment:\n  delete_nested_items_during_deletion: true\n");
        assert!(
            expand_features(Some(&block))
                .template_deployment
                .delete_nested_items_during_deletion
        );
    }

    #[test]
    #[serial]
    fn test_resource_group_default_depends_on_tf_acc() {
        let block = parse("resource_group: {}\n");

        temp_env::with_var_unset("TF_ACC", || {
            assert!(
                expand_features(Some(&block))
                    .resource_group
                    .prevent_deletion_if_contains_resources
            );
        });

        temp_env::with_var("TF_ACC", Some("1"), || {
            assert!(
                !expand_features(Some(&block))
                    .resource_group
                    .prevent_deletion_if_contains_resources
            );
        });
    }

    #[test]
    #[serial]
    fn test_resource_group_explicit_value_wins() {
        let block = parse("resource_group:\n  prevent_deletion_if_contains_resources: false\n");
        temp_env::with_var_unset("TF_ACC", || {
            assert!(
                !expand_features(Some(&block))
                    .resource_group
                    .prevent_deletion_if_contains_resources
            );
        });
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let result: Result<FeaturesBlock, _> = serde_yaml::from_str("virtual_machine: {}\n");
        assert!(result.is_err());
    }
}
