//! Provider configuration for armflow
//!
//! Locates `armflow.yaml`, parses it and layers `ARM_*` environment
//! variables on top.

pub mod error;
pub mod features;

pub use error::*;
pub use features::{FeaturesBlock, expand_features};

use armflow_cloud::UserFeatures;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const CANDIDATES: [&str; 2] = ["armflow.local.yaml", "armflow.yaml"];

/// armflow's directory under the user config dir, created on demand
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("armflow");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Find the provider configuration file.
///
/// Search order:
/// 1. `ARMFLOW_CONFIG_PATH`
/// 2. current directory: `armflow.local.yaml`, `armflow.yaml`
/// 3. `./.armflow/armflow.yaml`
/// 4. `~/.config/armflow/armflow.yaml`
pub fn find_provider_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var("ARMFLOW_CONFIG_PATH") {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;
    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let local = current_dir.join(".armflow").join("armflow.yaml");
    if local.exists() {
        return Ok(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global = config_dir.join("armflow").join("armflow.yaml");
        if global.exists() {
            return Ok(global);
        }
    }

    Err(ConfigError::ProviderFileNotFound)
}

/// Contents of `armflow.yaml`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Resource Manager endpoint
    pub endpoint: Option<String>,
    pub subscription_id: Option<String>,
    pub tenant_id: Option<String>,
    /// Bearer token used for every request
    pub access_token: Option<String>,
    /// Skip client-side request validation (on unless set)
    pub disable_sdk_validation: Option<bool>,
    /// Treat HTTP 429 as a retryable response (off unless set)
    pub count_429_as_retry: Option<bool>,
    pub features: Option<FeaturesBlock>,
}

impl ProviderConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!("Loaded provider configuration from {}", path.display());
        Ok(config)
    }

    /// Load the file found by [`find_provider_file`], or start empty when
    /// there is none; environment overrides are applied either way.
    pub fn discover() -> Result<Self> {
        let mut config = match find_provider_file() {
            Ok(path) => Self::load(&path)?,
            Err(ConfigError::ProviderFileNotFound) => {
                tracing::debug!("No provider configuration file, using environment only");
                Self::default()
            }
            Err(e) => return Err(e),
        };
        config.apply_env();
        Ok(config)
    }

    /// Override fields from `ARM_ENDPOINT`, `ARM_SUBSCRIPTION_ID`,
    /// `ARM_TENANT_ID` and `ARM_ACCESS_TOKEN`
    pub fn apply_env(&mut self) {
        let overrides = [
            ("ARM_ENDPOINT", &mut self.endpoint),
            ("ARM_SUBSCRIPTION_ID", &mut self.subscription_id),
            ("ARM_TENANT_ID", &mut self.tenant_id),
            ("ARM_ACCESS_TOKEN", &mut self.access_token),
        ];
        for (var, slot) in overrides {
            if let Some(value) = std::env::var(var).ok().filter(|v| !v.is_empty()) {
                *slot = Some(value);
            }
        }
    }

    pub fn user_features(&self) -> UserFeatures {
        expand_features(self.features.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    fn test_get_config_dir() {
        let config_dir = get_config_dir().unwrap();
        assert!(config_dir.ends_with("armflow"));
        assert!(config_dir.exists());
    }

    #[test]
    #[serial]
    fn test_find_provider_file_local_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("armflow.yaml"), "{}").unwrap();
        fs::write(temp_dir.path().join("armflow.local.yaml"), "{}").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = temp_env::with_var_unset("ARMFLOW_CONFIG_PATH", find_provider_file);
        std::env::set_current_dir(original_dir).unwrap();

        assert!(result.unwrap().ends_with("armflow.local.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_provider_file_in_armflow_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        let dir = temp_dir.path().join(".armflow");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("armflow.yaml"), "{}").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = temp_env::with_var_unset("ARMFLOW_CONFIG_PATH", find_provider_file);
        std::env::set_current_dir(original_dir).unwrap();

        assert!(result.unwrap().ends_with(".armflow/armflow.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_provider_file_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.yaml");
        fs::write(&config_path, "{}").unwrap();

        let result = temp_env::with_var(
            "ARMFLOW_CONFIG_PATH",
            Some(config_path.to_str().unwrap()),
            find_provider_file,
        );
        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_load_provider_config() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("armflow.yaml");
        fs::write(
            &path,
            r#"
endpoint: https://management.example.test
subscription_id: 00000000-0000-0000-0000-000000000001
count_429_as_retry: true
features:
  key_vault:
    purge_soft_delete_on_destroy: false
"#,
        )
        .unwrap();

        let config = ProviderConfig::load(&path).unwrap();
        assert_eq!(
            config.endpoint.as_deref(),
            Some("https://management.example.test")
        );
        assert_eq!(config.count_429_as_retry, Some(true));
        assert!(
            !config
                .user_features()
                .key_vault
                .purge_soft_delete_on_destroy
        );
    }

    #[test]
    fn test_load_rejects_unknown_keys() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("armflow.yaml");
        fs::write(&path, "endpoints: nope\n").unwrap();

        assert!(matches!(
            ProviderConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    #[serial]
    fn test_apply_env() {
        let mut config = ProviderConfig {
            subscription_id: Some("from-file".to_string()),
            tenant_id: Some("tenant-from-file".to_string()),
            ..Default::default()
        };

        temp_env::with_vars(
            [
                ("ARM_SUBSCRIPTION_ID", Some("from-env")),
                ("ARM_ACCESS_TOKEN", Some("token")),
                ("ARM_TENANT_ID", Some("")),
                ("ARM_ENDPOINT", None),
            ],
            || config.apply_env(),
        );

        assert_eq!(config.subscription_id.as_deref(), Some("from-env"));
        assert_eq!(config.access_token.as_deref(), Some("token"));
        // empty variables do not clobber file values
        assert_eq!(config.tenant_id.as_deref(), Some("tenant-from-file"));
        assert_eq!(config.endpoint, None);
    }
}
