use anyhow::Context as _;
use armflow_azure::{ClientOptions, Clients};
use armflow_cloud::{ResourceDefinition, ResourceState, StateStore};
use armflow_config::ProviderConfig;
use colored::Colorize;
use std::path::Path;

/// Load the provider file given on the command line, or discover one.
/// Environment overrides apply in both cases.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<ProviderConfig> {
    match path {
        Some(path) => {
            let mut config = ProviderConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?;
            config.apply_env();
            Ok(config)
        }
        None => ProviderConfig::discover().context("loading provider configuration"),
    }
}

/// Clients plus the optional state store shared by every command
pub struct Context {
    pub clients: Clients,
    store: Option<StateStore>,
}

impl Context {
    pub fn new(config: &ProviderConfig, save: bool) -> anyhow::Result<Self> {
        let options = ClientOptions::from_provider_config(config);
        tracing::debug!("Client options: {:?}", options);
        let clients = Clients::build(options).context("building Resource Manager clients")?;

        let store = if save {
            Some(StateStore::new(std::env::current_dir()?))
        } else {
            None
        };

        Ok(Self { clients, store })
    }

    /// Print a read result and, with `--save`, record it in the state file
    pub async fn report(
        &self,
        definition: &ResourceDefinition,
        original_id: &str,
        state: ResourceState,
    ) -> anyhow::Result<()> {
        if state.is_removed() {
            eprintln!("{} {} no longer exists", "!".yellow(), original_id.cyan());
        } else {
            println!("{}", serde_json::to_string_pretty(&state)?);
        }

        let Some(store) = &self.store else {
            return Ok(());
        };

        let mut file = store.load().await?;
        if state.is_removed() {
            let key = format!("{}:{}", definition.type_name, original_id);
            if file.untrack(&key).is_some() {
                eprintln!("{} removed {} from state", "✓".green(), original_id);
            }
        } else {
            file.track(state);
            eprintln!("{} state saved", "✓".green());
        }
        store.save(&file).await?;
        Ok(())
    }
}
