use armflow_config::ProviderConfig;

pub fn handle(config: &ProviderConfig) -> anyhow::Result<()> {
    let features = config.user_features();
    println!("{}", serde_json::to_string_pretty(&features)?);
    Ok(())
}
