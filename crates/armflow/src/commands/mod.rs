pub mod association;
pub mod features;
pub mod mg;
pub mod network;

use armflow_azure::provider::resource_definition;
use armflow_cloud::{ResourceDefinition, ResourceState};

/// Validate `id` as an importable `type_name` and start an empty state
/// record for it
pub fn prepare_read(
    type_name: &str,
    id: &str,
) -> anyhow::Result<(ResourceDefinition, ResourceState)> {
    let definition = resource_definition(type_name)?;
    definition.validate_import(id)?;
    let state = ResourceState::new(definition.type_name, id);
    Ok((definition, state))
}
