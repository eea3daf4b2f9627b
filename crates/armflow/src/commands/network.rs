use crate::commands::prepare_read;
use crate::context::Context;
use armflow_azure::network::{SUBNET_RESOURCE, VIRTUAL_NETWORK_RESOURCE, subnet, virtual_network};
use armflow_cloud::with_timeout;

pub async fn read_virtual_network(ctx: &Context, id: &str) -> anyhow::Result<()> {
    let (definition, mut state) = prepare_read(VIRTUAL_NETWORK_RESOURCE, id)?;
    with_timeout(
        definition.timeouts.read,
        "reading virtual network",
        virtual_network::read(ctx.clients.virtual_networks.as_ref(), &mut state),
    )
    .await?;
    ctx.report(&definition, id, state).await
}

pub async fn read_subnet(ctx: &Context, id: &str) -> anyhow::Result<()> {
    let (definition, mut state) = prepare_read(SUBNET_RESOURCE, id)?;
    with_timeout(
        definition.timeouts.read,
        "reading subnet",
        subnet::read(ctx.clients.subnets.as_ref(), &mut state),
    )
    .await?;
    ctx.report(&definition, id, state).await
}
