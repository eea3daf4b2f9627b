use crate::AssociationCommands;
use crate::commands::prepare_read;
use crate::context::Context;
use armflow_azure::managementgroup::{
    ASSOCIATION_RESOURCE, SubscriptionAssociationRefresh, association,
};
use armflow_cloud::{
    ManagementGroupSubscriptionAssociationId, RefreshState, StateChangeConf, with_timeout,
};
use colored::Colorize;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_secs(15);

pub async fn handle(ctx: &Context, cmd: AssociationCommands) -> anyhow::Result<()> {
    match cmd {
        AssociationCommands::Read { id } => read(ctx, &id).await,
        AssociationCommands::Wait { id, gone, timeout } => {
            wait(ctx, &id, gone, Duration::from_secs(timeout)).await
        }
    }
}

async fn read(ctx: &Context, id: &str) -> anyhow::Result<()> {
    let (definition, mut state) = prepare_read(ASSOCIATION_RESOURCE, id)?;
    with_timeout(
        definition.timeouts.read,
        "reading subscription association",
        association::read(ctx.clients.management_groups.as_ref(), &mut state),
    )
    .await?;
    ctx.report(&definition, id, state).await
}

async fn wait(ctx: &Context, id: &str, gone: bool, timeout: Duration) -> anyhow::Result<()> {
    let id = ManagementGroupSubscriptionAssociationId::parse(id)?;
    let (pending, target) = if gone {
        (RefreshState::Exists, RefreshState::NotFound)
    } else {
        (RefreshState::NotFound, RefreshState::Exists)
    };

    println!("Waiting for {} to reach {}...", id, target.as_str());
    let probe = SubscriptionAssociationRefresh::new(ctx.clients.management_groups.as_ref(), id);
    let reached = StateChangeConf::new(vec![pending], vec![target], timeout)
        .with_poll_interval(POLL_INTERVAL)
        .wait_for_state(&probe)
        .await?;

    println!("{} {}", "✓".green(), reached.as_str());
    Ok(())
}
