use crate::MgCommands;
use crate::commands::prepare_read;
use crate::context::Context;
use anyhow::bail;
use armflow_azure::managementgroup::{
    ManagementGroupCreateRefresh, MANAGEMENT_GROUP_RESOURCE, resource,
};
use armflow_cloud::{ActionType, Plan, RefreshState, StateChangeConf, with_timeout};
use colored::Colorize;
use std::collections::BTreeSet;
use std::time::Duration;

const CREATE_POLL_INTERVAL: Duration = Duration::from_secs(30);

pub async fn handle(ctx: &Context, cmd: MgCommands) -> anyhow::Result<()> {
    match cmd {
        MgCommands::Read { id } => read(ctx, &id).await,
        MgCommands::Reconcile {
            name,
            subscriptions,
            apply,
        } => reconcile(ctx, &name, subscriptions, apply).await,
        MgCommands::WaitCreated { name, timeout } => {
            wait_created(ctx, &name, Duration::from_secs(timeout)).await
        }
    }
}

async fn read(ctx: &Context, id: &str) -> anyhow::Result<()> {
    let (definition, mut state) = prepare_read(MANAGEMENT_GROUP_RESOURCE, id)?;
    with_timeout(
        definition.timeouts.read,
        "reading management group",
        resource::read(ctx.clients.management_groups.as_ref(), &mut state),
    )
    .await?;
    ctx.report(&definition, id, state).await
}

async fn reconcile(
    ctx: &Context,
    name: &str,
    subscriptions: Vec<String>,
    apply: bool,
) -> anyhow::Result<()> {
    let api = ctx.clients.management_groups.as_ref();
    let desired: BTreeSet<String> = subscriptions.into_iter().collect();

    println!("{}", format!("Planning membership of {:?}...", name).blue());
    let plan = resource::plan(api, name, &desired).await?;
    print_plan(&plan);

    if !plan.has_changes {
        println!("{}", "Nothing to do".dimmed());
        return Ok(());
    }
    if !apply {
        println!();
        println!("Run again with {} to make these changes", "--apply".cyan());
        return Ok(());
    }

    let result = resource::apply_plan(api, &plan).await;
    println!();
    for done in &result.succeeded {
        println!("  {} {}", "✓".green(), done.message);
    }
    for failed in &result.failed {
        println!(
            "  {} {}: {}",
            "✗".red(),
            failed.action_id,
            failed.error.as_deref().unwrap_or("unknown error")
        );
    }
    println!("{}", format!("Finished in {}ms", result.duration_ms).dimmed());

    if !result.is_success() {
        bail!("{} membership change(s) failed", result.failed.len());
    }
    Ok(())
}

fn print_plan(plan: &Plan) {
    println!();
    for action in &plan.actions {
        let marker = match action.action_type {
            ActionType::Create => "+".green(),
            ActionType::Delete => "-".red(),
            ActionType::Update => "~".yellow(),
            ActionType::NoOp => "=".dimmed(),
        };
        println!("  {} {}", marker, action.description);
    }
    println!();
    println!("{}", plan.summary().to_string().bold());
}

async fn wait_created(ctx: &Context, name: &str, timeout: Duration) -> anyhow::Result<()> {
    let api = ctx.clients.management_groups.as_ref();
    println!("Waiting for Management Group {:?} to become readable...", name);

    let reached = StateChangeConf::new(
        vec![RefreshState::Pending],
        vec![RefreshState::Succeeded],
        timeout,
    )
    .with_poll_interval(CREATE_POLL_INTERVAL)
    .wait_for_state(&ManagementGroupCreateRefresh::new(api, name))
    .await?;

    println!("{} {}", "✓".green(), reached.as_str());
    Ok(())
}
