use crate::runner::{self, Session};
use anyhow::Context as _;
use colored::Colorize;
use stackcraft_cloud::Plan;

pub async fn handle(stack: Option<String>, yes: bool) -> anyhow::Result<()> {
    let session = Session::load(stack.as_deref())?;
    println!("{}", "Planning destroy...".yellow());
    println!("Stack: {}", session.stack.cyan());

    let manager = session.state();
    let state = manager.load().await.context("failed to load stack state")?;
    if state.is_empty() {
        println!();
        println!("Nothing to destroy: stack {} has no resources.", session.stack);
        return Ok(());
    }

    let plan = Plan::destroy(&state);
    runner::print_plan(&plan);

    if !yes {
        println!();
        println!("Re-run with {} to clear the stack state.", "--yes".cyan());
        return Ok(());
    }

    manager
        .update(|state| state.clear())
        .await
        .context("failed to save stack state")?;

    println!();
    println!("{}", "✓ Stack destroyed".green().bold());
    Ok(())
}
