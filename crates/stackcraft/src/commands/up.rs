use crate::StackArgs;
use crate::runner;
use anyhow::Context as _;
use colored::Colorize;

pub async fn handle(args: StackArgs) -> anyhow::Result<()> {
    println!("{}", "Provisioning stack...".blue());

    let (session, result, plan) = runner::plan(args).await?;
    runner::print_plan(&plan);
    runner::print_warnings(&result.warnings);

    // Re-read under the lock so a concurrent run's save is not lost
    session
        .state()
        .update(|state| state.record_run(&result.resources, result.outputs.clone()))
        .await
        .context("failed to save stack state")?;

    println!();
    if plan.has_changes {
        println!("{}", "✓ Stack updated".green().bold());
    } else {
        println!("{}", "✓ No changes".green().bold());
    }

    if !result.outputs.is_empty() {
        println!();
        println!("{}", "Outputs:".bold());
        for (key, value) in result.outputs.iter() {
            let value = match value.as_str() {
                Some(s) => s.to_string(),
                None => value.to_string(),
            };
            println!("  {}: {}", key.cyan(), value);
        }
    }
    Ok(())
}
