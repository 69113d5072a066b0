use crate::StackArgs;
use crate::runner;
use colored::Colorize;

pub async fn handle(args: StackArgs) -> anyhow::Result<()> {
    println!("{}", "Previewing stack...".blue());

    let (_, result, plan) = runner::plan(args).await?;
    runner::print_plan(&plan);
    runner::print_warnings(&result.warnings);

    if plan.has_changes {
        println!();
        println!("Run {} to apply.", "stackcraft up".cyan());
    }
    Ok(())
}
