use crate::runner::Session;
use anyhow::Context as _;

pub async fn handle(key: Option<String>, stack: Option<String>) -> anyhow::Result<()> {
    let session = Session::load(stack.as_deref())?;
    let state = session
        .state()
        .load()
        .await
        .context("failed to load stack state")?;

    let Some(key) = key else {
        println!("{}", serde_json::to_string_pretty(&state.outputs)?);
        return Ok(());
    };

    let value = state
        .outputs
        .get(&key)
        .ok_or_else(|| anyhow::anyhow!("stack {} has no output '{}'", session.stack, key))?;
    match value.as_str() {
        Some(s) => println!("{}", s),
        None => println!("{}", value),
    }
    Ok(())
}
