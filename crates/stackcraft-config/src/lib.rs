pub mod error;
pub mod settings;

pub use error::*;
pub use settings::{Settings, resolve_stack};

use std::path::PathBuf;

const STACK_INPUT_CANDIDATES: [&str; 3] = ["stack-input.yaml", "stack-input.yml", "stack-input.json"];

/// Stackcraft's user config directory, created on first use
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("stackcraft");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Find the stack input for the current project
///
/// Search order:
/// 1. `STACKCRAFT_STACK_INPUT` (direct path)
/// 2. current directory: stack-input.yaml, stack-input.yml, stack-input.json
/// 3. `./.stackcraft/`: same order
pub fn find_stack_input() -> Result<PathBuf> {
    if let Ok(input_path) = std::env::var("STACKCRAFT_STACK_INPUT") {
        let path = PathBuf::from(input_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!(
            "STACKCRAFT_STACK_INPUT points at {}, which does not exist",
            path.display()
        );
    }

    let current_dir = std::env::current_dir()?;

    for filename in &STACK_INPUT_CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let project_dir = current_dir.join(settings::DEFAULT_STATE_DIR);
    if project_dir.is_dir() {
        for filename in &STACK_INPUT_CANDIDATES {
            let path = project_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    Err(ConfigError::StackInputNotFound)
}
