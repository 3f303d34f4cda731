mod config;

pub use config::{Config, InvokerConfig, LoopConfig, RecipesConfig};

use std::path::PathBuf;

/// Returns the labflow data directory, creating it if needed.
///
/// `LABFLOW_HOME` wins when set. Otherwise `~/.config/labflow/`, or
/// `~/.config/labflow-dev/` when `LABFLOW_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("LABFLOW_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("LABFLOW_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("labflow-dev")
            } else {
                base_dir.join("labflow")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
