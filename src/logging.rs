use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "GOOD_VIBES_LOG";
const DEFAULT_DIRECTIVE: &str = "good_vibes_tui=info";

pub fn default_log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("good-vibes").join("good-vibes.log"))
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Sends tracing output to a log file; the terminal belongs to the UI.
///
/// Returns the log path, or `None` when no cache directory is available and
/// logging stays disabled.
pub fn init() -> Result<Option<PathBuf>> {
    let Some(path) = default_log_path() else {
        return Ok(None);
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("logging: failed to create {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("logging: failed to open {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!("logging: {err}"))?;

    tracing::info!(version = crate::VERSION, "good vibes starting");
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_lives_in_cache_dir() {
        if let Some(path) = default_log_path() {
            assert!(path.ends_with("good-vibes/good-vibes.log"));
        }
    }
}
