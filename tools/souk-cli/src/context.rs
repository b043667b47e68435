//! CLI execution context.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use souk_checkout::StorefrontConfig;

use crate::output::Output;

pub const CONFIG_NAMES: [&str; 3] = ["souk.toml", ".souk.toml", "souk.json"];

/// Execution context for CLI commands.
pub struct Context {
    pub config: StorefrontConfig,
    /// Where the config came from, if a file was found.
    pub config_path: Option<PathBuf>,
    pub output: Output,
    pub cwd: PathBuf,
}

impl Context {
    /// Load context, searching parent directories for a config file when no
    /// path is given.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let (config, config_path) = match config_path {
            Some(path) => {
                let path = resolve(&cwd, path);
                let config = StorefrontConfig::load(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?;
                (config, Some(path))
            }
            None => match Self::find_config(&cwd) {
                Some(path) => {
                    let config = StorefrontConfig::load(&path)
                        .with_context(|| format!("Failed to load config {}", path.display()))?;
                    (config, Some(path))
                }
                None => (StorefrontConfig::default(), None),
            },
        };

        Ok(Self {
            config,
            config_path,
            output,
            cwd,
        })
    }

    /// Find a config file in the directory tree.
    fn find_config(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            for name in &CONFIG_NAMES {
                let candidate = current.join(name);
                if candidate.exists() {
                    return Some(candidate);
                }
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Resolve a path relative to the working directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        resolve(&self.cwd, path)
    }
}

fn resolve(cwd: &Path, path: &str) -> PathBuf {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}
