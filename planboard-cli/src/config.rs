//! Settings loading with figment
//!
//! Sources are merged in precedence order, later ones overriding earlier:
//! 1. Defaults (`PlannerSettings::default()`)
//! 2. `~/.planboard/config.{toml,yaml,yml,json}`
//! 3. `./.planboard/config.{toml,yaml,yml,json}`
//! 4. The file passed with `--config`
//! 5. `PLANBOARD_*` environment variables

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use planboard::PlannerSettings;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Directory holding configuration files, under home and project roots
pub const CONFIG_DIR: &str = ".planboard";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "PLANBOARD_";

const CONFIG_NAMES: [&str; 4] = ["config.toml", "config.yaml", "config.yml", "config.json"];

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Explicit configuration file not found
    #[error("configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Explicit configuration file has an unknown extension
    #[error("unsupported configuration format: {path}")]
    UnsupportedFormat { path: PathBuf },

    /// Merging or extracting failed
    #[error("failed to parse configuration: {source}")]
    Parse {
        #[from]
        source: figment::Error,
    },
}

/// Locates and merges configuration sources
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    home: Option<PathBuf>,
    project: Option<PathBuf>,
    explicit: Option<PathBuf>,
}

impl ConfigLoader {
    /// Loader rooted at the user's home and the current directory
    pub fn new() -> Self {
        Self {
            home: dirs::home_dir(),
            project: std::env::current_dir().ok(),
            explicit: None,
        }
    }

    /// Use a different home directory
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Use a different project directory
    pub fn with_project(mut self, project: impl Into<PathBuf>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Add an explicit configuration file
    pub fn with_file(mut self, file: Option<PathBuf>) -> Self {
        self.explicit = file;
        self
    }

    /// Build the merged figment
    pub fn figment(&self) -> Result<Figment, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(PlannerSettings::default()));

        for root in [&self.home, &self.project].into_iter().flatten() {
            for path in discover(root) {
                debug!(path = %path.display(), "merging configuration file");
                figment = merge_file(figment, &path)?;
            }
        }

        if let Some(path) = &self.explicit {
            if !path.is_file() {
                return Err(ConfigError::FileNotFound { path: path.clone() });
            }
            debug!(path = %path.display(), "merging explicit configuration file");
            figment = merge_file(figment, path)?;
        }

        Ok(figment.merge(Env::prefixed(ENV_PREFIX).map(|key| key.as_str().to_lowercase().into())))
    }

    /// Load the merged settings
    pub fn load(&self) -> Result<PlannerSettings, ConfigError> {
        let settings: PlannerSettings = self.figment()?.extract()?;
        debug!(?settings, "loaded planner settings");
        Ok(settings)
    }
}

/// Existing configuration files under `root/.planboard`
fn discover(root: &Path) -> Vec<PathBuf> {
    let dir = root.join(CONFIG_DIR);
    CONFIG_NAMES
        .iter()
        .map(|name| dir.join(name))
        .filter(|path| path.is_file())
        .collect()
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment, ConfigError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("toml") => Ok(figment.merge(Toml::file(path))),
        Some("yaml") | Some("yml") => Ok(figment.merge(Yaml::file(path))),
        Some("json") => Ok(figment.merge(Json::file(path))),
        _ => Err(ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_discover_finds_known_names_only() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(CONFIG_DIR);
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("config.yaml"), "max_rank_len: 10\n").unwrap();
        std::fs::write(dir.join("other.toml"), "").unwrap();
        assert_eq!(discover(temp.path()), vec![dir.join("config.yaml")]);
    }

    #[test]
    fn test_unsupported_extension() {
        let result = merge_file(Figment::new(), Path::new("settings.ini"));
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat { .. })));
    }
}
