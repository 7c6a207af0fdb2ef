use super::{CONFIG_FILE_NAME, Config};
use crate::error::ConfigError;
use anyhow::{Context, Result};
use directories::UserDirs;
use std::fs;
use std::path::{Path, PathBuf};

impl Config {
    /// Default working path: `~/.strata`.
    pub fn default_working_path() -> Result<PathBuf> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        Ok(home.join(".strata"))
    }

    /// Load `<working_path>/strata.toml` (or `config_path` when given), creating
    /// it with defaults on first use.
    pub fn load_or_init(working_path: &Path, config_path: Option<&Path>) -> Result<Self> {
        if !working_path.exists() {
            fs::create_dir_all(working_path).with_context(|| {
                format!("Failed to create working directory {}", working_path.display())
            })?;
        }

        let config_path = config_path.map_or_else(
            || working_path.join(CONFIG_FILE_NAME),
            Path::to_path_buf,
        );

        if config_path.exists() {
            let contents =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            let mut config: Config = toml::from_str(&contents)
                .map_err(|e| ConfigError::Load(e.to_string()))
                .context("Failed to parse config file")?;
            config.config_path.clone_from(&config_path);
            config.working_path = working_path.to_path_buf();
            config.apply_env_overrides();
            config.validate()?;
            Ok(config)
        } else {
            let mut config = Self {
                config_path,
                working_path: working_path.to_path_buf(),
                ..Self::default()
            };
            config.save()?;
            config.apply_env_overrides();
            config.validate()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.file_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "database.file_name must not be empty".into(),
            ));
        }
        if self.database.file_name.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "database.file_name must be a bare file name".into(),
            ));
        }
        if self.database.legacy_prefix.trim().is_empty() {
            return Err(ConfigError::Validation(
                "database.legacy_prefix must not be empty".into(),
            ));
        }
        if self.migration.staging_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "migration.staging_dir must not be empty".into(),
            ));
        }
        if self.migration.wipe_passes == 0 {
            return Err(ConfigError::Validation(
                "migration.wipe_passes must be >= 1".into(),
            ));
        }
        Ok(())
    }
}
