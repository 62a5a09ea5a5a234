//! # apix-config
//!
//! Layered configuration loading for apix using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`APIX_*` prefix, `__` as separator)
//! 2. Project-level `.apix/config.toml`
//! 3. User-level `~/.config/apix/config.toml`
//! 4. Built-in defaults
//!
//! `APIX_BUILDER__IMPLICIT_SCOPE` maps to `builder.implicit_scope`.
//!
//! ```no_run
//! use apix_config::ApixConfig;
//!
//! let config = ApixConfig::load_with_dotenv().expect("config");
//! println!("flags template: {}", config.builder.flags_template);
//! ```

mod builder;
mod error;
mod log;

pub use builder::BuilderConfig;
pub use error::ConfigError;
pub use log::LogConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ApixConfig {
    #[serde(default)]
    pub builder: BuilderConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl ApixConfig {
    /// Load configuration from TOML files and environment variables.
    ///
    /// Does not read `.env`; see [`ApixConfig::load_with_dotenv`].
    ///
    /// # Errors
    /// Returns [`ConfigError::Figment`] when a source fails to parse.
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment().extract().map_err(ConfigError::from)
    }

    /// Load `.env` from the current directory first, then [`ApixConfig::load`].
    ///
    /// # Errors
    /// See [`ApixConfig::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Load with an explicit project config file instead of `.apix/config.toml`.
    ///
    /// # Errors
    /// See [`ApixConfig::load`].
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("APIX_").split("__"))
            .extract()
            .map_err(ConfigError::from)
    }

    /// The provider chain, public so tests can add providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(global_path));
        }

        let local_path = PathBuf::from(".apix/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("APIX_").split("__"))
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("apix").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_loads() {
        let config = ApixConfig::default();
        assert_eq!(config.builder.hash_function, "qHash");
        assert_eq!(config.log.level, "warn");
    }

    #[test]
    fn figment_builds_without_files() {
        figment::Jail::expect_with(|_jail| {
            let config: ApixConfig = ApixConfig::figment().extract()?;
            assert_eq!(config.builder.interface_suffix, "Interface");
            Ok(())
        });
    }
}
