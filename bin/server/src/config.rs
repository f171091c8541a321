//! Server configuration.
//!
//! Loaded via the `config` crate from an optional `adpipe.toml` in the
//! working directory, then from `ADPIPE__*` environment variables
//! (e.g. `ADPIPE__STORE__KIND=file`).

use adpipe_integration::CollaboratorTimeouts;
use adpipe_workflow::EngineConfig;
use serde::Deserialize;
use std::path::PathBuf;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: HttpConfig,

    /// Where session state is kept.
    #[serde(default)]
    pub store: StoreConfig,

    /// Deadlines for collaborator calls.
    #[serde(default)]
    pub timeouts: CollaboratorTimeouts,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Address to bind.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8000".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// Session store backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Sessions live in process memory and are lost on restart.
    #[default]
    Memory,
    /// One JSON file per session.
    File,
}

/// Session store settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub kind: StoreKind,

    /// Directory for the file store. Ignored by the memory store.
    #[serde(default = "default_store_directory")]
    pub directory: PathBuf,
}

fn default_store_directory() -> PathBuf {
    PathBuf::from("sessions")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            directory: default_store_directory(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from `adpipe.toml` (if present) and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read or a value has the wrong type.
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("adpipe").required(false))
            .add_source(
                config::Environment::with_prefix("ADPIPE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// The part of the configuration the engine consumes.
    #[must_use]
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            timeouts: self.timeouts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{Config, File, FileFormat};

    fn parse(toml: &str) -> ServerConfig {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .expect("build")
            .try_deserialize()
            .expect("deserialize")
    }

    #[test]
    fn defaults_when_empty() {
        let config = parse("");
        assert_eq!(config.server.bind_addr, "127.0.0.1:8000");
        assert_eq!(config.store.kind, StoreKind::Memory);
        assert_eq!(config.store.directory, PathBuf::from("sessions"));
        assert_eq!(config.timeouts, CollaboratorTimeouts::default());
    }

    #[test]
    fn file_store_and_timeout_overrides() {
        let config = parse(
            r#"
            [store]
            kind = "file"
            directory = "/var/lib/adpipe"

            [timeouts]
            video_secs = 900
            "#,
        );
        assert_eq!(config.store.kind, StoreKind::File);
        assert_eq!(config.store.directory, PathBuf::from("/var/lib/adpipe"));
        assert_eq!(config.timeouts.video_secs, 900);
        assert_eq!(
            config.engine().timeouts.default_secs,
            CollaboratorTimeouts::default().default_secs
        );
    }
}
