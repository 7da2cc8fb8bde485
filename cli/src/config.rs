// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `DaemonConfig` (§4.1 ambient stack): defaults, then an optional YAML file,
//! then environment variable overrides, then a `validate()` pass — the same
//! layering shape the teacher's `NodeConfigManifest` loader uses.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Local,
    Cloud,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Env {
    Dev,
    Local,
    Test,
    Prod,
}

impl Env {
    /// §6: the debug HTTP surface (C8) never binds when `ENV == test`.
    pub fn debug_http_enabled(self) -> bool {
        !matches!(self, Env::Test)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub mode: Mode,
    pub env: Env,
    pub grpc_port: u16,
    pub debug_http_port: u16,
    pub engine_grpc_port: u16,
    pub engine_ui_port: u16,
    pub data_dir: PathBuf,
    pub db_path: Option<PathBuf>,
    pub server_bin: Option<PathBuf>,
    pub workflow_runner_bin: Option<PathBuf>,
    pub agent_runner_script: Option<PathBuf>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        DaemonConfig {
            mode: Mode::Local,
            env: Env::Dev,
            grpc_port: 7234,
            debug_http_port: 8234,
            engine_grpc_port: 7233,
            engine_ui_port: 8233,
            data_dir: default_data_dir(),
            db_path: None,
            server_bin: None,
            workflow_runner_bin: None,
            agent_runner_script: None,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs_next::data_dir()
        .map(|d| d.join("stigmer"))
        .unwrap_or_else(|| PathBuf::from(".stigmer"))
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl DaemonConfig {
    /// Layer order: built-in defaults, then `<data-dir>/config.yaml` or an
    /// explicit `--config` path if it exists, then environment variables.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = DaemonConfig::default();

        let yaml_path = explicit_path
            .map(PathBuf::from)
            .unwrap_or_else(|| config.data_dir.join("config.yaml"));
        if yaml_path.exists() {
            let raw = std::fs::read_to_string(&yaml_path).map_err(|source| ConfigError::Read {
                path: yaml_path.clone(),
                source,
            })?;
            config = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: yaml_path.clone(),
                source,
            })?;
        }

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(mode) = std::env::var("MODE") {
            self.mode = match mode.as_str() {
                "cloud" => Mode::Cloud,
                _ => Mode::Local,
            };
        }
        if let Ok(env) = std::env::var("ENV") {
            self.env = match env.as_str() {
                "local" => Env::Local,
                "test" => Env::Test,
                "prod" => Env::Prod,
                _ => Env::Dev,
            };
        }
        if let Ok(port) = std::env::var("GRPC_PORT") {
            if let Ok(port) = port.parse() {
                self.grpc_port = port;
            }
        }
        if let Ok(path) = std::env::var("DB_PATH") {
            self.db_path = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("STIGMER_SERVER_BIN") {
            self.server_bin = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("STIGMER_WORKFLOW_RUNNER_BIN") {
            self.workflow_runner_bin = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("STIGMER_AGENT_RUNNER_SCRIPT") {
            self.agent_runner_script = Some(PathBuf::from(path));
        }
    }

    /// §6: in `test`, the server must not bind any fixed port except the one
    /// it was explicitly asked to bind — reject the ambiguous "default port,
    /// test env" combination up front rather than fail later at bind time.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.env == Env::Test && std::env::var("GRPC_PORT").is_err() {
            return Err(ConfigError::Invalid(
                "ENV=test requires an explicit GRPC_PORT (no default port binding in test)".to_string(),
            ));
        }
        Ok(())
    }

    pub fn db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(|| self.data_dir.join("stigmer.db"))
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.data_dir.join("bin")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.data_dir.join("daemon.lock")
    }

    pub fn pid_path(&self, component: &str) -> PathBuf {
        self.data_dir.join(format!("{component}.pid"))
    }
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Local
    }
}

impl Default for Env {
    fn default() -> Self {
        Env::Dev
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_without_explicit_port_is_rejected() {
        std::env::remove_var("GRPC_PORT");
        let config = DaemonConfig {
            env: Env::Test,
            ..DaemonConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_http_disabled_only_in_test() {
        assert!(!Env::Test.debug_http_enabled());
        assert!(Env::Dev.debug_http_enabled());
        assert!(Env::Local.debug_http_enabled());
        assert!(Env::Prod.debug_http_enabled());
    }

    #[test]
    fn db_path_defaults_under_data_dir() {
        let config = DaemonConfig {
            data_dir: PathBuf::from("/tmp/stigmer-test"),
            ..DaemonConfig::default()
        };
        assert_eq!(config.db_path(), PathBuf::from("/tmp/stigmer-test/stigmer.db"));
    }
}
