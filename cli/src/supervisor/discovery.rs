// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Binary discovery (§4.1): explicit env override, then the extracted
//! `<data-dir>/bin/` path, then system `PATH`. No embedding/download step is
//! implemented here — the binaries this workspace produces (`stigmer`,
//! `stigmer-workflow-worker`, `stigmer-agent-worker`) are plain cargo
//! artifacts, not something this crate bundles into itself; the discovery
//! *order* is what's in scope, matching the contract the real packaging
//! step would honor.

use crate::config::DaemonConfig;
use crate::supervisor::error::SupervisorError;
use std::path::PathBuf;

pub struct Discovery<'a> {
    config: &'a DaemonConfig,
}

impl<'a> Discovery<'a> {
    pub fn new(config: &'a DaemonConfig) -> Self {
        Discovery { config }
    }

    /// Order: (1) explicit env override, (2) `<data-dir>/bin/<name>`,
    /// (3) system PATH. Fails with reinstall guidance if none exist.
    pub fn find(&self, name: &str, env_override: Option<&PathBuf>) -> Result<PathBuf, SupervisorError> {
        if let Some(path) = env_override {
            if path.exists() {
                return Ok(path.clone());
            }
        }

        let extracted = self.config.bin_dir().join(name);
        if extracted.exists() {
            return Ok(extracted);
        }

        if let Some(on_path) = which(name) {
            return Ok(on_path);
        }

        Err(SupervisorError::BinaryNotFound {
            component: name.to_string(),
            guidance: format!(
                "reinstall the CLI, or set the component's env override so `{name}` can be located"
            ),
        })
    }

    pub fn find_workflow_worker(&self) -> Result<PathBuf, SupervisorError> {
        self.find("stigmer-workflow-worker", self.config.workflow_runner_bin.as_ref())
    }

    pub fn find_agent_worker(&self) -> Result<PathBuf, SupervisorError> {
        self.find("stigmer-agent-worker", self.config.agent_runner_script.as_ref())
    }
}

fn which(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).map(|dir| dir.join(name)).find(|candidate| candidate.is_file())
}

/// `<data-dir>/bin/.version`: the build id that produced the extracted
/// binaries. Re-extraction is skipped when this matches the running build.
pub fn read_version_marker(config: &DaemonConfig) -> Option<String> {
    std::fs::read_to_string(config.bin_dir().join(".version")).ok().map(|s| s.trim().to_string())
}

pub fn write_version_marker(config: &DaemonConfig, build_id: &str) -> std::io::Result<()> {
    std::fs::create_dir_all(config.bin_dir())?;
    std::fs::write(config.bin_dir().join(".version"), build_id)
}

pub fn needs_extraction(config: &DaemonConfig, build_id: &str) -> bool {
    read_version_marker(config).as_deref() != Some(build_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_reports_reinstall_guidance() {
        let dir = tempfile::tempdir().unwrap();
        let config = DaemonConfig {
            data_dir: dir.path().to_path_buf(),
            ..DaemonConfig::default()
        };
        let discovery = Discovery::new(&config);
        let err = discovery.find("definitely-not-a-real-binary", None).unwrap_err();
        assert!(matches!(err, SupervisorError::BinaryNotFound { .. }));
    }

    #[test]
    fn env_override_wins_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("custom-server");
        std::fs::write(&bin, b"#!/bin/sh\n").unwrap();
        let config = DaemonConfig {
            data_dir: dir.path().to_path_buf(),
            ..DaemonConfig::default()
        };
        let discovery = Discovery::new(&config);
        let found = discovery.find("stigmer-server", Some(&bin)).unwrap();
        assert_eq!(found, bin);
    }

    #[test]
    fn version_marker_roundtrip_skips_reextraction() {
        let dir = tempfile::tempdir().unwrap();
        let config = DaemonConfig {
            data_dir: dir.path().to_path_buf(),
            ..DaemonConfig::default()
        };
        assert!(needs_extraction(&config, "build-123"));
        write_version_marker(&config, "build-123").unwrap();
        assert!(!needs_extraction(&config, "build-123"));
        assert!(needs_extraction(&config, "build-456"));
    }
}
