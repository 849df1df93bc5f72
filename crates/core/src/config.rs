// SPDX-License-Identifier: MIT

//! Control-plane configuration (SPEC_FULL.md "Configuration").
//!
//! Resolution chain: built-in defaults, overridden by an on-disk TOML file,
//! then overridden by `RCAB_*` environment variables.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Hard ceiling on retry backoff regardless of what a task's retry policy
/// requests (spec.md §4.3, §7).
pub const RETRY_BACKOFF_CEILING_SEC: u64 = 3_600;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub kube_namespace: String,
    /// IANA timezone name used for wall-clock labels (spec.md §4.5).
    pub timezone: String,
    pub token_bucket_capacity: u32,
    pub worker_pool_size: usize,
    pub event_stream_max_len: usize,
    pub event_payload_max_bytes: usize,
    pub token_lease_ttl_secs: u64,
    pub retry_backoff_ceiling_secs: u64,
    pub detector_algorithm_id: String,
    pub log_dir: PathBuf,
    /// Padding added on top of `pre_duration + fault_duration` when sizing
    /// an INJECT_FAULT namespace lock's TTL (spec.md §4.5 "safety_margin").
    pub namespace_lock_safety_margin_secs: u64,
    /// How long a RUN_ALGORITHM admission waits on the EXECUTE bucket
    /// before the executor reschedules instead (spec.md §4.5 "WaitForToken
    /// timeout").
    pub token_wait_timeout_secs: u64,
    /// Default image used to perform a BUILD_IMAGE source checkout + build
    /// when the submission doesn't override it.
    pub image_builder_image: String,
    /// Default image used to drive a Helm install/upgrade for
    /// RESTART_PEDESTAL.
    pub pedestal_upgrader_image: String,
    /// Base path mounted as `WORKSPACE` in every orchestrator job (spec.md §6).
    pub workspace_root: PathBuf,
    /// Group/version/kind of the project-configured fault-injection custom
    /// resource (spec.md §1: the injection CRD's schema is an external
    /// collaborator; this crate only needs enough of its identity to watch
    /// and patch it).
    pub injection_group: String,
    pub injection_version: String,
    pub injection_kind: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kube_namespace: "rcab".into(),
            timezone: "Asia/Shanghai".into(),
            token_bucket_capacity: 8,
            worker_pool_size: 16,
            event_stream_max_len: 10_000,
            event_payload_max_bytes: 65_536,
            token_lease_ttl_secs: 300,
            retry_backoff_ceiling_secs: RETRY_BACKOFF_CEILING_SEC,
            detector_algorithm_id: "default".into(),
            log_dir: PathBuf::from("/var/log/rcab"),
            namespace_lock_safety_margin_secs: 120,
            token_wait_timeout_secs: 30,
            image_builder_image: "rcab/image-builder:latest".into(),
            pedestal_upgrader_image: "rcab/pedestal-upgrader:latest".into(),
            workspace_root: PathBuf::from("/workspace"),
            injection_group: "chaos.rcab.io".into(),
            injection_version: "v1".into(),
            injection_kind: "FaultInjection".into(),
        }
    }
}

/// Directory holding `config.toml`: `$XDG_CONFIG_HOME/rcab` or `~/.config/rcab`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("rcab");
    }
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config").join("rcab")
}

/// Path to the config file, honoring the `RCAB_CONFIG` override.
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("RCAB_CONFIG") {
        return PathBuf::from(path);
    }
    config_dir().join("config.toml")
}

impl Config {
    /// Load defaults, merge an on-disk file if present, then apply `RCAB_*`
    /// environment overrides. Never errors because the file is missing; a
    /// present-but-unparsable file is an error.
    pub fn load() -> Result<Self, CoreError> {
        let mut config = Self::default();

        let path = config_path();
        if let Ok(contents) = std::fs::read_to_string(&path) {
            config = toml::from_str(&contents)
                .map_err(|err| CoreError::Config(format!("{}: {err}", path.display())))?;
        }

        config.apply_env_overrides()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), CoreError> {
        if let Ok(value) = std::env::var("RCAB_KUBE_NAMESPACE") {
            self.kube_namespace = value;
        }
        if let Ok(value) = std::env::var("RCAB_TIMEZONE") {
            self.timezone = value;
        }
        if let Ok(value) = std::env::var("RCAB_TOKEN_BUCKET_CAPACITY") {
            self.token_bucket_capacity = parse_env("RCAB_TOKEN_BUCKET_CAPACITY", &value)?;
        }
        if let Ok(value) = std::env::var("RCAB_WORKER_POOL_SIZE") {
            self.worker_pool_size = parse_env("RCAB_WORKER_POOL_SIZE", &value)?;
        }
        if let Ok(value) = std::env::var("RCAB_EVENT_STREAM_MAX_LEN") {
            self.event_stream_max_len = parse_env("RCAB_EVENT_STREAM_MAX_LEN", &value)?;
        }
        if let Ok(value) = std::env::var("RCAB_EVENT_PAYLOAD_MAX_BYTES") {
            self.event_payload_max_bytes = parse_env("RCAB_EVENT_PAYLOAD_MAX_BYTES", &value)?;
        }
        if let Ok(value) = std::env::var("RCAB_TOKEN_LEASE_TTL_SECS") {
            self.token_lease_ttl_secs = parse_env("RCAB_TOKEN_LEASE_TTL_SECS", &value)?;
        }
        if let Ok(value) = std::env::var("RCAB_RETRY_BACKOFF_CEILING_SECS") {
            let parsed: u64 = parse_env("RCAB_RETRY_BACKOFF_CEILING_SECS", &value)?;
            self.retry_backoff_ceiling_secs = parsed.min(RETRY_BACKOFF_CEILING_SEC);
        }
        if let Ok(value) = std::env::var("RCAB_DETECTOR_ALGORITHM_ID") {
            self.detector_algorithm_id = value;
        }
        if let Ok(value) = std::env::var("RCAB_LOG_DIR") {
            self.log_dir = PathBuf::from(value);
        }
        if let Ok(value) = std::env::var("RCAB_NAMESPACE_LOCK_SAFETY_MARGIN_SECS") {
            self.namespace_lock_safety_margin_secs =
                parse_env("RCAB_NAMESPACE_LOCK_SAFETY_MARGIN_SECS", &value)?;
        }
        if let Ok(value) = std::env::var("RCAB_TOKEN_WAIT_TIMEOUT_SECS") {
            self.token_wait_timeout_secs = parse_env("RCAB_TOKEN_WAIT_TIMEOUT_SECS", &value)?;
        }
        if let Ok(value) = std::env::var("RCAB_IMAGE_BUILDER_IMAGE") {
            self.image_builder_image = value;
        }
        if let Ok(value) = std::env::var("RCAB_PEDESTAL_UPGRADER_IMAGE") {
            self.pedestal_upgrader_image = value;
        }
        if let Ok(value) = std::env::var("RCAB_WORKSPACE_ROOT") {
            self.workspace_root = PathBuf::from(value);
        }
        if let Ok(value) = std::env::var("RCAB_INJECTION_GROUP") {
            self.injection_group = value;
        }
        if let Ok(value) = std::env::var("RCAB_INJECTION_VERSION") {
            self.injection_version = value;
        }
        if let Ok(value) = std::env::var("RCAB_INJECTION_KIND") {
            self.injection_kind = value;
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, CoreError> {
    value.parse().map_err(|_| CoreError::Config(format!("{name}={value} is not valid")))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
