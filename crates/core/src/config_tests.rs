// SPDX-License-Identifier: MIT

use super::*;
use std::sync::Mutex;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn lock_env() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[test]
fn default_config_has_shanghai_timezone_and_ceiling() {
    let config = Config::default();
    assert_eq!(config.timezone, "Asia/Shanghai");
    assert_eq!(config.retry_backoff_ceiling_secs, RETRY_BACKOFF_CEILING_SEC);
}

#[test]
fn load_without_file_or_env_returns_defaults() {
    let _guard = lock_env();
    let tmp = tempfile::TempDir::new().unwrap();
    let missing = tmp.path().join("does-not-exist.toml");

    unsafe { std::env::set_var("RCAB_CONFIG", &missing) };
    for var in env_var_names() {
        unsafe { std::env::remove_var(var) };
    }

    let config = Config::load().unwrap();
    assert_eq!(config.worker_pool_size, Config::default().worker_pool_size);

    unsafe { std::env::remove_var("RCAB_CONFIG") };
}

#[test]
fn env_override_wins_over_file() {
    let _guard = lock_env();
    let tmp = tempfile::TempDir::new().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(&path, "worker_pool_size = 4\n").unwrap();

    unsafe { std::env::set_var("RCAB_CONFIG", &path) };
    unsafe { std::env::set_var("RCAB_WORKER_POOL_SIZE", "9") };

    let config = Config::load().unwrap();
    assert_eq!(config.worker_pool_size, 9);

    unsafe { std::env::remove_var("RCAB_CONFIG") };
    unsafe { std::env::remove_var("RCAB_WORKER_POOL_SIZE") };
}

#[test]
fn file_without_env_is_honored() {
    let _guard = lock_env();
    let tmp = tempfile::TempDir::new().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(&path, "kube_namespace = \"rca-bench\"\n").unwrap();

    unsafe { std::env::set_var("RCAB_CONFIG", &path) };
    for var in env_var_names() {
        unsafe { std::env::remove_var(var) };
    }

    let config = Config::load().unwrap();
    assert_eq!(config.kube_namespace, "rca-bench");

    unsafe { std::env::remove_var("RCAB_CONFIG") };
}

#[test]
fn retry_backoff_ceiling_override_is_clamped() {
    let _guard = lock_env();
    let tmp = tempfile::TempDir::new().unwrap();
    let missing = tmp.path().join("does-not-exist.toml");
    unsafe { std::env::set_var("RCAB_CONFIG", &missing) };
    unsafe { std::env::set_var("RCAB_RETRY_BACKOFF_CEILING_SECS", "99999") };

    let config = Config::load().unwrap();
    assert_eq!(config.retry_backoff_ceiling_secs, RETRY_BACKOFF_CEILING_SEC);

    unsafe { std::env::remove_var("RCAB_CONFIG") };
    unsafe { std::env::remove_var("RCAB_RETRY_BACKOFF_CEILING_SECS") };
}

#[test]
fn malformed_env_value_is_rejected() {
    let _guard = lock_env();
    let tmp = tempfile::TempDir::new().unwrap();
    let missing = tmp.path().join("does-not-exist.toml");
    unsafe { std::env::set_var("RCAB_CONFIG", &missing) };
    unsafe { std::env::set_var("RCAB_WORKER_POOL_SIZE", "not-a-number") };

    let result = Config::load();
    assert!(result.is_err());

    unsafe { std::env::remove_var("RCAB_CONFIG") };
    unsafe { std::env::remove_var("RCAB_WORKER_POOL_SIZE") };
}

fn env_var_names() -> &'static [&'static str] {
    &[
        "RCAB_KUBE_NAMESPACE",
        "RCAB_TIMEZONE",
        "RCAB_TOKEN_BUCKET_CAPACITY",
        "RCAB_WORKER_POOL_SIZE",
        "RCAB_EVENT_STREAM_MAX_LEN",
        "RCAB_EVENT_PAYLOAD_MAX_BYTES",
        "RCAB_TOKEN_LEASE_TTL_SECS",
        "RCAB_RETRY_BACKOFF_CEILING_SECS",
        "RCAB_DETECTOR_ALGORITHM_ID",
        "RCAB_LOG_DIR",
    ]
}
