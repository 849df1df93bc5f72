// SPDX-License-Identifier: MIT

//! Bounded container log retrieval and per-trace log file persistence
//! (spec.md §4.6 "Log retrieval": "on FAILED, the adapter pulls container
//! logs (bounded size) and writes them to a per-trace log file plus an
//! event payload").

use std::path::{Path, PathBuf};

/// Ceiling on how many trailing bytes of a failed job's logs are kept.
pub const LOG_RETRIEVAL_MAX_BYTES: usize = 64 * 1024;

/// Truncate raw container logs to the trailing `LOG_RETRIEVAL_MAX_BYTES`,
/// prefixing a truncation marker when anything was cut.
pub fn bound_logs(raw: &str) -> String {
    if raw.len() <= LOG_RETRIEVAL_MAX_BYTES {
        return raw.to_string();
    }
    let start = raw.len() - LOG_RETRIEVAL_MAX_BYTES;
    // Avoid splitting a UTF-8 char boundary.
    let start = (start..raw.len()).find(|&i| raw.is_char_boundary(i)).unwrap_or(start);
    format!("...[truncated]...\n{}", &raw[start..])
}

/// Path of the per-trace log file under `log_dir` (spec.md §4.6).
pub fn trace_log_path(log_dir: &Path, trace_id: &str, job_name: &str) -> PathBuf {
    log_dir.join(trace_id).join(format!("{job_name}.log"))
}

/// Best-effort write; a log-write failure never masks the primary job
/// failure (spec.md §7 "log writes are best-effort and never mask the
/// primary error").
pub fn write_trace_log(log_dir: &Path, trace_id: &str, job_name: &str, contents: &str) {
    let path = trace_log_path(log_dir, trace_id, job_name);
    if let Some(parent) = path.parent() {
        if let Err(err) = std::fs::create_dir_all(parent) {
            tracing::warn!(%trace_id, %job_name, error = %err, "failed to create trace log directory");
            return;
        }
    }
    if let Err(err) = std::fs::write(&path, contents) {
        tracing::warn!(%trace_id, %job_name, error = %err, "failed to write trace log file");
    }
}

#[cfg(test)]
#[path = "logs_tests.rs"]
mod tests;
