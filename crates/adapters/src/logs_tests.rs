// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn short_logs_pass_through_unchanged() {
    assert_eq!(bound_logs("hello"), "hello");
}

#[test]
fn long_logs_are_truncated_to_the_tail() {
    let raw = "x".repeat(LOG_RETRIEVAL_MAX_BYTES + 100);
    let bounded = bound_logs(&raw);
    assert!(bounded.starts_with("...[truncated]..."));
    assert!(bounded.len() < raw.len());
}

#[test]
fn write_and_read_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    write_trace_log(dir.path(), "trc-1", "tsk-1", "boom");
    let path = trace_log_path(dir.path(), "trc-1", "tsk-1");
    assert_eq!(std::fs::read_to_string(path).unwrap(), "boom");
}
