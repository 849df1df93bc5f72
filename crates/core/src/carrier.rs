// SPDX-License-Identifier: MIT

//! Opaque, serializable carrier for distributed-trace context (spec.md §4.7,
//! §9 "Context propagation").
//!
//! Every task holds two of these: `trace_carrier` links all tasks of one
//! trace, `group_carrier` links all traces of one group. Executors inject
//! the carrier into orchestrator-resource annotations on creation and
//! extract it again on callback. Nothing outside this module is allowed to
//! know the concrete span/context type of whatever tracing SDK backs it —
//! the text-map shape is the only thing that crosses the boundary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A flat string-to-string map carrying distributed-trace baggage.
///
/// Implements the `opentelemetry` `Injector`/`Extractor` traits so a span
/// context can be written into and read back out of it without this crate
/// depending on any particular tracing backend beyond the propagation API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Carrier(BTreeMap<String, String>);

impl Carrier {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Serialize to the JSON string orchestrator annotations store.
    pub fn to_annotation(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parse back from an orchestrator annotation value. An empty or
    /// unparsable annotation yields an empty carrier rather than an error —
    /// a task with no upstream trace context is valid (e.g. the head task
    /// of a fresh submission before the composer injects one).
    pub fn from_annotation(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl opentelemetry::propagation::Injector for Carrier {
    fn set(&mut self, key: &str, value: String) {
        self.0.insert(key.to_string(), value);
    }
}

impl opentelemetry::propagation::Extractor for Carrier {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
#[path = "carrier_tests.rs"]
mod tests;
