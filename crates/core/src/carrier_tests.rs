// SPDX-License-Identifier: MIT

use super::*;
use opentelemetry::propagation::{Extractor, Injector};

#[test]
fn round_trips_through_annotation_string() {
    let mut carrier = Carrier::new();
    carrier.insert("traceparent", "00-aaaa-bbbb-01");
    carrier.insert("tracestate", "vendor=value");

    let annotation = carrier.to_annotation();
    let restored = Carrier::from_annotation(&annotation);

    assert_eq!(restored.get("traceparent"), Some("00-aaaa-bbbb-01"));
    assert_eq!(restored.get("tracestate"), Some("vendor=value"));
}

#[test]
fn unparsable_annotation_yields_empty_carrier() {
    let carrier = Carrier::from_annotation("not json");
    assert!(carrier.is_empty());
}

#[test]
fn implements_injector_and_extractor() {
    let mut carrier = Carrier::new();
    carrier.set("k", "v".to_string());
    assert_eq!(Extractor::get(&carrier, "k"), Some("v"));
    assert_eq!(Extractor::keys(&carrier), vec!["k"]);
}
