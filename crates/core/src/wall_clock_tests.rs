// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn formats_in_the_named_timezone() {
    // 2024-01-01T00:00:00Z
    let label = format_wall_clock(1_704_067_200_000, "Asia/Shanghai");
    assert_eq!(label, "2024-01-01 08:00:00 CST");
}

#[test]
fn falls_back_to_utc_for_an_unknown_timezone() {
    let label = format_wall_clock(1_704_067_200_000, "Not/AZone");
    assert_eq!(label, "2024-01-01 00:00:00 UTC");
}
