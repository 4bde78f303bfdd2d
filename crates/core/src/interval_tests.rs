// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    millis = { "250ms", Duration::from_millis(250) },
    bare_seconds = { "45", Duration::from_secs(45) },
    seconds = { "30s", Duration::from_secs(30) },
    minutes = { "5m", Duration::from_secs(300) },
    hours = { "2h", Duration::from_secs(7200) },
    days = { "1d", Duration::from_secs(86400) },
    long_suffix = { "10 minutes", Duration::from_secs(600) },
)]
fn parses_valid_intervals(input: &str, expected: Duration) {
    assert_eq!(parse_interval(input).unwrap(), expected);
}

#[parameterized(
    empty = { "" },
    no_number = { "ms" },
    bad_suffix = { "5y" },
    negative = { "-5s" },
)]
fn rejects_invalid_intervals(input: &str) {
    assert!(parse_interval(input).is_err());
}
