// src/progress/parse.rs

//! Helpers for turning tool output into progress percentages.

use std::sync::LazyLock;

use regex::Regex;

static PERCENT_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    // `\b` keeps "1234%" from matching as "234%".
    Regex::new(r"\b(\d{1,3})%").expect("percent regex is valid")
});

/// Extract the first `NN%` token from a line of tool output.
///
/// Values above 100 are ignored, so `"150%"` yields `None`.
pub fn parse_percent(line: &str) -> Option<i32> {
    let caps = PERCENT_TOKEN.captures(line)?;
    let value: i32 = caps.get(1)?.as_str().parse().ok()?;
    (value <= 100).then_some(value)
}

/// Map a 0..=100 percentage into `base..=base + span`.
///
/// `remap_percent(50, 20, 80) == 60` reserves 0-20% for an earlier phase.
pub fn remap_percent(percent: i32, base: i32, span: i32) -> i32 {
    base + (percent * span).div_euclid(100)
}
