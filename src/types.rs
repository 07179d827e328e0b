// src/types.rs

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// How queue progress is shown while work is pending.
///
/// - `Spinner`: redraw a glyph spinner on stderr (default).
/// - `None`: stay quiet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStyle {
    #[default]
    Spinner,
    None,
}

impl FromStr for ProgressStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spinner" => Ok(ProgressStyle::Spinner),
            "none" => Ok(ProgressStyle::None),
            other => Err(format!(
                "unknown progress style '{other}' (expected \"spinner\" or \"none\")"
            )),
        }
    }
}

/// Parse a duration such as `"300ms"`, `"2s"`, `"1m"` or `"1h"`.
///
/// The number must be a whole, non-negative integer and the unit is
/// mandatory.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' has no unit (use ms, s, m or h)"))?;
    let (digits, unit) = s.split_at(split);

    let value: u64 = digits
        .parse()
        .map_err(|e| format!("invalid number in duration '{s}': {e}"))?;

    let millis_per_unit: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "ms" => 1,
        "s" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        other => return Err(format!("unsupported duration unit '{other}' (use ms, s, m or h)")),
    };

    value
        .checked_mul(millis_per_unit)
        .map(Duration::from_millis)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}
