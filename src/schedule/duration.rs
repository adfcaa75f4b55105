use std::fmt;
use std::str::FromStr;

use crate::error::StreamwatchError;

/// Duration units, largest first. Parsing and formatting share this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
}

impl TimeUnit {
    pub const ALL: [TimeUnit; 5] = [
        TimeUnit::Day,
        TimeUnit::Hour,
        TimeUnit::Minute,
        TimeUnit::Second,
        TimeUnit::Millisecond,
    ];

    pub fn millis(self) -> u64 {
        match self {
            TimeUnit::Day => 86_400_000,
            TimeUnit::Hour => 3_600_000,
            TimeUnit::Minute => 60_000,
            TimeUnit::Second => 1_000,
            TimeUnit::Millisecond => 1,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            TimeUnit::Day => "d",
            TimeUnit::Hour => "h",
            TimeUnit::Minute => "m",
            TimeUnit::Second => "s",
            TimeUnit::Millisecond => "ms",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for TimeUnit {
    type Err = StreamwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeUnit::ALL
            .into_iter()
            .find(|unit| unit.suffix() == s)
            .ok_or_else(|| {
                StreamwatchError::ValidationError(format!(
                    "unknown unit '{s}', expected one of: {}",
                    unit_list()
                ))
            })
    }
}

/// `d|h|m|s|ms`, used in usage strings.
pub fn unit_list() -> String {
    TimeUnit::ALL
        .iter()
        .map(|u| u.suffix())
        .collect::<Vec<_>>()
        .join("|")
}

/// Parse a list of unit suffixes such as `d,h,m`.
pub fn parse_unit_list(input: &str) -> Result<Vec<TimeUnit>, StreamwatchError> {
    let units = input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(TimeUnit::from_str)
        .collect::<Result<Vec<_>, _>>()?;
    if units.is_empty() {
        return Err(StreamwatchError::ValidationError(format!(
            "unit list must include at least one of: {}",
            unit_list()
        )));
    }
    Ok(units)
}

#[derive(Debug, Clone)]
pub struct FormatOptions {
    pub units: Vec<TimeUnit>,
    pub pad_zero: bool,
    pub display_zero_units: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            units: vec![
                TimeUnit::Day,
                TimeUnit::Hour,
                TimeUnit::Minute,
                TimeUnit::Second,
            ],
            pad_zero: false,
            display_zero_units: false,
        }
    }
}

impl FormatOptions {
    pub fn with_units(units: &[TimeUnit]) -> Self {
        Self {
            units: units.to_vec(),
            ..Self::default()
        }
    }
}

/// Parse `"1d 3h 34m 10s 403ms"` into milliseconds.
///
/// Every whitespace separated token must be `<digits><unit>`; units may
/// repeat and are summed.
pub fn from_time_units(input: &str) -> Result<u64, StreamwatchError> {
    let mut tokens = input.split_whitespace().peekable();
    if tokens.peek().is_none() {
        return Err(StreamwatchError::ValidationError(format!(
            "expected at least one of: {}",
            unit_list()
        )));
    }

    let mut total: u64 = 0;
    for token in tokens {
        let split = token
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(token.len());
        let (digits, suffix) = token.split_at(split);
        if digits.is_empty() || suffix.is_empty() {
            return Err(StreamwatchError::ValidationError(format!(
                "malformed token '{token}', expected <number><{}>",
                unit_list()
            )));
        }
        let count: u64 = digits.parse().map_err(|_| {
            StreamwatchError::ValidationError(format!("number too large in '{token}'"))
        })?;
        let unit = TimeUnit::from_str(suffix)?;
        total = count
            .checked_mul(unit.millis())
            .and_then(|ms| total.checked_add(ms))
            .ok_or_else(|| {
                StreamwatchError::ValidationError(format!("'{input}' overflows milliseconds"))
            })?;
    }
    Ok(total)
}

/// Format milliseconds using the selected units, largest first.
pub fn to_time_units(ms: u64, options: &FormatOptions) -> String {
    let mut remaining = ms;
    let mut tokens = Vec::new();
    let mut smallest = None;

    for unit in TimeUnit::ALL {
        if !options.units.contains(&unit) {
            continue;
        }
        smallest = Some(unit);
        let count = remaining / unit.millis();
        remaining -= count * unit.millis();
        if count == 0 && !options.display_zero_units {
            continue;
        }
        tokens.push(format_count(count, unit, options.pad_zero));
    }

    if tokens.is_empty() {
        if let Some(unit) = smallest {
            tokens.push(format_count(0, unit, options.pad_zero));
        }
    }
    tokens.join(" ")
}

fn format_count(count: u64, unit: TimeUnit, pad_zero: bool) -> String {
    if pad_zero {
        format!("{count:02}{unit}")
    } else {
        format!("{count}{unit}")
    }
}
