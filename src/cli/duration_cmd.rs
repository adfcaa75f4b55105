use crate::error::StreamwatchError;
use crate::schedule::duration::parse_unit_list;
use crate::schedule::{from_time_units, to_time_units, FormatOptions};

/// Parsed duration, normalized for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationReport {
    pub millis: u64,
    pub formatted: String,
}

/// Accept either duration tokens (`1h 30m`) or a bare millisecond count.
pub fn evaluate(
    tokens: &[String],
    units: Option<&str>,
    pad_zero: bool,
    display_zero_units: bool,
) -> Result<DurationReport, StreamwatchError> {
    let input = tokens.join(" ");
    let millis = match input.trim().parse::<u64>() {
        Ok(ms) => ms,
        Err(_) => from_time_units(&input)?,
    };

    let mut options = match units {
        Some(list) => FormatOptions::with_units(&parse_unit_list(list)?),
        None => FormatOptions::default(),
    };
    options.pad_zero = pad_zero;
    options.display_zero_units = display_zero_units;

    Ok(DurationReport {
        millis,
        formatted: to_time_units(millis, &options),
    })
}

pub fn run_duration(
    tokens: &[String],
    units: Option<&str>,
    pad_zero: bool,
    display_zero_units: bool,
    json: bool,
) -> Result<(), StreamwatchError> {
    let report = evaluate(tokens, units, pad_zero, display_zero_units)?;
    if json {
        let value = serde_json::json!({
            "milliseconds": report.millis,
            "formatted": report.formatted,
        });
        println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
    } else {
        println!("{}", report.millis);
        println!("{}", report.formatted);
    }
    Ok(())
}
