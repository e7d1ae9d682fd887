//! Cron expression parsing
//!
//! Accepts the classic 5-field crontab form (`min hour dom month dow`) and
//! the 6/7-field form with seconds (and year). A 5-field expression fires at
//! second zero and numbers weekdays the crontab way (0 or 7 = Sunday,
//! 1 = Monday). The 6/7-field form is handed to the `cron` crate unchanged,
//! where 1 = Sunday.

use std::collections::BTreeSet;
use std::str::FromStr;

use crate::error::{Error, Result};

const WEEKDAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

pub fn parse_cron(expression: &str) -> Result<cron::Schedule> {
    let trimmed = expression.trim();
    let fields: Vec<&str> = trimmed.split_whitespace().collect();

    let normalized = match fields.as_slice() {
        [minute, hour, dom, month, dow] => {
            let dow = crontab_weekdays(dow).map_err(|reason| Error::invalid_cron(expression, reason))?;
            format!("0 {} {} {} {} {}", minute, hour, dom, month, dow)
        }
        [_, _, _, _, _, _] | [_, _, _, _, _, _, _] => trimmed.to_string(),
        [] => return Err(Error::invalid_cron(expression, "expression is empty")),
        other => {
            return Err(Error::invalid_cron(
                expression,
                format!("expected 5, 6 or 7 fields, got {}", other.len()),
            ));
        }
    };

    cron::Schedule::from_str(&normalized).map_err(|e| Error::invalid_cron(expression, e.to_string()))
}

/// Rewrite a crontab day-of-week field as day names
///
/// Numeric items (`0`, `1-5`, `*/2`, `5-7`) expand to the days they cover.
/// Named items (`MON-FRI`) and a bare `*` pass through.
fn crontab_weekdays(field: &str) -> std::result::Result<String, String> {
    let mut items = Vec::new();
    for item in field.split(',') {
        match numeric_weekdays(item)? {
            Some(days) => items.extend(days.into_iter().map(|d| WEEKDAY_NAMES[d as usize].to_string())),
            None => items.push(item.to_string()),
        }
    }
    Ok(items.join(","))
}

/// Days (0 = Sunday) covered by one list item, `None` when it is not numeric
fn numeric_weekdays(item: &str) -> std::result::Result<Option<BTreeSet<u8>>, String> {
    let (range, step) = match item.split_once('/') {
        Some((range, step)) => {
            let step: u8 = step
                .parse()
                .map_err(|_| format!("invalid day-of-week step '{}'", step))?;
            if step == 0 {
                return Err("day-of-week step must be positive".to_string());
            }
            (range, Some(step))
        }
        None => (item, None),
    };

    let (start, end) = match (range, range.split_once('-')) {
        ("*" | "?", _) if step.is_none() => return Ok(None),
        ("*" | "?", _) => (0, 7),
        (_, Some((lo, hi))) => match (weekday_number(lo)?, weekday_number(hi)?) {
            (Some(lo), Some(hi)) => (lo, hi),
            (None, None) => return Ok(None),
            _ => return Err(format!("day-of-week range '{}' mixes names and numbers", range)),
        },
        (single, None) => match weekday_number(single)? {
            Some(n) if step.is_some() => (n, 7),
            Some(n) => (n, n),
            None => return Ok(None),
        },
    };

    if start > end {
        return Err(format!("day-of-week range '{}' runs backwards", range));
    }

    let days = (start..=end)
        .step_by(step.unwrap_or(1) as usize)
        .map(|d| d % 7)
        .collect();
    Ok(Some(days))
}

fn weekday_number(text: &str) -> std::result::Result<Option<u8>, String> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(None);
    }
    match text.parse::<u8>() {
        Ok(n) if n <= 7 => Ok(Some(n)),
        _ => Err(format!("day of week must be between 0 and 7, got {}", text)),
    }
}
