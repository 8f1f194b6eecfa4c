//! CronEvaluator backed by the `cron` crate.
//!
//! Newsletter schedules are stored as standard 5-field expressions
//! (`min hour day-of-month month day-of-week`, Sunday = 0 or 7). The `cron`
//! crate wants a seconds field and counts weekdays from 1 = Sunday, so
//! expressions are normalised before parsing.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

use crate::ports::CronEvaluator;

#[derive(Debug, Default, Clone, Copy)]
pub struct CronSchedule;

impl CronSchedule {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(expr: &str) -> Option<Schedule> {
        let normalized = normalize_cron(expr)?;
        Schedule::from_str(&normalized).ok()
    }
}

impl CronEvaluator for CronSchedule {
    fn next_run_after(&self, expr: &str, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let Some(schedule) = Self::parse(expr) else {
            tracing::warn!(schedule = expr, "invalid cron schedule");
            return None;
        };
        schedule.after(&from).next()
    }
}

/// Normalize a 5-field expression to the 6-field form by prepending "0 " for
/// seconds. 6/7-field expressions pass through untouched.
pub(crate) fn normalize_cron(expr: &str) -> Option<String> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    match fields.as_slice() {
        [minute, hour, dom, month, dow] => {
            let dow = translate_day_of_week(dow)?;
            Some(format!("0 {minute} {hour} {dom} {month} {dow}"))
        }
        [_, _, _, _, _, _] | [_, _, _, _, _, _, _] => Some(fields.join(" ")),
        _ => None,
    }
}

/// Map standard weekday numbers (0-7, Sunday = 0 or 7) to the `cron` crate's
/// numbering (1-7, Sunday = 1). Names and `*` are kept. A step keeps its
/// increment and shifts its start or range.
fn translate_day_of_week(field: &str) -> Option<String> {
    let parts = field
        .split(',')
        .map(translate_day_of_week_part)
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join(","))
}

fn translate_day_of_week_part(part: &str) -> Option<String> {
    let Some((base, step)) = part.split_once('/') else {
        return translate_day_of_week_base(part);
    };

    let step: u8 = step.parse().ok().filter(|s| *s > 0)?;
    let base = match base {
        "*" => base.to_string(),
        // `7/n` would only ever match Sunday.
        "7" => return None,
        _ => translate_day_of_week_base(base)?,
    };
    // A wrapped range cannot carry a step.
    if base.contains(',') {
        return None;
    }
    Some(format!("{base}/{step}"))
}

fn translate_day_of_week_base(part: &str) -> Option<String> {
    if part == "*" || part.chars().any(|c| c.is_ascii_alphabetic()) {
        return Some(part.to_string());
    }

    let shift = |n: u8| -> Option<u8> {
        match n {
            0 | 7 => Some(1),
            1..=6 => Some(n + 1),
            _ => None,
        }
    };

    match part.split_once('-') {
        None => shift(part.parse().ok()?).map(|n| n.to_string()),
        Some((start, end)) => {
            let start: u8 = start.parse().ok()?;
            let end: u8 = end.parse().ok()?;
            if start > end || end > 7 {
                return None;
            }
            match (start, end) {
                (0, 7) | (0, 6) | (1, 7) => Some("1-7".to_string()),
                (0, e) => Some(format!("1-{}", e + 1)),
                (s, 7) => Some(format!("{}-7,1", s + 1)),
                (s, e) => Some(format!("{}-{}", s + 1, e + 1)),
            }
        }
    }
}
