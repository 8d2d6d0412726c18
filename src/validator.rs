//! Schema and cross-field validation of normalized ad candidates.
//!
//! Every rule is checked so a rejected record carries all of its violations,
//! and every candidate lands in exactly one of the two output lists.

use chrono::DateTime;
use serde_json::Value;
use tracing::info;

use crate::model::{AdCandidate, DisplayFormat, InvalidRecord, NormalizedAd};

/// Result of validating a batch of candidates.
#[derive(Debug, Default)]
pub struct ValidationOutcome {
    pub valid: Vec<NormalizedAd>,
    pub invalid: Vec<InvalidRecord>,
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn check_timestamp(name: &str, value: &Value, required: bool, violations: &mut Vec<String>) -> Option<i64> {
    match value {
        Value::Null if !required => None,
        Value::Null => {
            violations.push(format!("{} is required", name));
            None
        }
        Value::Number(n) => match n.as_i64() {
            Some(ts) if DateTime::from_timestamp(ts, 0).is_some() => Some(ts),
            Some(ts) => {
                violations.push(format!("{}: invalid UNIX timestamp: {}", name, ts));
                None
            }
            None => {
                violations.push(format!("{}: timestamp must be an integer, got {}", name, n));
                None
            }
        },
        other => {
            violations.push(format!("{}: timestamp must be an integer, got {}", name, describe(other)));
            None
        }
    }
}

/// Check one candidate, returning the typed record or every violation found.
pub fn validate(candidate: &AdCandidate) -> Result<NormalizedAd, Vec<String>> {
    let mut violations = Vec::new();

    let ad_id = match &candidate.ad_id {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::String(_) => {
            violations.push("ad_id must not be empty".to_string());
            None
        }
        Value::Null => {
            violations.push("ad_id is required".to_string());
            None
        }
        other => {
            violations.push(format!("ad_id must be a string, got {}", describe(other)));
            None
        }
    };

    let is_active = match &candidate.is_active {
        Value::Bool(active) => Some(*active),
        other => {
            violations.push(format!("is_active must be a boolean, got {}", describe(other)));
            None
        }
    };

    let start_date_ts = check_timestamp("start_date_ts", &candidate.start_date_ts, true, &mut violations);
    let end_date_ts = check_timestamp("end_date_ts", &candidate.end_date_ts, false, &mut violations);

    let total_active_time_sec = match &candidate.total_active_time_sec {
        Value::Null => None,
        Value::Number(n) if n.is_i64() => n.as_i64(),
        other => {
            violations.push(format!("total_active_time_sec must be an integer, got {}", describe(other)));
            None
        }
    };

    let ad_group_id = match &candidate.ad_group_id {
        Value::Null => None,
        Value::String(id) => Some(id.clone()),
        other => {
            violations.push(format!("ad_group_id must be a string, got {}", describe(other)));
            None
        }
    };

    let display_format = match candidate.display_format.as_str().and_then(DisplayFormat::parse) {
        Some(format) => Some(format),
        None => {
            violations.push(format!(
                "display_format must be one of VIDEO, IMAGE, DCO, CAROUSEL, got {}",
                candidate.display_format
            ));
            None
        }
    };

    let ad_text = match &candidate.ad_text {
        Value::String(text) => Some(text.clone()),
        other => {
            violations.push(format!("ad_text must be a string, got {}", describe(other)));
            None
        }
    };

    if let (Some(start), Some(end)) = (start_date_ts, end_date_ts) {
        if end < start {
            violations.push("end_date cannot be earlier than start_date".to_string());
        }
    }

    match (ad_id, is_active, start_date_ts, display_format, ad_text) {
        (Some(ad_id), Some(is_active), Some(start_date_ts), Some(display_format), Some(ad_text))
            if violations.is_empty() =>
        {
            Ok(NormalizedAd {
                ad_id,
                is_active,
                start_date_ts,
                end_date_ts,
                total_active_time_sec,
                ad_group_id,
                grouped_ads_count: candidate.grouped_ads_count,
                display_format,
                media_mix: candidate.media_mix,
                ad_text,
                ad_lang_code: candidate.ad_lang_code.clone(),
            })
        }
        _ => Err(violations),
    }
}

/// Partition candidates into accepted records and rejected ones with reasons.
pub fn validate_all(candidates: Vec<AdCandidate>) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::default();

    for candidate in candidates {
        match validate(&candidate) {
            Ok(ad) => outcome.valid.push(ad),
            Err(violations) => outcome.invalid.push(InvalidRecord {
                reason: violations.join("; "),
                record: candidate,
            }),
        }
    }

    info!(
        "Validation finished. Got valid: {} and invalid: {} ads",
        outcome.valid.len(),
        outcome.invalid.len()
    );
    outcome
}
