//! CSV rendering of screened rows.
//!
//! Every output row is the original row text (trailing delimiters trimmed)
//! with six fixed columns appended: `Result,SdnName,EntityID,Score,Programs,
//! Timestamp`. The header gets the same six names regardless of how wide the
//! input was.

use chrono::{SecondsFormat, Utc};

use crate::client::ScreenResult;
use crate::outcome::classify;

/// Append the fixed result column names to the original header line.
pub fn format_header(original: &str, separator: &str) -> String {
    [
        trim_row(original, separator),
        "Result",
        "SdnName",
        "EntityID",
        "Score",
        "Programs",
        "Timestamp",
    ]
    .join(separator)
}

/// Render one screened row.
///
/// Matched rows carry the outcome label, the disambiguated candidate name,
/// entity id, two-decimal score and program list. Unmatched rows (`is_set`
/// false) are labeled Clear with the result fields left empty.
pub fn format_row(
    original: &str,
    result: &ScreenResult,
    threshold: f64,
    separator: &str,
) -> String {
    format_row_at(original, result, threshold, separator, &timestamp())
}

/// Render a row whose search failed. The row keeps its original text; the
/// result columns stay empty (the failure reason is reported out-of-band,
/// never embedded in the CSV).
pub fn format_failed_row(original: &str, separator: &str) -> String {
    let ts = timestamp();
    [trim_row(original, separator), "", "", "", "", "", ts.as_str()].join(separator)
}

fn format_row_at(
    original: &str,
    result: &ScreenResult,
    threshold: f64,
    separator: &str,
    timestamp: &str,
) -> String {
    let outcome = classify(result.score, threshold).to_string();

    let (name, entity_id, score, programs) = match &result.candidate {
        Some(candidate) if result.is_set => (
            disambiguate_name(&candidate.name),
            candidate.entity_id.clone(),
            format!("{:.2}", result.score),
            format!("[{}]", candidate.programs.join(" ")),
        ),
        _ => Default::default(),
    };

    [
        trim_row(original, separator),
        outcome.as_str(),
        name.as_str(),
        entity_id.as_str(),
        score.as_str(),
        programs.as_str(),
        timestamp,
    ]
    .join(separator)
}

/// Strip line terminators and trailing delimiters from the original row so
/// appended columns line up no matter how the input was padded.
fn trim_row<'a>(original: &'a str, separator: &str) -> &'a str {
    original
        .trim_end_matches(['\r', '\n'])
        .trim_end_matches(separator)
}

/// Turn an embedded "Last, First" candidate name into "First Last" so it
/// cannot collide with the CSV's own delimiter.
fn disambiguate_name(name: &str) -> String {
    match name.split_once(',') {
        Some((last, first)) => format!("{} {}", first.trim(), last.trim()),
        None => name.to_string(),
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
