// Parsing, statistics and formatting helpers.
//
// Backend payloads are loosely typed: numbers sometimes arrive as strings,
// dates come with or without a time part. Everything forgiving lives here so
// the pipeline stages can assume clean, typed values.
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};
use serde::{Deserialize, Deserializer};

/// Numeric text as `f64`: surrounding whitespace and `,` separators are
/// ignored, letters other than an exponent marker reject the value, and
/// non-finite results are `None`.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s
        .chars()
        .any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E')
    {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a date in any of the shapes the backend emits.
///
/// Accepted: `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS[.fff]`, `YYYY-MM-DD HH:MM:SS`
/// and full RFC 3339 timestamps. Anything else is `None`.
pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}

/// Serde adapter for numeric fields that may arrive as a JSON number, a
/// numeric string, `null`, or garbage. Garbage becomes `None` instead of
/// failing the whole row.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrText {
        Num(f64),
        Text(String),
        Other(serde_json::Value),
    }

    Ok(match Option::<NumOrText>::deserialize(deserializer)? {
        Some(NumOrText::Num(v)) if v.is_finite() => Some(v),
        Some(NumOrText::Text(s)) => parse_f64_safe(Some(&s)),
        _ => None,
    })
}

/// Serde adapter for boolean flags. CSV exports carry `true`/`1`/`t`.
pub fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolLike {
        Bool(bool),
        Num(i64),
        Text(String),
        Other(serde_json::Value),
    }

    Ok(match Option::<BoolLike>::deserialize(deserializer)? {
        Some(BoolLike::Bool(b)) => Some(b),
        Some(BoolLike::Num(n)) => Some(n != 0),
        Some(BoolLike::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" | "yes" | "y" => Some(true),
            "false" | "f" | "0" | "no" | "n" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

/// Serde adapter for identifiers. TINs are sometimes sent as numbers and
/// blank strings mean "absent".
pub fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => {
            let t = s.trim();
            (!t.is_empty()).then(|| t.to_string())
        }
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Arithmetic mean, 0 for an empty slice.
pub fn average(v: &[f64]) -> f64 {
    match v.len() {
        0 => 0.0,
        n => v.iter().sum::<f64>() / n as f64,
    }
}

/// Middle value (mean of the two middle values for even lengths), 0 when
/// empty. Sorts its own copy.
pub fn median(mut v: Vec<f64>) -> f64 {
    v.sort_by(f64::total_cmp);
    let n = v.len();
    match n {
        0 => 0.0,
        _ if n % 2 == 1 => v[n / 2],
        _ => (v[n / 2 - 1] + v[n / 2]) / 2.0,
    }
}

/// Sample standard deviation (n - 1). `None` below two samples, matching
/// SQL `STDDEV`.
pub fn std_dev(v: &[f64]) -> Option<f64> {
    if v.len() < 2 {
        return None;
    }
    let mean = average(v);
    let var = v.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (v.len() - 1) as f64;
    Some(var.sqrt())
}

/// Divide and scale to a percentage; 0 when there is nothing to divide by.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

pub fn round_to(v: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (v * factor).round() / factor
}

/// Shorten long company names for chart axes: anything longer than
/// `max_chars` keeps its first `max_chars - 3` characters plus `...`.
pub fn truncate_label(name: &str, max_chars: usize) -> String {
    if name.chars().count() <= max_chars {
        return name.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = name.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Fixed decimals with `en` thousands separators (`1,234,567.89`).
/// Non-finite values print as `0`.
pub fn format_number(n: f64, decimals: usize) -> String {
    if !n.is_finite() {
        return "0".to_string();
    }
    let fixed = format!("{:.*}", decimals, n.abs());
    let (whole, frac) = match fixed.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (fixed.as_str(), None),
    };
    let grouped = group_thousands(whole);
    let is_zero = fixed.bytes().all(|c| c == b'0' || c == b'.');
    let sign = if n < 0.0 && !is_zero { "-" } else { "" };
    match frac {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

// Works on the digit string, so magnitudes past u64 keep their digits.
fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}
