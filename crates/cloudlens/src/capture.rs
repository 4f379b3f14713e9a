//! Applies a matched regex's captures to a record, per the declared
//! [`CaptureDescriptor`]s: string assignment, numeric parsing, or date
//! parsing into Unix-epoch seconds.

use regex::Captures;
use serde_json::Value;

use crate::pathkey::{self, Path};
use crate::pattern::{CaptureDescriptor, CaptureType, translate_date_format};

/// Apply every declared capture from a successful match to `record`.
///
/// Group `i` (1-indexed, since group 0 is the whole match) corresponds to
/// `captures[i - 1]`. A non-participating group removes any existing field
/// of that name; a participating group converts by type and, on parse
/// failure for `Number`/`Date`, leaves the record untouched at that field
/// (never partially overwritten — see the Open Question resolution in
/// `DESIGN.md`).
pub fn apply(record: &mut Value, descriptors: &[CaptureDescriptor], matched: &Captures<'_>) {
    for (i, descriptor) in descriptors.iter().enumerate() {
        let field = Path::field(descriptor.name.clone());
        let group = matched.get(i + 1);

        let Some(group) = group else {
            pathkey::remove(record, &field);
            continue;
        };

        let text = group.as_str();
        match descriptor.ty {
            CaptureType::String => pathkey::set(record, &field, Value::String(text.to_string())),
            CaptureType::Number => {
                if let Some(n) = parse_number(text) {
                    pathkey::set(record, &field, n);
                }
            }
            CaptureType::Date => {
                // `format` is always `Some` for `Date` captures by construction
                // (the pattern compiler rejects a format-less `Date` capture).
                if let Some(format) = &descriptor.format
                    && let Some(epoch_secs) = parse_date_epoch_seconds(text, format)
                    && let Some(n) = serde_json::Number::from_f64(epoch_secs)
                {
                    pathkey::set(record, &field, Value::Number(n));
                }
            }
        }
    }
}

/// Parse `text` as a locale-neutral decimal number, preferring an exact
/// integer representation and falling back to floating point.
fn parse_number(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    let f = trimmed.parse::<f64>().ok()?;
    serde_json::Number::from_f64(f).map(Value::Number)
}

/// Parse `text` against `format` (this engine's date token language) and
/// return the Unix-epoch time in seconds, interpreting the parsed moment as
/// UTC.
fn parse_date_epoch_seconds(text: &str, format: &str) -> Option<f64> {
    let chrono_format = translate_date_format(format).ok()?;
    let naive = chrono::NaiveDateTime::parse_from_str(text, &chrono_format).ok()?;
    let utc = naive.and_utc();
    let secs = utc.timestamp();
    let nanos = f64::from(utc.timestamp_subsec_nanos());
    #[allow(clippy::cast_precision_loss)]
    Some(secs as f64 + nanos / 1_000_000_000.0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::pattern::CompiledPattern;
    use serde_json::json;

    fn captures_for<'r>(pattern: &'r regex::Regex, haystack: &'r str) -> Captures<'r> {
        pattern.captures(haystack).expect("pattern should match")
    }

    #[test]
    fn string_capture_sets_field() {
        let compiled = CompiledPattern::compile(r"level=(?<level>\w+)").unwrap();
        let CompiledPattern::Regex { regex, captures } = compiled else {
            panic!("expected regex")
        };
        let m = captures_for(&regex, "level=error");
        let mut record = json!({});
        apply(&mut record, &captures, &m);
        assert_eq!(record, json!({"level": "error"}));
    }

    #[test]
    fn number_capture_parses_integer() {
        let compiled = CompiledPattern::compile(r"code=(?<code:Number>\d+)").unwrap();
        let CompiledPattern::Regex { regex, captures } = compiled else {
            panic!("expected regex")
        };
        let m = captures_for(&regex, "code=255");
        let mut record = json!({});
        apply(&mut record, &captures, &m);
        assert_eq!(record, json!({"code": 255}));
    }

    #[test]
    fn number_capture_parses_float() {
        let compiled = CompiledPattern::compile(r"latency=(?<ms:Number>[0-9.]+)").unwrap();
        let CompiledPattern::Regex { regex, captures } = compiled else {
            panic!("expected regex")
        };
        let m = captures_for(&regex, "latency=12.5");
        let mut record = json!({});
        apply(&mut record, &captures, &m);
        assert_eq!(record["ms"].as_f64(), Some(12.5));
    }

    #[test]
    fn number_capture_failed_parse_leaves_field_untouched() {
        // group matches but the declared type can't parse the text; the
        // regex only lets through `\w+` so force a non-numeric capture by
        // matching a word, not digits, against a Number field to simulate
        // an inconsistent config.
        let compiled = CompiledPattern::compile(r"code=(?<code:Number>\w+)").unwrap();
        let CompiledPattern::Regex { regex, captures } = compiled else {
            panic!("expected regex")
        };
        let m = captures_for(&regex, "code=abc");
        let mut record = json!({"code": "previous"});
        apply(&mut record, &captures, &m);
        assert_eq!(record, json!({"code": "previous"}));
    }

    #[test]
    fn non_participating_group_removes_field() {
        let compiled = CompiledPattern::compile(r"(?<a>\w+)?-tail").unwrap();
        let CompiledPattern::Regex { regex, captures } = compiled else {
            panic!("expected regex")
        };
        let m = captures_for(&regex, "-tail");
        let mut record = json!({"a": "stale"});
        apply(&mut record, &captures, &m);
        assert_eq!(record, json!({}));
    }

    #[test]
    fn date_capture_sets_epoch_seconds() {
        let compiled = CompiledPattern::compile(
            r"Starting test .* at (?<t:Date[yyyy-MM-dd' 'HH:mm:ss.SSS]>.{23})",
        )
        .unwrap();
        let CompiledPattern::Regex { regex, captures } = compiled else {
            panic!("expected regex")
        };
        let m = captures_for(&regex, "Starting test X at 2016-09-08 19:08:42.123");
        let mut record = json!({});
        apply(&mut record, &captures, &m);
        let expected = chrono::NaiveDate::from_ymd_opt(2016, 9, 8)
            .unwrap()
            .and_hms_milli_opt(19, 8, 42, 123)
            .unwrap()
            .and_utc()
            .timestamp() as f64
            + 0.123;
        let actual = record["t"].as_f64().unwrap();
        assert!((actual - expected).abs() < 1e-6, "{actual} vs {expected}");
    }

    #[test]
    fn date_capture_failed_parse_leaves_field_untouched() {
        let compiled =
            CompiledPattern::compile(r"at (?<t:Date[yyyy-MM-dd]>\w+)").unwrap();
        let CompiledPattern::Regex { regex, captures } = compiled else {
            panic!("expected regex")
        };
        let m = captures_for(&regex, "at notadate");
        let mut record = json!({});
        apply(&mut record, &captures, &m);
        assert_eq!(record, json!({}));
    }
}
