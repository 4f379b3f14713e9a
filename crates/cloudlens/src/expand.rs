//! The expansion marker: a reserved field, opaque to users, whose presence
//! tells a stage layer "replace this record with the ordered sequence of
//! values held here" (§4.3, §4.7).

use serde_json::Value;

/// Two rare private-use-area code points, chosen so real log data is
/// exceedingly unlikely to ever contain this exact field name.
const MARKER_KEY: &str = "\u{E000}\u{E001}cloudlens.expand";

/// Produce a value that, when assigned as a stage's record, tells the
/// layering rule to replace that record with `values` in order.
pub fn emit(values: impl IntoIterator<Item = Value>) -> Value {
    let mut map = serde_json::Map::with_capacity(1);
    map.insert(MARKER_KEY.to_string(), Value::Array(values.into_iter().collect()));
    Value::Object(map)
}

/// If `value` is an expansion wrapper, consume it and return its children;
/// otherwise hand `value` back unchanged.
pub fn take_children(value: Value) -> Result<Vec<Value>, Value> {
    match value {
        Value::Object(mut map) if map.len() == 1 && matches!(map.get(MARKER_KEY), Some(Value::Array(_))) => {
            let Some(Value::Array(children)) = map.remove(MARKER_KEY) else {
                unreachable!("checked above")
            };
            Ok(children)
        }
        other => Err(other),
    }
}
