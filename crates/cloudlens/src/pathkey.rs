//! Path-based access into [`serde_json::Value`] trees, and the distinguished
//! end-of-stream sentinel used to register deferred stages.

use serde_json::Value;

/// A single step of a [`Path`]: either a field name or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Step {
    Field(String),
    Index(usize),
}

/// An ordered, non-empty sequence of [`Step`]s addressing a location inside a
/// [`Value`] tree.
///
/// Dotted strings parse into steps; a segment that looks like a plain
/// non-negative integer is treated as an array index, everything else as a
/// field name. `"error"` → `[Field("error")]`; `"items.0.name"` →
/// `[Field("items"), Index(0), Field("name")]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path(Vec<Step>);

impl Path {
    /// Parse a dotted path string. An empty string parses to a single-step
    /// path whose one field name is itself empty, matching how `Path::from("")`
    /// is used nowhere in practice but still behaves predictably.
    pub fn parse(s: &str) -> Self {
        let steps = s
            .split('.')
            .map(|segment| {
                if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
                    segment
                        .parse::<usize>()
                        .map_or_else(|_| Step::Field(segment.to_string()), Step::Index)
                } else {
                    Step::Field(segment.to_string())
                }
            })
            .collect();
        Self(steps)
    }

    /// Build a single-step field path directly, without going through the
    /// dotted-string parser (used for capture-descriptor field names, which
    /// are plain identifiers, never dotted).
    pub fn field(name: impl Into<String>) -> Self {
        Self(vec![Step::Field(name.into())])
    }

    pub fn steps(&self) -> &[Step] {
        &self.0
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for Path {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

/// The well-known default key used when a pattern is supplied with no
/// explicit key.
pub fn default_key_path() -> Path {
    Path::field("message")
}

/// A path into a record, plus the distinguished end-of-stream sentinel.
///
/// `PathKey::EndOfStream` is unequal to every `PathKey::Field(_)` value and is
/// never resolved against a [`Value`] — it exists purely to carry the
/// "this is a deferred stage" intent through the API surface; see the
/// discussion of `at_end` vs. a generic `key=` parameter in `DESIGN.md`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathKey {
    Field(Path),
    EndOfStream,
}

impl PathKey {
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream)
    }
}

/// The end-of-stream sentinel, exposed for callers that want to compare
/// against it directly (mirroring how it would be compared in the dynamic
/// original rather than dispatched to via a dedicated method).
pub const END_OF_STREAM: PathKey = PathKey::EndOfStream;

impl From<&str> for PathKey {
    fn from(s: &str) -> Self {
        Self::Field(Path::parse(s))
    }
}

impl From<Path> for PathKey {
    fn from(p: Path) -> Self {
        Self::Field(p)
    }
}

fn get_step<'v>(value: &'v Value, step: &Step) -> Option<&'v Value> {
    match (step, value) {
        (Step::Field(name), Value::Object(map)) => map.get(name),
        (Step::Index(i), Value::Array(arr)) => arr.get(*i),
        _ => None,
    }
}

/// Returns the value at `path`, if every prefix resolves and the final step
/// is present.
pub fn get<'v>(value: &'v Value, path: &Path) -> Option<&'v Value> {
    let mut current = value;
    for step in path.steps() {
        current = get_step(current, step)?;
    }
    Some(current)
}

/// Like [`get`], but only returns a result when the resolved value is a
/// string (used by pattern matching, which operates on string content).
pub fn get_str<'v>(value: &'v Value, path: &Path) -> Option<&'v str> {
    get(value, path)?.as_str()
}

/// Returns `true` iff `path` resolves inside `value` (the final step is
/// present, regardless of its type).
pub fn exists(value: &Value, path: &Path) -> bool {
    get(value, path).is_some()
}

fn get_step_mut<'v>(value: &'v mut Value, step: &Step) -> Option<&'v mut Value> {
    match (step, value) {
        (Step::Field(name), Value::Object(map)) => map.get_mut(name),
        (Step::Index(i), Value::Array(arr)) => arr.get_mut(*i),
        _ => None,
    }
}

/// Sets the value at `path`, creating intermediate objects for any field
/// steps that do not yet exist. An intermediate index step that is missing
/// is not auto-created (arrays are not grown implicitly); in that case the
/// write is silently dropped, matching how a malformed/unreachable path is
/// simply inert rather than an error at this layer (capture fields always
/// use single-step paths in practice, so this edge case never triggers from
/// inside the engine itself).
pub fn set(value: &mut Value, path: &Path, new_value: Value) {
    let steps = path.steps();
    let Some((last, prefix)) = steps.split_last() else {
        return;
    };

    let mut current = value;
    for step in prefix {
        match step {
            Step::Field(name) => {
                if !current.is_object() {
                    *current = Value::Object(serde_json::Map::new());
                }
                let Value::Object(map) = current else {
                    unreachable!()
                };
                current = map.entry(name.clone()).or_insert(Value::Null);
            }
            Step::Index(_) => match get_step_mut(current, step) {
                Some(next) => current = next,
                None => return,
            },
        }
    }

    match last {
        Step::Field(name) => {
            if !current.is_object() {
                *current = Value::Object(serde_json::Map::new());
            }
            if let Value::Object(map) = current {
                map.insert(name.clone(), new_value);
            }
        }
        Step::Index(i) => {
            if let Value::Array(arr) = current
                && *i < arr.len()
            {
                arr[*i] = new_value;
            }
        }
    }
}

/// Removes and returns the value at `path`, if its parent is an object and
/// the final field is present. Removing through an array index is a no-op
/// (arrays are never re-indexed implicitly) and returns `None`.
pub fn remove(value: &mut Value, path: &Path) -> Option<Value> {
    let steps = path.steps();
    let (last, prefix) = steps.split_last()?;

    let mut current = value;
    for step in prefix {
        current = get_step_mut(current, step)?;
    }

    match last {
        Step::Field(name) => current.as_object_mut()?.shift_remove(name),
        Step::Index(_) => None,
    }
}

/// Appends `item` to the array at `path`. A no-op if the path does not
/// resolve to an array.
pub fn append(value: &mut Value, path: &Path, item: Value) {
    let steps = path.steps();
    let mut current = value;
    for step in steps {
        let Some(next) = get_step_mut(current, step) else {
            return;
        };
        current = next;
    }
    if let Value::Array(arr) = current {
        arr.push(item);
    }
}
