//! Stateful, single-pass pull sources. A [`Source`] is the producer end of
//! the pipeline; [`crate::stream::Stream`] always holds exactly one boxed
//! source, swapping it out as stages are layered on (§4.3) or as `run`
//! re-seats it (§4.6).

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path as FsPath, PathBuf};

use serde_json::Value;

use crate::error::CloudLensError;

/// A single-pass pull function. `next()` returns `None` to signal permanent
/// exhaustion — a well-behaved `Source` never returns `Some` again after its
/// first `None`.
pub trait Source {
    fn next(&mut self) -> Option<Value>;
}

/// Replays a fixed, in-memory sequence of values — used both for
/// `Stream::new` and as the replay source installed by `run(with_history =
/// true)`.
pub struct VecSource {
    values: VecDeque<Value>,
}

impl VecSource {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values: values.into(),
        }
    }
}

impl Source for VecSource {
    fn next(&mut self) -> Option<Value> {
        self.values.pop_front()
    }
}

/// Always exhausted — installed by `run(with_history = false)`.
pub struct EmptySource;

impl Source for EmptySource {
    fn next(&mut self) -> Option<Value> {
        None
    }
}

/// Wraps an arbitrary user pull closure.
pub struct FnSource<F> {
    f: F,
}

impl<F> FnSource<F>
where
    F: FnMut() -> Option<Value>,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Source for FnSource<F>
where
    F: FnMut() -> Option<Value>,
{
    fn next(&mut self) -> Option<Value> {
        (self.f)()
    }
}

/// Streams lines from a text file as `{ "message": line }` records. The file
/// is opened lazily on the first `next()` call (not at construction) and
/// dropped — closing the handle — as soon as EOF is reached.
pub struct TextFileSource {
    path: PathBuf,
    reader: Option<BufReader<File>>,
    done: bool,
}

impl TextFileSource {
    /// Construct a source for `path`. Does not touch the filesystem yet;
    /// opening is deferred to the first pull (§4.5).
    pub fn new(path: impl AsRef<FsPath>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            reader: None,
            done: false,
        }
    }
}

impl Source for TextFileSource {
    fn next(&mut self) -> Option<Value> {
        if self.done {
            return None;
        }

        if self.reader.is_none() {
            match File::open(&self.path) {
                Ok(file) => self.reader = Some(BufReader::new(file)),
                Err(_) => {
                    self.done = true;
                    return None;
                }
            }
        }

        let reader = self.reader.as_mut()?;
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => {
                self.done = true;
                self.reader = None; // drop the handle, closing the file
                None
            }
            Ok(_) => {
                let trimmed = line.trim_end_matches(['\r', '\n']);
                Some(serde_json::json!({ "message": trimmed }))
            }
        }
    }
}

/// Construct a text-file source, failing fast if the path does not look
/// openable at all (existence check only — real I/O errors during reading
/// still just end the stream early, matching `TextFileSource`'s lazy-open
/// contract).
pub fn open_text_file(path: impl AsRef<FsPath>) -> Result<TextFileSource, CloudLensError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(CloudLensError::SourceOpenError {
            path: path.to_path_buf(),
            reason: "file not found".to_string(),
        });
    }
    Ok(TextFileSource::new(path))
}

/// Reads a whole JSON document eagerly (JSON cannot be parsed incrementally
/// the way lines can) and streams its elements: the document's root array,
/// if it is one, else a single-element sequence containing the root.
pub fn read_json_file(path: impl AsRef<FsPath>) -> Result<VecSource, CloudLensError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| CloudLensError::SourceOpenError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let root: Value =
        serde_json::from_str(&text).map_err(|e| CloudLensError::SourceOpenError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    let values = match root {
        Value::Array(items) => items,
        other => vec![other],
    };
    Ok(VecSource::new(values))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn vec_source_yields_in_order_then_ends() {
        let mut s = VecSource::new(vec![serde_json::json!(1), serde_json::json!(2)]);
        assert_eq!(s.next(), Some(serde_json::json!(1)));
        assert_eq!(s.next(), Some(serde_json::json!(2)));
        assert_eq!(s.next(), None);
        assert_eq!(s.next(), None);
    }

    #[test]
    fn empty_source_is_always_exhausted() {
        let mut s = EmptySource;
        assert_eq!(Source::next(&mut s), None);
    }

    #[test]
    fn fn_source_delegates_to_closure() {
        let mut calls = 0;
        let mut s = FnSource::new(move || {
            calls += 1;
            if calls <= 2 {
                Some(serde_json::json!(calls))
            } else {
                None
            }
        });
        assert_eq!(s.next(), Some(serde_json::json!(1)));
        assert_eq!(s.next(), Some(serde_json::json!(2)));
        assert_eq!(s.next(), None);
    }

    #[test]
    fn text_file_source_opens_lazily_and_wraps_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "first").unwrap();
        writeln!(file, "second").unwrap();

        let mut source = open_text_file(file.path()).unwrap();
        assert_eq!(
            source.next(),
            Some(serde_json::json!({"message": "first"}))
        );
        assert_eq!(
            source.next(),
            Some(serde_json::json!({"message": "second"}))
        );
        assert_eq!(source.next(), None);
    }

    #[test]
    fn text_file_source_rejects_missing_path_at_open_time() {
        let err = open_text_file("/no/such/path/ever").unwrap_err();
        assert!(matches!(err, CloudLensError::SourceOpenError { .. }));
    }

    #[test]
    fn json_file_source_streams_array_elements() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"a":1}},{{"a":2}}]"#).unwrap();

        let mut source = read_json_file(file.path()).unwrap();
        assert_eq!(source.next(), Some(serde_json::json!({"a": 1})));
        assert_eq!(source.next(), Some(serde_json::json!({"a": 2})));
        assert_eq!(source.next(), None);
    }

    #[test]
    fn json_file_source_wraps_non_array_root_as_single_element() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"a":1}}"#).unwrap();

        let mut source = read_json_file(file.path()).unwrap();
        assert_eq!(source.next(), Some(serde_json::json!({"a": 1})));
        assert_eq!(source.next(), None);
    }

    #[test]
    fn json_file_source_rejects_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = read_json_file(file.path()).unwrap_err();
        assert!(matches!(err, CloudLensError::SourceOpenError { .. }));
    }
}
