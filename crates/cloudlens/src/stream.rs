//! The public pipeline builder: construct a [`Stream`] from a source, layer
//! stages onto it, then [`Stream::run`] to drain it (§6.1).

use std::path::Path as FsPath;

use serde_json::Value;

use crate::error::CloudLensError;
use crate::pathkey::{self, Path};
use crate::pattern::CompiledPattern;
use crate::source::{self, EmptySource, FnSource, Source, VecSource};
use crate::stage::StageSource;

/// A lazily-evaluated chain of stages over a single source.
///
/// Registering a stage (`process`, `annotate`, `at_end`, …) never touches the
/// source — it only wraps the current boxed source in a new layer. Nothing
/// runs until [`Stream::run`] pulls the chain to exhaustion.
pub struct Stream {
    source: Box<dyn Source>,
}

impl Stream {
    /// Build a stream over an in-memory sequence of raw records.
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            source: Box::new(VecSource::new(values)),
        }
    }

    /// Build a stream over an ordered sequence of strings; each string `m`
    /// becomes `{ "message": m }` (§4.5).
    pub fn from_messages<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = messages
            .into_iter()
            .map(|m| serde_json::json!({ "message": m.into() }))
            .collect();
        Self::new(values)
    }

    /// Build a stream over the lines of a text file, one `{ "message": line
    /// }` record per line. The file is not opened until the stream is run.
    pub fn from_text_file(path: impl AsRef<FsPath>) -> Result<Self, CloudLensError> {
        Ok(Self {
            source: Box::new(source::open_text_file(path)?),
        })
    }

    /// Build a stream over a JSON document: its root array's elements, or a
    /// single record if the root is not an array. Unlike a text file, the
    /// document is read and parsed eagerly since JSON has no line-oriented
    /// incremental grammar.
    pub fn from_json_file(path: impl AsRef<FsPath>) -> Result<Self, CloudLensError> {
        Ok(Self {
            source: Box::new(source::read_json_file(path)?),
        })
    }

    /// Build a stream over an arbitrary pull closure.
    pub fn from_fn(f: impl FnMut() -> Option<Value> + 'static) -> Self {
        Self {
            source: Box::new(FnSource::new(f)),
        }
    }

    fn layer(self, stage: StageSource) -> Self {
        Self {
            source: Box::new(stage),
        }
    }

    /// Register an unconditional stage: `action` runs on every record.
    pub fn process(self, action: impl FnMut(&mut Value) + 'static) -> Self {
        let stage = StageSource::plain(self.source, Box::new(action));
        self.layer(stage)
    }

    /// Register a stage keyed on `key`'s existence alone — the default key
    /// `"message"` is not implied here; callers pass it explicitly via
    /// [`pathkey::default_key_path`] if that is the intended behavior.
    pub fn process_at(
        self,
        key: impl Into<Path>,
        action: impl FnMut(&mut Value) + 'static,
    ) -> Self {
        let stage = StageSource::keyed(
            self.source,
            key.into(),
            CompiledPattern::Empty,
            Some(Box::new(action)),
        );
        self.layer(stage)
    }

    /// Register a stage guarded by `pattern` matched against the default key
    /// (`"message"`).
    pub fn process_matching(
        self,
        pattern: &str,
        action: impl FnMut(&mut Value) + 'static,
    ) -> Result<Self, CloudLensError> {
        self.process_matching_at(pathkey::default_key_path(), pattern, action)
    }

    /// Register a stage guarded by both `key`'s existence and `pattern`
    /// matching the string at `key`.
    pub fn process_matching_at(
        self,
        key: impl Into<Path>,
        pattern: &str,
        action: impl FnMut(&mut Value) + 'static,
    ) -> Result<Self, CloudLensError> {
        let compiled = CompiledPattern::compile(pattern)?;
        let stage = StageSource::keyed(self.source, key.into(), compiled, Some(Box::new(action)));
        Ok(self.layer(stage))
    }

    /// Register a pattern-only stage with no mutation action: useful purely
    /// for its side effect of binding named captures onto matching records
    /// (§4.2, "annotate").
    pub fn annotate(self, pattern: &str) -> Result<Self, CloudLensError> {
        self.annotate_at(pathkey::default_key_path(), pattern)
    }

    /// Like [`Stream::annotate`], guarded by an explicit key.
    pub fn annotate_at(self, key: impl Into<Path>, pattern: &str) -> Result<Self, CloudLensError> {
        let compiled = CompiledPattern::compile(pattern)?;
        let stage = StageSource::keyed(self.source, key.into(), compiled, None);
        Ok(self.layer(stage))
    }

    /// Register a deferred stage: `action` runs exactly once, after the
    /// upstream source is exhausted, against a scratch record that starts as
    /// `Value::Null` (§4.4).
    pub fn at_end(self, action: impl FnMut(&mut Value) + 'static) -> Self {
        let stage = StageSource::at_end(self.source, Box::new(action));
        self.layer(stage)
    }

    /// Drain the pipeline. If `with_history`, the drained records are
    /// buffered and re-seated as a replay source so a subsequent `run` (or
    /// further stage registrations) can see them again; otherwise the stream
    /// is left permanently exhausted (§4.6). Returns `self` to permit
    /// chaining, per §6.1.
    pub fn run(&mut self, with_history: bool) -> &mut Self {
        let mut drained = Vec::new();
        while let Some(v) = self.source.next() {
            if with_history {
                drained.push(v);
            }
        }
        self.source = if with_history {
            Box::new(VecSource::new(drained))
        } else {
            Box::new(EmptySource)
        };
        self
    }
}

impl Source for Stream {
    fn next(&mut self) -> Option<Value> {
        self.source.next()
    }
}
