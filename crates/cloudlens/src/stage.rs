//! The stage layering rule: each registered stage wraps the current
//! [`Source`] in a new `Source` that applies the stage's guard, captures,
//! and action to every record that passes through it (§4.3, §4.4).

use std::collections::VecDeque;

use serde_json::Value;

use crate::capture;
use crate::expand;
use crate::pathkey::{self, Path};
use crate::pattern::CompiledPattern;
use crate::source::Source;

/// A stage's mutation action: `FnMut(&mut Value)`, the Rust rendering of
/// "mutable binding by reference" (§9). Boxed and type-erased so stages of
/// different closures can share one `Box<dyn Source>` chain.
pub type Action = Box<dyn FnMut(&mut Value)>;

/// What gates a stage's action.
enum Guard {
    /// Fires on every record (`process`).
    Always,
    /// Fires only when `key` exists, and — if `pattern` is not `Empty` —
    /// only when the string at `key` matches.
    Keyed { key: Path, pattern: CompiledPattern },
    /// Fires exactly once, after the upstream source is exhausted.
    AtEnd,
}

/// One layer of the pipeline: an upstream source plus a guard, an optional
/// action, and the `pending` queue used for both expansion (§4.3) and
/// end-of-stream synthesis (§4.4).
pub struct StageSource {
    upstream: Box<dyn Source>,
    guard: Guard,
    action: Option<Action>,
    pending: VecDeque<Value>,
    /// Only meaningful for `Guard::AtEnd`: whether the upstream has already
    /// signalled exhaustion and the deferred action has already run.
    drained: bool,
}

impl StageSource {
    /// `process(action)` — unconditional stage.
    pub fn plain(upstream: Box<dyn Source>, action: Action) -> Self {
        Self {
            upstream,
            guard: Guard::Always,
            action: Some(action),
            pending: VecDeque::new(),
            drained: false,
        }
    }

    /// A key- and/or pattern-guarded stage. `action` is `None` for
    /// pattern-only annotation stages (`annotate`/`annotate_at`).
    pub fn keyed(
        upstream: Box<dyn Source>,
        key: Path,
        pattern: CompiledPattern,
        action: Option<Action>,
    ) -> Self {
        Self {
            upstream,
            guard: Guard::Keyed { key, pattern },
            action,
            pending: VecDeque::new(),
            drained: false,
        }
    }

    /// `at_end(action)` — deferred, fires exactly once.
    pub fn at_end(upstream: Box<dyn Source>, action: Action) -> Self {
        Self {
            upstream,
            guard: Guard::AtEnd,
            action: Some(action),
            pending: VecDeque::new(),
            drained: false,
        }
    }

    fn next_keyed(&mut self, key: &Path, pattern: &CompiledPattern) -> Option<Value> {
        loop {
            if let Some(v) = self.pending.pop_front() {
                return Some(v);
            }

            let mut record = self.upstream.next()?;

            if pathkey::exists(&record, key) {
                let fires = match pattern {
                    CompiledPattern::Empty => true,
                    _ => match pathkey::get_str(&record, key) {
                        Some(s) => pattern.is_match(s),
                        None => false,
                    },
                };

                if fires {
                    if let CompiledPattern::Regex { regex, captures } = pattern
                        && let Some(s) = pathkey::get_str(&record, key)
                        && let Some(m) = regex.captures(s)
                    {
                        capture::apply(&mut record, captures, &m);
                    }

                    if let Some(action) = &mut self.action {
                        action(&mut record);
                    }

                    if record.is_null() {
                        continue;
                    }

                    match expand::take_children(record) {
                        Ok(children) => {
                            self.pending.extend(children);
                            continue;
                        }
                        Err(unexpanded) => return Some(unexpanded),
                    }
                }
            }

            return Some(record);
        }
    }

    fn next_always(&mut self) -> Option<Value> {
        loop {
            if let Some(v) = self.pending.pop_front() {
                return Some(v);
            }

            let mut record = self.upstream.next()?;
            if let Some(action) = &mut self.action {
                action(&mut record);
            }

            if record.is_null() {
                continue;
            }

            match expand::take_children(record) {
                Ok(children) => {
                    self.pending.extend(children);
                    continue;
                }
                Err(unexpanded) => return Some(unexpanded),
            }
        }
    }

    fn next_at_end(&mut self) -> Option<Value> {
        if !self.drained {
            if let Some(v) = self.upstream.next() {
                return Some(v);
            }
            self.drained = true;

            let mut scratch = Value::Null;
            if let Some(action) = &mut self.action {
                action(&mut scratch);
            }

            if !scratch.is_null() {
                match expand::take_children(scratch) {
                    Ok(children) => self.pending.extend(children),
                    Err(single) => self.pending.push_back(single),
                }
            }
        }

        self.pending.pop_front()
    }
}

impl Source for StageSource {
    fn next(&mut self) -> Option<Value> {
        match &self.guard {
            Guard::Always => self.next_always(),
            Guard::Keyed { key, pattern } => {
                let key = key.clone();
                let pattern = pattern.clone_for_matching();
                self.next_keyed(&key, &pattern)
            }
            Guard::AtEnd => self.next_at_end(),
        }
    }
}

impl CompiledPattern {
    /// Cheap clone used so `next_keyed` can borrow `self.guard` immutably
    /// while still mutably borrowing `self.action`/`self.pending` — `Regex`
    /// clones are just a refcount bump internally.
    fn clone_for_matching(&self) -> Self {
        self.clone()
    }
}
