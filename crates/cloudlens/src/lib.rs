//! CloudLens is a lazy, pull-based pipeline engine for turning raw log
//! records into structured data: register stages that match, capture, and
//! reshape records, then [`Stream::run`] to drain the pipeline.
//!
//! ```
//! use cloudlens::{Source, Stream};
//! use serde_json::json;
//!
//! let mut stream = Stream::from_messages(["user=alice code=200", "user=bob code=500"])
//!     .annotate(r"user=(?<user>\w+) code=(?<code:Number>\d+)")
//!     .unwrap();
//!
//! assert_eq!(stream.next(), Some(json!({"message": "user=alice code=200", "user": "alice", "code": 200})));
//! ```

mod capture;
mod error;
mod expand;
mod pathkey;
mod pattern;
mod source;
mod stage;
mod stream;

pub use error::CloudLensError;
pub use expand::emit;
pub use pathkey::{Path, PathKey, Step, default_key_path, END_OF_STREAM};
pub use pattern::{CaptureDescriptor, CaptureType, CompiledPattern};
pub use source::{EmptySource, FnSource, Source, TextFileSource, VecSource, open_text_file, read_json_file};
pub use stream::Stream;
