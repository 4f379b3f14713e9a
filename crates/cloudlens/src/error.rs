use std::path::PathBuf;

/// Fatal construction/registration-time failures.
///
/// Every fallible constructor and stage-registration method on [`crate::Stream`]
/// returns `Result<_, CloudLensError>` rather than panicking — callers that want
/// the original "authoring-time correctness assumed" behavior terminate the
/// process themselves on receipt of an error (see `cloudlens-cli`'s `main`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloudLensError {
    /// The regex engine rejected a pattern after named-group rewriting.
    InvalidPattern { pattern: String, reason: String },
    /// The rewritten pattern contains capture groups that were not declared
    /// via `(?<name[:type[format]]>...)`.
    UnnamedGroups { pattern: String },
    /// A named-group declaration was malformed: bad identifier, a `Date`
    /// capture missing its format, an unrecognized date format token, or an
    /// unterminated declaration.
    InvalidDeclaration { pattern: String, reason: String },
    /// A file-backed source could not be opened, read, or parsed.
    SourceOpenError { path: PathBuf, reason: String },
}

impl std::fmt::Display for CloudLensError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPattern { pattern, reason } => {
                write!(f, "invalid pattern `{pattern}`: {reason}")
            }
            Self::UnnamedGroups { pattern } => {
                write!(
                    f,
                    "pattern `{pattern}` contains anonymous capture groups; \
                     only `(?<name...>...)` declarations may capture"
                )
            }
            Self::InvalidDeclaration { pattern, reason } => {
                write!(f, "invalid capture declaration in `{pattern}`: {reason}")
            }
            Self::SourceOpenError { path, reason } => {
                write!(f, "failed to open source {}: {reason}", path.display())
            }
        }
    }
}

impl std::error::Error for CloudLensError {}
