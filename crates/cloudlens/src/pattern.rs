//! Compiles user-supplied patterns into `Empty`, `Simple(substring)`, or a
//! `Regex` paired with its declared, typed capture descriptors.
//!
//! Named-group declarations use the syntax `(?<NAME[:TYPE[[FORMAT]]]>BODY)`,
//! which is not valid syntax for the underlying `regex` crate, so declarations
//! are scanned out and rewritten to plain anonymous groups `(BODY)` before the
//! rewritten pattern is handed to [`regex::Regex::new`]. The declaration
//! scanner walks the pattern byte-by-byte tracking bracket/paren depth, the
//! same style this project already uses to find balanced `{…}` template
//! expressions (see `tokf-filter`'s `find_matching_close`).

use regex::Regex;

use crate::error::CloudLensError;

const METACHARACTERS: &[char] = &[
    '*', '?', '+', '[', ']', '(', ')', '{', '}', '^', '$', '|', '\\', '.', '/',
];

/// The type a named capture converts its matched substring into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureType {
    String,
    Number,
    Date,
}

/// A single declared capture: its field name, conversion type, and (for
/// `Date`) the format string used to parse it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureDescriptor {
    pub name: String,
    pub ty: CaptureType,
    pub format: Option<String>,
}

/// The result of compiling a pattern.
#[derive(Debug, Clone)]
pub enum CompiledPattern {
    /// No pattern was supplied; the stage fires unconditionally (subject
    /// only to its key guard, if any).
    Empty,
    /// A pattern with no regex metacharacters; matching is "contains
    /// substring".
    Simple(String),
    /// A full regex, plus the capture descriptors bound to its groups in
    /// declaration order (group 1, 2, … — group 0 is the whole match and is
    /// never a declared capture).
    Regex {
        regex: Regex,
        captures: Vec<CaptureDescriptor>,
    },
}

impl CompiledPattern {
    /// Compile `pattern`. An empty string compiles to [`CompiledPattern::Empty`].
    pub fn compile(pattern: &str) -> Result<Self, CloudLensError> {
        if pattern.is_empty() {
            return Ok(Self::Empty);
        }

        if !pattern.chars().any(|c| METACHARACTERS.contains(&c)) {
            return Ok(Self::Simple(pattern.to_string()));
        }

        let (rewritten, captures) = rewrite_declarations(pattern)?;

        let regex = Regex::new(&rewritten).map_err(|e| CloudLensError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        // captures_len() includes the implicit group 0 (whole match).
        if regex.captures_len() - 1 != captures.len() {
            return Err(CloudLensError::UnnamedGroups {
                pattern: pattern.to_string(),
            });
        }

        Ok(Self::Regex { regex, captures })
    }

    /// Substring/regex match against `haystack`, ignoring captures. `Empty`
    /// always matches (its stage fires unconditionally).
    pub fn is_match(&self, haystack: &str) -> bool {
        match self {
            Self::Empty => true,
            Self::Simple(s) => haystack.contains(s.as_str()),
            Self::Regex { regex, .. } => regex.is_match(haystack),
        }
    }
}

/// Identifier rule for capture names: `[A-Za-z][A-Za-z0-9]*`.
fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric()
}

/// Scan `pattern` for `(?<NAME[:TYPE[[FORMAT]]]>BODY)` declarations, rewrite
/// them to plain `(BODY)` groups, and return the rewritten pattern alongside
/// the capture descriptors in declaration order.
fn rewrite_declarations(
    pattern: &str,
) -> Result<(String, Vec<CaptureDescriptor>), CloudLensError> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len());
    let mut captures = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '\\' && i + 1 < chars.len() {
            out.push(chars[i]);
            out.push(chars[i + 1]);
            i += 2;
            continue;
        }

        if chars[i] == '(' && chars.get(i + 1) == Some(&'?') && chars.get(i + 2) == Some(&'<') {
            let (descriptor, body, next) = parse_declaration(pattern, &chars, i)?;
            out.push('(');
            out.push_str(&body);
            out.push(')');
            captures.push(descriptor);
            i = next;
            continue;
        }

        out.push(chars[i]);
        i += 1;
    }

    Ok((out, captures))
}

/// Parse a single declaration starting at `start` (the index of the opening
/// `(`). Returns the descriptor, the (unrewritten-further) body text, and the
/// index just past the declaration's closing `)`.
fn parse_declaration(
    original: &str,
    chars: &[char],
    start: usize,
) -> Result<(CaptureDescriptor, String, usize), CloudLensError> {
    let fail = |reason: &str| CloudLensError::InvalidDeclaration {
        pattern: original.to_string(),
        reason: reason.to_string(),
    };

    let mut j = start + 3; // skip "(?<"

    let name_start = j;
    if !chars.get(j).is_some_and(|&c| is_ident_start(c)) {
        return Err(fail("capture name must start with a letter"));
    }
    j += 1;
    while chars.get(j).is_some_and(|&c| is_ident_continue(c)) {
        j += 1;
    }
    let name: String = chars[name_start..j].iter().collect();

    let mut ty = CaptureType::String;
    let mut format = None;

    if chars.get(j) == Some(&':') {
        j += 1;
        let type_start = j;
        while chars.get(j).is_some_and(|c| c.is_ascii_alphabetic()) {
            j += 1;
        }
        let type_str: String = chars[type_start..j].iter().collect();
        ty = match type_str.as_str() {
            "String" => CaptureType::String,
            "Number" => CaptureType::Number,
            "Date" => CaptureType::Date,
            other => return Err(fail(&format!("unknown capture type `{other}`"))),
        };

        if chars.get(j) == Some(&'[') {
            j += 1;
            let format_start = j;
            while chars.get(j).is_some_and(|&c| c != ']') {
                j += 1;
            }
            if j >= chars.len() {
                return Err(fail("unterminated format `[...]`"));
            }
            let fmt: String = chars[format_start..j].iter().collect();
            validate_date_format(&fmt).map_err(|reason| fail(&reason))?;
            format = Some(fmt);
            j += 1; // skip ']'
        }
    }

    if ty == CaptureType::Date && format.is_none() {
        return Err(fail("Date captures require a [FORMAT]"));
    }

    if chars.get(j) != Some(&'>') {
        return Err(fail("expected `>` to close capture declaration header"));
    }
    j += 1; // skip '>'

    let body_start = j;
    let mut depth = 1usize;
    let mut in_class = false;
    while j < chars.len() && depth > 0 {
        match chars[j] {
            '\\' => {
                j += 2;
                continue;
            }
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            '(' if !in_class => depth += 1,
            ')' if !in_class => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            _ => {}
        }
        j += 1;
    }
    if depth != 0 {
        return Err(fail("unterminated capture group body"));
    }

    let body: String = chars[body_start..j].iter().collect();
    Ok((
        CaptureDescriptor { name, ty, format },
        body,
        j + 1, // past the closing ')'
    ))
}

/// Translate the log-style date tokens used by this engine's `Date[FORMAT]`
/// captures (`yyyy`, `MM`, `dd`, `HH`, `mm`, `ss`, `S`/`SS`/`SSS`, and
/// single-quoted literal runs) into a `chrono` strptime format string,
/// validating every token up front so a typo is caught at compile time
/// rather than silently failing every per-record parse.
pub(crate) fn translate_date_format(fmt: &str) -> Result<String, String> {
    let chars: Vec<char> = fmt.chars().collect();
    let mut out = String::with_capacity(fmt.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            let start = i + 1;
            let mut j = start;
            while j < chars.len() && chars[j] != '\'' {
                j += 1;
            }
            if j >= chars.len() {
                return Err("unterminated literal run in date format".to_string());
            }
            for &lit in &chars[start..j] {
                if lit == '%' {
                    out.push('%');
                }
                out.push(lit);
            }
            i = j + 1;
            continue;
        }

        if c.is_ascii_alphabetic() {
            let start = i;
            let mut j = i;
            while j < chars.len() && chars[j] == c {
                j += 1;
            }
            let token: String = chars[start..j].iter().collect();
            out.push_str(&translate_token(&token)?);
            i = j;
            continue;
        }

        if c == '%' {
            out.push('%');
        }
        out.push(c);
        i += 1;
    }

    Ok(out)
}

fn translate_token(token: &str) -> Result<String, String> {
    Ok(match token {
        "yyyy" => "%Y".to_string(),
        "yy" => "%y".to_string(),
        "MM" => "%m".to_string(),
        "M" => "%-m".to_string(),
        "dd" => "%d".to_string(),
        "d" => "%-d".to_string(),
        "HH" => "%H".to_string(),
        "H" => "%-H".to_string(),
        "mm" => "%M".to_string(),
        "m" => "%-M".to_string(),
        "ss" => "%S".to_string(),
        "s" => "%-S".to_string(),
        "S" => "%1f".to_string(),
        "SS" => "%2f".to_string(),
        "SSS" => "%3f".to_string(),
        other => return Err(format!("unrecognized date format token `{other}`")),
    })
}

fn validate_date_format(fmt: &str) -> Result<(), String> {
    translate_date_format(fmt).map(|_| ())
}
