// Frontmatter header parsing.
//
// Recognized shape: the very first line is exactly `---`, followed by one
// `key: value` line per entry and a closing `---` line. Everything after the
// closing line is opaque body content. Values are scalars: quoted or bare
// strings, dates (`YYYY-MM-DD`) and timestamps.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::Serialize;
use thiserror::Error;

/// Line that opens and closes the metadata block.
pub const DELIMITER: &str = "---";

const DATE_FORMAT: &str = "%Y-%m-%d";
const OFFSET_TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S %z", "%Y-%m-%d %H:%M:%S%.f %z"];
const LOCAL_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrontmatterError {
    #[error("frontmatter block is not closed by a `{DELIMITER}` line")]
    Unterminated,

    #[error("line {line}: expected `key: value`")]
    MissingSeparator { line: usize },

    #[error("line {line}: invalid key `{key}`")]
    InvalidKey { line: usize, key: String },

    #[error("line {line}: unterminated quoted value")]
    UnterminatedQuote { line: usize },

    #[error("line {line}: unexpected characters after quoted value")]
    TrailingCharacters { line: usize },

    #[error("line {line}: indented line without a preceding key")]
    OrphanIndent { line: usize },
}

/// A single metadata value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Scalar {
    Text(String),
    Date(NaiveDate),
    /// Timestamp written with an explicit offset (or `Z`).
    Timestamp(DateTime<FixedOffset>),
    /// Timestamp without an offset.
    LocalTimestamp(NaiveDateTime),
}

impl Scalar {
    /// Calendar date carried by this value, as written.
    ///
    /// Timestamps keep their own offset: `2024-06-20T23:30:00-05:00` is
    /// `2024-06-20`, not the following UTC day. Quoted strings are accepted
    /// when their content is itself a date or timestamp.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(date) => Some(*date),
            Self::Timestamp(timestamp) => Some(timestamp.date_naive()),
            Self::LocalTimestamp(timestamp) => Some(timestamp.date()),
            Self::Text(text) => parse_temporal(text.trim()).and_then(|scalar| scalar.as_date()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Date(date) => write!(f, "{}", date.format(DATE_FORMAT)),
            Self::Timestamp(timestamp) => f.write_str(&timestamp.to_rfc3339()),
            Self::LocalTimestamp(timestamp) => write!(f, "{}", timestamp.format("%Y-%m-%dT%H:%M:%S")),
        }
    }
}

/// Parsed metadata block: key to scalar, last occurrence of a key wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Frontmatter {
    entries: BTreeMap<String, Scalar>,
}

impl Frontmatter {
    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Scalar) {
        self.entries.insert(key.into(), value);
    }

    /// Non-blank `title`, rendered as text.
    pub fn title(&self) -> Option<String> {
        self.non_blank("title")
    }

    /// Non-blank `slug` override, rendered as text.
    pub fn slug(&self) -> Option<String> {
        self.non_blank("slug")
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.entries.get("date").and_then(Scalar::as_date)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    fn non_blank(&self, key: &str) -> Option<String> {
        let text = self.entries.get(key)?.to_string();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Parse the metadata block at the start of `text`.
///
/// Returns `None` when there is no block or the block is malformed. Callers
/// on the save/display path use this; a bad header never blocks them.
pub fn parse(text: &str) -> Option<Frontmatter> {
    try_parse(text).ok().flatten()
}

/// Like [`parse`], but reports why a block that is present could not be read.
///
/// `Ok(None)` means the text does not start with a block at all.
pub fn try_parse(text: &str) -> Result<Option<Frontmatter>, FrontmatterError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line));

    if lines.next() != Some(DELIMITER) {
        return Ok(None);
    }

    let mut frontmatter = Frontmatter::default();
    let mut last_key: Option<String> = None;

    // Line 1 is the opening delimiter.
    for (line_no, line) in (2..).zip(lines) {
        if line == DELIMITER {
            return Ok(Some(frontmatter));
        }

        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if is_continuation(line) {
            // Nested maps and lists are not scalars; drop the owning key.
            let key = last_key.as_ref().ok_or(FrontmatterError::OrphanIndent { line: line_no })?;
            frontmatter.entries.remove(key);
            continue;
        }

        let (key, raw_value) =
            line.split_once(':').ok_or(FrontmatterError::MissingSeparator { line: line_no })?;
        let key = key.trim();
        if !is_valid_key(key) {
            return Err(FrontmatterError::InvalidKey { line: line_no, key: key.to_string() });
        }

        match parse_scalar(raw_value.trim(), line_no)? {
            Some(value) => frontmatter.insert(key, value),
            None => {
                frontmatter.entries.remove(key);
            }
        }
        last_key = Some(key.to_string());
    }

    Err(FrontmatterError::Unterminated)
}

fn is_continuation(line: &str) -> bool {
    line.starts_with(' ') || line.starts_with('\t') || line == "-" || line.starts_with("- ")
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'))
}

fn parse_scalar(raw: &str, line: usize) -> Result<Option<Scalar>, FrontmatterError> {
    if raw.is_empty() {
        return Ok(None);
    }

    if let Some(rest) = raw.strip_prefix('"') {
        let (text, remainder) = parse_double_quoted(rest, line)?;
        ensure_only_comment(remainder, line)?;
        return Ok(Some(Scalar::Text(text)));
    }

    if let Some(rest) = raw.strip_prefix('\'') {
        let (text, remainder) = parse_single_quoted(rest, line)?;
        ensure_only_comment(remainder, line)?;
        return Ok(Some(Scalar::Text(text)));
    }

    let bare = match raw.find(" #") {
        Some(index) => raw[..index].trim_end(),
        None => raw,
    };
    if bare.is_empty() {
        return Ok(None);
    }

    Ok(Some(parse_temporal(bare).unwrap_or_else(|| Scalar::Text(bare.to_string()))))
}

fn parse_double_quoted(rest: &str, line: usize) -> Result<(String, &str), FrontmatterError> {
    let mut text = String::new();
    let mut chars = rest.char_indices();
    while let Some((index, ch)) = chars.next() {
        match ch {
            '"' => return Ok((text, &rest[index + 1..])),
            '\\' => match chars.next() {
                Some((_, 'n')) => text.push('\n'),
                Some((_, 't')) => text.push('\t'),
                Some((_, escaped)) => text.push(escaped),
                None => break,
            },
            _ => text.push(ch),
        }
    }
    Err(FrontmatterError::UnterminatedQuote { line })
}

fn parse_single_quoted(rest: &str, line: usize) -> Result<(String, &str), FrontmatterError> {
    let mut text = String::new();
    let mut chars = rest.char_indices().peekable();
    while let Some((index, ch)) = chars.next() {
        if ch != '\'' {
            text.push(ch);
            continue;
        }
        // `''` is an escaped quote inside single-quoted scalars.
        if matches!(chars.peek(), Some((_, '\''))) {
            chars.next();
            text.push('\'');
        } else {
            return Ok((text, &rest[index + 1..]));
        }
    }
    Err(FrontmatterError::UnterminatedQuote { line })
}

fn ensure_only_comment(remainder: &str, line: usize) -> Result<(), FrontmatterError> {
    let remainder = remainder.trim();
    if remainder.is_empty() || remainder.starts_with('#') {
        Ok(())
    } else {
        Err(FrontmatterError::TrailingCharacters { line })
    }
}

fn parse_temporal(value: &str) -> Option<Scalar> {
    if let Ok(date) = NaiveDate::parse_from_str(value, DATE_FORMAT) {
        return Some(Scalar::Date(date));
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(Scalar::Timestamp(timestamp));
    }
    for format in OFFSET_TIMESTAMP_FORMATS {
        if let Ok(timestamp) = DateTime::parse_from_str(value, format) {
            return Some(Scalar::Timestamp(timestamp));
        }
    }
    for format in LOCAL_TIMESTAMP_FORMATS {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Scalar::LocalTimestamp(timestamp));
        }
    }
    None
}
