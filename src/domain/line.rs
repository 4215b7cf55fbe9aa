//! Line parser and serializer
//!
//! One physical line maps to one [`Record`]. Parsing rules, in order:
//!
//! 1. Empty or whitespace-only line: blank record
//! 2. First non-whitespace character is `#`: comment record
//! 3. Otherwise `key=value`, split on the first `=`
//!
//! A value wrapped in matching single or double quotes is stored without
//! them and the quote style is remembered for serialization.
//!
//! Every record keeps the raw text it was parsed from. Serializing an
//! untouched record emits that raw text, so a file that is only read
//! round-trips byte for byte.

use thiserror::Error;

use super::item::Item;

/// A line that is neither blank, a comment, nor `key=value`
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid line: {line}")]
pub struct FormatError {
    pub line: String,
}

impl FormatError {
    fn new(line: &str) -> Self {
        Self {
            line: line.to_string(),
        }
    }
}

/// Quote style of a stored value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quote {
    #[default]
    None,
    Single,
    Double,
}

impl Quote {
    fn as_char(self) -> Option<char> {
        match self {
            Quote::None => None,
            Quote::Single => Some('\''),
            Quote::Double => Some('"'),
        }
    }

    /// Splits a raw value into its quote style and unquoted content
    fn detect(raw: &str) -> (Quote, &str) {
        for quote in [Quote::Double, Quote::Single] {
            let Some(c) = quote.as_char() else { continue };
            if raw.len() >= 2 && raw.starts_with(c) && raw.ends_with(c) {
                return (quote, &raw[1..raw.len() - 1]);
            }
        }
        (Quote::None, raw)
    }

    /// Quote style for a value that has no prior style to preserve.
    ///
    /// Whitespace needs quotes to stay unambiguous, and a value that is
    /// itself wrapped in quotes needs an outer pair so parsing does not
    /// strip its own.
    fn for_value(value: &str) -> Quote {
        let self_wrapped = !matches!(Quote::detect(value).0, Quote::None);
        if self_wrapped || value.chars().any(char::is_whitespace) {
            Quote::Double
        } else {
            Quote::None
        }
    }
}

/// A data record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    key: String,
    value: String,
    quote: Quote,
    raw: Option<String>,
}

impl Entry {
    /// Creates an entry that was never on disk
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            key: key.into(),
            quote: Quote::for_value(&value),
            value,
            raw: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn quote(&self) -> Quote {
        self.quote
    }

    /// Returns true if the entry will be serialized from its parsed text
    pub fn is_pristine(&self) -> bool {
        self.raw.is_some()
    }

    /// Overwrites the value in place.
    ///
    /// A quoted entry keeps its quote style. An unquoted one picks a style
    /// for the new value. Setting the value it already has is a no-op and
    /// leaves the original text untouched.
    pub fn set_value(&mut self, value: impl Into<String>) {
        let value = value.into();
        if value == self.value {
            return;
        }
        if self.quote == Quote::None {
            self.quote = Quote::for_value(&value);
        }
        self.value = value;
        self.raw = None;
    }

    pub fn to_item(&self) -> Item {
        Item::new(self.key.clone(), self.value.clone())
    }

    fn render(&self) -> String {
        if let Some(raw) = &self.raw {
            return raw.clone();
        }
        match self.quote.as_char() {
            Some(q) => format!("{}={q}{}{q}", self.key, self.value),
            None => format!("{}={}", self.key, self.value),
        }
    }
}

/// One physical line of a key/value file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Blank(String),
    Comment(String),
    Entry(Entry),
}

impl Record {
    pub fn is_blank(&self) -> bool {
        matches!(self, Record::Blank(_))
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, Record::Comment(_))
    }

    pub fn entry(&self) -> Option<&Entry> {
        match self {
            Record::Entry(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn entry_mut(&mut self) -> Option<&mut Entry> {
        match self {
            Record::Entry(entry) => Some(entry),
            _ => None,
        }
    }

    /// Serializes the record, newline included
    pub fn to_line(&self) -> String {
        let mut line = match self {
            Record::Blank(raw) | Record::Comment(raw) => raw.clone(),
            Record::Entry(entry) => entry.render(),
        };
        line.push('\n');
        line
    }
}

impl From<Entry> for Record {
    fn from(entry: Entry) -> Self {
        Record::Entry(entry)
    }
}

/// Parses one line, without its terminator
pub fn parse_line(line: &str) -> Result<Record, FormatError> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() {
        return Ok(Record::Blank(line.to_string()));
    }
    if trimmed.starts_with('#') {
        return Ok(Record::Comment(line.to_string()));
    }

    let (key, raw_value) = line.split_once('=').ok_or_else(|| FormatError::new(line))?;
    if key.is_empty() {
        return Err(FormatError::new(line));
    }

    let (quote, value) = Quote::detect(raw_value);
    Ok(Record::Entry(Entry {
        key: key.to_string(),
        value: value.to_string(),
        quote,
        raw: Some(line.to_string()),
    }))
}
