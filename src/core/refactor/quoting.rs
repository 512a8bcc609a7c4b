//! TMDL identifier quoting.
//!
//! A name must be wrapped in single quotes when it contains whitespace or
//! punctuation, starts with a digit, or collides with a TMDL keyword.
//! Embedded single quotes are doubled inside the quoted form.
//!
//! `quote` takes a *logical* name. Passing an already-quoted spelling quotes it
//! a second time (`'Sales Data'` becomes `'''Sales Data'''`), so callers must
//! unquote first when the source spelling is unknown.

/// Characters that force quoting (in addition to any whitespace).
const SPECIAL_CHARS: &[char] = &[
    '\'', '"', '[', ']', '{', '}', '(', ')', '.', ',', ';', ':', '!', '@', '#', '$', '%', '^',
    '&', '*', '+', '-', '=', '<', '>', '?', '/', '\\', '|', '~', '`',
];

/// Keywords that cannot appear as bare identifiers (compared case-insensitively).
pub const RESERVED_KEYWORDS: &[&str] = &[
    "table",
    "column",
    "measure",
    "relationship",
    "partition",
    "hierarchy",
    "level",
    "annotation",
    "expression",
    "from",
    "to",
    "true",
    "false",
    "null",
];

/// Whether `name` must be single-quoted wherever it is referenced.
pub fn needs_quoting(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }

    if name
        .chars()
        .any(|c| c.is_whitespace() || SPECIAL_CHARS.contains(&c))
    {
        return true;
    }

    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return true;
    }

    RESERVED_KEYWORDS
        .iter()
        .any(|kw| kw.eq_ignore_ascii_case(name))
}

/// Canonical spelling of a logical name: quoted only when required.
pub fn quote(name: &str) -> String {
    if needs_quoting(name) {
        force_quote(name)
    } else {
        name.to_string()
    }
}

/// Quoted spelling regardless of whether quoting is required.
pub fn force_quote(name: &str) -> String {
    format!("'{}'", escape_quotes(name))
}

/// Strip bounding single quotes and undouble embedded quotes.
///
/// Returns the input unchanged when it is not a quoted spelling.
pub fn unquote(name: &str) -> String {
    if is_quoted(name) {
        name[1..name.len() - 1].replace("''", "'")
    } else {
        name.to_string()
    }
}

/// True when `spelling` is bounded by single quotes.
pub fn is_quoted(spelling: &str) -> bool {
    spelling.len() >= 2 && spelling.starts_with('\'') && spelling.ends_with('\'')
}

/// Double embedded single quotes, for text that already sits inside quotes.
pub fn escape_quotes(name: &str) -> String {
    name.replace('\'', "''")
}
