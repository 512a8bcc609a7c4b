//! Structural column rewrite for per-visual report documents.
//!
//! `"Property": "Amount"` alone is ambiguous: every table may have an
//! `Amount`. The document is therefore addressed as a tree and a `Property`
//! string is rewritten only when the same object names the owning table,
//! either directly (`"Entity": "Sales"`) or through
//! `"Expression": {"SourceRef": {"Entity": "Sales"}}`.
//!
//! The tree is a span tree over the original bytes, so the rewrite touches
//! nothing but the matched string tokens. Formatting, key order and
//! whitespace survive unchanged.

use std::ops::Range;

use super::catalog::json_escape;

#[derive(Debug)]
enum Node {
    Object(Vec<(String, Node)>),
    Array(Vec<Node>),
    Str { value: String, span: Range<usize> },
    Scalar,
}

impl Node {
    fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Object(members) => members.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    fn as_str(&self) -> Option<&str> {
        match self {
            Node::Str { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// Rewrite `Property` bindings of `table`.`old` to `new`.
///
/// Returns the new content and the number of bindings changed. Content that
/// does not parse as JSON is returned unchanged.
pub fn rewrite_entity_property(
    content: &str,
    table: &str,
    old: &str,
    new: &str,
) -> (String, usize) {
    let Some(root) = Parser::new(content).parse_document() else {
        return (content.to_string(), 0);
    };

    let mut spans = Vec::new();
    collect_property_spans(&root, table, old, &mut spans);
    if old == new || spans.is_empty() {
        return (content.to_string(), 0);
    }

    spans.sort_by_key(|span| span.start);
    let replacement = format!("\"{}\"", json_escape(new));
    let mut out = String::with_capacity(content.len());
    let mut last = 0;
    for span in &spans {
        out.push_str(&content[last..span.start]);
        out.push_str(&replacement);
        last = span.end;
    }
    out.push_str(&content[last..]);

    (out, spans.len())
}

fn collect_property_spans(node: &Node, table: &str, old: &str, spans: &mut Vec<Range<usize>>) {
    match node {
        Node::Object(members) => {
            if let Some(Node::Str { value, span }) = node.get("Property") {
                if value == old && entity_of(node) == Some(table) {
                    spans.push(span.clone());
                }
            }
            for (_, child) in members {
                collect_property_spans(child, table, old, spans);
            }
        }
        Node::Array(items) => {
            for item in items {
                collect_property_spans(item, table, old, spans);
            }
        }
        Node::Str { .. } | Node::Scalar => {}
    }
}

fn entity_of(object: &Node) -> Option<&str> {
    object.get("Entity").and_then(Node::as_str).or_else(|| {
        object
            .get("Expression")
            .and_then(|e| e.get("SourceRef"))
            .and_then(|s| s.get("Entity"))
            .and_then(Node::as_str)
    })
}

// ============================================================================
// Span parser
// ============================================================================

struct Parser<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Parser {
            text,
            bytes: text.as_bytes(),
            pos: 0,
        }
    }

    fn parse_document(mut self) -> Option<Node> {
        // Skip a UTF-8 BOM, which report files sometimes carry.
        if self.text.starts_with('\u{feff}') {
            self.pos = '\u{feff}'.len_utf8();
        }
        let node = self.value()?;
        self.skip_ws();
        (self.pos == self.bytes.len()).then_some(node)
    }

    fn skip_ws(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn value(&mut self) -> Option<Node> {
        self.skip_ws();
        match self.peek()? {
            b'{' => self.object(),
            b'[' => self.array(),
            b'"' => {
                let (value, span) = self.string()?;
                Some(Node::Str { value, span })
            }
            _ => self.scalar(),
        }
    }

    fn object(&mut self) -> Option<Node> {
        self.pos += 1;
        let mut members = Vec::new();
        self.skip_ws();
        if self.peek()? == b'}' {
            self.pos += 1;
            return Some(Node::Object(members));
        }
        loop {
            self.skip_ws();
            if self.peek()? != b'"' {
                return None;
            }
            let (key, _) = self.string()?;
            self.skip_ws();
            if self.peek()? != b':' {
                return None;
            }
            self.pos += 1;
            let value = self.value()?;
            members.push((key, value));
            self.skip_ws();
            match self.peek()? {
                b',' => self.pos += 1,
                b'}' => {
                    self.pos += 1;
                    return Some(Node::Object(members));
                }
                _ => return None,
            }
        }
    }

    fn array(&mut self) -> Option<Node> {
        self.pos += 1;
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek()? == b']' {
            self.pos += 1;
            return Some(Node::Array(items));
        }
        loop {
            items.push(self.value()?);
            self.skip_ws();
            match self.peek()? {
                b',' => self.pos += 1,
                b']' => {
                    self.pos += 1;
                    return Some(Node::Array(items));
                }
                _ => return None,
            }
        }
    }

    /// String token, decoded with serde_json; the span covers both quotes.
    fn string(&mut self) -> Option<(String, Range<usize>)> {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.peek()? {
                b'\\' => self.pos += 2,
                b'"' => {
                    self.pos += 1;
                    break;
                }
                _ => self.pos += 1,
            }
        }
        let span = start..self.pos;
        let value: String = serde_json::from_str(self.text.get(span.clone())?).ok()?;
        Some((value, span))
    }

    fn scalar(&mut self) -> Option<Node> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b',' | b'}' | b']') || b.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
        let token = self.text.get(start..self.pos)?;
        serde_json::from_str::<serde_json::Value>(token).ok()?;
        Some(Node::Scalar)
    }
}
