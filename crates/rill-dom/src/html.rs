//! Reader for the executor's own markup dialect.
//!
//! This is not a general HTML parser. It accepts exactly what the
//! server-side renderer emits (five-entity escaping, double-quoted or
//! bare attributes, self-closing void elements, `<!---->` comments) and
//! builds a [`Document`] from it, which is what hydration runs against.
//! Anything outside the dialect is a hard error with a byte position.

use thiserror::Error;

use rill_tree::is_void_element;
use rill_tree::markup::unescape_html;

use crate::document::{Document, NodeId};

#[derive(Debug, Error)]
pub enum HtmlError {
    #[error("unexpected end of input (byte {at})")]
    UnexpectedEof { at: usize },

    #[error("malformed tag (byte {at})")]
    MalformedTag { at: usize },

    #[error("unterminated comment (byte {at})")]
    UnterminatedComment { at: usize },

    #[error("unexpected closing tag </{found}> (byte {at})")]
    UnexpectedClose { found: String, at: usize },

    #[error("mismatched closing tag: expected </{expected}>, found </{found}> (byte {at})")]
    MismatchedClose {
        expected: String,
        found: String,
        at: usize,
    },

    #[error("unclosed element <{tag}>")]
    UnclosedElement { tag: String },
}

/// Parse a markup fragment into a fresh document, its nodes hanging
/// under the document root.
pub fn parse_document(input: &str) -> Result<Document, HtmlError> {
    let doc = Document::new();
    parse_into(&doc, doc.root(), input)?;
    Ok(doc)
}

/// Parse a markup fragment into an existing document under `parent`.
pub fn parse_into(doc: &Document, parent: NodeId, input: &str) -> Result<(), HtmlError> {
    Parser {
        doc,
        input,
        bytes: input.as_bytes(),
        pos: 0,
    }
    .run(parent)
}

struct Parser<'a> {
    doc: &'a Document,
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn run(mut self, parent: NodeId) -> Result<(), HtmlError> {
        // Open elements; the payload remembers the written tag so close
        // tags can be checked verbatim.
        let mut open: Vec<(NodeId, String)> = Vec::new();
        while self.pos < self.bytes.len() {
            let top = open.last().map_or(parent, |(node, _)| *node);
            if self.starts_with("<!--") {
                self.comment(top)?;
            } else if self.starts_with("</") {
                self.close(&mut open)?;
            } else if self.starts_with("<") {
                self.open(top, &mut open)?;
            } else {
                self.text(top);
            }
        }
        if let Some((_, tag)) = open.pop() {
            return Err(HtmlError::UnclosedElement { tag });
        }
        Ok(())
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.bytes[self.pos..].starts_with(prefix.as_bytes())
    }

    fn text(&mut self, parent: NodeId) {
        let start = self.pos;
        while self.pos < self.bytes.len() && self.bytes[self.pos] != b'<' {
            self.pos += 1;
        }
        let raw = &self.input[start..self.pos];
        let node = self.doc.create_text(unescape_html(raw));
        self.doc.append_child(parent, node);
    }

    fn comment(&mut self, parent: NodeId) -> Result<(), HtmlError> {
        let start = self.pos;
        self.pos += 4;
        let Some(end) = self.input[self.pos..].find("-->") else {
            return Err(HtmlError::UnterminatedComment { at: start });
        };
        let value = &self.input[self.pos..self.pos + end];
        self.pos += end + 3;
        let node = self.doc.create_comment(value);
        self.doc.append_child(parent, node);
        Ok(())
    }

    fn close(&mut self, open: &mut Vec<(NodeId, String)>) -> Result<(), HtmlError> {
        let at = self.pos;
        self.pos += 2;
        let found = self.tag_name(at)?;
        if self.bytes.get(self.pos) != Some(&b'>') {
            return Err(HtmlError::MalformedTag { at });
        }
        self.pos += 1;
        match open.pop() {
            Some((_, expected)) if expected == found => Ok(()),
            Some((_, expected)) => Err(HtmlError::MismatchedClose {
                expected,
                found,
                at,
            }),
            None => Err(HtmlError::UnexpectedClose { found, at }),
        }
    }

    fn open(&mut self, parent: NodeId, open: &mut Vec<(NodeId, String)>) -> Result<(), HtmlError> {
        let at = self.pos;
        self.pos += 1;
        let tag = self.tag_name(at)?;
        let node = self.doc.create_element(&tag);
        loop {
            self.skip_whitespace();
            match self.bytes.get(self.pos) {
                None => return Err(HtmlError::UnexpectedEof { at: self.pos }),
                Some(b'>') => {
                    self.pos += 1;
                    self.doc.append_child(parent, node);
                    if !is_void_element(&tag) {
                        open.push((node, tag));
                    }
                    return Ok(());
                }
                Some(b'/') => {
                    if self.bytes.get(self.pos + 1) != Some(&b'>') {
                        return Err(HtmlError::MalformedTag { at });
                    }
                    self.pos += 2;
                    self.doc.append_child(parent, node);
                    return Ok(());
                }
                Some(_) => self.attribute(node)?,
            }
        }
    }

    fn attribute(&mut self, node: NodeId) -> Result<(), HtmlError> {
        let start = self.pos;
        while let Some(&b) = self.bytes.get(self.pos) {
            if b == b'=' || b == b'>' || b == b'/' || b.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(HtmlError::MalformedTag { at: start });
        }
        let name = self.input[start..self.pos].to_owned();
        if self.bytes.get(self.pos) != Some(&b'=') {
            // Bare attribute: present with an empty value.
            self.doc.set_attribute(node, &name, "");
            return Ok(());
        }
        self.pos += 1;
        if self.bytes.get(self.pos) != Some(&b'"') {
            return Err(HtmlError::MalformedTag { at: start });
        }
        self.pos += 1;
        let value_start = self.pos;
        let Some(end) = self.input[self.pos..].find('"') else {
            return Err(HtmlError::UnexpectedEof { at: self.pos });
        };
        self.pos += end + 1;
        let value = unescape_html(&self.input[value_start..value_start + end]);
        self.doc.set_attribute(node, &name, value);
        Ok(())
    }

    fn tag_name(&mut self, at: usize) -> Result<String, HtmlError> {
        let start = self.pos;
        while let Some(&b) = self.bytes.get(self.pos) {
            if b.is_ascii_alphanumeric() || b == b'-' {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(HtmlError::MalformedTag { at });
        }
        Ok(self.input[start..self.pos].to_owned())
    }

    fn skip_whitespace(&mut self) {
        while self
            .bytes
            .get(self.pos)
            .is_some_and(u8::is_ascii_whitespace)
        {
            self.pos += 1;
        }
    }
}
