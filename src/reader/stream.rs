//! Token Stream Readers
//!
//! `TokenReader` is the pull interface every stage of the pipeline speaks.
//! `XmlTokenReader` tokenizes any `BufRead` source; `VecTokenReader`
//! replays tokens that are already in memory.

use std::collections::VecDeque;
use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;

use super::events::{Attribute, EndElement, StartElement, XmlToken};

/// Failure raised while pulling tokens
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Malformed markup or undecodable content
    #[error("malformed XML: {0}")]
    Syntax(String),
    /// The underlying byte source failed
    #[error("I/O error reading XML: {0}")]
    Io(String),
    /// An orm.xml root declared a version outside the supported set
    #[error("unsupported orm.xml version: {requested}")]
    BadVersion { requested: String },
}

/// Pull-style token source
pub trait TokenReader {
    /// Consume and return the next token, `None` once the stream is exhausted
    fn next_token(&mut self) -> Result<Option<XmlToken>, TokenError>;

    /// Look at the next token without consuming it; repeated peeks return the same token
    fn peek_token(&mut self) -> Result<Option<&XmlToken>, TokenError>;
}

impl<R: TokenReader + ?Sized> TokenReader for &mut R {
    fn next_token(&mut self) -> Result<Option<XmlToken>, TokenError> {
        (**self).next_token()
    }

    fn peek_token(&mut self) -> Result<Option<&XmlToken>, TokenError> {
        (**self).peek_token()
    }
}

impl<R: TokenReader + ?Sized> TokenReader for Box<R> {
    fn next_token(&mut self) -> Result<Option<XmlToken>, TokenError> {
        (**self).next_token()
    }

    fn peek_token(&mut self) -> Result<Option<&XmlToken>, TokenError> {
        (**self).peek_token()
    }
}

/// Drain a reader into a vector
pub fn read_all<R: TokenReader>(mut reader: R) -> Result<Vec<XmlToken>, TokenError> {
    let mut tokens = Vec::new();
    while let Some(token) = reader.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

// ============================================================================
// In-memory reader
// ============================================================================

/// Replays an owned token sequence
#[derive(Debug, Default, Clone)]
pub struct VecTokenReader {
    tokens: VecDeque<XmlToken>,
}

impl VecTokenReader {
    pub fn new(tokens: Vec<XmlToken>) -> Self {
        VecTokenReader {
            tokens: tokens.into(),
        }
    }

    /// Number of tokens not yet consumed
    pub fn remaining(&self) -> usize {
        self.tokens.len()
    }
}

impl TokenReader for VecTokenReader {
    fn next_token(&mut self) -> Result<Option<XmlToken>, TokenError> {
        Ok(self.tokens.pop_front())
    }

    fn peek_token(&mut self) -> Result<Option<&XmlToken>, TokenError> {
        Ok(self.tokens.front())
    }
}

// ============================================================================
// Byte source reader
// ============================================================================

/// Tokenizes XML from a buffered byte source
///
/// The document start token is only produced when the input carries an
/// XML declaration. Empty elements are reported as start + end.
pub struct XmlTokenReader<R: BufRead> {
    reader: NsReader<R>,
    buffer: Vec<u8>,
    peeked: Option<XmlToken>,
    pending_end: Option<EndElement>,
    finished: bool,
}

impl<'a> XmlTokenReader<&'a [u8]> {
    /// Create a reader over an in-memory document
    pub fn from_bytes(input: &'a [u8]) -> Self {
        Self::new(input)
    }
}

impl<R: BufRead> XmlTokenReader<R> {
    /// Create a new token reader
    pub fn new(source: R) -> Self {
        let mut reader = NsReader::from_reader(source);
        reader.config_mut().trim_text(false);
        XmlTokenReader {
            reader,
            buffer: Vec::with_capacity(1024),
            peeked: None,
            pending_end: None,
            finished: false,
        }
    }

    fn read_next(&mut self) -> Result<Option<XmlToken>, TokenError> {
        if let Some(end) = self.pending_end.take() {
            return Ok(Some(XmlToken::EndElement(end)));
        }
        if self.finished {
            return Ok(None);
        }

        loop {
            self.buffer.clear();
            let (resolved, event) = self
                .reader
                .read_resolved_event_into(&mut self.buffer)
                .map_err(map_xml_error)?;
            let namespace = match resolved {
                ResolveResult::Bound(ns) => Some(utf8(ns.as_ref())?),
                _ => None,
            };

            let token = match event {
                Event::Decl(decl) => {
                    let version = decl.version().map_err(syntax_error)?;
                    let encoding = match decl.encoding() {
                        Some(enc) => Some(utf8(&enc.map_err(syntax_error)?)?),
                        None => None,
                    };
                    let standalone = match decl.standalone() {
                        Some(value) => Some(&*value.map_err(syntax_error)? == b"yes"),
                        None => None,
                    };
                    XmlToken::StartDocument {
                        version: utf8(&version)?,
                        encoding,
                        standalone,
                    }
                }
                Event::Start(start) => XmlToken::StartElement(start_element(&start, namespace)?),
                Event::Empty(start) => {
                    let element = start_element(&start, namespace)?;
                    self.pending_end = Some(EndElement::new(element.name.clone()));
                    XmlToken::StartElement(element)
                }
                Event::End(end) => XmlToken::EndElement(EndElement::new(utf8(end.name().as_ref())?)),
                Event::Text(text) => {
                    let value = text.unescape().map_err(syntax_error)?;
                    if value.is_empty() {
                        continue;
                    }
                    XmlToken::Text(value.into_owned())
                }
                Event::CData(cdata) => XmlToken::CData(utf8(&cdata.into_inner())?),
                Event::Comment(comment) => XmlToken::Comment(utf8(comment.as_ref())?),
                Event::PI(pi) => XmlToken::ProcessingInstruction {
                    target: utf8(pi.target())?,
                    data: utf8(pi.content())?.trim_start().to_string(),
                },
                Event::DocType(doctype) => XmlToken::DocType(utf8(doctype.as_ref())?),
                Event::Eof => {
                    self.finished = true;
                    XmlToken::EndDocument
                }
            };
            return Ok(Some(token));
        }
    }
}

impl<R: BufRead> TokenReader for XmlTokenReader<R> {
    fn next_token(&mut self) -> Result<Option<XmlToken>, TokenError> {
        match self.peeked.take() {
            Some(token) => Ok(Some(token)),
            None => self.read_next(),
        }
    }

    fn peek_token(&mut self) -> Result<Option<&XmlToken>, TokenError> {
        if self.peeked.is_none() {
            self.peeked = self.read_next()?;
        }
        Ok(self.peeked.as_ref())
    }
}

fn start_element(start: &BytesStart<'_>, namespace: Option<String>) -> Result<StartElement, TokenError> {
    let mut element = StartElement::new(utf8(start.name().as_ref())?);
    element.namespace = namespace;
    for attr in start.attributes() {
        let attr = attr.map_err(syntax_error)?;
        let value = attr.unescape_value().map_err(syntax_error)?;
        element
            .attributes
            .push(Attribute::new(utf8(attr.key.as_ref())?, value.into_owned()));
    }
    Ok(element)
}

fn utf8(bytes: &[u8]) -> Result<String, TokenError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| TokenError::Syntax(format!("invalid UTF-8: {}", e)))
}

fn syntax_error<E: std::fmt::Display>(err: E) -> TokenError {
    TokenError::Syntax(err.to_string())
}

fn map_xml_error(err: quick_xml::Error) -> TokenError {
    match err {
        quick_xml::Error::Io(io) => TokenError::Io(io.to_string()),
        other => TokenError::Syntax(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_element() {
        let tokens = read_all(XmlTokenReader::from_bytes(b"<root>hello</root>")).unwrap();
        assert_eq!(tokens.len(), 4);
        assert!(matches!(&tokens[0], XmlToken::StartElement(e) if e.name == "root"));
        assert_eq!(tokens[1].as_text(), Some("hello"));
        assert!(matches!(&tokens[2], XmlToken::EndElement(e) if e.name == "root"));
        assert_eq!(tokens[3], XmlToken::EndDocument);
    }

    #[test]
    fn test_declaration_becomes_start_document() {
        let mut reader =
            XmlTokenReader::from_bytes(b"<?xml version=\"1.0\" encoding=\"UTF-8\"?><root/>");
        let first = reader.next_token().unwrap().unwrap();
        assert!(matches!(
            first,
            XmlToken::StartDocument { ref version, ref encoding, .. }
                if version == "1.0" && encoding.as_deref() == Some("UTF-8")
        ));
    }

    #[test]
    fn test_empty_element_expands() {
        let tokens = read_all(XmlTokenReader::from_bytes(b"<a><b x=\"1\"/></a>")).unwrap();
        assert!(matches!(&tokens[1], XmlToken::StartElement(e) if e.get_attribute_value("x") == Some("1")));
        assert!(matches!(&tokens[2], XmlToken::EndElement(e) if e.name == "b"));
    }

    #[test]
    fn test_namespace_resolved() {
        let tokens = read_all(XmlTokenReader::from_bytes(
            b"<m:entity-mappings xmlns:m=\"urn:orm\"><m:entity/></m:entity-mappings>",
        ))
        .unwrap();
        let root = tokens[0].as_start_element().unwrap();
        assert_eq!(root.local_name(), "entity-mappings");
        assert_eq!(root.namespace.as_deref(), Some("urn:orm"));
    }

    #[test]
    fn test_peek_is_idempotent() {
        let mut reader = XmlTokenReader::from_bytes(b"<root/>");
        let first = reader.peek_token().unwrap().cloned();
        let second = reader.peek_token().unwrap().cloned();
        assert_eq!(first, second);
        assert_eq!(reader.next_token().unwrap(), first);
    }

    #[test]
    fn test_entities_decoded() {
        let tokens = read_all(XmlTokenReader::from_bytes(b"<a t=\"&lt;x&gt;\">a &amp; b</a>")).unwrap();
        let start = tokens[0].as_start_element().unwrap();
        assert_eq!(start.get_attribute_value("t"), Some("<x>"));
        assert_eq!(tokens[1].as_text(), Some("a & b"));
    }

    #[test]
    fn test_mismatched_end_is_syntax_error() {
        let result = read_all(XmlTokenReader::from_bytes(b"<a><b></a>"));
        assert!(matches!(result, Err(TokenError::Syntax(_))));
    }

    #[test]
    fn test_vec_reader() {
        let mut reader = VecTokenReader::new(vec![XmlToken::Comment("x".to_string())]);
        assert_eq!(reader.remaining(), 1);
        assert!(reader.peek_token().unwrap().is_some());
        assert!(reader.next_token().unwrap().is_some());
        assert!(reader.next_token().unwrap().is_none());
    }
}
