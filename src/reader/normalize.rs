//! Document Start Normalization
//!
//! Guarantees a token stream opens with a document start token. Readers
//! that begin mid-document (after the prolog was consumed, or built from
//! fragments) get a synthesized `<?xml version="1.0" encoding="UTF-8"?>`.

use super::events::XmlToken;
use super::stream::{TokenError, TokenReader};

/// A reader that is known to open with a document start token
pub enum FilledStart<R: TokenReader> {
    /// The original reader already began with a document start
    Native(R),
    /// A document start is replayed before the original tokens
    Synthesized(SynthesizedStart<R>),
}

/// Wrapper emitting a fabricated document start ahead of `inner`
pub struct SynthesizedStart<R: TokenReader> {
    start: Option<XmlToken>,
    inner: R,
}

impl<R: TokenReader> SynthesizedStart<R> {
    /// Borrow the wrapped reader
    pub fn inner(&self) -> &R {
        &self.inner
    }
}

/// Ensure `reader` opens with a document start token
///
/// Peeks exactly one token of the original reader. Errors from that peek
/// propagate unchanged.
pub fn fill_start<R: TokenReader>(mut reader: R) -> Result<FilledStart<R>, TokenError> {
    let has_start = matches!(reader.peek_token()?, Some(token) if token.is_start_document());
    if has_start {
        Ok(FilledStart::Native(reader))
    } else {
        Ok(FilledStart::Synthesized(SynthesizedStart {
            start: Some(XmlToken::start_document()),
            inner: reader,
        }))
    }
}

impl<R: TokenReader> FilledStart<R> {
    /// True when no wrapper was needed
    pub fn is_native(&self) -> bool {
        matches!(self, FilledStart::Native(_))
    }
}

impl<R: TokenReader> TokenReader for SynthesizedStart<R> {
    fn next_token(&mut self) -> Result<Option<XmlToken>, TokenError> {
        match self.start.take() {
            Some(start) => Ok(Some(start)),
            None => self.inner.next_token(),
        }
    }

    fn peek_token(&mut self) -> Result<Option<&XmlToken>, TokenError> {
        match self.start {
            Some(ref start) => Ok(Some(start)),
            None => self.inner.peek_token(),
        }
    }
}

impl<R: TokenReader> TokenReader for FilledStart<R> {
    fn next_token(&mut self) -> Result<Option<XmlToken>, TokenError> {
        match self {
            FilledStart::Native(reader) => reader.next_token(),
            FilledStart::Synthesized(reader) => reader.next_token(),
        }
    }

    fn peek_token(&mut self) -> Result<Option<&XmlToken>, TokenError> {
        match self {
            FilledStart::Native(reader) => reader.peek_token(),
            FilledStart::Synthesized(reader) => reader.peek_token(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::events::{EndElement, StartElement};
    use crate::reader::stream::{read_all, VecTokenReader};

    fn body() -> Vec<XmlToken> {
        vec![
            XmlToken::StartElement(StartElement::new("entity-mappings")),
            XmlToken::EndElement(EndElement::new("entity-mappings")),
            XmlToken::EndDocument,
        ]
    }

    #[test]
    fn test_passthrough_when_start_present() {
        let mut tokens = vec![XmlToken::start_document()];
        tokens.extend(body());

        let filled = fill_start(VecTokenReader::new(tokens.clone())).unwrap();
        assert!(filled.is_native());
        assert_eq!(read_all(filled).unwrap(), tokens);
    }

    #[test]
    fn test_synthesizes_missing_start() {
        let filled = fill_start(VecTokenReader::new(body())).unwrap();
        assert!(!filled.is_native());

        let tokens = read_all(filled).unwrap();
        assert!(tokens[0].is_start_document());
        assert_eq!(&tokens[1..], body().as_slice());
    }

    #[test]
    fn test_peek_does_not_consume_inner() {
        let mut filled = fill_start(VecTokenReader::new(body())).unwrap();
        assert!(filled.peek_token().unwrap().unwrap().is_start_document());
        assert!(filled.peek_token().unwrap().unwrap().is_start_document());

        if let FilledStart::Synthesized(ref wrapper) = filled {
            assert_eq!(wrapper.inner().remaining(), 3);
        }

        filled.next_token().unwrap();
        assert!(filled.peek_token().unwrap().unwrap().is_start_element());
    }

    #[test]
    fn test_empty_stream_gets_start() {
        let tokens = read_all(fill_start(VecTokenReader::default()).unwrap()).unwrap();
        assert_eq!(tokens, vec![XmlToken::start_document()]);
    }

    struct FailingReader;

    impl TokenReader for FailingReader {
        fn next_token(&mut self) -> Result<Option<XmlToken>, TokenError> {
            Err(TokenError::Io("disk gone".to_string()))
        }

        fn peek_token(&mut self) -> Result<Option<&XmlToken>, TokenError> {
            Err(TokenError::Io("disk gone".to_string()))
        }
    }

    #[test]
    fn test_errors_propagate_verbatim() {
        let result = fill_start(FailingReader);
        assert!(matches!(result, Err(TokenError::Io(ref m)) if m == "disk gone"));
    }
}
