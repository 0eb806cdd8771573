//! XML Reader Module
//!
//! The token stream layer of the binding pipeline:
//! - Events: owned token types
//! - Stream: the `TokenReader` pull interface and its sources
//! - Normalize: document start synthesis
//! - Hbm / Orm: dialect-specific token rewriting

pub mod events;
pub mod hbm;
pub mod normalize;
pub mod orm;
pub mod stream;

pub use events::{Attribute, EndElement, StartElement, XmlToken};
pub use normalize::{fill_start, FilledStart};
pub use stream::{read_all, TokenError, TokenReader, VecTokenReader, XmlTokenReader};
