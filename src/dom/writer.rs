//! Tree Serialization
//!
//! Renders a `Document` back to bytes through `quick_xml::Writer`, always
//! emitting an XML declaration. Used by producers that round-trip a
//! generated tree through the binder.

use std::io::Write;

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::document::Document;
use super::node::{NodeId, NodeKind, DOCUMENT_NODE};
use crate::error::{Error, Result, TreeError};

/// Serialization settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteOptions {
    /// Spaces per nesting level; 0 writes everything on one line
    pub indent: usize,
}

impl WriteOptions {
    pub fn with_indent(indent: usize) -> Self {
        WriteOptions { indent }
    }
}

/// Serialize a whole document
pub fn write_document<W: Write>(doc: &Document, out: W, options: &WriteOptions) -> Result<()> {
    let indenting = options.indent > 0;
    let mut writer = if indenting {
        Writer::new_with_indent(out, b' ', options.indent)
    } else {
        Writer::new(out)
    };

    emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    for child in doc.children(DOCUMENT_NODE) {
        write_node(doc, &mut writer, child, indenting)?;
    }
    Ok(())
}

/// Serialize a whole document into a byte buffer
pub fn to_bytes(doc: &Document, options: &WriteOptions) -> Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(doc.node_count() * 32);
    write_document(doc, &mut buffer, options)?;
    Ok(buffer)
}

fn write_node<W: Write>(doc: &Document, writer: &mut Writer<W>, id: NodeId, indenting: bool) -> Result<()> {
    let node = doc.get_node(id).ok_or(TreeError::ForeignNode(id))?;

    match node.kind {
        NodeKind::Element => {
            let name = doc.node_name(id).unwrap_or_default();
            let mut start = BytesStart::new(name);
            for attr in doc.get_attribute_values(id) {
                start.push_attribute(attr);
            }
            if node.has_children() {
                emit(writer, Event::Start(start))?;
                for child in doc.children(id) {
                    write_node(doc, writer, child, indenting)?;
                }
                emit(writer, Event::End(BytesEnd::new(name)))?;
            } else {
                emit(writer, Event::Empty(start))?;
            }
        }
        NodeKind::Text => {
            let text = doc.text_content(id).unwrap_or_default();
            // Indentation replaces formatting whitespace
            if indenting && text.trim().is_empty() {
                return Ok(());
            }
            emit(writer, Event::Text(BytesText::new(text)))?;
        }
        NodeKind::CData => {
            emit(writer, Event::CData(BytesCData::new(doc.text_content(id).unwrap_or_default())))?;
        }
        NodeKind::Comment => {
            emit(writer, Event::Comment(BytesText::from_escaped(doc.text_content(id).unwrap_or_default())))?;
        }
        NodeKind::ProcessingInstruction => {
            let target = doc.node_name(id).unwrap_or_default();
            let content = match doc.pi_data(id) {
                Some(data) if !data.is_empty() => format!("{} {}", target, data),
                _ => target.to_string(),
            };
            emit(writer, Event::PI(BytesPI::new(content)))?;
        }
        NodeKind::Document => {}
    }
    Ok(())
}

fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::Write(e.to_string()))
}
