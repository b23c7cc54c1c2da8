//! The proto-parser: markup text in, [`Instruction`] stream out.
//!
//! Tokenizing is delegated to `quick-xml`; this module walks its events,
//! keeps the document's prefix bindings, resolves element types and member
//! tokens, and queues the instructions each event produces. Instructions are
//! handed out lazily, one tokenizer event at a time.

use std::collections::VecDeque;
use std::sync::Arc;

use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{ParseError, ParseErrorKind, Position};
use crate::instruction::Instruction;
use crate::registry::{NamespaceScope, TypeRegistry};
use crate::resolver;
use crate::types::TypeDescriptor;

/// Attribute name (or prefix segment) that declares a namespace prefix.
pub const XMLNS: &str = "xmlns";

// ── ProtoParser ───────────────────────────────────────────────────────────

pub struct ProtoParser<'r> {
    registry: &'r TypeRegistry,
}

impl<'r> ProtoParser<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self { registry }
    }

    /// Start parsing `text`. The returned iterator is single-pass; parse again
    /// to start over.
    pub fn parse<'t>(&self, text: &'t str) -> Instructions<'r, 't> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(false);
        Instructions {
            src: text,
            reader,
            scope: NamespaceScope::new(self.registry),
            frames: Vec::new(),
            pending: VecDeque::new(),
            text: String::new(),
            text_offset: 0,
            state: State::BeforeRoot,
        }
    }
}

// ── Instructions ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    BeforeRoot,
    InRoot,
    AfterRoot,
    Done,
}

enum Frame {
    Element { ty: Arc<TypeDescriptor>, prefix: String, scope_depth: usize },
    Property { text: String, scope_depth: usize },
}

/// Lazy instruction stream over one document.
///
/// Yields `Err` at most once, then ends.
pub struct Instructions<'r, 't> {
    src: &'t str,
    reader: Reader<&'t [u8]>,
    scope: NamespaceScope<'r>,
    frames: Vec<Frame>,
    pending: VecDeque<Instruction>,
    text: String,
    text_offset: usize,
    state: State,
}

impl Iterator for Instructions<'_, '_> {
    type Item = Result<Instruction, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(instruction) = self.pending.pop_front() {
                log::trace!("instruction: {instruction}");
                return Some(Ok(instruction));
            }
            if self.state == State::Done {
                return None;
            }
            if let Err(e) = self.advance() {
                self.state = State::Done;
                self.pending.clear();
                return Some(Err(e));
            }
        }
    }
}

impl std::iter::FusedIterator for Instructions<'_, '_> {}

/// A byte offset into the document. Resolved to a line and column only when
/// an error is raised.
#[derive(Debug, Clone, Copy)]
struct At<'t> {
    src: &'t str,
    offset: usize,
}

impl At<'_> {
    fn pos(self) -> Position {
        Position::from_offset(self.src, self.offset)
    }
}

impl<'t> Instructions<'_, 't> {
    fn at(&self, offset: usize) -> At<'t> {
        At { src: self.src, offset }
    }

    /// Consume one tokenizer event, queueing whatever it produces.
    fn advance(&mut self) -> Result<(), ParseError> {
        let offset = self.reader.buffer_position() as usize;
        let event = match self.reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                let at = self.at(self.reader.buffer_position() as usize);
                return Err(tokenizer_error(e, at));
            }
        };
        let at = self.at(offset);

        match event {
            Event::Start(start) => {
                self.flush_text()?;
                self.open(&start, false, at)
            }
            Event::Empty(start) => {
                self.flush_text()?;
                self.open(&start, true, at)
            }
            Event::End(_) => {
                self.flush_text()?;
                self.close(at)
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| syntax(e, at))?;
                self.buffer_text(&text, offset);
                Ok(())
            }
            Event::CData(data) => {
                let text = std::str::from_utf8(&data).map_err(|e| syntax(e, at))?;
                self.buffer_text(text, offset);
                Ok(())
            }
            Event::Eof => {
                self.flush_text()?;
                self.finish(at)
            }
            // comments, declarations, processing instructions, doctype
            _ => Ok(()),
        }
    }

    fn open(&mut self, start: &BytesStart<'_>, is_empty: bool, at: At<'t>) -> Result<(), ParseError> {
        if self.state == State::AfterRoot {
            return Err(unbalanced("content after the root element", at));
        }

        let name = start.name();
        let qname = std::str::from_utf8(name.as_ref()).map_err(|e| syntax(e, at))?.to_string();
        let (prefix, local) = split_qname(&qname);

        if self.frames.is_empty() && local.contains('.') {
            return Err(ParseError::at(
                ParseErrorKind::InvalidRootElement { found: format!("property element `{qname}`") },
                at.pos(),
            ));
        }

        let attributes = collect_attributes(start, at)?;
        let scope_depth = self.scope.depth();
        let mut ordinary = Vec::with_capacity(attributes.len());
        for (key, value) in attributes {
            match prefix_declaration(&key) {
                Some(declared) => {
                    self.scope.declare(declared, value.as_str());
                    self.pending.push_back(Instruction::prefix_declaration(declared, value));
                }
                None => ordinary.push((key, value)),
            }
        }

        let parent = match self.frames.last() {
            Some(Frame::Element { ty, .. }) => Some(Arc::clone(ty)),
            Some(Frame::Property { .. }) if local.contains('.') => {
                return Err(invalid_property(&qname, "property elements cannot nest directly", at));
            }
            _ => None,
        };

        match parent {
            Some(parent) if local.contains('.') => {
                self.open_property(&parent, &qname, prefix, local, &ordinary, is_empty, scope_depth, at)
            }
            _ => self.open_element(prefix, local, ordinary, is_empty, scope_depth, at),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn open_element(
        &mut self,
        prefix: &str,
        local: &str,
        attributes: Vec<(String, String)>,
        is_empty: bool,
        scope_depth: usize,
        at: At<'t>,
    ) -> Result<(), ParseError> {
        let ty = self.scope.type_for_prefix(prefix, local).map_err(|k| ParseError::at(k, at.pos()))?;
        self.state = State::InRoot;
        self.pending.push_back(Instruction::element(&ty, is_empty));

        for (key, value) in attributes {
            let member = resolver::resolve_member(&ty, &key, &self.scope, prefix)
                .map_err(|k| ParseError::at(k, at.pos()))?;
            self.pending.push_back(Instruction::attribute(member, value));
        }

        if is_empty {
            self.pending.push_back(Instruction::ElementEnd);
            self.leave(scope_depth);
        } else {
            self.frames.push(Frame::Element { ty, prefix: prefix.to_string(), scope_depth });
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn open_property(
        &mut self,
        parent: &Arc<TypeDescriptor>,
        qname: &str,
        prefix: &str,
        local: &str,
        attributes: &[(String, String)],
        is_empty: bool,
        scope_depth: usize,
        at: At<'t>,
    ) -> Result<(), ParseError> {
        if !attributes.is_empty() {
            return Err(invalid_property(qname, "property elements cannot carry attributes", at));
        }
        let (owner, member) = resolver::resolve_property_element(parent, prefix, local, &self.scope)
            .map_err(|k| ParseError::at(k, at.pos()))?;
        self.pending.push_back(Instruction::PropertyElementStart { owner, member });

        if is_empty {
            self.pending.push_back(Instruction::text(""));
            self.pending.push_back(Instruction::ElementEnd);
            self.scope.truncate(scope_depth);
        } else {
            self.frames.push(Frame::Property { text: String::new(), scope_depth });
        }
        Ok(())
    }

    fn close(&mut self, at: At<'t>) -> Result<(), ParseError> {
        match self.frames.pop() {
            Some(Frame::Element { scope_depth, .. }) => {
                self.pending.push_back(Instruction::ElementEnd);
                self.leave(scope_depth);
                Ok(())
            }
            Some(Frame::Property { text, scope_depth }) => {
                self.pending.push_back(Instruction::text(text.trim()));
                self.pending.push_back(Instruction::ElementEnd);
                self.scope.truncate(scope_depth);
                Ok(())
            }
            None => Err(unbalanced("closing tag without a matching start tag", at)),
        }
    }

    /// Unwind an element's declarations; note when the root has closed.
    fn leave(&mut self, scope_depth: usize) {
        self.scope.truncate(scope_depth);
        if self.frames.is_empty() {
            self.state = State::AfterRoot;
        }
    }

    /// Hold character data until the next tag, so text interrupted by a
    /// comment or a CDATA section stays one run.
    fn buffer_text(&mut self, raw: &str, offset: usize) {
        if self.text.is_empty() {
            self.text_offset = offset;
        }
        self.text.push_str(raw);
    }

    fn flush_text(&mut self) -> Result<(), ParseError> {
        if self.text.is_empty() {
            return Ok(());
        }
        let raw = std::mem::take(&mut self.text);
        let at = self.at(self.text_offset);
        match self.frames.last_mut() {
            Some(Frame::Property { text, .. }) => {
                text.push_str(&raw);
                Ok(())
            }
            _ if raw.trim().is_empty() => Ok(()),
            Some(Frame::Element { .. }) => {
                self.pending.push_back(Instruction::text(raw.trim()));
                Ok(())
            }
            None if self.state == State::BeforeRoot => Err(ParseError::at(
                ParseErrorKind::InvalidRootElement { found: "text".to_string() },
                at.pos(),
            )),
            None => Err(unbalanced("text after the root element", at)),
        }
    }

    fn finish(&mut self, at: At<'t>) -> Result<(), ParseError> {
        if let Some(open) = self.frames.last() {
            let inside = match open {
                Frame::Element { ty, prefix, .. } if prefix.is_empty() => ty.name().to_string(),
                Frame::Element { ty, prefix, .. } => format!("{prefix}:{}", ty.name()),
                Frame::Property { .. } => "a property element".to_string(),
            };
            return Err(unbalanced(format!("document ended inside {inside}"), at));
        }
        if self.state == State::BeforeRoot {
            return Err(ParseError::at(
                ParseErrorKind::InvalidRootElement { found: "an empty document".to_string() },
                at.pos(),
            ));
        }
        self.state = State::Done;
        Ok(())
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────

/// Copy attributes in source order; a repeated name overwrites in place.
fn collect_attributes(start: &BytesStart<'_>, at: At<'_>) -> Result<IndexMap<String, String>, ParseError> {
    let mut attributes = IndexMap::new();
    for attr in start.attributes().with_checks(false) {
        let attr = attr.map_err(|e| syntax(e, at))?;
        let key = std::str::from_utf8(attr.key.as_ref()).map_err(|e| syntax(e, at))?.to_string();
        let value = attr.unescape_value().map_err(|e| syntax(e, at))?.into_owned();
        attributes.insert(key, value);
    }
    Ok(attributes)
}

/// `xmlns` declares the default prefix, `xmlns:p` declares `p`.
fn prefix_declaration(key: &str) -> Option<&str> {
    if key == XMLNS {
        return Some("");
    }
    match split_qname(key) {
        (XMLNS, declared) => Some(declared),
        _ => None,
    }
}

fn split_qname(qname: &str) -> (&str, &str) {
    qname.split_once(':').unwrap_or(("", qname))
}

fn tokenizer_error(e: quick_xml::Error, at: At<'_>) -> ParseError {
    let kind = match e {
        quick_xml::Error::IllFormed(ill) => ParseErrorKind::UnbalancedStructure { message: ill.to_string() },
        other => ParseErrorKind::Syntax { message: other.to_string() },
    };
    ParseError::at(kind, at.pos())
}

fn syntax(e: impl std::fmt::Display, at: At<'_>) -> ParseError {
    ParseError::at(ParseErrorKind::Syntax { message: e.to_string() }, at.pos())
}

fn unbalanced(message: impl Into<String>, at: At<'_>) -> ParseError {
    ParseError::at(ParseErrorKind::UnbalancedStructure { message: message.into() }, at.pos())
}

fn invalid_property(name: &str, reason: &str, at: At<'_>) -> ParseError {
    ParseError::at(
        ParseErrorKind::InvalidPropertyElement { name: name.to_string(), reason: reason.to_string() },
        at.pos(),
    )
}
