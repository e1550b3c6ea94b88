//! Single-pass classifier that cuts INI text into logical lines.
//!
//! The scanner walks the buffer byte by byte and hands every finished logical line to a
//! [`LineVisitor`]. Both the memory estimator and the document builder are visitors, so the
//! two passes share one state machine and cannot disagree about where lines end or how they
//! are classified.
//!
//! Every input byte lands in exactly one logical line. Text that breaks the rules below is
//! classified [`LineKind::Malformed`] and kept verbatim; scanning never stops early.
//!
//! Ambiguous input resolves as follows:
//!
//! ```text
//! ["Hello]"        Malformed (section still open at the line break)
//! [World           Malformed
//! [Foo] = Bar      Property "Foo" = "Bar", no section
//! [Woop][Woop]     Two section lines, the first without a line break
//! [Foo] Bar = Baz  Section "Foo" and property "Bar" on one line
//! [[Yay]           Malformed
//! Foo = Bar = Baz  Malformed (second equals sign)
//! Foo = "Bar" Baz  Malformed (text after a closed quote)
//! [Yay = Nay]      Malformed (equals sign inside a section name)
//! Foo = [Bar]      Property "Foo" = "[Bar]"
//! "Foo" Bar = Baz  Malformed
//! ```

use std::ops::Range;

/// Byte range relative to the start of the line it belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Span {
    /// Offset of the first byte.
    pub start: usize,
    /// Number of bytes covered.
    pub len: usize,
}

impl Span {
    #[must_use]
    /// Creates a span covering `len` bytes from `start`.
    pub const fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    #[must_use]
    /// Offset one past the last byte.
    pub const fn end(&self) -> usize {
        self.start + self.len
    }

    #[must_use]
    /// The span as a range usable for slicing.
    pub const fn range(&self) -> Range<usize> {
        self.start..self.end()
    }

    #[must_use]
    /// The bytes this span covers within `line`.
    pub fn slice<'a>(&self, line: &'a [u8]) -> &'a [u8] {
        &line[self.range()]
    }
}

/// Location of a `[name]` marker within a line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SectionMarker {
    /// The section name, without brackets, quotes or surrounding whitespace.
    pub name: Span,
    /// Offset one past the closing bracket.
    pub end: usize,
}

/// Classification of a logical line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind {
    /// Blank or comment-only line.
    Plain,
    /// Line that violates the syntax; its bytes are preserved but carry no meaning.
    Malformed,
    /// Section declaration such as `[Name]`.
    Section {
        /// The declared section name.
        name: Span,
    },
    /// Property assignment such as `name = value`.
    Property {
        /// Section declared on the same line in front of the assignment, if any.
        section: Option<SectionMarker>,
        /// The property name, without quotes or surrounding whitespace.
        name: Span,
        /// The property value, without quotes or surrounding whitespace.
        value: Span,
    },
}

/// One classified logical line handed to a [`LineVisitor`].
#[derive(Clone, Copy, Debug)]
pub struct ScannedLine<'a> {
    /// Offset of the line within the scanned buffer.
    pub offset: usize,
    /// The line's bytes, including its line break if it has one.
    pub bytes: &'a [u8],
    /// How the line was classified.
    pub kind: LineKind,
}

/// Receives logical lines from [`scan`] in input order.
pub trait LineVisitor {
    /// Error that aborts the scan.
    type Error;

    /// Accepts the next logical line.
    ///
    /// # Errors
    ///
    /// Any error returned stops the scan and is passed through to the caller of [`scan`].
    fn visit_line(&mut self, line: ScannedLine<'_>) -> Result<(), Self::Error>;
}

/// Name, section name or value being collected.
#[derive(Default)]
struct Token {
    start: Option<usize>,
    end: usize,
    quote_closed: bool,
}

impl Token {
    /// Extends the token over a non-whitespace byte. Fails after a closing quote.
    fn push(&mut self, at: usize) -> bool {
        if self.quote_closed {
            return false;
        }
        if self.start.is_none() {
            self.start = Some(at);
        }
        self.end = at + 1;
        true
    }

    /// Starts a quoted token. Only legal as the token's first byte.
    fn open_quote(&mut self, at: usize) -> bool {
        if self.start.is_some() {
            return false;
        }
        self.start = Some(at + 1);
        self.end = at + 1;
        true
    }

    fn close_quote(&mut self, at: usize) {
        self.end = at;
        self.quote_closed = true;
    }

    fn span(&self, line_start: usize) -> Option<Span> {
        self.start
            .map(|start| Span::new(start - line_start, self.end - start))
    }
}

/// Everything known about the logical line being scanned.
#[derive(Default)]
struct LineState {
    start: usize,
    malformed: bool,
    in_comment: bool,
    in_quote: bool,
    section_open: bool,
    section: Token,
    marker_end: Option<usize>,
    name: Token,
    equals: Option<usize>,
    value: Token,
}

impl LineState {
    fn starting_at(start: usize) -> Self {
        Self {
            start,
            ..Self::default()
        }
    }

    /// Token the next byte belongs to.
    fn token(&mut self) -> &mut Token {
        if self.section_open {
            &mut self.section
        } else if self.equals.is_some() {
            &mut self.value
        } else {
            &mut self.name
        }
    }

    /// A `[` right after a complete `[name]` starts a new logical line.
    fn starts_second_section(&self) -> bool {
        !self.section_open
            && self.marker_end.is_some()
            && self.equals.is_none()
            && self.name.start.is_none()
    }

    fn step(&mut self, byte: u8, at: usize) {
        match byte {
            b';' | b'#' => self.in_comment = true,
            b'"' => {
                if self.token().open_quote(at) {
                    self.in_quote = true;
                } else {
                    self.malformed = true;
                }
            }
            b'[' if self.equals.is_none() => {
                if self.section_open || self.marker_end.is_some() || self.name.start.is_some() {
                    self.malformed = true;
                } else {
                    self.section_open = true;
                }
            }
            b']' if self.equals.is_none() => {
                if self.section_open {
                    self.section_open = false;
                    self.marker_end = Some(at + 1);
                } else {
                    self.malformed = true;
                }
            }
            b'=' => {
                if self.section_open || self.equals.is_some() {
                    self.malformed = true;
                } else {
                    self.equals = Some(at);
                }
            }
            b' ' | b'\t' | b'\r' => {}
            _ => {
                if !self.token().push(at) {
                    self.malformed = true;
                }
            }
        }
    }

    fn classify(&self, input: &[u8], end: usize) -> LineKind {
        if self.malformed || self.in_quote || self.section_open {
            return LineKind::Malformed;
        }

        let section = match self.marker_end {
            Some(marker_end) => match self.section.span(self.start) {
                Some(name) if name.len > 0 => Some(SectionMarker {
                    name,
                    end: marker_end - self.start,
                }),
                _ => return LineKind::Malformed,
            },
            None => None,
        };

        let name = self.name.span(self.start);
        if name.is_some_and(|name| name.len == 0) {
            return LineKind::Malformed;
        }

        match (self.equals, section, name) {
            (Some(equals), section, Some(name)) => LineKind::Property {
                section,
                name,
                value: self.value_span(input, equals, end),
            },
            (Some(equals), Some(marker), None) => LineKind::Property {
                section: None,
                name: marker.name,
                value: self.value_span(input, equals, end),
            },
            (None, Some(marker), None) => LineKind::Section { name: marker.name },
            (None, None, None) => LineKind::Plain,
            (Some(_), None, None) | (None, _, Some(_)) => LineKind::Malformed,
        }
    }

    /// An empty value sits right after the blanks that follow the equals sign.
    fn value_span(&self, input: &[u8], equals: usize, end: usize) -> Span {
        if let Some(span) = self.value.span(self.start) {
            return span;
        }
        let mut at = equals + 1;
        while at < end && matches!(input[at], b' ' | b'\t') {
            at += 1;
        }
        Span::new(at - self.start, 0)
    }

    fn finish<V: LineVisitor + ?Sized>(
        &self,
        input: &[u8],
        end: usize,
        visitor: &mut V,
    ) -> Result<(), V::Error> {
        visitor.visit_line(ScannedLine {
            offset: self.start,
            bytes: &input[self.start..end],
            kind: self.classify(input, end),
        })
    }
}

/// Scans `input` from start to end, reporting each logical line to `visitor`.
///
/// A final line without a line break is still reported. An empty buffer produces no lines.
///
/// # Errors
///
/// Only errors raised by the visitor are returned; classification itself cannot fail.
pub fn scan<V: LineVisitor + ?Sized>(input: &[u8], visitor: &mut V) -> Result<(), V::Error> {
    let mut state = LineState::starting_at(0);

    for (at, &byte) in input.iter().enumerate() {
        if byte == b'\n' {
            state.finish(input, at + 1, visitor)?;
            state = LineState::starting_at(at + 1);
        } else if state.malformed || state.in_comment {
            // inert until the line break
        } else if state.in_quote {
            if byte == b'"' {
                state.in_quote = false;
                state.token().close_quote(at);
            }
        } else if byte == b'[' && state.starts_second_section() {
            state.finish(input, at, visitor)?;
            state = LineState::starting_at(at);
            state.step(byte, at);
        } else {
            state.step(byte, at);
        }
    }

    if input.len() > state.start {
        state.finish(input, input.len(), visitor)?;
    }
    Ok(())
}

/// Classifies `input` into owned line records.
#[must_use]
pub fn classify(input: &[u8]) -> Vec<(Range<usize>, LineKind)> {
    let mut collected = Vec::new();
    let mut sink = |line: ScannedLine<'_>| {
        collected.push((line.offset..line.offset + line.bytes.len(), line.kind));
    };
    let Ok(()) = scan(input, &mut FnVisitor(&mut sink));
    collected
}

struct FnVisitor<F>(F);

impl<F: FnMut(ScannedLine<'_>)> LineVisitor for FnVisitor<F> {
    type Error = std::convert::Infallible;

    fn visit_line(&mut self, line: ScannedLine<'_>) -> Result<(), Self::Error> {
        (self.0)(line);
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/scanner.rs"]
mod tests;
