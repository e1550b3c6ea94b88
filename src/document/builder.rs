//! Fills a document from the scanner's logical lines.

use crate::error::Error;
use crate::scanner::{LineKind, LineVisitor, ScannedLine, Span};
use crate::section::Section;

use super::{Conventions, Document, LineId};

/// What the builder saw while loading, used to pick conventions for later edits.
#[derive(Debug, Default)]
pub(super) struct LoadSummary {
    pub(super) lines: usize,
    pub(super) malformed: usize,
    spaced_assignments: usize,
    tight_assignments: usize,
    separated_properties: usize,
    adjacent_properties: usize,
    crlf: Option<bool>,
}

impl LoadSummary {
    /// Line endings always follow the file; spacing only when `detect` is set.
    pub(super) fn apply_to(&self, conventions: &mut Conventions, detect: bool) {
        if let Some(crlf) = self.crlf {
            conventions.crlf = crlf;
        }
        if !detect {
            return;
        }
        if self.spaced_assignments + self.tight_assignments > 0 {
            conventions.spaces_around_assignment =
                self.spaced_assignments >= self.tight_assignments;
        }
        if self.separated_properties + self.adjacent_properties > 0 {
            conventions.empty_lines_between_properties =
                self.separated_properties > self.adjacent_properties;
        }
    }
}

/// Where the previous lines leave us with respect to property spacing.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Run {
    Other,
    AfterProperty,
    BlankAfterProperty,
}

/// Appends scanned lines to a document and registers them in its index.
pub(super) struct ModelBuilder<'d> {
    document: &'d mut Document,
    current: String,
    run: Run,
    summary: LoadSummary,
}

impl<'d> ModelBuilder<'d> {
    pub(super) fn new(document: &'d mut Document) -> Self {
        Self {
            document,
            current: String::new(),
            run: Run::Other,
            summary: LoadSummary::default(),
        }
    }

    pub(super) fn finish(self) -> LoadSummary {
        self.summary
    }

    /// Makes `raw` the open section, creating its index entry on first sight.
    fn enter_section(&mut self, line: LineId, raw: &[u8]) {
        let key = self.document.key(raw);
        self.document
            .sections
            .entry(key.clone())
            .or_insert_with(|| Section::declared(String::from_utf8_lossy(raw).into_owned(), line))
            .last_line = Some(line);
        self.current = key;
    }

    /// Files a property under the open section. The first assignment of a name wins.
    fn register_property(&mut self, line: LineId, raw: &[u8]) {
        let key = self.document.key(raw);
        if let Some(section) = self.document.sections.get_mut(&self.current) {
            section.properties.entry(key).or_insert(line);
            section.last_line = Some(line);
        }
    }

    fn observe_assignment(&mut self, bytes: &[u8], name: Span, value: Span) {
        let gap = &bytes[name.end()..value.start];
        let Some(equals) = gap.iter().position(|&byte| byte == b'=') else {
            return;
        };
        let before = equals.checked_sub(1).map(|at| gap[at]);
        let after = gap.get(equals + 1).copied();
        if matches!(before, Some(b' ' | b'\t')) && matches!(after, Some(b' ' | b'\t')) {
            self.summary.spaced_assignments += 1;
        } else {
            self.summary.tight_assignments += 1;
        }

        match self.run {
            Run::AfterProperty => self.summary.adjacent_properties += 1,
            Run::BlankAfterProperty => self.summary.separated_properties += 1,
            Run::Other => {}
        }
        self.run = Run::AfterProperty;
    }

    fn observe_ending(&mut self, bytes: &[u8]) {
        if self.summary.crlf.is_none() && bytes.ends_with(b"\n") {
            self.summary.crlf = Some(bytes.ends_with(b"\r\n"));
        }
    }
}

impl LineVisitor for ModelBuilder<'_> {
    type Error = Error;

    fn visit_line(&mut self, scanned: ScannedLine<'_>) -> Result<(), Error> {
        let id = self.document.push_back(scanned.bytes, scanned.kind)?;
        self.summary.lines += 1;
        self.observe_ending(scanned.bytes);

        match scanned.kind {
            LineKind::Plain => {
                let blank = scanned.bytes.iter().all(u8::is_ascii_whitespace);
                self.run = match self.run {
                    Run::AfterProperty | Run::BlankAfterProperty if blank => {
                        Run::BlankAfterProperty
                    }
                    _ => Run::Other,
                };
            }
            LineKind::Malformed => {
                self.summary.malformed += 1;
                self.run = Run::Other;
            }
            LineKind::Section { name } => {
                self.enter_section(id, name.slice(scanned.bytes));
                self.run = Run::Other;
            }
            LineKind::Property {
                section,
                name,
                value,
            } => {
                if let Some(marker) = section {
                    self.enter_section(id, marker.name.slice(scanned.bytes));
                    self.run = Run::Other;
                }
                self.register_property(id, name.slice(scanned.bytes));
                self.observe_assignment(scanned.bytes, name, value);
            }
        }
        Ok(())
    }
}
