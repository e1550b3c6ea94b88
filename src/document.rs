//! Format-preserving document model of an INI file.
//!
//! A [`Document`] keeps every logical line of the source in order, each line owning its exact
//! bytes, and indexes sections and properties by name on top of that list. Writing the lines
//! back out reproduces the input byte for byte; edits touch only the lines they change.
//!
//! Lines live in an [`Arena`] and link to their neighbours through [`LineId`]s, forming a
//! circular list that starts at `head`. The index in `sections` refers to the same ids, and
//! every mutation updates the list and the index together.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tracing::{debug, trace};

use crate::arena::{Arena, ArenaStats, RecordId, DEFAULT_CHUNK_SIZE};
use crate::error::{Error, Result};
use crate::estimator;
use crate::names::{ExactNames, NameFolding};
use crate::scanner::{self, LineKind};
use crate::section::Section;

mod builder;
mod editing;

use builder::ModelBuilder;

/// Handle of a line inside a [`Document`].
///
/// A handle stays valid until its line is removed or relocated by an edit. Using it after that
/// yields [`Error::DetachedLine`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LineId(RecordId);

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Placeholder link of a line that has not been linked into the list yet.
const UNLINKED: LineId = LineId(RecordId::Dedicated {
    block: usize::MAX,
    generation: u32::MAX,
});

/// Arena record header of one logical line. Its bytes are the record's payload.
#[derive(Debug)]
pub(crate) struct Line {
    previous: LineId,
    next: LineId,
    length: usize,
    kind: LineKind,
    attached: bool,
}

/// Formatting used for lines the document composes itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Conventions {
    /// Write `name = value` rather than `name=value`.
    pub spaces_around_assignment: bool,
    /// Put a blank line between a new property and the property before it.
    pub empty_lines_between_properties: bool,
    /// End new lines with CR-LF rather than LF.
    pub crlf: bool,
}

impl Conventions {
    fn line_ending(&self) -> &'static [u8] {
        if self.crlf {
            b"\r\n"
        } else {
            b"\n"
        }
    }
}

/// Settings for creating or loading a document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DocumentOptions {
    /// Spacing around `=` in new property lines.
    pub spaces_around_assignment: bool,
    /// Blank lines between new properties.
    pub empty_lines_between_properties: bool,
    /// Let the conventions observed in a loaded file override the two settings above.
    pub detect_conventions: bool,
    /// Size of the arena chunks used for lines created after loading.
    pub chunk_size: usize,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            spaces_around_assignment: true,
            empty_lines_between_properties: false,
            detect_conventions: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// A line as seen from outside the document.
#[derive(Clone, Copy, Debug)]
pub struct LineRef<'a> {
    /// Handle of the line.
    pub id: LineId,
    /// Classification of the line.
    pub kind: LineKind,
    /// The line's exact bytes, including its line break.
    pub contents: &'a [u8],
}

impl<'a> LineRef<'a> {
    #[must_use]
    /// Name of the section this line declares, if it declares one.
    pub fn section_name(&self) -> Option<&'a [u8]> {
        match self.kind {
            LineKind::Section { name } => Some(name.slice(self.contents)),
            LineKind::Property {
                section: Some(marker),
                ..
            } => Some(marker.name.slice(self.contents)),
            _ => None,
        }
    }

    #[must_use]
    /// Name and value of the property this line assigns, if it assigns one.
    pub fn property(&self) -> Option<(&'a [u8], &'a [u8])> {
        match self.kind {
            LineKind::Property { name, value, .. } => {
                Some((name.slice(self.contents), value.slice(self.contents)))
            }
            _ => None,
        }
    }
}

/// A property listed by [`Document::properties`].
#[derive(Clone, Copy, Debug)]
pub struct PropertyRef<'a> {
    /// Line the property is assigned on.
    pub line: LineId,
    /// Property name, without quotes.
    pub name: &'a [u8],
    /// Property value, without quotes.
    pub value: &'a [u8],
}

/// In-memory model of an INI file that can be edited and written back losslessly.
pub struct Document {
    arena: Arena<Line>,
    head: Option<LineId>,
    sections: HashMap<String, Section>,
    folding: Box<dyn NameFolding + Send + Sync>,
    conventions: Conventions,
}

impl Document {
    /// Creates an empty document consisting of a single blank line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] if the line cannot be allocated.
    pub fn empty() -> Result<Self> {
        Self::empty_with(DocumentOptions::default(), Box::new(ExactNames))
    }

    /// Creates an empty document with the given options and name folding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] if the line cannot be allocated.
    pub fn empty_with(
        options: DocumentOptions,
        folding: Box<dyn NameFolding + Send + Sync>,
    ) -> Result<Self> {
        let mut document = Self::bare(Arena::new(options.chunk_size), options, folding);
        let ending = document.conventions.line_ending();
        document.push_back(ending, LineKind::Plain)?;
        Ok(document)
    }

    /// Parses a complete INI buffer with default options and exact name matching.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] if line storage cannot be reserved. Malformed text is
    /// not an error; it is kept as [`LineKind::Malformed`] lines.
    pub fn parse(input: &[u8]) -> Result<Self> {
        Self::parse_with(input, DocumentOptions::default(), Box::new(ExactNames))
    }

    /// Parses a complete INI buffer.
    ///
    /// A dry-run scan sizes a single block for all lines first, then the build scan fills it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] if line storage cannot be reserved.
    pub fn parse_with(
        input: &[u8],
        options: DocumentOptions,
        folding: Box<dyn NameFolding + Send + Sync>,
    ) -> Result<Self> {
        let estimate = estimator::estimate(input);
        let arena = Arena::with_bulk_capacity(options.chunk_size, estimate.bytes())?;
        let mut document = Self::bare(arena, options, folding);

        let mut builder = ModelBuilder::new(&mut document);
        scanner::scan(input, &mut builder)?;
        let summary = builder.finish();

        summary.apply_to(&mut document.conventions, options.detect_conventions);

        debug!(
            bytes = input.len(),
            estimated = estimate.bytes(),
            lines = summary.lines,
            malformed = summary.malformed,
            sections = document.sections.len() - 1,
            conventions = ?document.conventions,
            "parsed document"
        );
        Ok(document)
    }

    /// Reads and parses the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, or [`Error::OutOfMemory`].
    pub fn load(
        path: impl AsRef<Path>,
        options: DocumentOptions,
        folding: Box<dyn NameFolding + Send + Sync>,
    ) -> Result<Self> {
        let contents = fs::read(path.as_ref())?;
        Self::parse_with(&contents, options, folding)
    }

    fn bare(
        arena: Arena<Line>,
        options: DocumentOptions,
        folding: Box<dyn NameFolding + Send + Sync>,
    ) -> Self {
        let mut sections = HashMap::new();
        sections.insert(String::new(), Section::global());
        Self {
            arena,
            head: None,
            sections,
            folding,
            conventions: Conventions {
                spaces_around_assignment: options.spaces_around_assignment,
                empty_lines_between_properties: options.empty_lines_between_properties,
                crlf: false,
            },
        }
    }

    #[must_use]
    /// Formatting applied to lines composed by edits.
    pub fn conventions(&self) -> Conventions {
        self.conventions
    }

    #[must_use]
    /// Memory held by the line arena.
    pub fn arena_stats(&self) -> ArenaStats {
        self.arena.stats()
    }

    // ----- reading ---------------------------------------------------------------------------

    #[must_use]
    /// Iterates over all lines in document order.
    pub fn lines(&self) -> Lines<'_> {
        Lines {
            document: self,
            next: self.head,
        }
    }

    /// Exact bytes of a line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DetachedLine`] if the line was removed or relocated.
    pub fn line_contents(&self, id: LineId) -> Result<&[u8]> {
        self.contents(id)
    }

    /// Classification of a line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DetachedLine`] if the line was removed or relocated.
    pub fn line_kind(&self, id: LineId) -> Result<LineKind> {
        Ok(self.line(id)?.kind)
    }

    #[must_use]
    /// Whether a section of this name exists. The empty name is the global section.
    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(self.fold(section).as_ref())
    }

    #[must_use]
    /// Index entry of a section. The empty name is the global section.
    pub fn section(&self, section: &str) -> Option<&Section> {
        self.sections.get(self.fold(section).as_ref())
    }

    #[must_use]
    /// Names of all declared sections in order of their first declaration.
    pub fn sections(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for line in self.lines() {
            let Some(raw) = line.section_name() else {
                continue;
            };
            let key = self.key(raw);
            if let Some((key, section)) = self.sections.get_key_value(&key) {
                if seen.insert(key.as_str()) {
                    names.push(section.name.as_str());
                }
            }
        }
        names
    }

    #[must_use]
    /// Handle of the line that assigns a property.
    pub fn property_line(&self, section: &str, name: &str) -> Option<LineId> {
        self.sections
            .get(self.fold(section).as_ref())?
            .properties
            .get(self.fold(name).as_ref())
            .copied()
    }

    #[must_use]
    /// Raw value of a property. The empty section name is the global section.
    pub fn property(&self, section: &str, name: &str) -> Option<&[u8]> {
        let id = self.property_line(section, name)?;
        let line = self.line(id).ok()?;
        let contents = self.contents(id).ok()?;
        match line.kind {
            LineKind::Property { value, .. } => Some(value.slice(contents)),
            _ => None,
        }
    }

    #[must_use]
    /// Value of a property if it is valid UTF-8.
    pub fn property_str(&self, section: &str, name: &str) -> Option<&str> {
        self.property(section, name)
            .and_then(|value| std::str::from_utf8(value).ok())
    }

    #[must_use]
    /// Properties of a section in document order.
    pub fn properties(&self, section: &str) -> Vec<PropertyRef<'_>> {
        let key = self.fold(section).into_owned();
        let Some(entry) = self.sections.get(&key) else {
            return Vec::new();
        };

        let mut properties = Vec::new();
        self.visit_regions(|region, line| {
            if region != key {
                return;
            }
            let Some((name, value)) = line.property() else {
                return;
            };
            if entry.properties.get(&self.key(name)) == Some(&line.id) {
                properties.push(PropertyRef {
                    line: line.id,
                    name,
                    value,
                });
            }
        });
        properties
    }

    // ----- writing ---------------------------------------------------------------------------

    #[must_use]
    /// Concatenates all lines, reproducing the file.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for line in self.lines() {
            bytes.extend_from_slice(line.contents);
        }
        bytes
    }

    /// Writes all lines to `writer`.
    ///
    /// # Errors
    ///
    /// Returns any error raised by the writer.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for line in self.lines() {
            writer.write_all(line.contents)?;
        }
        Ok(())
    }

    /// Writes the document to the file at `path`, replacing its contents.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path.as_ref(), self.to_bytes())?;
        Ok(())
    }

    // ----- index helpers ---------------------------------------------------------------------

    fn fold<'n>(&self, name: &'n str) -> Cow<'n, str> {
        self.folding.fold(name)
    }

    /// Lookup key for a name taken from the file's bytes.
    fn key(&self, raw: &[u8]) -> String {
        self.fold(&String::from_utf8_lossy(raw)).into_owned()
    }

    /// Calls `visit` for every line with the key of the section the line belongs to.
    ///
    /// A line declaring a section belongs to the section it declares.
    fn visit_regions<'a>(&'a self, mut visit: impl FnMut(&str, LineRef<'a>)) {
        let mut region = String::new();
        for line in self.lines() {
            if let Some(raw) = line.section_name() {
                region = self.key(raw);
            }
            visit(&region, line);
        }
    }

    // ----- line list -------------------------------------------------------------------------

    fn line(&self, id: LineId) -> Result<&Line> {
        self.arena
            .header(id.0)
            .filter(|line| line.attached)
            .ok_or(Error::DetachedLine(id))
    }

    fn line_mut(&mut self, id: LineId) -> Result<&mut Line> {
        self.arena
            .header_mut(id.0)
            .filter(|line| line.attached)
            .ok_or(Error::DetachedLine(id))
    }

    fn contents(&self, id: LineId) -> Result<&[u8]> {
        match self.arena.record(id.0) {
            Some((line, payload)) if line.attached => Ok(&payload[..line.length]),
            _ => Err(Error::DetachedLine(id)),
        }
    }

    /// Key of the section whose region holds `id`: the nearest declaration at or before it.
    fn region_of(&self, id: LineId) -> Result<String> {
        let mut cursor = id;
        loop {
            let line = self.line(cursor)?;
            let declared = match line.kind {
                LineKind::Section { name } => Some(name),
                LineKind::Property {
                    section: Some(marker),
                    ..
                } => Some(marker.name),
                _ => None,
            };
            if let Some(name) = declared {
                return Ok(self.key(name.slice(self.contents(cursor)?)));
            }
            if Some(cursor) == self.head {
                return Ok(String::new());
            }
            cursor = line.previous;
        }
    }

    fn tail(&self) -> Option<LineId> {
        let head = self.head?;
        self.line(head).ok().map(|line| line.previous)
    }

    fn allocate_line(&mut self, contents: &[u8], kind: LineKind) -> Result<LineId> {
        let header = Line {
            previous: UNLINKED,
            next: UNLINKED,
            length: contents.len(),
            kind,
            attached: true,
        };
        let id = LineId(self.arena.allocate(header, contents.len())?);
        if let Some((_, payload)) = self.arena.record_mut(id.0) {
            payload.copy_from_slice(contents);
        }
        Ok(id)
    }

    /// Links `line` between two neighbours, which may be the same line.
    fn link_between(&mut self, previous: LineId, line: LineId, next: LineId) -> Result<()> {
        {
            let header = self.line_mut(line)?;
            header.previous = previous;
            header.next = next;
        }
        self.line_mut(previous)?.next = line;
        self.line_mut(next)?.previous = line;
        Ok(())
    }

    fn link_alone(&mut self, line: LineId) -> Result<()> {
        let header = self.line_mut(line)?;
        header.previous = line;
        header.next = line;
        self.head = Some(line);
        Ok(())
    }

    /// Appends a new line at the end of the document.
    fn push_back(&mut self, contents: &[u8], kind: LineKind) -> Result<LineId> {
        let id = self.allocate_line(contents, kind)?;
        match self.head {
            None => self.link_alone(id)?,
            Some(head) => {
                let tail = self.line(head)?.previous;
                self.link_between(tail, id, head)?;
            }
        }
        Ok(id)
    }

    /// Inserts a new line at the start of the document.
    fn push_front(&mut self, contents: &[u8], kind: LineKind) -> Result<LineId> {
        let id = self.push_back(contents, kind)?;
        self.head = Some(id);
        Ok(id)
    }

    /// Inserts a new line directly after `anchor`.
    fn insert_after(&mut self, anchor: LineId, contents: &[u8], kind: LineKind) -> Result<LineId> {
        let next = self.line(anchor)?.next;
        let id = self.allocate_line(contents, kind)?;
        self.link_between(anchor, id, next)?;
        Ok(id)
    }

    /// Removes a line from the list. The caller updates the index.
    fn unlink(&mut self, id: LineId) -> Result<()> {
        let (previous, next) = {
            let line = self.line(id)?;
            (line.previous, line.next)
        };

        if next == id {
            self.head = None;
        } else {
            self.line_mut(previous)?.next = next;
            self.line_mut(next)?.previous = previous;
            if self.head == Some(id) {
                self.head = Some(next);
            }
        }

        self.line_mut(id)?.attached = false;
        if self.arena.release(id.0) {
            trace!(line = %id, "released dedicated line block");
        }
        Ok(())
    }

    /// Replaces a line's bytes and classification.
    ///
    /// The line is rewritten in place when the new bytes fit its storage; otherwise a new line
    /// takes its place in the list and in the index, and the new handle is returned. Only the
    /// section whose region holds the line can refer to it, so only that entry is updated.
    fn rewrite(&mut self, id: LineId, contents: &[u8], kind: LineKind) -> Result<LineId> {
        let capacity = match self.arena.record(id.0) {
            Some((line, payload)) if line.attached => payload.len(),
            _ => return Err(Error::DetachedLine(id)),
        };

        if contents.len() <= capacity {
            if let Some((line, payload)) = self.arena.record_mut(id.0) {
                payload[..contents.len()].copy_from_slice(contents);
                line.length = contents.len();
                line.kind = kind;
            }
            return Ok(id);
        }

        let (previous, next) = {
            let line = self.line(id)?;
            (line.previous, line.next)
        };
        let owner = self.region_of(id)?;
        let replacement = self.allocate_line(contents, kind)?;
        if next == id {
            self.link_alone(replacement)?;
        } else {
            self.link_between(previous, replacement, next)?;
            if self.head == Some(id) {
                self.head = Some(replacement);
            }
        }

        self.line_mut(id)?.attached = false;
        self.arena.release(id.0);
        if let Some(section) = self.sections.get_mut(&owner) {
            section.retarget(id, replacement);
        }

        trace!(from = %id, to = %replacement, bytes = contents.len(), "relocated line");
        Ok(replacement)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            f.write_str(&String::from_utf8_lossy(line.contents))?;
        }
        Ok(())
    }
}

/// Iterator over the lines of a [`Document`].
pub struct Lines<'a> {
    document: &'a Document,
    next: Option<LineId>,
}

impl<'a> Iterator for Lines<'a> {
    type Item = LineRef<'a>;

    fn next(&mut self) -> Option<LineRef<'a>> {
        let id = self.next?;
        let (line, payload) = self.document.arena.record(id.0)?;
        self.next = Some(line.next).filter(|next| Some(*next) != self.document.head);
        Some(LineRef {
            id,
            kind: line.kind,
            contents: &payload[..line.length],
        })
    }
}

#[cfg(test)]
#[path = "tests/document.rs"]
mod tests;
