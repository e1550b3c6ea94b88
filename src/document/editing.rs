//! Mutations of a document: setting and removing properties, removing sections.
//!
//! Every mutation keeps the line list and the section index in agreement and leaves the bytes
//! and order of untouched lines alone. New lines follow the document's [`Conventions`].
//!
//! [`Conventions`]: super::Conventions

use std::borrow::Cow;

use tracing::trace;

use crate::error::{Error, Result};
use crate::scanner::{LineKind, Span};
use crate::section::Section;

use super::{Document, LineId};

/// Bytes that carry meaning outside quotes.
const SPECIAL: [char; 5] = [';', '#', '=', '[', ']'];

/// Rejects text that cannot appear on a single INI line.
fn validate(what: &'static str, text: &str, allow_empty: bool) -> Result<()> {
    let reason = if text.is_empty() && !allow_empty {
        "it is empty"
    } else if text.contains(['\n', '\r']) {
        "it contains a line break"
    } else if text.contains('"') {
        "it contains a double quote"
    } else {
        return Ok(());
    };
    Err(Error::Unrepresentable {
        what,
        text: text.to_string(),
        reason,
    })
}

fn needs_quotes(text: &str) -> bool {
    text.starts_with([' ', '\t'])
        || text.ends_with([' ', '\t'])
        || text.contains(SPECIAL)
}

/// Validates `text` and quotes it if the scanner would otherwise misread it.
fn encode<'a>(what: &'static str, text: &'a str, allow_empty: bool) -> Result<Cow<'a, str>> {
    validate(what, text, allow_empty)?;
    Ok(if needs_quotes(text) {
        Cow::Owned(format!("\"{text}\""))
    } else {
        Cow::Borrowed(text)
    })
}

/// Span of the raw text inside its encoded form written at `at`.
fn inner_span(at: usize, encoded: &str, raw: &str) -> Span {
    if encoded.len() == raw.len() {
        Span::new(at, raw.len())
    } else {
        Span::new(at + 1, raw.len())
    }
}

/// The line break a line ends with, if any.
fn line_break(contents: &[u8]) -> &[u8] {
    if contents.ends_with(b"\r\n") {
        b"\r\n"
    } else if contents.ends_with(b"\n") {
        b"\n"
    } else {
        b""
    }
}

/// Start of the comment after `from`, including the blanks in front of it.
fn trailing_comment(contents: &[u8], from: usize) -> Option<usize> {
    let mut in_quote = false;
    let mut comment = None;
    for (at, &byte) in contents.iter().enumerate().skip(from) {
        match byte {
            b'"' => in_quote = !in_quote,
            b';' | b'#' if !in_quote => {
                comment = Some(at);
                break;
            }
            _ => {}
        }
    }
    let mut start = comment?;
    while start > from && matches!(contents[start - 1], b' ' | b'\t') {
        start -= 1;
    }
    Some(start)
}

impl Document {
    /// Sets a property, creating its section and its line as needed.
    ///
    /// The empty section name addresses the global section. A missing section is declared at
    /// the end of the document; a missing property is added after the last line of its
    /// section. An existing value is rewritten in place when the new line fits the line's
    /// storage, otherwise the line is replaced at the same position. Returns the handle of the
    /// property's line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unrepresentable`] for names or values that cannot be written on one
    /// line, or [`Error::OutOfMemory`] if a new line cannot be allocated.
    pub fn set_property(&mut self, section: &str, name: &str, value: &str) -> Result<LineId> {
        validate("section name", section, true)?;
        validate("property name", name, false)?;
        validate("value", value, true)?;

        let section_key = self.fold(section).into_owned();
        if !self.sections.contains_key(&section_key) {
            self.declare_section(section, section_key.clone())?;
        }

        let name_key = self.fold(name).into_owned();
        let existing = self
            .sections
            .get(&section_key)
            .and_then(|entry| entry.properties.get(&name_key).copied());

        match existing {
            Some(line) => self.update_value(line, value),
            None => self.append_property(&section_key, name_key, name, value),
        }
    }

    /// Removes a property. Returns `false` if it did not exist.
    ///
    /// Every assignment of the name in the section goes, not only the indexed first one, so no
    /// later duplicate resurfaces when the file is read again. When an assignment shares its
    /// line with a section declaration, the declaration and any trailing comment stay.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DetachedLine`] if the index refers to a line no longer in the list.
    pub fn remove_property(&mut self, section: &str, name: &str) -> Result<bool> {
        let section_key = self.fold(section).into_owned();
        let name_key = self.fold(name).into_owned();
        let Some(indexed) = self
            .sections
            .get(&section_key)
            .and_then(|entry| entry.properties.get(&name_key).copied())
        else {
            return Ok(false);
        };
        // Fail before touching the index if it already disagrees with the list.
        self.line(indexed)?;

        let mut doomed = Vec::new();
        self.visit_regions(|region, line| {
            if region != section_key {
                return;
            }
            if let Some((raw, _)) = line.property() {
                if self.key(raw) == name_key {
                    doomed.push(line.id);
                }
            }
        });

        if let Some(entry) = self.sections.get_mut(&section_key) {
            entry.properties.remove(&name_key);
        }
        // Last to first, so `last_line` can step back over several removed lines.
        for &id in doomed.iter().rev() {
            self.remove_assignment(&section_key, id)?;
        }

        trace!(section, name, lines = doomed.len(), "removed property");
        Ok(true)
    }

    /// Removes a section's declaration lines and all of its properties.
    ///
    /// Comments and blank lines inside the section stay. The global section cannot be removed;
    /// removing it only removes its properties. Returns `false` if the section did not exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DetachedLine`] if the index refers to a line no longer in the list.
    pub fn remove_section(&mut self, section: &str) -> Result<bool> {
        let key = self.fold(section).into_owned();
        if !self.sections.contains_key(&key) {
            return Ok(false);
        }

        let global = key.is_empty();
        let mut doomed = Vec::new();
        self.visit_regions(|region, line| {
            let owned = match line.kind {
                LineKind::Section { .. } => !global,
                LineKind::Property { .. } => true,
                LineKind::Plain | LineKind::Malformed => false,
            };
            if owned && region == key {
                doomed.push(line.id);
            }
        });

        if global {
            if let Some(entry) = self.sections.get_mut(&key) {
                entry.properties.clear();
                entry.last_line = None;
            }
        } else {
            self.sections.remove(&key);
        }
        for id in &doomed {
            self.unlink(*id)?;
        }

        trace!(section, lines = doomed.len(), "removed section");
        Ok(true)
    }

    // ----- helpers ---------------------------------------------------------------------------

    /// Takes one assignment line out of a section, keeping a declaration that shares the line.
    fn remove_assignment(&mut self, section_key: &str, id: LineId) -> Result<()> {
        let kind = self.line(id)?.kind;
        let LineKind::Property {
            section: Some(marker),
            ..
        } = kind
        else {
            let previous = self.previous_significant(id)?;
            if let Some(entry) = self.sections.get_mut(section_key) {
                if entry.last_line == Some(id) {
                    entry.last_line = previous;
                }
            }
            return self.unlink(id);
        };

        let contents = self.contents(id)?;
        let mut kept = contents[..marker.end].to_vec();
        match trailing_comment(contents, marker.end) {
            Some(comment) => kept.extend_from_slice(&contents[comment..]),
            None => kept.extend_from_slice(line_break(contents)),
        }
        self.rewrite(id, &kept, LineKind::Section { name: marker.name })?;
        Ok(())
    }

    /// Rewrites the value of a property line, keeping everything around it.
    fn update_value(&mut self, id: LineId, value: &str) -> Result<LineId> {
        let LineKind::Property {
            section,
            name,
            value: old,
        } = self.line(id)?.kind
        else {
            return Err(Error::DetachedLine(id));
        };

        let contents = self.contents(id)?;
        let already_quoted = old.start > 0 && contents[old.start - 1] == b'"';
        let encoded = if already_quoted {
            Cow::Borrowed(value)
        } else {
            encode("value", value, true)?
        };
        let span = if already_quoted {
            Span::new(old.start, value.len())
        } else {
            inner_span(old.start, &encoded, value)
        };

        let mut updated = Vec::with_capacity(contents.len() + encoded.len());
        updated.extend_from_slice(&contents[..old.start]);
        updated.extend_from_slice(encoded.as_bytes());
        updated.extend_from_slice(&contents[old.end()..]);

        let kind = LineKind::Property {
            section,
            name,
            value: span,
        };
        self.rewrite(id, &updated, kind)
    }

    /// Adds a new property line to the end of a section.
    fn append_property(
        &mut self,
        section_key: &str,
        name_key: String,
        name: &str,
        value: &str,
    ) -> Result<LineId> {
        let (contents, kind) = self.compose_property(name, value)?;
        let last_line = self
            .sections
            .get(section_key)
            .and_then(|entry| entry.last_line);

        let id = match last_line {
            Some(anchor) => {
                let mut anchor = self.terminate(anchor)?;
                let separate = self.conventions.empty_lines_between_properties
                    && matches!(self.line(anchor)?.kind, LineKind::Property { .. });
                if separate {
                    let ending = self.conventions.line_ending();
                    anchor = self.insert_after(anchor, ending, LineKind::Plain)?;
                }
                self.insert_after(anchor, &contents, kind)?
            }
            None => self.insert_first_global(&contents, kind)?,
        };

        if let Some(entry) = self.sections.get_mut(section_key) {
            entry.properties.insert(name_key, id);
            entry.last_line = Some(id);
        }
        Ok(id)
    }

    /// Places the first property of the global section.
    ///
    /// It goes in front of the first section declaration, or at the very start of a document
    /// that holds nothing but blank lines, or else at the end.
    fn insert_first_global(&mut self, contents: &[u8], kind: LineKind) -> Result<LineId> {
        let mut first_declaration = None;
        let mut only_blank = true;
        for line in self.lines() {
            if line.section_name().is_some() {
                first_declaration = Some(line.id);
                break;
            }
            only_blank &= line.kind == LineKind::Plain
                && line.contents.iter().all(u8::is_ascii_whitespace);
        }

        match first_declaration {
            Some(declaration) if Some(declaration) == self.head => {
                self.push_front(contents, kind)
            }
            Some(declaration) => {
                let previous = self.line(declaration)?.previous;
                let previous = self.terminate(previous)?;
                self.insert_after(previous, contents, kind)
            }
            None if only_blank => self.push_front(contents, kind),
            None => {
                if let Some(tail) = self.tail() {
                    self.terminate(tail)?;
                }
                self.push_back(contents, kind)
            }
        }
    }

    /// Appends a `[name]` line at the end of the document and indexes it.
    fn declare_section(&mut self, section: &str, key: String) -> Result<LineId> {
        let encoded = encode("section name", section, false)?;
        let mut contents = Vec::with_capacity(encoded.len() + 4);
        contents.push(b'[');
        contents.extend_from_slice(encoded.as_bytes());
        contents.push(b']');
        contents.extend_from_slice(self.conventions.line_ending());
        let kind = LineKind::Section {
            name: inner_span(1, &encoded, section),
        };

        if let Some(tail) = self.tail() {
            let tail = self.terminate(tail)?;
            let blank = self
                .contents(tail)?
                .iter()
                .all(u8::is_ascii_whitespace);
            if !blank {
                let ending = self.conventions.line_ending();
                self.push_back(ending, LineKind::Plain)?;
            }
        }

        let id = self.push_back(&contents, kind)?;
        self.sections
            .insert(key, Section::declared(section.to_string(), id));
        trace!(section, line = %id, "declared section");
        Ok(id)
    }

    /// Composes `name = value` with the document's spacing and line ending.
    fn compose_property(&self, name: &str, value: &str) -> Result<(Vec<u8>, LineKind)> {
        let encoded_name = encode("property name", name, false)?;
        let encoded_value = encode("value", value, true)?;
        let assignment: &[u8] = if self.conventions.spaces_around_assignment {
            b" = "
        } else {
            b"="
        };

        let mut contents = Vec::with_capacity(encoded_name.len() + encoded_value.len() + 5);
        contents.extend_from_slice(encoded_name.as_bytes());
        contents.extend_from_slice(assignment);
        let value_start = contents.len();
        contents.extend_from_slice(encoded_value.as_bytes());
        contents.extend_from_slice(self.conventions.line_ending());

        let kind = LineKind::Property {
            section: None,
            name: inner_span(0, &encoded_name, name),
            value: inner_span(value_start, &encoded_value, value),
        };
        Ok((contents, kind))
    }

    /// Makes sure a line ends with a line break so a line can follow it.
    fn terminate(&mut self, id: LineId) -> Result<LineId> {
        let contents = self.contents(id)?;
        if contents.ends_with(b"\n") {
            return Ok(id);
        }
        let kind = self.line(id)?.kind;
        let mut terminated = contents.to_vec();
        terminated.extend_from_slice(self.conventions.line_ending());
        self.rewrite(id, &terminated, kind)
    }

    /// Nearest declaration or property line before `id`, stopping at the document start.
    fn previous_significant(&self, id: LineId) -> Result<Option<LineId>> {
        let mut cursor = id;
        loop {
            if Some(cursor) == self.head {
                return Ok(None);
            }
            cursor = self.line(cursor)?.previous;
            if matches!(
                self.line(cursor)?.kind,
                LineKind::Section { .. } | LineKind::Property { .. }
            ) {
                return Ok(Some(cursor));
            }
        }
    }
}
