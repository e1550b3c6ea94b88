//! Section index entries of a document model.
//!
//! A section gathers the properties declared under one name. Declarations of the same name in
//! several places of a file collapse into one entry: the first declaration line is canonical,
//! later ones stay in the file and keep routing their properties here. The unnamed global
//! section holds everything above the first declaration and has no declaration line.

use std::collections::HashMap;

use crate::document::LineId;

#[derive(Clone, Debug)]
/// Index entry tying a section name to the lines that belong to it.
pub struct Section {
    /// Section name as first declared, without brackets or quotes.
    pub name: String,
    /// Line holding the canonical `[name]` marker; `None` for the global section.
    pub declaration: Option<LineId>,
    /// Last declaration or property line of this section, where new properties go.
    pub last_line: Option<LineId>,
    /// Property lines keyed by folded property name.
    pub properties: HashMap<String, LineId>,
}

impl Section {
    #[must_use]
    /// Creates the implicit, unnamed section at the top of every document.
    pub fn global() -> Self {
        Self {
            name: String::new(),
            declaration: None,
            last_line: None,
            properties: HashMap::new(),
        }
    }

    #[must_use]
    /// Creates a section declared by `line`.
    pub fn declared(name: String, line: LineId) -> Self {
        Self {
            name,
            declaration: Some(line),
            last_line: Some(line),
            properties: HashMap::new(),
        }
    }

    #[must_use]
    /// Whether this is the unnamed global section.
    pub fn is_global(&self) -> bool {
        self.declaration.is_none()
    }

    /// Points every reference to line `from` at line `to`.
    pub(crate) fn retarget(&mut self, from: LineId, to: LineId) {
        if self.declaration == Some(from) {
            self.declaration = Some(to);
        }
        if self.last_line == Some(from) {
            self.last_line = Some(to);
        }
        for line in self.properties.values_mut() {
            if *line == from {
                *line = to;
            }
        }
    }
}
