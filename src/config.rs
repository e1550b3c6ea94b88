//! Configuration to acknowledge developer preferences as well as set defaults.
//!
//! Specifically, we try to find an inidoc.toml, and if present we load settings from there.
//! This provides the formatting of lines written by edits and the name matching rules.

use facet::Facet;
use std::fs;

use crate::arena::DEFAULT_CHUNK_SIZE;
use crate::document::DocumentOptions;
use crate::names::{AsciiCaseInsensitive, ExactNames, NameFolding};

/// File looked up in the working directory.
pub const CONFIG_FILE: &str = "inidoc.toml";

#[derive(Facet, Clone, Debug, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
/// User preferences loaded from inidoc.toml or falling back to defaults.
pub struct Config {
    #[facet(default = true)]
    /// Write `name = value` rather than `name=value` in new lines.
    pub spaces_around_assignment: bool,
    #[facet(default = false)]
    /// Separate new properties from the previous one with a blank line.
    pub empty_lines_between_properties: bool,
    #[facet(default = true)]
    /// Let the style found in an edited file override the two settings above.
    pub detect_conventions: bool,
    #[facet(default = false)]
    /// Match section and property names regardless of ASCII case.
    pub case_insensitive: bool,
    #[facet(default = 4096)]
    /// Bytes per arena chunk for lines created by edits.
    pub chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spaces_around_assignment: true,
            empty_lines_between_properties: false,
            detect_conventions: true,
            case_insensitive: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Config {
    #[must_use]
    /// Load configuration from inidoc.toml if present.
    ///
    /// A missing or unreadable file yields the defaults.
    pub fn load() -> Self {
        fs::read_to_string(CONFIG_FILE)
            .ok()
            .and_then(|contents| Self::from_toml(&contents))
            .unwrap_or_default()
    }

    #[must_use]
    /// Parse configuration from TOML text, or `None` if it does not describe a config.
    pub fn from_toml(contents: &str) -> Option<Self> {
        facet_toml::from_str::<Self>(contents).ok()
    }

    #[must_use]
    /// Options for documents opened under this configuration.
    pub fn document_options(&self) -> DocumentOptions {
        DocumentOptions {
            spaces_around_assignment: self.spaces_around_assignment,
            empty_lines_between_properties: self.empty_lines_between_properties,
            detect_conventions: self.detect_conventions,
            chunk_size: self.chunk_size,
        }
    }

    #[must_use]
    /// Name matching rules for documents opened under this configuration.
    pub fn folding(&self) -> Box<dyn NameFolding + Send + Sync> {
        if self.case_insensitive {
            Box::new(AsciiCaseInsensitive)
        } else {
            Box::new(ExactNames)
        }
    }
}

#[cfg(test)]
#[path = "tests/config.rs"]
mod tests;
