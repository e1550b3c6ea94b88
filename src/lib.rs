//! inidoc: format-preserving INI documents.
//!
//! A [`Document`] parses INI text into classified lines plus a section and property index, lets
//! callers set and remove properties and sections, and writes the result back with every
//! untouched byte exactly where it was.
//!
//! ```
//! use inidoc::Document;
//!
//! let mut document = Document::parse(b"; server settings\n[Server]\nport = 80\n")?;
//! document.set_property("Server", "port", "8080")?;
//! assert_eq!(document.to_bytes(), b"; server settings\n[Server]\nport = 8080\n");
//! # Ok::<(), inidoc::Error>(())
//! ```
#![allow(clippy::multiple_crate_versions)]

pub mod arena;
pub mod config;
pub mod document;
pub mod edit_plan;
pub mod error;
pub mod estimator;
pub mod names;
pub mod scanner;
pub mod section;

pub use document::{Conventions, Document, DocumentOptions, LineId, LineRef, PropertyRef};
pub use error::{Error, Result};
pub use names::{AsciiCaseInsensitive, ExactNames, NameFolding};
pub use scanner::LineKind;
