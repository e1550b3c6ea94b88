//! Error types shared by the document model, the edit plan and the command line front end.
//!
//! Malformed INI text is never an error: it is recorded as a line classification. What remains
//! are caller mistakes (stale line handles, names that cannot be written as a single line),
//! allocation failure and the I/O around loading and saving files.

use std::collections::TryReserveError;
use thiserror::Error;

use crate::document::LineId;

/// The primary error type for all operations in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A line handle was used after its line was removed or relocated.
    #[error("line {0} is no longer part of the document")]
    DetachedLine(LineId),

    /// The arena could not reserve memory for a chunk or a dedicated block.
    #[error("failed to reserve {requested} bytes for line storage")]
    OutOfMemory {
        /// Number of bytes the arena tried to reserve.
        requested: usize,
        /// Allocator error reported by the standard library.
        #[source]
        source: TryReserveError,
    },

    /// A name or value cannot be written as a single INI line.
    #[error("cannot write {what} {text:?}: {reason}")]
    Unrepresentable {
        /// Which kind of token was rejected ("section name", "property name" or "value").
        what: &'static str,
        /// The rejected text.
        text: String,
        /// Why the text cannot be represented.
        reason: &'static str,
    },

    /// An error originating from file I/O.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An edit plan could not be read or written as JSON.
    #[error("invalid edit plan: {0}")]
    Plan(#[from] serde_json::Error),
}

/// A convenience `Result` type alias using the crate's `Error` type.
pub type Result<T> = std::result::Result<T, Error>;
