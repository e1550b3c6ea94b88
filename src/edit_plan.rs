//! The edit plan batches document modifications across INI files.
//!
//! A plan is a JSON list of edits, each naming a file and one operation. Applying it loads every
//! file once, runs its operations in plan order through the [`Document`] mutation API and writes
//! the file back, so untouched lines keep their exact bytes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::config::Config;
use crate::document::Document;
use crate::error::Result;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
/// Serialisable collection of file modifications applied file by file.
pub struct EditPlan {
    /// Individual operations, applied in order within each file.
    pub edits: Vec<Edit>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
/// One operation on one file.
pub struct Edit {
    /// Target file path for this modification.
    pub file_name: String,
    /// What to change in the file.
    #[serde(flatten)]
    pub operation: Operation,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
/// A single document mutation. The empty section name is the global section.
pub enum Operation {
    /// Create or update a property.
    Set {
        /// Section holding the property.
        section: String,
        /// Property name.
        name: String,
        /// New raw value.
        value: String,
    },
    /// Remove a property if present.
    RemoveProperty {
        /// Section holding the property.
        section: String,
        /// Property name.
        name: String,
    },
    /// Remove a section's declarations and properties if present.
    RemoveSection {
        /// Section to remove.
        section: String,
    },
}

impl Operation {
    /// Applies the operation to `document`. Returns whether the document changed.
    ///
    /// # Errors
    ///
    /// Returns the error of the underlying document mutation.
    pub fn apply_to(&self, document: &mut Document) -> Result<bool> {
        match self {
            Self::Set {
                section,
                name,
                value,
            } => {
                let unchanged = document.property_str(section, name) == Some(value.as_str());
                document.set_property(section, name, value)?;
                Ok(!unchanged)
            }
            Self::RemoveProperty { section, name } => document.remove_property(section, name),
            Self::RemoveSection { section } => document.remove_section(section),
        }
    }
}

impl EditPlan {
    /// Reads a plan from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid plan.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Apply all edits in the plan.
    ///
    /// Groups edits by file, keeping the order of first appearance, and applies each file's
    /// operations in plan order. A file is only written back if an operation changed it.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read or written, or an operation is rejected.
    /// Files earlier in the plan stay written.
    pub fn apply(&self, config: &Config) -> Result<()> {
        let mut order: Vec<&str> = Vec::new();
        let mut file_groups: HashMap<&str, Vec<&Operation>> = HashMap::new();

        for edit in &self.edits {
            let file_name = edit.file_name.as_str();
            file_groups
                .entry(file_name)
                .or_insert_with(|| {
                    order.push(file_name);
                    Vec::new()
                })
                .push(&edit.operation);
        }

        for file_name in order {
            let operations = file_groups.remove(file_name).unwrap_or_default();
            let mut document =
                Document::load(file_name, config.document_options(), config.folding())?;

            let mut changed = false;
            for operation in &operations {
                changed |= operation.apply_to(&mut document)?;
            }

            debug!(
                file = file_name,
                operations = operations.len(),
                changed,
                "applied edit plan"
            );
            if changed {
                document.save(file_name)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/edit_plan.rs"]
mod tests;
