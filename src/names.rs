//! Name comparison for section and property lookups.
//!
//! The document index is keyed by folded names. Folding is an injected capability so callers
//! can bring their own comparison rules; two simple ones ship with the crate.

use std::borrow::Cow;

/// Maps a name to the key it is indexed under. Names with equal keys are the same name.
pub trait NameFolding {
    /// Returns the lookup key for `name`.
    fn fold<'a>(&self, name: &'a str) -> Cow<'a, str>;
}

/// Names match only when byte-identical.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExactNames;

impl NameFolding for ExactNames {
    fn fold<'a>(&self, name: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(name)
    }
}

/// Names match regardless of ASCII letter case.
#[derive(Clone, Copy, Debug, Default)]
pub struct AsciiCaseInsensitive;

impl NameFolding for AsciiCaseInsensitive {
    fn fold<'a>(&self, name: &'a str) -> Cow<'a, str> {
        if name.bytes().any(|byte| byte.is_ascii_uppercase()) {
            Cow::Owned(name.to_ascii_lowercase())
        } else {
            Cow::Borrowed(name)
        }
    }
}
