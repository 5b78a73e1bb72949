//! Format values and format groups.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

/// One on-disk artifact representation: a symbolic name plus a file extension.
///
/// Formats are plain constants (see [`crate::tables`]). Two formats are equal
/// only when both the name and the extension match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Format {
    name: &'static str,
    ext: &'static str,
}

impl Format {
    /// Creates a format. `ext` is empty for formats that are not stored in a
    /// file of their own (aliases, operations).
    pub const fn new(name: &'static str, ext: &'static str) -> Self {
        Self { name, ext }
    }

    /// Returns the symbolic name, e.g. `"cadquery"`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the file extension without the dot, e.g. `"py"`.
    pub fn ext(&self) -> &'static str {
        self.ext
    }

    /// Returns true if artifacts of this format live in their own file.
    pub fn is_file_based(&self) -> bool {
        !self.ext.is_empty()
    }

    /// Returns the conventional file name for an object called `stem`.
    pub fn file_name(&self, stem: &str) -> String {
        if self.ext.is_empty() {
            stem.to_string()
        } else {
            format!("{}.{}", stem, self.ext)
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// An ordered, named collection of formats sharing one trait.
///
/// Groups are built once and never change. Lookups by symbolic name go
/// through a hash index.
#[derive(Debug, Clone)]
pub struct FormatGroup {
    name: String,
    formats: Vec<Format>,
    index: HashMap<&'static str, usize>,
}

impl FormatGroup {
    /// Builds a group from one or more declaring tables, in order.
    ///
    /// Returns the offending name if two entries share a symbolic name.
    pub fn new(name: impl Into<String>, sources: &[&[Format]]) -> Result<Self, &'static str> {
        Self::from_formats(name, sources.iter().flat_map(|s| s.iter().copied()))
    }

    /// Builds a group from an iterator of formats.
    pub fn from_formats(
        name: impl Into<String>,
        formats: impl IntoIterator<Item = Format>,
    ) -> Result<Self, &'static str> {
        let mut group = Self {
            name: name.into(),
            formats: Vec::new(),
            index: HashMap::new(),
        };
        for format in formats {
            if group.index.contains_key(format.name()) {
                return Err(format.name());
            }
            group.index.insert(format.name(), group.formats.len());
            group.formats.push(format);
        }
        Ok(group)
    }

    /// Returns the group name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the formats in declaration order.
    pub fn formats(&self) -> &[Format] {
        &self.formats
    }

    /// Returns the symbolic names in declaration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.formats.iter().map(|f| f.name()).collect()
    }

    /// Looks up a format by symbolic name.
    pub fn get(&self, name: &str) -> Option<Format> {
        self.index.get(name).map(|&i| self.formats[i])
    }

    /// Returns true if the group holds a format with this name.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Returns every format stored with the given extension.
    ///
    /// Several formats may share one: `by_ext("py")` yields both cadquery and
    /// build123d in script groups.
    pub fn by_ext(&self, ext: &str) -> Vec<Format> {
        self.formats.iter().filter(|f| f.ext() == ext).copied().collect()
    }

    /// Number of formats in the group.
    pub fn len(&self) -> usize {
        self.formats.len()
    }

    /// Returns true if the group is empty.
    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}
