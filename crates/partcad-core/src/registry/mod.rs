//! Per-domain format registry.
//!
//! Every artifact domain (sketch, part, assembly) owns a list of disjoint
//! [`FormatGroup`]s. On top of the groups a domain declares *capabilities*:
//! named views such as "importable" or "convert_output" that select one or
//! more groups. Groups never share a symbolic name within a domain, so a name
//! always dispatches to exactly one format; capabilities may overlap freely.
//!
//! The registry is built once at start-up and then only read, so a shared
//! reference can be handed to any number of threads.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::FormatError;
use crate::format::{Format, FormatGroup};

/// Artifact kind that owns a set of format groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Sketch,
    Part,
    Assembly,
}

impl Domain {
    /// All domains in manifest order.
    pub const ALL: [Domain; 3] = [Domain::Sketch, Domain::Part, Domain::Assembly];

    /// Returns the identifier used on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Sketch => "sketch",
            Domain::Part => "part",
            Domain::Assembly => "assembly",
        }
    }

    /// Returns the `partcad.yaml` section holding objects of this domain.
    pub fn manifest_key(&self) -> &'static str {
        match self {
            Domain::Sketch => "sketches",
            Domain::Part => "parts",
            Domain::Assembly => "assemblies",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sketch" | "sketches" => Ok(Domain::Sketch),
            "part" | "parts" => Ok(Domain::Part),
            "assembly" | "assemblies" => Ok(Domain::Assembly),
            other => Err(format!("unknown domain '{}'", other)),
        }
    }
}

/// All format groups of one domain plus its capability views.
#[derive(Debug, Clone)]
pub struct DomainFormats {
    domain: Domain,
    groups: Vec<FormatGroup>,
    /// Symbolic name to index of the owning group.
    owners: HashMap<&'static str, usize>,
    /// Capability name to indices of the selected groups.
    capabilities: IndexMap<String, Vec<usize>>,
}

impl DomainFormats {
    fn new(domain: Domain) -> Self {
        Self {
            domain,
            groups: Vec::new(),
            owners: HashMap::new(),
            capabilities: IndexMap::new(),
        }
    }

    /// Returns the domain these formats belong to.
    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Returns the groups in registration order.
    pub fn groups(&self) -> &[FormatGroup] {
        &self.groups
    }

    /// Returns the group that owns `name`, if any.
    pub fn group_of(&self, name: &str) -> Option<&FormatGroup> {
        self.owners.get(name).map(|&i| &self.groups[i])
    }

    /// Returns every format of the domain in group order.
    pub fn formats(&self) -> impl Iterator<Item = Format> + '_ {
        self.groups.iter().flat_map(|g| g.formats().iter().copied())
    }

    /// Returns the declared capability names in declaration order.
    pub fn capability_names(&self) -> impl Iterator<Item = &str> {
        self.capabilities.keys().map(|k| k.as_str())
    }

    fn add_group(&mut self, group: FormatGroup) -> Result<(), FormatError> {
        // Check every name before touching the index so a failed
        // registration leaves the domain unchanged. A name clash is reported
        // as such even when the group name clashes too.
        for format in group.formats() {
            if let Some(&owner) = self.owners.get(format.name()) {
                return Err(FormatError::DuplicateFormat {
                    domain: self.domain,
                    name: format.name().to_string(),
                    group: group.name().to_string(),
                    existing: self.groups[owner].name().to_string(),
                });
            }
        }

        if self.groups.iter().any(|g| g.name() == group.name()) {
            return Err(FormatError::DuplicateGroup {
                domain: self.domain,
                group: group.name().to_string(),
            });
        }

        let index = self.groups.len();
        for format in group.formats() {
            self.owners.insert(format.name(), index);
        }
        self.groups.push(group);
        Ok(())
    }
}

/// Registry of every format group, keyed by domain.
#[derive(Debug, Clone)]
pub struct FormatRegistry {
    sketch: DomainFormats,
    part: DomainFormats,
    assembly: DomainFormats,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            sketch: DomainFormats::new(Domain::Sketch),
            part: DomainFormats::new(Domain::Part),
            assembly: DomainFormats::new(Domain::Assembly),
        }
    }

    /// Returns the formats of one domain.
    pub fn domain(&self, domain: Domain) -> &DomainFormats {
        match domain {
            Domain::Sketch => &self.sketch,
            Domain::Part => &self.part,
            Domain::Assembly => &self.assembly,
        }
    }

    fn domain_mut(&mut self, domain: Domain) -> &mut DomainFormats {
        match domain {
            Domain::Sketch => &mut self.sketch,
            Domain::Part => &mut self.part,
            Domain::Assembly => &mut self.assembly,
        }
    }

    /// Registers a group of formats under `domain`.
    ///
    /// Fails with [`FormatError::DuplicateFormat`] if any name is already
    /// owned by another group of the same domain (or repeats within
    /// `formats`). The registry is unchanged on failure.
    pub fn register_group(
        &mut self,
        domain: Domain,
        group_name: &str,
        formats: &[Format],
    ) -> Result<(), FormatError> {
        let group = FormatGroup::from_formats(group_name, formats.iter().copied()).map_err(
            |name| FormatError::DuplicateFormat {
                domain,
                name: name.to_string(),
                group: group_name.to_string(),
                existing: group_name.to_string(),
            },
        )?;
        self.domain_mut(domain).add_group(group)
    }

    /// Declares a capability view over already registered groups.
    pub fn register_capability(
        &mut self,
        domain: Domain,
        name: &str,
        groups: &[&str],
    ) -> Result<(), FormatError> {
        let formats = self.domain_mut(domain);
        let mut indices = Vec::with_capacity(groups.len());
        for group in groups {
            let index = formats
                .groups
                .iter()
                .position(|g| g.name() == *group)
                .ok_or_else(|| FormatError::UnknownGroup {
                    domain,
                    group: group.to_string(),
                })?;
            indices.push(index);
        }
        formats.capabilities.insert(name.to_string(), indices);
        Ok(())
    }

    /// Resolves a symbolic name to its format.
    pub fn resolve(&self, domain: Domain, name: &str) -> Result<Format, FormatError> {
        self.domain(domain)
            .group_of(name)
            .and_then(|g| g.get(name))
            .ok_or_else(|| FormatError::UnknownFormat {
                domain,
                name: name.to_string(),
            })
    }

    /// Returns true if `format` is registered under `domain` with the same
    /// extension.
    pub fn is_registered(&self, domain: Domain, format: &Format) -> bool {
        self.resolve(domain, format.name())
            .map(|f| f == *format)
            .unwrap_or(false)
    }

    /// Returns the groups of a domain in insertion order.
    pub fn groups_of(&self, domain: Domain) -> &[FormatGroup] {
        self.domain(domain).groups()
    }

    /// Returns a capability view.
    pub fn capability(&self, domain: Domain, name: &str) -> Result<FormatView<'_>, FormatError> {
        let formats = self.domain(domain);
        let (key, indices) = formats.capabilities.get_key_value(name).ok_or_else(|| {
            FormatError::UnknownCapability {
                domain,
                name: name.to_string(),
            }
        })?;
        Ok(FormatView {
            name: key.as_str(),
            groups: indices.iter().map(|&i| &formats.groups[i]).collect(),
        })
    }

    /// Returns every format of the domain stored with the given extension.
    pub fn formats_by_ext(&self, domain: Domain, ext: &str) -> Vec<Format> {
        self.domain(domain).formats().filter(|f| f.ext() == ext).collect()
    }
}

/// A named selection of format groups.
#[derive(Debug, Clone)]
pub struct FormatView<'a> {
    name: &'a str,
    groups: Vec<&'a FormatGroup>,
}

impl<'a> FormatView<'a> {
    /// Returns the capability name.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Returns true if any selected group holds `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.groups.iter().any(|g| g.contains(name))
    }

    /// Looks up a format by symbolic name.
    pub fn get(&self, name: &str) -> Option<Format> {
        self.groups.iter().find_map(|g| g.get(name))
    }

    /// Returns the formats of every selected group, in order.
    pub fn formats(&self) -> Vec<Format> {
        self.groups
            .iter()
            .flat_map(|g| g.formats().iter().copied())
            .collect()
    }

    /// Returns the symbolic names, in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.formats().iter().map(|f| f.name()).collect()
    }

    /// Returns the formats stored with the given extension.
    pub fn by_ext(&self, ext: &str) -> Vec<Format> {
        self.groups.iter().flat_map(|g| g.by_ext(ext)).collect()
    }
}

#[cfg(test)]
mod tests;
