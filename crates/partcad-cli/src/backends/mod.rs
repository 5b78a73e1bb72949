//! Conversion backend registry.
//!
//! A backend declares which `source -> target` conversions it performs in one
//! domain and how it is reached. Each `(domain, source, target)` triple may
//! be claimed by one backend only, so conversion dispatch never has to choose.

mod builtin;


pub use builtin::builtin_specs;

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use partcad_core::{Domain, ErrorCode, FormatError, FormatRegistry};
use partcad_wrapper::BackendInterface;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Declaration of one backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSpec {
    /// Unique backend name.
    pub name: String,
    /// Domain whose formats the backend converts.
    pub domain: Domain,
    /// How to reach the backend.
    pub interface: BackendInterface,
    /// Source format to the target formats it can produce.
    #[serde(default)]
    pub convert: IndexMap<String, Vec<String>>,
}

impl BackendSpec {
    /// Creates a backend with no conversions.
    pub fn new(name: impl Into<String>, domain: Domain, interface: BackendInterface) -> Self {
        Self {
            name: name.into(),
            domain,
            interface,
            convert: IndexMap::new(),
        }
    }

    /// Declares `source -> targets`.
    pub fn converts(mut self, source: &str, targets: &[&str]) -> Self {
        self.convert
            .entry(source.to_string())
            .or_default()
            .extend(targets.iter().map(|t| t.to_string()));
        self
    }

    /// Iterates over every declared `(source, target)` pair.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.convert
            .iter()
            .flat_map(|(s, targets)| targets.iter().map(move |t| (s.as_str(), t.as_str())))
    }
}

/// Errors while registering backends.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    /// A backend with this name is already registered.
    #[error("backend already registered: {0}")]
    AlreadyRegistered(String),

    /// The conversion is already claimed by another backend.
    #[error("{domain} conversion {source_format} -> {target} already claimed by backend '{existing}'")]
    PairConflict {
        domain: Domain,
        source_format: String,
        target: String,
        existing: String,
    },

    /// The backend names a format the domain does not have.
    #[error("backend '{backend}': {error}")]
    UnknownFormat {
        backend: String,
        #[source]
        error: FormatError,
    },
}

impl ErrorCode for RegistryError {
    fn code(&self) -> &'static str {
        match self {
            RegistryError::AlreadyRegistered(_) => "BACKEND_001",
            RegistryError::PairConflict { .. } => "BACKEND_002",
            RegistryError::UnknownFormat { .. } => "BACKEND_003",
        }
    }

    fn category(&self) -> &'static str {
        "backend"
    }
}

type PairKey = (Domain, String, String);

/// All known backends.
#[derive(Debug, Clone)]
pub struct BackendRegistry {
    formats: Arc<FormatRegistry>,
    backends: IndexMap<String, BackendSpec>,
    claims: HashMap<PairKey, String>,
}

impl BackendRegistry {
    /// Creates an empty registry validating against `formats`.
    pub fn new(formats: Arc<FormatRegistry>) -> Self {
        Self {
            formats,
            backends: IndexMap::new(),
            claims: HashMap::new(),
        }
    }

    /// Creates a registry holding the builtin backends.
    pub fn builtin(formats: Arc<FormatRegistry>) -> Result<Self, RegistryError> {
        let mut registry = Self::new(formats);
        for spec in builtin_specs() {
            registry.register(spec)?;
        }
        Ok(registry)
    }

    /// Registers a backend.
    ///
    /// Fails without changing the registry if the name is taken, a format is
    /// unknown in the backend's domain, or a pair is already claimed.
    pub fn register(&mut self, spec: BackendSpec) -> Result<(), RegistryError> {
        if self.backends.contains_key(&spec.name) {
            return Err(RegistryError::AlreadyRegistered(spec.name.clone()));
        }

        for (source, target) in spec.pairs() {
            for name in [source, target] {
                self.formats
                    .resolve(spec.domain, name)
                    .map_err(|e| RegistryError::UnknownFormat {
                        backend: spec.name.clone(),
                        error: e,
                    })?;
            }
            let key = (spec.domain, source.to_string(), target.to_string());
            if let Some(existing) = self.claims.get(&key) {
                return Err(RegistryError::PairConflict {
                    domain: spec.domain,
                    source_format: source.to_string(),
                    target: target.to_string(),
                    existing: existing.clone(),
                });
            }
        }

        // A backend repeating its own pair is harmless; the first claim holds.
        for (source, target) in spec.pairs() {
            self.claims
                .entry((spec.domain, source.to_string(), target.to_string()))
                .or_insert_with(|| spec.name.clone());
        }
        tracing::debug!("registered backend '{}'", spec.name);
        self.backends.insert(spec.name.clone(), spec);
        Ok(())
    }

    /// Registers several backends, stopping at the first error.
    pub fn register_all(
        &mut self,
        specs: impl IntoIterator<Item = BackendSpec>,
    ) -> Result<(), RegistryError> {
        for spec in specs {
            self.register(spec)?;
        }
        Ok(())
    }

    /// Returns the backend converting `source -> target` in `domain`.
    pub fn find(&self, domain: Domain, source: &str, target: &str) -> Option<&BackendSpec> {
        let key = (domain, source.to_string(), target.to_string());
        self.claims.get(&key).and_then(|name| self.backends.get(name))
    }

    /// Returns every target reachable from `source` in one step.
    pub fn targets_from(&self, domain: Domain, source: &str) -> Vec<&str> {
        let mut targets: Vec<&str> = self
            .backends
            .values()
            .filter(|b| b.domain == domain)
            .flat_map(|b| b.pairs())
            .filter(|(s, _)| *s == source)
            .map(|(_, t)| t)
            .collect();
        targets.sort();
        targets.dedup();
        targets
    }

    /// Looks up a backend by name.
    pub fn get(&self, name: &str) -> Option<&BackendSpec> {
        self.backends.get(name)
    }

    /// Iterates over backends in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &BackendSpec> {
        self.backends.values()
    }

    /// Number of registered backends.
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Returns true if no backend is registered.
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Returns the format registry backends are checked against.
    pub fn formats(&self) -> &Arc<FormatRegistry> {
        &self.formats
    }
}
