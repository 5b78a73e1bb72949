//! `partcad.yaml` package manifests.
//!
//! A package is a directory holding a `partcad.yaml` file that declares
//! sketches, parts and assemblies plus the packages it imports. Keys this
//! crate does not model are kept verbatim so that rewriting a manifest never
//! drops user data.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::ManifestError;
use crate::registry::{Domain, FormatRegistry};

/// Name of the manifest file inside a package directory.
pub const MANIFEST_FILE: &str = "partcad.yaml";

/// Default version requirement written by `init`.
pub const DEFAULT_VERSION_REQ: &str = ">=0.7.0";

/// How an imported package is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    Local,
    Git,
}

/// One entry of the `import` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportDecl {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ImportKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl ImportDecl {
    /// Declares a local package.
    pub fn local(path: impl Into<String>) -> Self {
        Self {
            kind: Some(ImportKind::Local),
            path: Some(path.into()),
            url: None,
            revision: None,
            desc: None,
            extra: IndexMap::new(),
        }
    }

    /// Declares a git package.
    pub fn git(url: impl Into<String>) -> Self {
        Self {
            kind: Some(ImportKind::Git),
            path: None,
            url: Some(url.into()),
            revision: None,
            desc: None,
            extra: IndexMap::new(),
        }
    }

    /// Returns the effective kind. Untyped entries with a `url` are git
    /// imports, everything else is local.
    pub fn effective_kind(&self) -> ImportKind {
        match self.kind {
            Some(kind) => kind,
            None if self.url.is_some() => ImportKind::Git,
            None => ImportKind::Local,
        }
    }
}

/// Declaration of one sketch, part or assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectConfig {
    /// Symbolic format name.
    #[serde(rename = "type")]
    pub kind: String,
    /// File path relative to the package directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    /// Type-specific settings (e.g. `sketch` and `depth` for extrusions).
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl ObjectConfig {
    /// Creates a declaration of the given type.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            path: None,
            desc: None,
            extra: IndexMap::new(),
        }
    }

    /// Sets the path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the description.
    pub fn with_desc(mut self, desc: Option<String>) -> Self {
        self.desc = desc;
        self
    }
}

/// The parsed contents of `partcad.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    /// Required PartCAD version.
    #[serde(rename = "partcad", default, skip_serializing_if = "Option::is_none")]
    pub version_req: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub private: bool,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub import: IndexMap<String, ImportDecl>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub sketches: IndexMap<String, ObjectConfig>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parts: IndexMap<String, ObjectConfig>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub assemblies: IndexMap<String, ObjectConfig>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl PackageManifest {
    /// Returns the objects of one domain.
    pub fn objects(&self, domain: Domain) -> &IndexMap<String, ObjectConfig> {
        match domain {
            Domain::Sketch => &self.sketches,
            Domain::Part => &self.parts,
            Domain::Assembly => &self.assemblies,
        }
    }

    /// Returns the objects of one domain for editing.
    pub fn objects_mut(&mut self, domain: Domain) -> &mut IndexMap<String, ObjectConfig> {
        match domain {
            Domain::Sketch => &mut self.sketches,
            Domain::Part => &mut self.parts,
            Domain::Assembly => &mut self.assemblies,
        }
    }
}

/// A loaded package: manifest plus its location on disk.
#[derive(Debug, Clone)]
pub struct Package {
    dir: PathBuf,
    manifest_path: PathBuf,
    manifest: PackageManifest,
}

impl Package {
    /// Maps a user supplied package path to the manifest file.
    ///
    /// Directories resolve to `<dir>/partcad.yaml`; anything else is taken
    /// as the manifest itself.
    pub fn manifest_path_for(path: &Path) -> PathBuf {
        if path.is_dir() {
            path.join(MANIFEST_FILE)
        } else {
            path.to_path_buf()
        }
    }

    /// Loads a package from a directory or a manifest file.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let manifest_path = Self::manifest_path_for(path);
        if !manifest_path.is_file() {
            return Err(ManifestError::NotFound(manifest_path));
        }

        let content = fs::read_to_string(&manifest_path).map_err(|e| ManifestError::Read {
            path: manifest_path.clone(),
            source: e,
        })?;

        // An empty file is a valid, empty package.
        let manifest: PackageManifest = if content.trim().is_empty() {
            PackageManifest::default()
        } else {
            serde_yaml::from_str(&content).map_err(|e| ManifestError::Parse {
                path: manifest_path.clone(),
                source: e,
            })?
        };

        tracing::debug!("loaded package manifest {}", manifest_path.display());
        Ok(Self::from_manifest(manifest_path, manifest))
    }

    /// Creates a new package manifest. Refuses to overwrite.
    pub fn create(path: &Path, private: bool) -> Result<Self, ManifestError> {
        let manifest_path = Self::manifest_path_for(path);
        if manifest_path.exists() {
            return Err(ManifestError::AlreadyExists(manifest_path));
        }

        let manifest = PackageManifest {
            version_req: Some(DEFAULT_VERSION_REQ.to_string()),
            private,
            ..Default::default()
        };
        let package = Self::from_manifest(manifest_path, manifest);
        package.save()?;
        Ok(package)
    }

    /// Wraps an in-memory manifest.
    pub fn from_manifest(manifest_path: PathBuf, manifest: PackageManifest) -> Self {
        let dir = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            dir,
            manifest_path,
            manifest,
        }
    }

    /// Writes the manifest back to disk.
    pub fn save(&self) -> Result<(), ManifestError> {
        let yaml = serde_yaml::to_string(&self.manifest).map_err(ManifestError::Serialize)?;
        if let Some(parent) = self.manifest_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| ManifestError::Write {
                    path: self.manifest_path.clone(),
                    source: e,
                })?;
            }
        }
        fs::write(&self.manifest_path, yaml).map_err(|e| ManifestError::Write {
            path: self.manifest_path.clone(),
            source: e,
        })
    }

    /// Returns the package directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the manifest file path.
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Returns the manifest.
    pub fn manifest(&self) -> &PackageManifest {
        &self.manifest
    }

    /// Returns the manifest for editing. Call [`Package::save`] afterwards.
    pub fn manifest_mut(&mut self) -> &mut PackageManifest {
        &mut self.manifest
    }

    /// Returns the package name; unnamed packages are the root package `//`.
    pub fn name(&self) -> &str {
        self.manifest.name.as_deref().unwrap_or("//")
    }

    /// Looks up an object of one domain.
    pub fn get(&self, domain: Domain, name: &str) -> Option<&ObjectConfig> {
        self.manifest.objects(domain).get(name)
    }

    /// Finds an object by name, searching parts, then sketches, then
    /// assemblies.
    pub fn find(&self, name: &str) -> Option<(Domain, &ObjectConfig)> {
        [Domain::Part, Domain::Sketch, Domain::Assembly]
            .into_iter()
            .find_map(|domain| self.get(domain, name).map(|config| (domain, config)))
    }

    /// Adds or replaces an object declaration.
    pub fn set_object(&mut self, domain: Domain, name: impl Into<String>, config: ObjectConfig) {
        self.manifest.objects_mut(domain).insert(name.into(), config);
    }

    /// Resolves the file backing an object.
    ///
    /// Objects with an explicit `path` use it (relative to the package
    /// directory); others default to `<name>.<ext>` next to the manifest.
    pub fn object_path(
        &self,
        registry: &FormatRegistry,
        domain: Domain,
        name: &str,
    ) -> Result<PathBuf, ManifestError> {
        let config = self
            .get(domain, name)
            .ok_or_else(|| ManifestError::UnknownObject {
                domain,
                name: name.to_string(),
            })?;

        if let Some(ref path) = config.path {
            return Ok(self.dir.join(path));
        }

        let format = registry
            .resolve(domain, &config.kind)
            .map_err(|e| ManifestError::InvalidType {
                domain,
                name: name.to_string(),
                source: e,
            })?;
        Ok(self.dir.join(format.file_name(name)))
    }

    /// Expresses `path` relative to the package directory when it lies
    /// inside it.
    pub fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    /// Checks that every declared object type is known to the registry.
    pub fn validate(&self, registry: &FormatRegistry) -> Vec<ManifestError> {
        let mut errors = Vec::new();
        for domain in Domain::ALL {
            for (name, config) in self.manifest.objects(domain) {
                if let Err(e) = registry.resolve(domain, &config.kind) {
                    errors.push(ManifestError::InvalidType {
                        domain,
                        name: name.clone(),
                        source: e,
                    });
                }
            }
        }
        errors
    }
}
