//! CLI command implementations
//!
//! The builtin tree is a static table: every name maps to a constructor and
//! nothing is built until a command line selects it.

pub mod add;
pub mod config;
pub mod convert;
pub mod healthcheck;
pub mod import;
pub mod init;
pub mod install;
pub mod list;
pub mod reset;
pub mod status;
pub mod update;
pub mod version;

use std::path::Path;

use anyhow::{Context, Result};
use partcad_core::{Domain, FormatRegistry, Package};

use crate::config::UserConfig;
use crate::loader::{
    CliCommand, CommandLoader, CompositeLoader, DirectoryConfig, DirectoryLoader, StaticEntry,
    StaticLoader,
};

/// Help text of the root command.
pub const ABOUT: &str = "PartCAD - package manager for CAD models";

fn leaf<T: CliCommand + Default + 'static>() -> Box<dyn CliCommand> {
    Box::new(T::default())
}

static ROOT: &[StaticEntry] = &[
    StaticEntry::group(
        "add",
        "Add a file or a dependency to the package",
        add::loader,
    ),
    StaticEntry::leaf(
        "config",
        "Show the effective user configuration",
        leaf::<config::Config>,
    ),
    StaticEntry::leaf(
        "convert",
        "Convert an object to another format",
        leaf::<convert::Convert>,
    ),
    StaticEntry::leaf(
        "healthcheck",
        "Check the host for PartCAD requirements",
        leaf::<healthcheck::Healthcheck>,
    ),
    StaticEntry::group(
        "import",
        "Import an external file into the package",
        import::loader,
    ),
    StaticEntry::leaf("init", "Create a new package", leaf::<init::Init>),
    StaticEntry::leaf(
        "install",
        "Fetch the packages this package imports",
        leaf::<install::Install>,
    ),
    StaticEntry::group("list", "List package contents", list::loader),
    StaticEntry::leaf(
        "reset",
        "Remove cached packages and runtime state",
        leaf::<reset::Reset>,
    ),
    StaticEntry::leaf(
        "status",
        "Show the internal data used by PartCAD",
        leaf::<status::Status>,
    ),
    StaticEntry::leaf(
        "update",
        "Fetch the latest revision of every imported package",
        leaf::<update::Update>,
    ),
    StaticEntry::leaf("version", "Print version information", leaf::<version::Version>),
];

/// Returns the builtin command tree.
pub fn builtin_tree() -> Box<dyn CommandLoader> {
    Box::new(StaticLoader::new(ABOUT, ROOT))
}

/// Returns the tree served by the `partcad` binary: the builtin commands,
/// then the user's commands directory if one is configured. Builtin names
/// shadow user commands.
pub fn root_loader(config: &UserConfig) -> Box<dyn CommandLoader> {
    match config.commands_dir {
        Some(ref dir) if dir.is_dir() => {
            tracing::debug!("user commands from {}", dir.display());
            let user = DirectoryLoader::new(DirectoryConfig::new(dir, builtin_tree));
            Box::new(
                CompositeLoader::new()
                    .with_about(ABOUT)
                    .layer(builtin_tree())
                    .layer(Box::new(user)),
            )
        }
        Some(ref dir) => {
            tracing::warn!("commands directory {} does not exist", dir.display());
            builtin_tree()
        }
        None => builtin_tree(),
    }
}

/// Returns the names of the formats `domain` accepts through the given
/// capabilities, in table order.
pub(crate) fn capability_names(
    registry: &FormatRegistry,
    domain: Domain,
    capabilities: &[&str],
) -> Result<Vec<&'static str>> {
    let mut names = Vec::new();
    for capability in capabilities {
        let view = registry
            .capability(domain, capability)
            .with_context(|| format!("missing {} capability '{}'", domain, capability))?;
        for name in view.names() {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    Ok(names)
}

/// Expresses `path` relative to the package directory, or absolute when it
/// lies outside the package.
pub(crate) fn package_relative(package: &Package, path: &Path) -> Result<String> {
    let file = path
        .canonicalize()
        .with_context(|| format!("cannot resolve {}", path.display()))?;
    let dir = if package.dir().as_os_str().is_empty() {
        Path::new(".")
    } else {
        package.dir()
    };
    let dir = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
    let relative = file.strip_prefix(&dir).unwrap_or(&file);
    Ok(relative.to_string_lossy().replace('\\', "/"))
}

/// Lower-cased file extension, with `.stp` folded into `.step`.
pub(crate) fn normalized_ext(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    Some(match ext.as_str() {
        "stp" => "step".to_string(),
        _ => ext,
    })
}

/// Returns the object name implied by a file name.
pub(crate) fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .with_context(|| format!("cannot derive a name from {}", path.display()))
}
