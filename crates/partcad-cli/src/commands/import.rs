//! Import command implementation
//!
//! Copies an external file into the package, detecting its type from the
//! extension, and optionally converts it on the way in.

use anyhow::{bail, Context, Result};
use clap::{Arg, ArgMatches};
use colored::Colorize;
use partcad_core::{Domain, Format, FormatRegistry, ObjectConfig};
use regex::Regex;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use super::{capability_names, file_stem, normalized_ext};
use crate::context::CliContext;
use crate::dispatch::ConversionRequest;
use crate::loader::{CliCommand, CommandLoader, StaticEntry, StaticLoader};

/// Lines of a python file searched for a CAD library import.
const SCRIPT_SCAN_LINES: usize = 50;

static ENTRIES: &[StaticEntry] = &[
    StaticEntry::leaf("assembly", "Import an assembly file", assembly),
    StaticEntry::leaf("part", "Import a part file, optionally converting it", part),
];

/// Returns the `import` group.
pub fn loader() -> Box<dyn CommandLoader> {
    Box::new(StaticLoader::new(
        "Import an external file into the package",
        ENTRIES,
    ))
}

fn part() -> Box<dyn CliCommand> {
    Box::new(Import {
        domain: Domain::Part,
    })
}

fn assembly() -> Box<dyn CliCommand> {
    Box::new(Import {
        domain: Domain::Assembly,
    })
}

/// Detects whether a python script is a CadQuery or build123d model.
pub fn detect_script_kind(path: &Path) -> Result<Option<&'static str>> {
    let pattern = Regex::new(r"^\s*(?:import|from)\s+(cadquery|build123d)\b")?;
    let file = fs::File::open(path).with_context(|| format!("failed to read {}", path.display()))?;

    for line in BufReader::new(file).lines().take(SCRIPT_SCAN_LINES) {
        let line = line.with_context(|| format!("failed to read {}", path.display()))?;
        if let Some(caps) = pattern.captures(&line) {
            return Ok(match &caps[1] {
                "cadquery" => Some("cadquery"),
                _ => Some("build123d"),
            });
        }
    }
    Ok(None)
}

/// Picks the format of `path` among the importable formats of `domain`.
pub fn detect_format(registry: &FormatRegistry, domain: Domain, path: &Path) -> Result<Format> {
    let ext = normalized_ext(path)
        .with_context(|| format!("cannot detect the type of {} (no extension)", path.display()))?;

    if ext == "py" {
        let kind = detect_script_kind(path)?.with_context(|| {
            format!(
                "{} does not import cadquery or build123d in its first {} lines",
                path.display(),
                SCRIPT_SCAN_LINES
            )
        })?;
        return Ok(registry.resolve(domain, kind)?);
    }

    let importable = registry.capability(domain, "importable")?;
    match importable.by_ext(&ext).first() {
        Some(format) => Ok(*format),
        None => bail!(
            "'.{}' files cannot be imported as a {} (supported: {})",
            ext,
            domain,
            capability_names(registry, domain, &["importable"])?.join(", ")
        ),
    }
}

/// `partcad import part|assembly <file>`
#[derive(Debug, Clone, Copy)]
pub struct Import {
    domain: Domain,
}

impl CliCommand for Import {
    fn command(&self) -> clap::Command {
        let mut cmd = clap::Command::new(self.domain.as_str())
            .about(format!("Import a {} file into the package", self.domain))
            .arg(
                Arg::new("file")
                    .required(true)
                    .value_parser(clap::value_parser!(PathBuf))
                    .help("File to import"),
            )
            .arg(Arg::new("name").long("name").help("Object name (default: file stem)"))
            .arg(Arg::new("desc").long("desc").help("Description"));
        if self.domain == Domain::Part {
            cmd = cmd.arg(
                Arg::new("target")
                    .short('t')
                    .long("target")
                    .help("Convert to this format while importing"),
            );
        }
        cmd
    }

    fn run(&self, matches: &ArgMatches, ctx: &mut CliContext) -> Result<ExitCode> {
        let domain = self.domain;
        let file = matches.get_one::<PathBuf>("file").cloned().unwrap_or_default();
        if !file.is_file() {
            bail!("file not found: {}", file.display());
        }
        let registry = std::sync::Arc::clone(ctx.registry());
        let source = detect_format(&registry, domain, &file)?;
        let target = match matches.try_get_one::<String>("target").ok().flatten() {
            Some(name) => Some(registry.resolve(domain, name)?),
            None => None,
        };
        let name = match matches.get_one::<String>("name") {
            Some(name) => name.clone(),
            None => file_stem(&file)?,
        };
        let desc = matches.get_one::<String>("desc").cloned();
        tracing::debug!("importing {} as {} '{}' ({})", file.display(), domain, name, source);

        let dispatcher = ctx.dispatcher()?;
        let package = ctx.package()?;
        if package.get(domain, &name).is_some() {
            bail!("{} '{}' already exists in the package", domain, name);
        }

        let format = target.unwrap_or(source);
        let dest = package.dir().join(format.file_name(&name));
        let request = ConversionRequest::new(domain, &file, source, format).output(&dest);
        let result = dispatcher.convert(&request)?;
        if !result.success {
            bail!(
                "failed to import {}: {}",
                file.display(),
                result.exception.unwrap_or_else(|| "unknown error".to_string())
            );
        }

        package.set_object(
            domain,
            name.clone(),
            ObjectConfig::new(format.name()).with_desc(desc),
        );
        package.save()?;

        println!(
            "{} {} '{}' ({}) as {}",
            "Imported".green().bold(),
            domain,
            name,
            format,
            dest.display()
        );
        Ok(ExitCode::SUCCESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn registry() -> FormatRegistry {
        FormatRegistry::builtin().unwrap()
    }

    #[test]
    fn test_detect_script_kind() {
        let dir = tempfile::tempdir().unwrap();
        let cq = dir.path().join("gear.py");
        fs::write(&cq, "# gear\nimport cadquery as cq\nresult = cq.Workplane()\n").unwrap();
        let b3d = dir.path().join("shaft.py");
        fs::write(&b3d, "from build123d import *\n").unwrap();
        let plain = dir.path().join("util.py");
        fs::write(&plain, "import math\n").unwrap();

        assert_eq!(detect_script_kind(&cq).unwrap(), Some("cadquery"));
        assert_eq!(detect_script_kind(&b3d).unwrap(), Some("build123d"));
        assert_eq!(detect_script_kind(&plain).unwrap(), None);
    }

    #[test]
    fn test_script_import_past_scan_window_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let late = dir.path().join("late.py");
        let mut content = "# padding\n".repeat(SCRIPT_SCAN_LINES);
        content.push_str("import cadquery\n");
        fs::write(&late, content).unwrap();
        assert_eq!(detect_script_kind(&late).unwrap(), None);
    }

    #[test]
    fn test_detect_format() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry();

        let step = dir.path().join("bracket.STP");
        fs::write(&step, "").unwrap();
        assert_eq!(detect_format(&registry, Domain::Part, &step).unwrap().name(), "step");
        assert_eq!(
            detect_format(&registry, Domain::Assembly, &step).unwrap().name(),
            "step"
        );

        let scad = dir.path().join("box.scad");
        fs::write(&scad, "cube(1);").unwrap();
        assert_eq!(detect_format(&registry, Domain::Part, &scad).unwrap().name(), "scad");

        let png = dir.path().join("render.png");
        fs::write(&png, "").unwrap();
        assert!(detect_format(&registry, Domain::Part, &png).is_err());

        let assy = dir.path().join("arm.assy");
        fs::write(&assy, "").unwrap();
        assert!(detect_format(&registry, Domain::Assembly, &assy).is_err());
    }
}
