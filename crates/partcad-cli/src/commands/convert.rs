//! Convert command implementation

use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, ArgMatches};
use colored::Colorize;
use partcad_core::{Domain, FormatRegistry, ObjectConfig, Package};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use super::package_relative;
use crate::context::CliContext;
use crate::dispatch::ConversionRequest;
use crate::loader::CliCommand;

/// `partcad convert <object> -t <target> [-O dir] [-i] [--dry-run]`
#[derive(Debug, Default)]
pub struct Convert;

impl CliCommand for Convert {
    fn command(&self) -> clap::Command {
        clap::Command::new("convert")
            .about("Convert an object to another format")
            .arg(Arg::new("object").required(true).help("Part, sketch or assembly name"))
            .arg(
                Arg::new("target")
                    .short('t')
                    .long("target")
                    .required(true)
                    .help("Target format, e.g. step or stl"),
            )
            .arg(
                Arg::new("output-dir")
                    .short('O')
                    .long("output-dir")
                    .value_parser(clap::value_parser!(PathBuf))
                    .help("Write the result here and record it in the package"),
            )
            .arg(
                Arg::new("in-place")
                    .short('i')
                    .long("in-place")
                    .action(ArgAction::SetTrue)
                    .help("Record the converted file in the package"),
            )
            .arg(
                Arg::new("dry-run")
                    .long("dry-run")
                    .action(ArgAction::SetTrue)
                    .help("Show what would be converted without doing it"),
            )
    }

    fn run(&self, matches: &ArgMatches, ctx: &mut CliContext) -> Result<ExitCode> {
        let object = matches.get_one::<String>("object").cloned().unwrap_or_default();
        let target = matches.get_one::<String>("target").cloned().unwrap_or_default();
        let output_dir = matches.get_one::<PathBuf>("output-dir").cloned();
        let update = matches.get_flag("in-place") || output_dir.is_some();
        let dry_run = matches.get_flag("dry-run");

        let registry = Arc::clone(ctx.registry());
        let dispatcher = ctx.dispatcher()?;
        let package = ctx.package()?;

        let (domain, config) = package
            .find(&object)
            .map(|(domain, config)| (domain, config.clone()))
            .with_context(|| {
                format!("object '{}' not found in package '{}'", object, package.name())
            })?;
        let source_format = registry
            .resolve(domain, &config.kind)
            .with_context(|| format!("{} '{}' has an invalid type", domain, object))?;
        let target_format = dispatcher.resolve(domain, &target, "target")?;

        let job = plan(package, &registry, domain, &object, &config)?;
        let output_dir = match output_dir {
            Some(dir) => dir,
            None => job
                .default_dir
                .clone()
                .unwrap_or_else(|| package.dir().to_path_buf()),
        };
        let output = output_dir.join(target_format.file_name(&object));

        if dry_run {
            println!(
                "{} {} '{}' ({} -> {}) to {}",
                "Would convert".cyan().bold(),
                domain,
                object,
                source_format,
                target_format,
                output.display()
            );
            return Ok(ExitCode::SUCCESS);
        }

        let request = ConversionRequest::new(domain, &job.source, source_format, target_format)
            .output(&output)
            .params(job.params);
        let result = dispatcher.convert(&request)?;
        if !result.success {
            bail!(
                "conversion of '{}' failed: {}",
                object,
                result.exception.unwrap_or_else(|| "unknown error".to_string())
            );
        }

        println!(
            "{} {} '{}' ({} -> {}): {}",
            "Converted".green().bold(),
            domain,
            object,
            source_format,
            target_format,
            result.output_path.display()
        );

        if update && source_format != target_format {
            let mut updated =
                ObjectConfig::new(target_format.name()).with_desc(config.desc.clone());
            if source_format.is_file_based() {
                updated.extra = config.extra.clone();
            }
            if result.output_path != package.dir().join(target_format.file_name(&object)) {
                updated.path = Some(package_relative(package, &result.output_path)?);
            }
            package.set_object(domain, object.clone(), updated);
            package.save()?;
            println!("  {} {} '{}' is now {}", "->".green(), domain, object, target_format);
        }
        Ok(ExitCode::SUCCESS)
    }
}

/// Inputs of one conversion, derived from the object declaration.
struct Job {
    source: PathBuf,
    params: Map<String, Value>,
    default_dir: Option<PathBuf>,
}

/// Works out the source file and parameters of `object`.
///
/// Extrusions read the sketch they reference and pass their own settings
/// (e.g. `depth`) to the backend; every other object is its own file.
fn plan(
    package: &Package,
    registry: &FormatRegistry,
    domain: Domain,
    object: &str,
    config: &ObjectConfig,
) -> Result<Job> {
    if domain == Domain::Part && config.kind == "extrude" {
        let sketch = config
            .extra
            .get("sketch")
            .and_then(|v| v.as_str())
            .with_context(|| format!("extrusion '{}' does not name a sketch", object))?;
        let source = package
            .object_path(registry, Domain::Sketch, sketch)
            .with_context(|| format!("extrusion '{}' refers to a missing sketch", object))?;

        let params = match serde_json::to_value(&config.extra)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        return Ok(Job {
            source,
            params,
            default_dir: Some(package.dir().to_path_buf()),
        });
    }

    let source = package.object_path(registry, domain, object)?;
    let default_dir = source.parent().map(Path::to_path_buf);
    Ok(Job {
        source,
        params: Map::new(),
        default_dir,
    })
}
