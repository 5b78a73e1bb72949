//! Config command implementation

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use std::process::ExitCode;

use crate::config::UserConfig;
use crate::context::CliContext;
use crate::loader::CliCommand;

/// Returns `config` with every defaulted setting filled in.
pub fn effective(config: &UserConfig) -> UserConfig {
    let mut shown = config.clone();
    shown.internal_state_dir = Some(config.internal_state_dir());
    shown.wrapper_timeout_secs = Some(config.wrapper_timeout().as_secs());
    shown
}

/// `partcad config`
#[derive(Debug, Default)]
pub struct Config;

impl CliCommand for Config {
    fn command(&self) -> clap::Command {
        clap::Command::new("config").about("Show the effective user configuration")
    }

    fn run(&self, _matches: &ArgMatches, ctx: &mut CliContext) -> Result<ExitCode> {
        let config = ctx.config();
        let yaml = serde_yaml::to_string(&effective(config))
            .context("failed to serialize the user config")?;

        println!("{}", "User configuration".cyan().bold());
        match config.source {
            Some(ref path) => println!("  {} {}", "file:".dimmed(), path.display()),
            None => println!("  {} {}", "file:".dimmed(), "(none, defaults)".dimmed()),
        }
        if !config.env_overrides.is_empty() {
            println!(
                "  {} {}",
                "overridden by:".dimmed(),
                config.env_overrides.join(", ")
            );
        }
        println!();
        print!("{}", yaml);
        Ok(ExitCode::SUCCESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn test_effective_fills_defaults() {
        let config = UserConfig {
            internal_state_dir: Some(PathBuf::from("/srv/partcad")),
            ..Default::default()
        };
        let shown = effective(&config);
        assert_eq!(shown.internal_state_dir, Some(PathBuf::from("/srv/partcad")));
        assert_eq!(
            shown.wrapper_timeout_secs,
            Some(partcad_wrapper::DEFAULT_TIMEOUT_SECS)
        );

        let yaml = serde_yaml::to_string(&shown).unwrap();
        assert!(yaml.contains("internalStateDir: /srv/partcad"));
        assert!(yaml.contains("wrapperTimeoutSecs:"));
    }
}
