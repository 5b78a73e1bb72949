//! Logging setup for the `partcad` binary.

use clap::ValueEnum;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// How much to log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// Nothing at all.
    Quiet,
    /// Informational messages and up.
    #[default]
    Normal,
    /// Everything including debug output.
    Verbose,
}

impl Verbosity {
    /// Picks the level from the `-q` and `-v` flags; `-q` wins.
    pub fn from_flags(quiet: bool, verbose: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Verbosity::Quiet,
            (false, true) => Verbosity::Verbose,
            _ => Verbosity::Normal,
        }
    }

    fn directive(self) -> &'static str {
        match self {
            Verbosity::Quiet => "off",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
        }
    }
}

/// Prefix of each log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Timestamp and level.
    Time,
    /// Source file, line and level.
    Path,
    /// Level only.
    Level,
}

/// Logging options collected from the global flags.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub verbosity: Verbosity,
    pub no_ansi: bool,
    pub format: Option<LogFormat>,
}

impl LogOptions {
    /// The filter used when `RUST_LOG` is not set.
    pub fn default_filter(&self) -> EnvFilter {
        EnvFilter::new(self.verbosity.directive())
    }

    /// Installs the global subscriber, writing to stderr.
    ///
    /// `RUST_LOG` overrides the verbosity flags.
    pub fn init(&self) -> anyhow::Result<()> {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| self.default_filter());

        let layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(!self.no_ansi)
            .with_target(false);
        let layer: Box<dyn Layer<Registry> + Send + Sync> = match self.format {
            Some(LogFormat::Time) => layer.boxed(),
            Some(LogFormat::Path) => layer
                .without_time()
                .with_file(true)
                .with_line_number(true)
                .boxed(),
            Some(LogFormat::Level) | None => layer.without_time().boxed(),
        };

        tracing_subscriber::registry()
            .with(layer)
            .with(filter)
            .try_init()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_wins_over_verbose() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn test_default_filter() {
        let options = LogOptions {
            verbosity: Verbosity::Verbose,
            ..Default::default()
        };
        assert_eq!(options.default_filter().to_string(), "debug");
    }

    #[test]
    fn test_format_names() {
        assert_eq!(LogFormat::from_str("path", true), Ok(LogFormat::Path));
        assert!(LogFormat::from_str("json", true).is_err());
    }
}
