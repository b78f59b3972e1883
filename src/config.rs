//! Router configuration.
//!
//! Every option can be given as a flag or through its `ROUTER_*`
//! environment variable, which is how hook runners usually pass settings.

use clap::{ArgAction, Parser};
use std::convert::Infallible;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::scenario::DEFAULT_SHORT_THRESHOLD;

/// Command-line / environment surface
#[derive(Parser, Debug, Clone)]
#[command(name = "agent-router")]
#[command(version, about = "Routes prompts to specialized subagents and skills", long_about = None)]
pub struct Cli {
    /// Override path to the global router-rules.json
    #[arg(long, env = "ROUTER_RULES_PATH")]
    pub rules_path: Option<PathBuf>,

    /// Prompts with fewer words than this count as short
    #[arg(long, env = "ROUTER_SHORT_THRESHOLD", default_value_t = DEFAULT_SHORT_THRESHOLD, value_parser = parse_threshold)]
    pub short_threshold: usize,

    /// Log structural problems in the global rules (1/true/yes)
    #[arg(long, env = "ROUTER_STRICT_VALIDATION", action = ArgAction::Set, default_value = "1", value_parser = parse_toggle)]
    pub strict_validation: bool,

    /// Merge custom agents from project rules (1/true/yes)
    #[arg(long, env = "ROUTER_CUSTOM_DISCOVERY", action = ArgAction::Set, default_value = "1", value_parser = parse_toggle)]
    pub custom_discovery: bool,

    /// Debug logging to stderr (1/true/yes)
    #[arg(long, env = "ROUTER_DEBUG", action = ArgAction::Set, default_value = "0", value_parser = parse_toggle)]
    pub debug: bool,
}

/// Resolved settings for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    pub rules_path: Option<PathBuf>,
    pub short_threshold: usize,
    pub strict_validation: bool,
    pub custom_discovery: bool,
    pub debug: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            rules_path: None,
            short_threshold: DEFAULT_SHORT_THRESHOLD,
            strict_validation: true,
            custom_discovery: true,
            debug: false,
        }
    }
}

impl From<Cli> for RouterConfig {
    fn from(cli: Cli) -> Self {
        Self {
            rules_path: cli.rules_path,
            short_threshold: cli.short_threshold,
            strict_validation: cli.strict_validation,
            custom_discovery: cli.custom_discovery,
            debug: cli.debug,
        }
    }
}

impl RouterConfig {
    /// Parse process arguments and environment
    pub fn from_env() -> (Self, Option<clap::Error>) {
        Self::from_args_or_env(std::env::args_os())
    }

    /// Parse `args`. On a bad argument, settle for the `ROUTER_*`
    /// environment alone, then for the defaults; the error is returned
    /// alongside.
    pub fn from_args_or_env<I, T>(args: I) -> (Self, Option<clap::Error>)
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        match Cli::try_parse_from(args) {
            Ok(cli) => (cli.into(), None),
            Err(e) => {
                let config = Cli::try_parse_from(["agent-router"])
                    .map(Self::from)
                    .unwrap_or_default();
                (config, Some(e))
            }
        }
    }
}

/// `1`, `true` and `yes` (any case) are on; everything else is off.
pub fn parse_toggle(value: &str) -> Result<bool, Infallible> {
    Ok(matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes"
    ))
}

/// Unparseable thresholds fall back to the default
pub fn parse_threshold(value: &str) -> Result<usize, Infallible> {
    Ok(value.trim().parse().unwrap_or(DEFAULT_SHORT_THRESHOLD))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RouterConfig::default();
        assert_eq!(config.short_threshold, 5);
        assert!(config.strict_validation);
        assert!(config.custom_discovery);
        assert!(!config.debug);
        assert!(config.rules_path.is_none());
    }

    #[test]
    fn test_parse_toggle() {
        for on in ["1", "true", "TRUE", "yes", " Yes "] {
            assert!(parse_toggle(on).unwrap(), "{} should be on", on);
        }
        for off in ["0", "false", "no", "", "on"] {
            assert!(!parse_toggle(off).unwrap(), "{} should be off", off);
        }
    }

    #[test]
    fn test_parse_threshold() {
        assert_eq!(parse_threshold("8").unwrap(), 8);
        assert_eq!(parse_threshold("eight").unwrap(), DEFAULT_SHORT_THRESHOLD);
        assert_eq!(parse_threshold("-1").unwrap(), DEFAULT_SHORT_THRESHOLD);
    }

    #[test]
    fn test_bad_argument_keeps_environment() {
        std::env::set_var("ROUTER_SHORT_THRESHOLD", "9");
        let (config, error) = RouterConfig::from_args_or_env(["agent-router", "--no-such-flag"]);
        std::env::remove_var("ROUTER_SHORT_THRESHOLD");

        assert_eq!(config.short_threshold, 9);
        assert_eq!(
            error.map(|e| e.kind()),
            Some(clap::error::ErrorKind::UnknownArgument)
        );
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "agent-router",
            "--short-threshold",
            "8",
            "--custom-discovery",
            "no",
            "--debug",
            "yes",
            "--rules-path",
            "/opt/rules/router-rules.json",
        ])
        .unwrap();
        let config = RouterConfig::from(cli);

        assert_eq!(config.short_threshold, 8);
        assert!(!config.custom_discovery);
        assert!(config.debug);
        assert_eq!(
            config.rules_path,
            Some(PathBuf::from("/opt/rules/router-rules.json"))
        );
    }
}
