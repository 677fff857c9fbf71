//! CLI argument parsing

use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;

use pummel_core::{RunConfig, ScriptErrorPolicy, StopCondition};

#[derive(Parser)]
#[command(name = "pummel")]
#[command(author, version, about = "Constant-rate HTTP load generator", long_about = None)]
pub struct Cli {
    /// Target requests per second across the whole pool
    #[arg(short, long, default_value_t = 10)]
    pub rps: u32,

    /// Number of concurrent workers (never more than --rps are started)
    #[arg(short, long, default_value_t = 100)]
    pub workers: usize,

    /// Path to a JSON scenario describing the request to send
    #[arg(short, long)]
    pub script: Option<PathBuf>,

    /// Reuse connections between requests
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    pub keepalive: bool,

    /// Ask for and decode compressed response bodies
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    pub compression: bool,

    /// Cache DNS lookups in-process for the lifetime of the run
    #[arg(long)]
    pub cachedns: bool,

    /// Stop after this many seconds instead of running until interrupted
    #[arg(short, long)]
    pub duration: Option<u64>,

    /// Count script failures as request errors instead of aborting the run
    #[arg(long)]
    pub lenient_scripts: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Target URL (without --script), then arguments forwarded to the script
    pub args: Vec<String>,
}

impl Cli {
    /// Map the parsed flags onto a run configuration.
    pub fn run_config(&self) -> RunConfig {
        let stop_condition = match self.duration {
            Some(secs) => StopCondition::Duration(Duration::from_secs(secs)),
            None => StopCondition::Indefinite,
        };

        let script_error_policy = if self.lenient_scripts {
            ScriptErrorPolicy::CountAsError
        } else {
            ScriptErrorPolicy::Fatal
        };

        RunConfig {
            rps: self.rps,
            workers: self.workers,
            keepalive: self.keepalive,
            compression: self.compression,
            cache_dns: self.cachedns,
            stop_condition,
            script_error_policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["pummel", "http://localhost:8080/"]);
        let config = cli.run_config();

        assert_eq!(config.rps, 10);
        assert_eq!(config.workers, 100);
        assert!(config.keepalive);
        assert!(config.compression);
        assert!(!config.cache_dns);
        assert!(matches!(config.stop_condition, StopCondition::Indefinite));
        assert_eq!(config.script_error_policy, ScriptErrorPolicy::Fatal);
        assert_eq!(cli.args, vec!["http://localhost:8080/"]);
    }

    #[test]
    fn test_flags_map_onto_config() {
        let cli = Cli::parse_from([
            "pummel",
            "--rps",
            "200",
            "--workers",
            "16",
            "--keepalive",
            "false",
            "--cachedns",
            "--duration",
            "30",
            "--lenient-scripts",
            "http://localhost:8080/",
        ]);
        let config = cli.run_config();

        assert_eq!(config.rps, 200);
        assert_eq!(config.workers, 16);
        assert!(!config.keepalive);
        assert!(config.cache_dns);
        assert!(matches!(
            config.stop_condition,
            StopCondition::Duration(d) if d == Duration::from_secs(30)
        ));
        assert_eq!(config.script_error_policy, ScriptErrorPolicy::CountAsError);
    }

    #[test]
    fn test_verbose_flag() {
        let cli = Cli::parse_from(["pummel", "http://localhost:8080/"]);
        assert!(!cli.verbose);

        let cli = Cli::parse_from(["pummel", "-v", "http://localhost:8080/"]);
        assert!(cli.verbose);
    }

    #[test]
    fn test_script_with_forwarded_args() {
        let cli = Cli::parse_from(["pummel", "--script", "scenario.json", "alpha", "beta"]);
        assert_eq!(cli.script, Some(PathBuf::from("scenario.json")));
        assert_eq!(cli.args, vec!["alpha", "beta"]);
    }
}
