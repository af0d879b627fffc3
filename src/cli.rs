//! CLI argument parsing using clap v4

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::persona::IncomeLevel;
use crate::survey::DemographicAttribute;

/// Avatar Survey - simulated advertisement surveys
///
/// Builds synthetic personas, asks a completion service how each persona
/// would rate each ad, and summarizes which ad wins.
#[derive(Parser, Debug)]
#[command(name = "avatar-survey")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a survey and export the report
    Run(RunArgs),

    /// Generate personas and print or save them as JSON
    Personas {
        /// Path to configuration file
        #[arg(short, long, env = "SURVEY_CONFIG")]
        config: Option<String>,

        #[command(flatten)]
        selection: PersonaArgs,

        /// Write personas to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Re-aggregate and print an exported report
    Report {
        /// Report file written by `run`
        file: PathBuf,

        /// Break results down by a persona attribute
        #[arg(long)]
        breakdown: Option<DemographicAttribute>,
    },

    /// Display version and build information
    Version,

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// Options for `run`
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Path to configuration file
    #[arg(short, long, env = "SURVEY_CONFIG")]
    pub config: Option<String>,

    /// Content items (TOML or JSON); bundled sample ads when omitted
    #[arg(long)]
    pub content: Option<PathBuf>,

    /// Load personas from a JSON file instead of generating them
    #[arg(long, conflicts_with_all = ["count", "min_age", "max_age", "income", "interest"])]
    pub personas: Option<PathBuf>,

    #[command(flatten)]
    pub selection: PersonaArgs,

    /// Extra context included in every prompt
    #[arg(long)]
    pub context: Option<String>,

    /// Report destination (default: <output_dir>/survey-<time>-<id>.json)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Skip the completion service and use fallback ratings only
    #[arg(long)]
    pub mock: bool,

    /// Maximum number of evaluations in flight
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Break results down by a persona attribute
    #[arg(long)]
    pub breakdown: Option<DemographicAttribute>,
}

/// Persona generation options shared by `run` and `personas`
#[derive(Args, Debug, Clone, Default)]
pub struct PersonaArgs {
    /// Number of personas to generate
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Youngest persona age
    #[arg(long)]
    pub min_age: Option<u8>,

    /// Oldest persona age
    #[arg(long)]
    pub max_age: Option<u8>,

    /// Allowed income level (repeatable: low, medium, high)
    #[arg(long = "income")]
    pub income: Vec<IncomeLevel>,

    /// Interest every persona must have (repeatable)
    #[arg(long = "interest")]
    pub interest: Vec<String>,

    /// Seed for persona generation and fallback ratings
    #[arg(long)]
    pub seed: Option<u64>,
}

impl PersonaArgs {
    /// True when any demographic constraint was given
    pub fn is_targeted(&self) -> bool {
        self.min_age.is_some()
            || self.max_age.is_some()
            || !self.income.is_empty()
            || !self.interest.is_empty()
    }
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the effective configuration
    Show {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Write a commented default configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_defaults() {
        let cli = Cli::parse_from(["avatar-survey", "run"]);
        match cli.command {
            Commands::Run(args) => {
                assert!(args.config.is_none());
                assert!(args.content.is_none());
                assert!(!args.mock);
                assert!(!args.selection.is_targeted());
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_run_with_filters() {
        let cli = Cli::parse_from([
            "avatar-survey",
            "run",
            "--mock",
            "--count",
            "12",
            "--min-age",
            "25",
            "--income",
            "high",
            "--income",
            "medium",
            "--interest",
            "fitness",
            "--seed",
            "42",
            "--breakdown",
            "income-level",
        ]);
        match cli.command {
            Commands::Run(args) => {
                assert!(args.mock);
                assert_eq!(args.selection.count, Some(12));
                assert_eq!(args.selection.min_age, Some(25));
                assert_eq!(
                    args.selection.income,
                    vec![IncomeLevel::High, IncomeLevel::Medium]
                );
                assert_eq!(args.selection.interest, vec!["fitness".to_string()]);
                assert_eq!(args.selection.seed, Some(42));
                assert_eq!(args.breakdown, Some(DemographicAttribute::IncomeLevel));
                assert!(args.selection.is_targeted());
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_personas_file_conflicts_with_generation() {
        let result = Cli::try_parse_from([
            "avatar-survey",
            "run",
            "--personas",
            "people.json",
            "--count",
            "3",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_bad_income_rejected() {
        let result = Cli::try_parse_from(["avatar-survey", "personas", "--income", "rich"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_report_command() {
        let cli = Cli::parse_from(["avatar-survey", "report", "out.json", "--breakdown", "age"]);
        match cli.command {
            Commands::Report { file, breakdown } => {
                assert_eq!(file, PathBuf::from("out.json"));
                assert_eq!(breakdown, Some(DemographicAttribute::AgeBracket));
            }
            _ => panic!("Expected Report command"),
        }
    }

    #[test]
    fn test_verbosity_flags() {
        let cli = Cli::parse_from(["avatar-survey", "-vv", "version"]);
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);

        let cli = Cli::parse_from(["avatar-survey", "--quiet", "version"]);
        assert!(cli.quiet);
    }

    #[test]
    fn test_config_init() {
        let cli = Cli::parse_from(["avatar-survey", "config", "init", "--force"]);
        match cli.command {
            Commands::Config {
                subcommand: ConfigSubcommand::Init { path, force },
            } => {
                assert!(path.is_none());
                assert!(force);
            }
            _ => panic!("Expected Config Init command"),
        }
    }
}
