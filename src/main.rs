//! avatar-survey binary entry point.

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tracing::{debug, info, warn};

use avatar_survey::backend::BackendFactory;
use avatar_survey::cli::{Cli, Commands, ConfigSubcommand, PersonaArgs, RunArgs};
use avatar_survey::config::{self, SurveyConfig};
use avatar_survey::error::{Error, Result};
use avatar_survey::evaluator::Evaluator;
use avatar_survey::logging::{self, LogGuards};
use avatar_survey::persona::{
    load_personas, save_personas, AgeRange, DemographicFilter, IncomeLevel, PersonaFactory,
    PersonaRecord,
};
use avatar_survey::survey::{
    DemographicAttribute, RunInfo, SurveyReport, SurveyRunner, SurveySummary,
};
use avatar_survey::types::{ContentItem, ContentSet};
use avatar_survey::version;

/// Exit code for a run that completed with fallback ratings caused by an
/// unavailable completion service
const EXIT_DEGRADED: i32 = 3;

fn main() {
    let cli = Cli::parse();

    match dispatch(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprint!("{}", e.format_for_terminal());
            std::process::exit(e.exit_code());
        }
    }
}

fn dispatch(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Version => {
            version::print_version();
            Ok(0)
        }
        Commands::Config { subcommand } => {
            logging::init_simple(tracing::Level::WARN)?;
            handle_config_command(subcommand)?;
            Ok(0)
        }
        Commands::Report { file, breakdown } => {
            logging::init_simple(quiet_level(cli.verbose, cli.quiet))?;
            show_report(&file, breakdown)?;
            Ok(0)
        }
        Commands::Personas {
            config,
            selection,
            output,
        } => {
            let config = SurveyConfig::load(config.as_deref())?;
            let _log_guards = init_logging_from_config(&config, cli.verbose, cli.quiet)?;
            generate_personas_command(&config, &selection, output.as_deref())?;
            Ok(0)
        }
        Commands::Run(args) => {
            let mut config = SurveyConfig::load(args.config.as_deref())?;
            apply_run_overrides(&mut config, &args);
            config.validate()?;

            let _log_guards = init_logging_from_config(&config, cli.verbose, cli.quiet)?;

            let build = version::build_info();
            info!(
                version = %build.full_version(),
                target = %build.target,
                "Starting avatar-survey"
            );

            run_survey(config, args)
        }
    }
}

fn quiet_level(verbose: u8, quiet: bool) -> tracing::Level {
    match (quiet, verbose) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::WARN,
        (false, 1) => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    }
}

fn init_logging_from_config(config: &SurveyConfig, verbose: u8, quiet: bool) -> Result<LogGuards> {
    logging::init_logging(&config.logging, verbose, quiet)
}

/// CLI flags take precedence over file and environment settings
fn apply_run_overrides(config: &mut SurveyConfig, args: &RunArgs) {
    if args.mock {
        config.survey.mock_mode = true;
    }
    if let Some(seed) = args.selection.seed {
        config.survey.seed = Some(seed);
    }
    if let Some(limit) = args.concurrency {
        config.survey.concurrency_limit = limit;
    }
    if let Some(attribute) = args.breakdown {
        config.survey.breakdown = Some(attribute);
    }
}

// ─────────────────────────────────────────────────────────────────
// run
// ─────────────────────────────────────────────────────────────────

fn run_survey(config: SurveyConfig, args: RunArgs) -> Result<i32> {
    let seed = config.survey.seed.unwrap_or_else(rand::random);

    let content = match args.content {
        Some(ref path) => ContentSet::load(path)?,
        None => ContentSet::samples()?,
    };
    let context = args.context.clone().or_else(|| content.context.clone());

    let personas = match args.personas {
        Some(ref path) => load_personas(path)?,
        None => build_personas(&config, &args.selection, seed)?,
    };

    info!(
        seed,
        personas = personas.len(),
        content_items = content.items.len(),
        mock_mode = config.survey.mock_mode,
        concurrency = config.survey.concurrency_limit,
        "Survey configured"
    );

    let backend = BackendFactory::from_config(&config)?;
    let backend_name = backend.name();
    let evaluator = Arc::new(Evaluator::from_config(&config, backend, seed)?);
    let runner = SurveyRunner::from_config(&config, evaluator.clone());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("avatar-survey")
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create async runtime: {}", e)))?;

    let cancel = runner.cancel_handle();
    let run = runtime.block_on(async {
        evaluator.check_backend().await;

        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, finishing in-flight evaluations");
                cancel.cancel();
            }
        });

        runner
            .run_comparison(&content.items, &personas, context.as_deref())
            .await
    })?;

    print_summary(&run.summary, &content.items);

    let degraded = run.is_degraded();
    if degraded {
        warn!(
            upstream_failures = run.upstream_failures,
            "Completion service unavailable for some pairs; their ratings are fallbacks"
        );
    }

    let report = SurveyReport::new(
        run,
        content.items,
        personas,
        RunInfo {
            seed,
            backend: backend_name.to_string(),
            mock_mode: config.survey.mock_mode,
            context,
        },
    );

    let destination = args
        .output
        .unwrap_or_else(|| config.output_dir().join(report.default_file_name()));
    report.export(&destination)?;
    println!();
    println!("Report written to {}", destination.display());

    Ok(if degraded { EXIT_DEGRADED } else { 0 })
}

fn build_personas(
    config: &SurveyConfig,
    selection: &PersonaArgs,
    seed: u64,
) -> Result<Vec<PersonaRecord>> {
    let bounds = config.age_bounds();
    let count = selection.count.unwrap_or(config.personas.default_count);
    let mut factory = PersonaFactory::seeded(seed).with_bounds(bounds);

    if !selection.is_targeted() {
        return factory.generate_random(count);
    }

    let filter = DemographicFilter {
        age_range: AgeRange::new(
            selection.min_age.unwrap_or(bounds.min),
            selection.max_age.unwrap_or(bounds.max),
        ),
        income_levels: if selection.income.is_empty() {
            IncomeLevel::all().to_vec()
        } else {
            selection.income.clone()
        },
        required_interests: selection.interest.clone(),
    };
    debug!(filter = ?filter, "Generating targeted personas");
    factory.generate_targeted(&filter, count)
}

fn print_summary(summary: &SurveySummary, items: &[ContentItem]) {
    println!();
    println!(
        "Survey Results ({} responses, {} rated, {} fallback)",
        summary.total_responses, summary.rated_count, summary.fallback_count
    );
    println!(
        "  {:<12} {:<28} {:>6} {:>6} {:>6} {:>4} {:>4}",
        "Item", "Title", "Mean", "High", "Low", "Min", "Max"
    );
    for stats in &summary.content {
        println!(
            "  {:<12} {:<28} {:>6.2} {:>6} {:>6} {:>4} {:>4}",
            stats.content_id,
            truncate(&stats.title, 28),
            stats.mean,
            stats.high_engagement,
            stats.low_engagement,
            stats.min,
            stats.max
        );
    }
    println!(
        "  (high >= {}, low <= {})",
        summary.high_threshold, summary.low_threshold
    );

    match summary.winner {
        Some(ref winner) => {
            let title = items
                .iter()
                .find(|i| i.id == winner.content_id)
                .map(|i| i.title.as_str())
                .unwrap_or("");
            println!();
            println!(
                "Winner: {} {} (mean {:.2})",
                winner.content_id, title, winner.mean
            );
        }
        None => {
            println!();
            println!("Winner: none (no responses)");
        }
    }

    if let Some(ref breakdown) = summary.breakdown {
        println!();
        println!("Breakdown by {}:", breakdown.attribute);
        for group in &breakdown.groups {
            println!(
                "  {:<12} {:<22} {:>6.2} ({} responses)",
                group.content_id, group.group, group.mean, group.responses
            );
        }
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut short: String = text.chars().take(width.saturating_sub(3)).collect();
    short.push_str("...");
    short
}

// ─────────────────────────────────────────────────────────────────
// personas / report / config
// ─────────────────────────────────────────────────────────────────

fn generate_personas_command(
    config: &SurveyConfig,
    selection: &PersonaArgs,
    output: Option<&Path>,
) -> Result<()> {
    let seed = selection
        .seed
        .or(config.survey.seed)
        .unwrap_or_else(rand::random);
    let personas = build_personas(config, selection, seed)?;

    match output {
        Some(path) => {
            save_personas(&personas, path)?;
            info!(seed, count = personas.len(), path = %path.display(), "Personas saved");
            println!("Wrote {} personas to {}", personas.len(), path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&personas)?),
    }
    Ok(())
}

fn show_report(file: &Path, breakdown: Option<DemographicAttribute>) -> Result<()> {
    let report = SurveyReport::load(file)?;

    let mut settings = report.summary.settings();
    if breakdown.is_some() {
        settings.breakdown = breakdown;
    }
    let summary = report.reaggregate(&settings);

    println!(
        "Run {} ({}, seed {}, backend {}{})",
        report.run_id,
        report.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        report.seed,
        report.backend,
        if report.mock_mode { ", mock mode" } else { "" }
    );
    print_summary(&summary, &report.content_items);
    Ok(())
}

fn handle_config_command(subcommand: ConfigSubcommand) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show { config } => {
            let mut cfg = SurveyConfig::load(config.as_deref())?;
            if !cfg.backend.api_key.is_empty() {
                cfg.backend.api_key = "********".to_string();
            }
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigSubcommand::Init { path, force } => {
            let written = config::init_config(path.as_deref(), force)?;
            println!("Configuration written to {}", written.display());
        }
        ConfigSubcommand::Validate { config } => {
            SurveyConfig::load(config.as_deref())?;
            println!("Configuration is valid.");
        }
    }

    Ok(())
}
