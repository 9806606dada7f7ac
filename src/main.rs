//! Entry point for the spatialstats application.
//! Handles CLI parsing, configuration merging, and dispatches either a dataset
//! listing or a full analysis run.

use clap::Parser;
use log::LevelFilter;
use spatial_stats::cli::Args;
use spatial_stats::config::AnalysisConfig;
use spatial_stats::dataset::Dataset;
use spatial_stats::pipeline::run_analysis;
use spatial_stats::report::{config_echo, show_farewell, show_greeting, show_summary};
use spatial_stats::Result;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::debug!("{e:?}");
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_logging(args: &Args) {
    let level = if args.quiet {
        LevelFilter::Error
    } else if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn run(args: &Args) -> Result<()> {
    let config = AnalysisConfig::from_args(args)?;

    if args.list_vars {
        let dataset = Dataset::open(config.input()?)?;
        println!("{}", dataset.summary());
        return dataset.close();
    }

    config.validate()?;
    if !args.quiet {
        show_greeting();
        config_echo(&config);
    }
    if let Some(parallel) = config.parallel_config() {
        parallel.setup_global_pool()?;
    }

    let summary = run_analysis(&config)?;

    if !args.quiet {
        show_summary(&summary);
        show_farewell(&summary);
    }
    Ok(())
}
