//! wmi-watch: follow a Licorn WMI page from the terminal
//!
//! ## Usage
//!
//! ```bash
//! wmi-watch watch users                      # Print the users list as it changes
//! wmi-watch watch users --search jdoe        # Only rows matching "jdoe"
//! wmi-watch mutate /users/mod/1001/gecos/Bob # Send one mutation
//! wmi-watch config > wmi.yaml                # Dump the effective configuration
//! ```

use clap::Parser;
use licorn_wmi_cli::{
    run_mutate, run_watch, Cli, CliConfig, CliResult, ColorChoice, Commands, ConfigArgs,
    ConfigFormat, Printer, Verbosity,
};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;
    init_logging(config.verbosity, cli.log_json);

    match cli.command {
        Commands::Config(args) => run_config(&config, &args),
        Commands::Watch(args) => {
            let mut printer = printer(&config);
            let summary = runtime()?.block_on(run_watch(&config, &args, &mut printer))?;
            tracing::info!(
                batches = summary.batches,
                failed_calls = summary.failed_calls,
                "watch finished"
            );
            Ok(())
        }
        Commands::Mutate(args) => {
            let printer = printer(&config);
            runtime()?.block_on(run_mutate(&config, &args, &printer))?;
            Ok(())
        }
    }
}

fn build_config(cli: &Cli) -> CliResult<CliConfig> {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.verbose, cli.quiet))
        .with_color(ColorChoice::from(cli.color.clone()))
        .with_client_config(cli.config.as_deref(), cli.base_url.as_deref())
}

fn init_logging(verbosity: Verbosity, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_directive()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

fn printer(config: &CliConfig) -> Printer {
    Printer::new(config.color.should_color(), config.verbosity.is_quiet())
}

fn run_config(config: &CliConfig, args: &ConfigArgs) -> CliResult<()> {
    let text = match args.format {
        ConfigFormat::Yaml => config.wmi.to_yaml()?,
        ConfigFormat::Json => serde_json::to_string_pretty(&config.wmi)?,
    };
    println!("{}", text.trim_end());
    Ok(())
}
