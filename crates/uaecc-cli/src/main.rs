//! uaecc CLI entry point

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uaecc_cli::config::CliOverrides;
use uaecc_cli::{Cli, Config, ExitCode};

fn main() -> std::process::ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load config from custom path or default
    let config = match Config::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: Config error: {e}");
            return ExitCode::InvalidInput.to_exit_code();
        }
    };

    // Build CLI overrides
    let overrides = CliOverrides {
        output_format: cli.output.map(|f| f.to_string()),
        verbose: if cli.verbose { Some(true) } else { None },
        debug: if cli.debug { Some(true) } else { None },
        curve: cli.curve,
        pki_root: cli.pki.clone(),
        work_dir: cli.work_dir.clone(),
    };

    // Apply CLI overrides to config
    let config = config.with_overrides(&overrides);

    // Initialize logging based on config (with CLI override)
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Execute command with resolved config
    match cli.execute_with_config(config) {
        Ok(code) => code.to_exit_code(),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::GeneralError.to_exit_code()
        }
    }
}
