//! Config validation CLI tool
//!
//! Validates a lecternd configuration file and reports any errors.

use lectern_config::ConfigError;
use lectern_util::{default_config_path, format_datetime_short};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a lecternd configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match lectern_config::load_config(&config_path) {
        Ok(config) => {
            println!("Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", lectern_config::CURRENT_CONFIG_VERSION);
            println!("  Socket: {}", config.service.socket_path.display());
            println!("  Data dir: {}", config.service.data_dir.display());
            println!(
                "  Refresh interval: {}s",
                config.service.refresh_interval.as_secs()
            );
            println!("  Seed presentations: {}", config.seed_presentations.len());

            for draft in &config.seed_presentations {
                println!(
                    "    - {} ({} -> {})",
                    draft.project_name,
                    format_datetime_short(&draft.start_time),
                    format_datetime_short(&draft.end_time)
                );
            }

            ExitCode::SUCCESS
        }
        Err(ConfigError::ValidationFailed { errors }) => {
            eprintln!("Configuration has {} error(s):", errors.len());
            for error in errors {
                eprintln!("  - {}", error);
            }
            ExitCode::from(1)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}
