use clap::Parser;
use ragdesk_cli::{build_service, commands, logging, run, Command};
use ragdesk_core::config::Settings;
use ragdesk_core::Error;
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

#[derive(Parser)]
#[command(name = "ragdesk")]
#[command(about = "Ask questions over your own documents")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and config.<env>.toml
    #[arg(short, long, global = true, default_value = ".")]
    config_dir: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

fn print(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(_) => println!("{value}"),
    }
}

fn fail(err: &Error) -> ExitCode {
    error!(code = err.code(), error = %err, "command_failed");
    print(&err.envelope());
    if err.is_client_error() {
        ExitCode::from(2)
    } else {
        ExitCode::from(1)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if matches!(cli.command, Command::Health) {
        print(&commands::health());
        return ExitCode::SUCCESS;
    }

    let env_name = std::env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

    let settings = match Settings::from_figment(Settings::figment(&cli.config_dir, &env_name)) {
        Ok(settings) => settings,
        Err(err) => {
            logging::init("info", false);
            return fail(&err);
        }
    };
    let level = if cli.verbose { "debug" } else { settings.log_level.as_str() };
    logging::init(level, settings.is_prod());

    let service = match build_service(&settings, &cli.config_dir).await {
        Ok(service) => service,
        Err(err) => return fail(&err),
    };
    match run(&service, cli.command).await {
        Ok(body) => {
            print(&body);
            ExitCode::SUCCESS
        }
        Err(err) => fail(&err),
    }
}
