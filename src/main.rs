use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rigel_voice::api::health::{CheckResult, ReadinessChecks};
use rigel_voice::api::{ApiServer, ApiState};
use rigel_voice::Config;

/// Rigel - streaming speech playback for the kiosk assistant
#[derive(Parser)]
#[command(name = "rigel", version, about)]
struct Cli {
    /// Address to bind the HTTP server to
    #[arg(long, env = "RIGEL_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "RIGEL_PORT")]
    port: Option<u16>,

    /// Append logs to this file instead of stderr
    #[arg(long, env = "RIGEL_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP speech server (default)
    Serve,
    /// Speak text once and exit
    Speak {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
    /// Check the voice model and external programs
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let (mut config, file_status) = match Config::load() {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(path) = cli.log_file.clone() {
        config.log_file = Some(path);
    }

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,rigel_voice=info",
        1 => "info,rigel_voice=debug",
        2 => "debug",
        _ => "trace",
    };

    if let Err(e) = init_logging(filter, config.log_file.as_deref()) {
        eprintln!("failed to open log file: {e}");
        return ExitCode::FAILURE;
    }
    file_status.log();

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(filter: &str, log_file: Option<&Path>) -> std::io::Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(EnvFilter::new(filter));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.init(),
    }
    Ok(())
}

async fn run(cli: Cli, mut config: Config) -> anyhow::Result<()> {
    if let Some(host) = cli.host {
        config.api_server.host = host;
    }
    if let Some(port) = cli.port {
        config.api_server.port = port;
    }
    tracing::debug!(?config, "loaded configuration");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Speak { text } => speak(&config, &text).await,
        Command::Check => check(&config),
    }
}

/// Run the HTTP server until interrupted
async fn serve(config: Config) -> anyhow::Result<()> {
    let pipeline = Arc::new(config.speech.build_pipeline()?);

    let checks = ReadinessChecks::inspect(&config.speech);
    if !checks.all_ok() {
        tracing::warn!(?checks, "speech pipeline is not ready; requests will fail");
    }

    tracing::info!(
        host = %config.api_server.host,
        port = config.api_server.port,
        "starting rigel speech server"
    );

    let state = ApiState::new(pipeline).with_speech_config(config.speech.clone());
    let server = ApiServer::new(state, config.api_server.host, config.api_server.port);

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
    }

    Ok(())
}

/// Speak text once
async fn speak(config: &Config, text: &str) -> anyhow::Result<()> {
    let pipeline = config.speech.build_pipeline()?;
    pipeline.speak(text).await?;
    Ok(())
}

/// Print readiness checks
fn check(config: &Config) -> anyhow::Result<()> {
    let checks = ReadinessChecks::inspect(&config.speech);

    print_check("voice model", &config.speech.voice_model, &checks.voice_model);
    print_check("engine", &config.speech.engine, &checks.engine);
    print_check("player", &config.speech.player, &checks.player);

    if !checks.all_ok() {
        anyhow::bail!("speech pipeline is not ready");
    }
    println!("\nAll checks passed.");
    Ok(())
}

fn print_check(name: &str, target: &Path, result: &CheckResult) {
    match &result.message {
        Some(message) => println!("{name:<12} {:<5} {message}", result.status),
        None => println!("{name:<12} {:<5} {}", result.status, target.display()),
    }
}
