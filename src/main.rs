//! screenrec command line

use anyhow::Context;
use clap::{Parser, Subcommand};
use screenrec::capture::Environment;
use screenrec::config::Config;
use screenrec::recorder::{SegmentOptions, SegmentRecorder};
use screenrec::utils::error::ErrorResponse;
use screenrec::{api, RecorderError};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "screenrec", version, about = "Record the screen for a fixed duration")]
struct Cli {
    /// Configuration file (defaults to ./screenrec.json if present)
    #[arg(long, global = true, env = "SCREENREC_CONFIG")]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record to a file; Ctrl-C stops early
    Record {
        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Duration in seconds
        #[arg(short, long)]
        duration: f64,
    },
    /// Record one timestamped segment into a directory
    Segment {
        /// Destination directory (defaults to paths.output_dir)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Show the detected capture backend and permission state
    Doctor {
        /// Ask the OS for screen recording access first
        #[arg(long)]
        request: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    screenrec::init_tracing(&config.logging);
    tracing::debug!("Configuration source: {}", config.source);

    let backend = config.video.backend.clone();
    if let Command::Doctor { request } = cli.command {
        if request {
            let granted = screenrec::capture::request_screen_recording();
            tracing::info!("Screen recording access requested (granted: {})", granted);
        }
        let env = Environment::detect(backend.as_deref());
        print_doctor(&env, cli.json)?;
        return Ok(if env.available { ExitCode::SUCCESS } else { ExitCode::FAILURE });
    }

    let controller = api::controller_with_backend(backend.as_deref());
    if let Err(e) = controller.initialize() {
        report_failure(e, cli.json)?;
        return Ok(ExitCode::FAILURE);
    }

    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping recording");
            api::cancel_active();
        }
    });

    match cli.command {
        Command::Record { output, duration } => {
            let (status, message) =
                tokio::task::spawn_blocking(move || api::start_recording(&output, duration))
                    .await
                    .context("recording task panicked")?;

            if cli.json {
                let body = serde_json::json!({
                    "status": status,
                    "message": message.as_ref().map(|m| m.as_str()),
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                match &message {
                    Some(message) => eprintln!("{status}: {message}"),
                    None => println!("{status}"),
                }
            }
            if let Some(message) = message {
                api::release_error_message(message);
            }
            Ok(if status.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Command::Segment { dir } => {
            let dest = dir.unwrap_or_else(|| config.paths.output_dir.clone());
            let recorder = SegmentRecorder::new(
                controller,
                SegmentOptions {
                    chunk_seconds: config.video.chunk_seconds,
                    format: config.video.format.clone(),
                    clock: None,
                },
            )?;

            let result = tokio::task::spawn_blocking(move || recorder.record(&dest))
                .await
                .context("recording task panicked")?;
            match result {
                Ok(segment) => {
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(&segment)?);
                    } else {
                        println!("{:?}: {}", segment.phase, segment.file.display());
                    }
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    report_failure(e, cli.json)?;
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Doctor { .. } => Ok(ExitCode::SUCCESS),
    }
}

fn print_doctor(env: &Environment, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(env)?);
        return Ok(());
    }
    println!("backend:    {}", env.provider.as_str());
    println!("available:  {}", env.available);
    println!("permission: {}", env.permission.as_str());
    println!("message:    {}", env.message);
    if let Some(guidance) = &env.guidance {
        println!("guidance:   {guidance}");
    }
    Ok(())
}

fn report_failure(error: RecorderError, json: bool) -> anyhow::Result<()> {
    if json {
        let response = ErrorResponse::from(error);
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        eprintln!("{}: {}", error.status(), error);
    }
    Ok(())
}
