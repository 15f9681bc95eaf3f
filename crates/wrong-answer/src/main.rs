use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use wrong_answer::{ServerConfig, ServerError, WrongAnswerServer, default_config_path, load_questions};

/// Find-the-impostor trivia game server.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file; written with defaults if it does not exist
    /// [default: <user config dir>/wrong-answer-server/config.yaml]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overriding the config file
    #[arg(short, long)]
    bind: Option<String>,

    /// Question file, overriding the config file
    #[arg(short, long)]
    questions: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), ServerError> {
    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let mut config = ServerConfig::load_or_create(&config_path)?;
    if args.bind.is_some() {
        config.bind = args.bind;
    }
    if args.questions.is_some() {
        config.questions = args.questions;
    }

    let server = WrongAnswerServer::builder()
        .bind(&config.bind_addr())
        .lobby_config(config.lobby_config())
        .questions(load_questions(&config.questions_path(&config_path))?)
        .build()
        .await?;

    if let Ok(addr) = server.local_addr() {
        tracing::info!(%addr, "listening");
    }
    server.run().await
}
