use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod ui;

use cli::{Cli, Commands};
use commands::{analyze, checksum, show, update, RunContext};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with LOGGING env var support
    // LOGGING=debug,info,warn,error or just LOGGING=debug
    let log_level = std::env::var("LOGGING")
        .or_else(|_| std::env::var("LOG_LEVEL"))
        .unwrap_or_else(|_| {
            if cli.verbose {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        });

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let ctx = RunContext {
        config: cli.config,
        timeout: cli.timeout,
    };

    match cli.command {
        Commands::Analyze {
            target,
            microservice,
            models,
            json,
            allow_dangerous,
        } => {
            analyze::execute(&ctx, target, microservice, models, json, allow_dangerous).await?;
        }
        Commands::Update {
            target,
            microservice,
            models,
            fixes,
            auto_fix,
            write_models,
        } => {
            update::execute(&ctx, target, microservice, models, fixes, auto_fix, write_models)
                .await?;
        }
        Commands::Show { target, json } => {
            show::execute(&ctx, target, json).await?;
        }
        Commands::Checksum { models } => {
            checksum::execute(models).await?;
        }
    }

    Ok(())
}
