use anyhow::Context;
use clap::Parser;
use tracing::info;
use vedarag::cli::handle_ask;
use vedarag::cli::handle_chain;
use vedarag::cli::handle_check;
use vedarag::cli::handle_interactive;
use vedarag::cli::handle_stats;
use vedarag::cli::Cli;
use vedarag::cli::Commands;
use vedarag::cli::ProfileArg;
use vedarag::config::AppConfig;
use vedarag::models::AnswerRequest;
use vedarag::models::HardwareProfile;
use vedarag::rag::RagService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => AppConfig::load().context("failed to load configuration")?,
    };

    // Initialize logging
    let level_override = cli.verbose.then_some("debug");
    let log_guard = vedarag::logging::init_logging_with_config(&config.logging, level_override)
        .context("failed to initialize logging")?;
    info!("Configuration loaded successfully");

    let profile_or_default = |arg: Option<ProfileArg>| -> HardwareProfile {
        arg.map_or_else(|| config.hardware_profile(), HardwareProfile::from)
    };

    let service = RagService::new(&config).context("failed to initialize RAG service")?;

    // Execute the requested command
    match cli.command {
        Commands::Ask {
            question,
            sources,
            profile,
            show_context,
        } => {
            let request =
                AnswerRequest::new(question, profile_or_default(profile)).with_sources(sources);
            handle_ask(&service, request, show_context).await?;
        }
        Commands::Interactive { profile } => {
            handle_interactive(&service, profile_or_default(profile)).await?;
            // stdin's reader thread blocks runtime shutdown until the next line
            drop(log_guard);
            std::process::exit(0);
        }
        Commands::Check { profile } => {
            handle_check(&service, profile_or_default(profile)).await?;
        }
        Commands::Stats => {
            handle_stats(&service).await?;
        }
        Commands::Chain { profile } => {
            handle_chain(&service, profile_or_default(profile));
        }
    }

    Ok(())
}
