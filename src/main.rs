//! k8s-cd-deployer - continuous-deployment trigger for Kubernetes
//!
#![doc = "Main entry point for the k8s-cd-deployer binary."]

use anyhow::Result;

use k8s_cd_deployer::cli::{Cli, Commands};
use k8s_cd_deployer::commands;
use k8s_cd_deployer::config::{Config, LoadNotice};
use k8s_cd_deployer::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let (mut config, notices) = Config::load_with_notices(config_path)?;

    if cli.verbose {
        config.logging.level = "k8s_cd_deployer=debug".to_string();
    }

    init_logging(&config.logging)?;
    notices.iter().for_each(LoadNotice::log);

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Run { dry_run, no_server } => {
            tracing::info!("Starting deployer");
            commands::run::run_deployer(config, dry_run, no_server).await?;
            Ok(())
        }
        Commands::Restart { tag, dry_run } => {
            tracing::info!(tag = %tag, "Starting one-off restart");
            commands::restart::run_restart(&config, &tag, dry_run).await?;
            Ok(())
        }
        Commands::Check {
            tag,
            namespace,
            image,
        } => {
            commands::check::run_check(&config, &tag, namespace.as_deref(), image.as_deref())?;
            Ok(())
        }
    }
}
