//! Command-line interface definition for k8s-cd-deployer
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for running the deployer, triggering a one-off
//! restart, and checking the restart policy offline.

use clap::{Parser, Subcommand};

/// k8s-cd-deployer - restart Kubernetes workloads when their image tag is pushed
#[derive(Parser, Debug, Clone)]
#[command(name = "k8s-cd-deployer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for k8s-cd-deployer
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Consume image update events and serve the HTTP facade
    Run {
        /// Report matching workloads without restarting them
        #[arg(long)]
        dry_run: bool,

        /// Do not start the HTTP facade
        #[arg(long)]
        no_server: bool,
    },

    /// Restart every eligible workload running TAG, then exit
    Restart {
        /// Full image reference, e.g. gcr.io/project/app:INT
        tag: String,

        /// Report matching workloads without restarting them
        #[arg(long)]
        dry_run: bool,
    },

    /// Evaluate the restart policy for a tag without contacting the cluster
    Check {
        /// Full image reference to evaluate
        tag: String,

        /// Namespace to test for eligibility
        #[arg(short, long)]
        namespace: Option<String>,

        /// Image a hypothetical workload runs (defaults to TAG)
        #[arg(short, long)]
        image: Option<String>,
    },
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
