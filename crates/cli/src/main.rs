//! Churn prediction CLI
//!
//! A command-line tool for scoring clients against the churn prediction
//! service, checking its status and inspecting the training schema.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{predict, schema, status};

/// Churn prediction CLI
#[derive(Parser)]
#[command(name = "churn")]
#[command(author, version, about = "CLI for the churn prediction service", long_about = None)]
pub struct Cli {
    /// API endpoint URL (falls back to ~/.config/churn/config.json, then http://localhost:8000)
    #[arg(long, env = "CHURN_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict whether a client will churn
    Predict(predict::PredictArgs),

    /// Show service readiness and the loaded model
    Status,

    /// List the training columns expected by the model
    Schema,
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load()?;
    let api_url = config.resolve_api_url(cli.api_url);
    let client = client::ApiClient::new(&api_url)?;

    match cli.command {
        Commands::Predict(args) => predict::predict(&client, &config, args, cli.format).await,
        Commands::Status => status::show_status(&client, cli.format).await,
        Commands::Schema => schema::show_schema(&client, cli.format).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
