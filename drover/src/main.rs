//! Command-line entry point for the drover campaign sender
//!
//! Subcommands:
//! - `send`: run a campaign against the remote mail API
//! - `list`: list campaigns under the data root
//! - `preflight`: validate a campaign's local inputs without sending
//! - `stats`: join the sent log with ingested bounce/reply/open files

use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use drover_engine::{
    CampaignConfig, CampaignRunner, RunContext, transport::HttpApiTransport,
};

/// Campaign email sender with durable, crash-resumable delivery tracking
#[derive(Parser, Debug)]
#[command(name = "drover")]
#[command(about = "Send email campaigns with durable delivery tracking", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send a campaign
    Send {
        /// Campaign name under <data_root>/campaigns/
        #[arg(long)]
        campaign: String,
    },
    /// List campaigns
    List,
    /// Validate a campaign's recipients, template, and attachments locally
    Preflight {
        /// Campaign name under <data_root>/campaigns/
        #[arg(long)]
        campaign: String,
    },
    /// Build stats.csv from the sent log and any ingested tracking files
    Stats {
        /// Campaign name under <data_root>/campaigns/
        #[arg(long)]
        campaign: String,

        /// Print the joined rows to stdout as well
        #[arg(long)]
        print: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    drover_common::logging::init();

    let cli = Cli::parse();
    let ctx = RunContext::from_env();

    match cli.command {
        Commands::Send { campaign } => cmd_send(&ctx, &campaign).await,
        Commands::List => cmd_list(&ctx),
        Commands::Preflight { campaign } => cmd_preflight(&ctx, &campaign),
        Commands::Stats { campaign, print } => cmd_stats(&ctx, &campaign, print),
    }
}

async fn cmd_send(ctx: &RunContext, campaign: &str) -> anyhow::Result<()> {
    let config = CampaignConfig::load(&ctx.config_path(campaign))?;
    let token = read_token(ctx, &config)?;

    let transport = Arc::new(HttpApiTransport::new(&config.api.base_url, token));
    let runner = CampaignRunner::new(
        ctx.clone(),
        campaign,
        config,
        transport.clone(),
        Some(transport),
    );

    let summary = runner.run().await?;
    tracing::info!(
        sent = summary.sent,
        errors = summary.errors,
        skipped = summary.skipped,
        "Run finished"
    );
    Ok(())
}

/// Read the bearer token for the campaign's account identity. Token
/// acquisition/refresh is external tooling's job; a missing token aborts
/// before any send.
fn read_token(ctx: &RunContext, config: &CampaignConfig) -> anyhow::Result<String> {
    let path = ctx.creds_dir(&config.account_name).join("token");
    let token = std::fs::read_to_string(&path)
        .with_context(|| format!("reading API token from {}", path.display()))?;
    Ok(token.trim().to_string())
}

fn cmd_list(ctx: &RunContext) -> anyhow::Result<()> {
    let root = ctx.campaigns_dir();
    let Ok(entries) = std::fs::read_dir(&root) else {
        println!("No campaigns found.");
        return Ok(());
    };

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    for name in names {
        println!("{name}");
    }
    Ok(())
}

fn cmd_preflight(ctx: &RunContext, campaign: &str) -> anyhow::Result<()> {
    let config = CampaignConfig::load(&ctx.config_path(campaign))?;
    drover_engine::preflight(ctx, campaign, &config)?;
    Ok(())
}

fn cmd_stats(ctx: &RunContext, campaign: &str, print: bool) -> anyhow::Result<()> {
    let rows = drover_engine::build_stats(ctx, campaign)?;
    let path = drover_engine::write_stats(ctx, campaign, &rows)?;
    println!("Created {}", path.display());

    if print {
        println!("email,sent,bounced,replied,opened");
        for row in rows.iter().take(30) {
            println!(
                "{},{},{},{},{}",
                row.email, row.sent, row.bounced, row.replied, row.opened
            );
        }
    }
    Ok(())
}
