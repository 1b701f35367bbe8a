mod config;
mod context;
mod model;
mod pipeline;
mod prompt;
mod report;
mod shell;
mod source;

use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info, info_span, warn};
use tracing_subscriber::EnvFilter;

/// Ticket Review: fetches a Jira ticket and/or a GitHub Pull Request and
/// asks a locally served model whether the change addresses the ticket.
///
/// Without --ticket or --pr it runs interactively, asking for a repository,
/// a ticket and a PR number each turn.
#[derive(Parser, Debug)]
#[command(name = "ticket-review", version, about)]
struct Cli {
    /// Repository name (`repo`, or `owner/repo` to override GITHUB_OWNER)
    #[arg(short, long)]
    repo: Option<String>,

    /// Jira ticket key (e.g., PROJ-1)
    #[arg(short, long)]
    ticket: Option<String>,

    /// Pull request number
    #[arg(short, long)]
    pr: Option<String>,

    /// Write a markdown transcript of the turn (with --ticket or --pr only)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Config file (defaults to .ticket-review.toml in the current directory)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn is_one_shot(&self) -> bool {
        self.ticket.is_some() || self.pr.is_some()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let config = config::Config::load(cli.config.as_deref())?;
    debug!(
        model = config.model.name(),
        host = config.model.host(),
        max_retries = config.model.max_retries(),
        "model settings"
    );

    let pipeline = pipeline::Pipeline::new(
        source::JiraFetcher::new(config.jira.clone()),
        source::GitHubFetcher::new(config.github.clone()),
        model::OllamaBackend::new(&config.model)?,
    );

    if cli.is_one_shot() {
        let _span = info_span!("one_shot").entered();
        let request = context::ReviewRequest::from_input(
            cli.repo.as_deref().unwrap_or_default(),
            cli.ticket.as_deref().unwrap_or_default(),
            cli.pr.as_deref().unwrap_or_default(),
        );
        shell::run_once(&pipeline, &request, cli.output.as_deref()).await?;
    } else {
        if cli.output.is_some() {
            warn!("--output is ignored in interactive mode");
        }
        shell::interactive(&pipeline).await?;
    }

    Ok(())
}
