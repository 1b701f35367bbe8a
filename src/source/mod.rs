pub mod github;
pub mod jira;
pub mod types;

pub use github::GitHubFetcher;
pub use jira::JiraFetcher;
pub use types::{PullRequestQuery, PullRequestRecord, TicketRecord};

use async_trait::async_trait;
use thiserror::Error;

/// Failure of a single source fetch. None of these are fatal: the caller
/// logs them and treats the source as absent for the current turn.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{service} is not configured: set {}", .variables.join(", "))]
    ConfigurationMissing {
        service: &'static str,
        variables: &'static [&'static str],
    },

    #[error("No {what} found")]
    NotFound { what: String },

    #[error("API returned status code {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Request failed: {0}")]
    Transport(String),
}

impl FetchError {
    /// Console hint for errors the user can fix locally.
    pub fn guidance(&self) -> Option<String> {
        match self {
            FetchError::ConfigurationMissing { variables, .. } => Some(format!(
                "Please set {} environment variables",
                variables.join(", ")
            )),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Transport(format!("malformed JSON: {}", err))
    }
}

/// Common contract for every context source.
/// Fetchers must be Send + Sync so the assembler can join them concurrently.
#[async_trait]
pub trait Fetcher: Send + Sync {
    type Query: Send + Sync;
    type Record: Send;

    /// Human-readable name of this source (e.g., "Jira")
    fn name(&self) -> &str;

    /// Fetch one record. Must not print to stdout; failures are returned.
    async fn fetch(&self, query: &Self::Query) -> Result<Self::Record, FetchError>;
}
