use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::types::{FileChange, PullRequestQuery, PullRequestRecord};
use super::{FetchError, Fetcher};
use crate::config::GitHubConfig;

const TOKEN_VARIABLES: &[&str] = &["GITHUB_TOKEN"];
const OWNER_VARIABLES: &[&str] = &["GITHUB_OWNER"];

/// GitHub's maximum page size for the PR files endpoint.
const FILES_PER_PAGE: usize = 100;
/// The files endpoint stops listing after 3000 entries.
const MAX_FILE_PAGES: usize = 30;

/// Fetches pull request metadata and its file list from the GitHub REST API.
pub struct GitHubFetcher {
    config: GitHubConfig,
    client: reqwest::Client,
}

impl GitHubFetcher {
    pub fn new(config: GitHubConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Split `owner/repo`, or pair a bare name with the configured owner.
    fn resolve_repo<'a>(&'a self, repo: &'a str) -> Result<(&'a str, &'a str), FetchError> {
        let repo = repo.trim();
        if let Some((owner, name)) = repo.split_once('/') {
            if !owner.is_empty() && !name.is_empty() {
                return Ok((owner, name));
            }
        }

        let owner = self.config.owner().ok_or(FetchError::ConfigurationMissing {
            service: "GitHub",
            variables: OWNER_VARIABLES,
        })?;
        Ok((owner, repo))
    }

    async fn get(
        &self,
        url: &str,
        token: &str,
        query: &[(&str, &str)],
    ) -> Result<(StatusCode, String), FetchError> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, "ticket-review")
            .header(ACCEPT, "application/vnd.github+json")
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }

    /// Walk the file list page by page until a short page comes back.
    /// The first non-success page ends the walk and is returned as-is.
    async fn get_files(&self, url: &str, token: &str) -> Result<FileListing, FetchError> {
        let per_page = FILES_PER_PAGE.to_string();
        let mut files = Vec::new();

        for page in 1..=MAX_FILE_PAGES {
            let page_number = page.to_string();
            let query = [("per_page", per_page.as_str()), ("page", page_number.as_str())];
            let (status, body) = self.get(url, token, &query).await?;
            if !status.is_success() {
                return Ok(FileListing::Failed { status, body });
            }

            let batch: Vec<FileResponse> = serde_json::from_str(&body)?;
            let received = batch.len();
            debug!(page, received, "received PR file page");
            files.extend(batch);
            if received < FILES_PER_PAGE {
                break;
            }
        }

        Ok(FileListing::Complete(files))
    }
}

enum FileListing {
    Complete(Vec<FileResponse>),
    Failed { status: StatusCode, body: String },
}

#[derive(Deserialize)]
struct User {
    login: String,
}

#[derive(Deserialize)]
struct PullResponse {
    number: u64,
    title: String,
    state: String,
    #[serde(default)]
    body: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    user: User,
}

#[derive(Deserialize)]
struct FileResponse {
    filename: String,
    status: String,
    additions: u64,
    deletions: u64,
    #[serde(default)]
    patch: Option<String>,
}

impl FileResponse {
    fn into_change(self) -> FileChange {
        FileChange {
            path: self.filename,
            status: self.status.into(),
            additions: self.additions,
            deletions: self.deletions,
            patch: self.patch,
        }
    }
}

#[async_trait]
impl Fetcher for GitHubFetcher {
    type Query = PullRequestQuery;
    type Record = PullRequestRecord;

    fn name(&self) -> &str {
        "GitHub"
    }

    /// Metadata and the paged file list are requested concurrently; both must succeed.
    #[instrument(skip(self), fields(repo = %query.repo, pr = query.number))]
    async fn fetch(&self, query: &PullRequestQuery) -> Result<PullRequestRecord, FetchError> {
        let token = self.config.token().ok_or(FetchError::ConfigurationMissing {
            service: "GitHub",
            variables: TOKEN_VARIABLES,
        })?;
        let (owner, repo) = self.resolve_repo(&query.repo)?;

        let pull_url = format!(
            "{}/repos/{}/{}/pulls/{}",
            self.config.api_base.trim_end_matches('/'),
            owner,
            repo,
            query.number
        );
        let files_url = format!("{}/files", pull_url);

        debug!("fetching PR metadata and file list from GitHub API");
        let (metadata, listing) = tokio::join!(
            self.get(&pull_url, token, &[]),
            self.get_files(&files_url, token),
        );
        let (metadata_status, metadata_body) = metadata?;

        let files = match listing? {
            FileListing::Complete(files) if metadata_status.is_success() => files,
            listing => {
                let (files_status, files_body) = match listing {
                    FileListing::Complete(_) => (StatusCode::OK, String::new()),
                    FileListing::Failed { status, body } => (status, body),
                };
                let (status, body) = if metadata_status.is_success() {
                    (files_status, files_body)
                } else {
                    (metadata_status, metadata_body)
                };
                return Err(FetchError::Upstream {
                    status: status.as_u16(),
                    body: format!(
                        "metadata returned {}, files returned {}: {}",
                        metadata_status.as_u16(),
                        files_status.as_u16(),
                        body
                    ),
                });
            }
        };

        let pull: PullResponse = serde_json::from_str(&metadata_body)?;
        debug!(title = %pull.title, files = files.len(), "received PR metadata");

        Ok(PullRequestRecord {
            number: pull.number,
            title: pull.title,
            state: pull.state.into(),
            body: pull.body.unwrap_or_default(),
            created_at: pull.created_at,
            updated_at: pull.updated_at,
            author: pull.user.login,
            files: files.into_iter().map(FileResponse::into_change).collect(),
        })
    }
}
