use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::types::{TicketRecord, NO_DESCRIPTION};
use super::{FetchError, Fetcher};
use crate::config::JiraConfig;

const REQUIRED_VARIABLES: &[&str] = &["JIRA_EMAIL", "JIRA_API_TOKEN", "JIRA_DOMAIN"];

/// Looks up a single Jira ticket through the REST search endpoint.
pub struct JiraFetcher {
    config: JiraConfig,
    client: reqwest::Client,
}

impl JiraFetcher {
    pub fn new(config: JiraConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<Issue>,
}

#[derive(Deserialize)]
struct Issue {
    key: String,
    fields: IssueFields,
}

#[derive(Deserialize)]
struct IssueFields {
    #[serde(default)]
    summary: String,
    // A plain string on API v2; anything else is treated as missing.
    #[serde(default)]
    description: Option<serde_json::Value>,
    #[serde(default)]
    status: Option<IssueStatus>,
}

#[derive(Deserialize)]
struct IssueStatus {
    name: String,
}

impl Issue {
    fn into_record(self) -> TicketRecord {
        let description = match self.fields.description {
            Some(serde_json::Value::String(text)) if !text.trim().is_empty() => text,
            _ => NO_DESCRIPTION.to_string(),
        };

        TicketRecord {
            key: self.key,
            summary: self.fields.summary,
            description,
            status: self
                .fields
                .status
                .map(|status| status.name)
                .unwrap_or_default(),
        }
    }
}

/// Build a JQL filter selecting exactly one issue by key.
pub fn build_jql(ticket_id: &str) -> String {
    let escaped = ticket_id.trim().replace('\\', "\\\\").replace('"', "\\\"");
    format!("key = \"{}\"", escaped)
}

#[async_trait]
impl Fetcher for JiraFetcher {
    type Query = String;
    type Record = TicketRecord;

    fn name(&self) -> &str {
        "Jira"
    }

    #[instrument(skip(self), fields(ticket = %ticket_id))]
    async fn fetch(&self, ticket_id: &String) -> Result<TicketRecord, FetchError> {
        let credentials = self
            .config
            .credentials()
            .ok_or(FetchError::ConfigurationMissing {
                service: "Jira",
                variables: REQUIRED_VARIABLES,
            })?;

        let url = format!("{}/rest/api/2/search", credentials.base_url);
        let jql = build_jql(ticket_id);

        debug!(%jql, "searching Jira");
        let response = self
            .client
            .get(&url)
            .basic_auth(&credentials.email, Some(&credentials.api_token))
            .header(ACCEPT, "application/json")
            .query(&[("jql", jql.as_str()), ("maxResults", "1")])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(FetchError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let search: SearchResponse = serde_json::from_str(&body)?;
        debug!(issues = search.issues.len(), "received Jira search result");

        search
            .issues
            .into_iter()
            .next()
            .map(Issue::into_record)
            .ok_or_else(|| FetchError::NotFound {
                what: format!("Jira ticket matching {}", ticket_id.trim()),
            })
    }
}
