use thiserror::Error;
use tracing::{debug, warn};

use crate::source::{FetchError, Fetcher, PullRequestQuery, PullRequestRecord, TicketRecord};

/// Everything gathered for one turn. Either field may be absent; a context
/// with neither is never rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DevelopmentContext {
    pub ticket: Option<TicketRecord>,
    pub pull_request: Option<PullRequestRecord>,
}

impl DevelopmentContext {
    pub fn is_empty(&self) -> bool {
        self.ticket.is_none() && self.pull_request.is_none()
    }
}

/// A part of the input that could not be used. The source it names is
/// skipped for the turn; the rest of the request still runs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("Invalid PR number: {0:?}")]
    InvalidPrNumber(String),

    #[error("A repository name is required to look up PR #{0}")]
    MissingRepository(u64),
}

impl InputError {
    pub fn guidance(&self) -> &'static str {
        match self {
            InputError::InvalidPrNumber(_) => "Enter the PR number as digits, e.g. 42 or #42",
            InputError::MissingRepository(_) => "Enter a repository name (repo or owner/repo) with the PR number",
        }
    }
}

/// What the user asked for in one turn, already trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewRequest {
    pub ticket_id: Option<String>,
    pub pull_request: Option<PullRequestQuery>,
    /// Input that was dropped; reported alongside the turn's results.
    pub skipped: Vec<InputError>,
}

impl ReviewRequest {
    /// Build a request from raw console input. Blank fields skip their source,
    /// and so does a PR number that cannot be used.
    pub fn from_input(repo: &str, ticket: &str, pr_number: &str) -> Self {
        let ticket_id = non_empty(ticket).map(str::to_string);
        let mut skipped = Vec::new();

        let pull_request = match non_empty(pr_number).map(|raw| parse_pull_request(repo, raw)) {
            None => None,
            Some(Ok(query)) => Some(query),
            Some(Err(err)) => {
                warn!(%err, "skipping pull request source");
                skipped.push(err);
                None
            }
        };

        Self {
            ticket_id,
            pull_request,
            skipped,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ticket_id.is_none() && self.pull_request.is_none()
    }
}

/// A source that was requested but could not be fetched.
#[derive(Debug)]
pub struct SourceFailure {
    pub source: String,
    pub error: FetchError,
}

#[derive(Debug)]
pub struct Assembly {
    pub context: DevelopmentContext,
    pub failures: Vec<SourceFailure>,
}

/// Fetch every requested source concurrently and collect the results.
/// A failed source becomes an absent field; it never aborts the others.
pub async fn assemble<T, P>(tickets: &T, pulls: &P, request: &ReviewRequest) -> Assembly
where
    T: Fetcher<Query = String, Record = TicketRecord>,
    P: Fetcher<Query = PullRequestQuery, Record = PullRequestRecord>,
{
    let (ticket, pull_request) = tokio::join!(
        fetch_requested(tickets, request.ticket_id.as_ref()),
        fetch_requested(pulls, request.pull_request.as_ref()),
    );

    let mut failures = Vec::new();
    let context = DevelopmentContext {
        ticket: settle(tickets.name(), ticket, &mut failures),
        pull_request: settle(pulls.name(), pull_request, &mut failures),
    };
    debug!(
        ticket = context.ticket.is_some(),
        pull_request = context.pull_request.is_some(),
        failures = failures.len(),
        "assembled context"
    );

    Assembly { context, failures }
}

async fn fetch_requested<F: Fetcher>(
    fetcher: &F,
    query: Option<&F::Query>,
) -> Result<Option<F::Record>, FetchError> {
    match query {
        Some(query) => fetcher.fetch(query).await.map(Some),
        None => Ok(None),
    }
}

fn settle<R>(
    source: &str,
    outcome: Result<Option<R>, FetchError>,
    failures: &mut Vec<SourceFailure>,
) -> Option<R> {
    match outcome {
        Ok(record) => record,
        Err(error) => {
            warn!(source, %error, "source unavailable, continuing without it");
            failures.push(SourceFailure {
                source: source.to_string(),
                error,
            });
            None
        }
    }
}

fn parse_pull_request(repo: &str, raw: &str) -> Result<PullRequestQuery, InputError> {
    let number = raw
        .trim_start_matches('#')
        .parse::<u64>()
        .map_err(|_| InputError::InvalidPrNumber(raw.to_string()))?;
    let repo = non_empty(repo).ok_or(InputError::MissingRepository(number))?;
    Ok(PullRequestQuery {
        repo: repo.to_string(),
        number,
    })
}

fn non_empty(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::source::types::{FileChange, FileStatus, PrState};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::marker::PhantomData;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory fetcher that counts calls and replays a canned outcome.
    pub struct StubFetcher<Q, R> {
        name: &'static str,
        outcome: Box<dyn Fn() -> Result<R, FetchError> + Send + Sync>,
        calls: AtomicUsize,
        _query: PhantomData<fn(&Q)>,
    }

    impl<Q, R> StubFetcher<Q, R> {
        pub fn new<F>(name: &'static str, outcome: F) -> Self
        where
            F: Fn() -> Result<R, FetchError> + Send + Sync + 'static,
        {
            Self {
                name,
                outcome: Box::new(outcome),
                calls: AtomicUsize::new(0),
                _query: PhantomData,
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl<Q, R> Fetcher for StubFetcher<Q, R>
    where
        Q: Send + Sync + 'static,
        R: Send + 'static,
    {
        type Query = Q;
        type Record = R;

        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(&self, _query: &Q) -> Result<R, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }
    }

    pub type StubTickets = StubFetcher<String, TicketRecord>;
    pub type StubPulls = StubFetcher<PullRequestQuery, PullRequestRecord>;

    pub fn sample_ticket() -> TicketRecord {
        TicketRecord {
            key: "PROJ-1".to_string(),
            summary: "Fix bug".to_string(),
            description: "No description provided".to_string(),
            status: "Open".to_string(),
        }
    }

    pub fn sample_pull_request() -> PullRequestRecord {
        PullRequestRecord {
            number: 42,
            title: "Add feature".to_string(),
            state: PrState::Open,
            body: "Implements the feature.".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 3, 2, 17, 45, 10).unwrap(),
            author: "alice".to_string(),
            files: vec![FileChange {
                path: "a.go".to_string(),
                status: FileStatus::Modified,
                additions: 3,
                deletions: 1,
                patch: Some("@@ -1,2 +1,4 @@\n-old\n+new".to_string()),
            }],
        }
    }

    fn not_found() -> FetchError {
        FetchError::NotFound {
            what: "Jira ticket matching PROJ-9".to_string(),
        }
    }

    #[test]
    fn test_request_from_blank_input_is_empty() {
        let request = ReviewRequest::from_input("  ", "", " \t");
        assert!(request.is_empty());
    }

    #[test]
    fn test_request_trims_fields() {
        let request = ReviewRequest::from_input(" demo ", " PROJ-1 ", " #42 ");
        assert_eq!(request.ticket_id.as_deref(), Some("PROJ-1"));
        assert_eq!(
            request.pull_request,
            Some(PullRequestQuery {
                repo: "demo".to_string(),
                number: 42
            })
        );
    }

    #[test]
    fn test_bad_pr_number_keeps_ticket() {
        let request = ReviewRequest::from_input("demo", "PROJ-1", "forty-two");
        assert_eq!(request.ticket_id.as_deref(), Some("PROJ-1"));
        assert_eq!(request.pull_request, None);
        assert_eq!(
            request.skipped,
            vec![InputError::InvalidPrNumber("forty-two".to_string())]
        );
    }

    #[test]
    fn test_pr_without_repo_keeps_ticket() {
        let request = ReviewRequest::from_input("", "PROJ-1", "42");
        assert_eq!(request.ticket_id.as_deref(), Some("PROJ-1"));
        assert_eq!(request.pull_request, None);
        assert_eq!(request.skipped, vec![InputError::MissingRepository(42)]);
        assert!(!request.is_empty());
    }

    #[test]
    fn test_pr_without_repo_alone_is_empty() {
        let request = ReviewRequest::from_input(" ", "", "#7");
        assert!(request.is_empty());
        assert_eq!(request.skipped, vec![InputError::MissingRepository(7)]);
    }

    #[tokio::test]
    async fn test_pr_without_repo_still_fetches_ticket() {
        let tickets = StubTickets::new("Jira", || Ok(sample_ticket()));
        let pulls = StubPulls::new("GitHub", || Ok(sample_pull_request()));
        let request = ReviewRequest::from_input("", "PROJ-1", "42");

        let assembly = assemble(&tickets, &pulls, &request).await;

        assert_eq!(assembly.context.ticket, Some(sample_ticket()));
        assert!(assembly.context.pull_request.is_none());
        assert!(assembly.failures.is_empty());
        assert_eq!(tickets.calls(), 1);
        assert_eq!(pulls.calls(), 0);
    }

    #[tokio::test]
    async fn test_assemble_empty_request_fetches_nothing() {
        let tickets = StubTickets::new("Jira", || Ok(sample_ticket()));
        let pulls = StubPulls::new("GitHub", || Ok(sample_pull_request()));

        let assembly = assemble(&tickets, &pulls, &ReviewRequest::default()).await;

        assert!(assembly.context.is_empty());
        assert!(assembly.failures.is_empty());
        assert_eq!(tickets.calls(), 0);
        assert_eq!(pulls.calls(), 0);
    }

    #[tokio::test]
    async fn test_assemble_both_sources() {
        let tickets = StubTickets::new("Jira", || Ok(sample_ticket()));
        let pulls = StubPulls::new("GitHub", || Ok(sample_pull_request()));
        let request = ReviewRequest::from_input("demo", "PROJ-1", "42");

        let assembly = assemble(&tickets, &pulls, &request).await;

        assert_eq!(assembly.context.ticket, Some(sample_ticket()));
        assert_eq!(assembly.context.pull_request, Some(sample_pull_request()));
        assert_eq!(tickets.calls(), 1);
        assert_eq!(pulls.calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_source_does_not_abort_the_other() {
        let tickets = StubTickets::new("Jira", || Err(not_found()));
        let pulls = StubPulls::new("GitHub", || Ok(sample_pull_request()));
        let request = ReviewRequest::from_input("demo", "PROJ-9", "42");

        let assembly = assemble(&tickets, &pulls, &request).await;

        assert!(assembly.context.ticket.is_none());
        assert!(assembly.context.pull_request.is_some());
        assert_eq!(assembly.failures.len(), 1);
        assert_eq!(assembly.failures[0].source, "Jira");
        assert!(matches!(
            assembly.failures[0].error,
            FetchError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_ticket_only_request_skips_pull_fetcher() {
        let tickets = StubTickets::new("Jira", || Ok(sample_ticket()));
        let pulls = StubPulls::new("GitHub", || Ok(sample_pull_request()));
        let request = ReviewRequest::from_input("", "PROJ-1", "");

        let assembly = assemble(&tickets, &pulls, &request).await;

        assert!(assembly.context.ticket.is_some());
        assert!(assembly.context.pull_request.is_none());
        assert_eq!(pulls.calls(), 0);
    }
}
