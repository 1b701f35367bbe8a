use tracing::{info, instrument, warn};

use crate::context::{
    assemble, Assembly, DevelopmentContext, InputError, ReviewRequest, SourceFailure,
};
use crate::model::{CompletionBackend, ModelError};
use crate::prompt::build_prompt;
use crate::source::{Fetcher, PullRequestQuery, PullRequestRecord, TicketRecord};

/// How a single turn ended.
#[derive(Debug)]
pub enum Outcome {
    /// Nothing was gathered, so nothing was rendered or sent.
    NoContext,
    Completed {
        context: DevelopmentContext,
        prompt: String,
        completion: String,
    },
    ModelFailed {
        context: DevelopmentContext,
        prompt: String,
        error: ModelError,
    },
}

/// Result of one turn: skipped input, per-source failures, then the outcome.
#[derive(Debug)]
pub struct PromptResult {
    pub skipped: Vec<InputError>,
    pub failures: Vec<SourceFailure>,
    pub outcome: Outcome,
}

/// fetch → assemble → render → invoke, with the sources and the backend
/// supplied by the caller.
pub struct Pipeline<T, P, M> {
    tickets: T,
    pulls: P,
    backend: M,
}

impl<T, P, M> Pipeline<T, P, M>
where
    T: Fetcher<Query = String, Record = TicketRecord>,
    P: Fetcher<Query = PullRequestQuery, Record = PullRequestRecord>,
    M: CompletionBackend,
{
    pub fn new(tickets: T, pulls: P, backend: M) -> Self {
        Self {
            tickets,
            pulls,
            backend,
        }
    }

    /// Run one turn. Never fails: every error ends up in the returned result.
    #[instrument(skip_all, fields(ticket = ?request.ticket_id, pr = ?request.pull_request.as_ref().map(|q| q.number)))]
    pub async fn run(&self, request: &ReviewRequest) -> PromptResult {
        let Assembly { context, failures } =
            assemble(&self.tickets, &self.pulls, request).await;

        if context.is_empty() {
            info!("no context gathered, skipping model");
            return PromptResult {
                skipped: request.skipped.clone(),
                failures,
                outcome: Outcome::NoContext,
            };
        }

        let prompt = build_prompt(&context);
        info!(backend = self.backend.name(), prompt_bytes = prompt.len(), "requesting completion");

        let outcome = match self.backend.complete(&prompt).await {
            Ok(completion) => Outcome::Completed {
                context,
                prompt,
                completion,
            },
            Err(error) => {
                warn!(%error, "completion failed");
                Outcome::ModelFailed {
                    context,
                    prompt,
                    error,
                }
            }
        };

        PromptResult {
            skipped: request.skipped.clone(),
            failures,
            outcome,
        }
    }
}
