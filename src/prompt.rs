use crate::context::DevelopmentContext;
use crate::source::types::{PullRequestRecord, TicketRecord, NO_DESCRIPTION};

/// Opening instruction addressed to the reviewer persona.
pub const PREAMBLE: &str = "You are a senior software engineer reviewing work in progress. \
Below is the development context for a single change: a Jira ticket, a GitHub pull request, or both.";

/// Closing instruction asking for the two labeled output sections.
pub const CLOSING: &str = "Based on this information, respond with exactly two labeled sections:\n\
Context: one paragraph summarizing what the ticket asks for and what the pull request changes.\n\
Opinion: a direct verdict on whether the pull request addresses the ticket, naming any gaps or risks.";

/// Rendered in the patch block for files GitHub returned no diff for.
pub const NO_PATCH: &str = "No patch available";

const SECTION_SEPARATOR: &str = "\n\n";

/// Render the full prompt for a context.
///
/// Pure: equal contexts always produce byte-identical prompts. Sections are
/// emitted in the order preamble, Jira, pull request, closing; an absent
/// source contributes nothing, not even a separator. Callers must not pass
/// an empty context (see `DevelopmentContext::is_empty`); if they do, only
/// the preamble and closing instruction are returned.
pub fn build_prompt(context: &DevelopmentContext) -> String {
    let mut sections = vec![PREAMBLE.to_string()];

    if let Some(ticket) = &context.ticket {
        sections.push(render_ticket(ticket));
    }
    if let Some(pull_request) = &context.pull_request {
        sections.push(render_pull_request(pull_request));
    }

    sections.push(CLOSING.to_string());

    let mut prompt = sections.join(SECTION_SEPARATOR);
    prompt.push('\n');
    prompt
}

fn render_ticket(ticket: &TicketRecord) -> String {
    format!(
        "Jira Ticket:\nKey: {}\nSummary: {}\nDescription: {}\nStatus: {}",
        ticket.key, ticket.summary, ticket.description, ticket.status
    )
}

fn render_pull_request(pr: &PullRequestRecord) -> String {
    let body = if pr.body.trim().is_empty() {
        NO_DESCRIPTION
    } else {
        pr.body.as_str()
    };

    let mut out = format!(
        "Pull Request:\nNumber: #{}\nTitle: {}\nState: {}\nAuthor: {}\nBody: {}",
        pr.number, pr.title, pr.state, pr.author, body
    );

    out.push_str(SECTION_SEPARATOR);
    out.push_str("Files Changed:\n");
    if pr.files.is_empty() {
        out.push_str("No files changed");
        return out;
    }

    let summary: Vec<String> = pr
        .files
        .iter()
        .map(|file| {
            format!(
                "{} ({}): +{} -{}",
                file.path, file.status, file.additions, file.deletions
            )
        })
        .collect();
    out.push_str(&summary.join("\n"));

    let patches: Vec<String> = pr
        .files
        .iter()
        .map(|file| {
            let patch = file.patch.as_deref().unwrap_or(NO_PATCH);
            format!("=== {} ===\n{}", file.path, patch)
        })
        .collect();
    out.push_str(SECTION_SEPARATOR);
    out.push_str("Patches:\n");
    out.push_str(&patches.join(SECTION_SEPARATOR));

    out
}
