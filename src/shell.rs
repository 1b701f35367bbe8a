use colored::Colorize;
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::{debug, info};

use crate::context::ReviewRequest;
use crate::model::CompletionBackend;
use crate::pipeline::Pipeline;
use crate::report::{self, ReportError};
use crate::source::{Fetcher, PullRequestQuery, PullRequestRecord, TicketRecord};

/// Raw answers to the three per-turn questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnInput {
    pub repo: String,
    pub ticket: String,
    pub pr_number: String,
}

/// Ask the user for a repository, ticket and PR number until they type
/// `exit`/`quit` or close stdin. Unusable input and errors from a turn are
/// printed and the loop carries on.
pub async fn interactive<T, P, M>(pipeline: &Pipeline<T, P, M>) -> std::io::Result<()>
where
    T: Fetcher<Query = String, Record = TicketRecord>,
    P: Fetcher<Query = PullRequestQuery, Record = PullRequestRecord>,
    M: CompletionBackend,
{
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Type {} or {} at any prompt to leave.", "exit".bold(), "quit".bold());

    while let Some(input) = read_turn(&mut lines).await? {
        debug!(?input, "read turn");
        let request = ReviewRequest::from_input(&input.repo, &input.ticket, &input.pr_number);
        if request.is_empty() {
            report::print_skipped(&request.skipped);
            println!("{}", report::NO_DATA.yellow());
            continue;
        }

        let result = pipeline.run(&request).await;
        report::print_turn(&result);
        println!();
    }

    info!("interactive session finished");
    Ok(())
}

/// Run a single turn from command-line arguments, optionally saving a transcript.
pub async fn run_once<T, P, M>(
    pipeline: &Pipeline<T, P, M>,
    request: &ReviewRequest,
    output: Option<&Path>,
) -> Result<(), ReportError>
where
    T: Fetcher<Query = String, Record = TicketRecord>,
    P: Fetcher<Query = PullRequestQuery, Record = PullRequestRecord>,
    M: CompletionBackend,
{
    let result = pipeline.run(request).await;
    report::print_turn(&result);
    if let Some(path) = output {
        report::write_markdown(&result, path)?;
    }
    Ok(())
}

/// Read one turn's answers. `None` means the user wants to stop.
pub async fn read_turn<R>(lines: &mut Lines<R>) -> std::io::Result<Option<TurnInput>>
where
    R: AsyncBufRead + Unpin,
{
    let Some(repo) = ask(lines, "Repository name (blank to skip the PR): ").await? else {
        return Ok(None);
    };
    let Some(ticket) = ask(lines, "Jira ticket (blank to skip): ").await? else {
        return Ok(None);
    };
    let Some(pr_number) = ask(lines, "PR number (blank to skip): ").await? else {
        return Ok(None);
    };

    Ok(Some(TurnInput {
        repo,
        ticket,
        pr_number,
    }))
}

async fn ask<R>(lines: &mut Lines<R>, question: &str) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    print!("{}", question);
    std::io::stdout().flush()?;

    match lines.next_line().await? {
        Some(line) if is_exit(&line) => Ok(None),
        Some(line) => Ok(Some(line)),
        None => Ok(None),
    }
}

fn is_exit(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "exit" | "quit")
}
