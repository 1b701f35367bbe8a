pub mod timestamp;

use crate::context::{DevelopmentContext, InputError, SourceFailure};
use crate::pipeline::{Outcome, PromptResult};
use crate::source::{PullRequestRecord, TicketRecord};
use colored::Colorize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

/// Printed between console sections.
pub const DIVIDER: &str = "-------------------";

/// Printed when a turn gathered nothing to review.
pub const NO_DATA: &str = "No data provided";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Print one turn to the terminal: skipped input and source failures first,
/// then the fetched records and the model's answer, separated by [`DIVIDER`].
pub fn print_turn(result: &PromptResult) {
    print_skipped(&result.skipped);
    for failure in &result.failures {
        print_failure(failure);
    }

    match &result.outcome {
        Outcome::NoContext => {
            println!("{}", NO_DATA.yellow());
        }
        Outcome::Completed {
            context,
            completion,
            ..
        } => {
            print_context(context);
            println!("{}", "Context & Opinion".bold());
            println!("{}", completion.trim_end());
            println!("{}", DIVIDER);
        }
        Outcome::ModelFailed { context, error, .. } => {
            print_context(context);
            println!("{} {}", "Model unavailable:".red().bold(), error);
            println!("{}", DIVIDER);
        }
    }
}

/// Print input that was dropped from the turn, with a hint for each.
pub fn print_skipped(skipped: &[InputError]) {
    for err in skipped {
        println!("{} {}", "PR skipped:".yellow().bold(), err);
        println!("  {}", err.guidance());
    }
}

fn print_failure(failure: &SourceFailure) {
    println!(
        "{} {}",
        format!("{} unavailable:", failure.source).red().bold(),
        failure.error
    );
    if let Some(hint) = failure.error.guidance() {
        println!("  {}", hint);
    }
}

fn print_context(context: &DevelopmentContext) {
    if let Some(ticket) = &context.ticket {
        print_ticket(ticket);
        println!("{}", DIVIDER);
    }
    if let Some(pr) = &context.pull_request {
        print_pull_request(pr);
        println!("{}", DIVIDER);
    }
}

fn print_ticket(ticket: &TicketRecord) {
    println!("{}", "Jira Ticket".bold());
    println!("Issue Key: {}", ticket.key);
    println!("Summary: {}", ticket.summary);
    println!("Description: {}", ticket.description);
    println!("Status: {}", ticket.status);
}

fn print_pull_request(pr: &PullRequestRecord) {
    println!("{}", format!("PR #{}: \"{}\"", pr.number, pr.title).bold());
    println!("State: {} | Author: {}", pr.state, pr.author);
    println!(
        "Created: {} | Updated: {}",
        timestamp::format(&pr.created_at),
        timestamp::format(&pr.updated_at)
    );
    println!("Files changed: {}", pr.files.len());
    for file in &pr.files {
        println!(
            "  {} ({}): {} {}",
            file.path,
            file.status,
            format!("+{}", file.additions).green(),
            format!("-{}", file.deletions).red()
        );
    }
}

/// Write one turn as a markdown transcript.
#[instrument(skip(result))]
pub fn write_markdown(result: &PromptResult, path: &Path) -> Result<(), ReportError> {
    debug!(path = %path.display(), "writing transcript");
    std::fs::write(path, render_markdown(result))?;
    Ok(())
}

fn render_markdown(result: &PromptResult) -> String {
    let mut md = String::from("# Ticket Review\n\n");

    for err in &result.skipped {
        md.push_str(&format!("> **PR skipped:** {}. {}\n\n", err, err.guidance()));
    }

    for failure in &result.failures {
        md.push_str(&format!("> **{} unavailable:** {}\n\n", failure.source, failure.error));
    }

    let (context, prompt, answer) = match &result.outcome {
        Outcome::NoContext => {
            md.push_str(&format!("{}\n", NO_DATA));
            return md;
        }
        Outcome::Completed {
            context,
            prompt,
            completion,
        } => (context, prompt, completion.trim_end().to_string()),
        Outcome::ModelFailed {
            context,
            prompt,
            error,
        } => (context, prompt, format!("_Model unavailable: {}_", error)),
    };

    if let Some(ticket) = &context.ticket {
        md.push_str(&format!("## Jira Ticket {}\n\n", ticket.key));
        md.push_str(&format!("**Summary:** {}\n\n", ticket.summary));
        md.push_str(&format!("**Status:** {}\n\n", ticket.status));
        md.push_str(&format!("{}\n\n", ticket.description));
    }

    if let Some(pr) = &context.pull_request {
        md.push_str(&format!("## PR #{}: \"{}\"\n\n", pr.number, pr.title));
        md.push_str(&format!(
            "**State:** {} | **Author:** {} | **Updated:** {}\n\n",
            pr.state,
            pr.author,
            timestamp::format(&pr.updated_at)
        ));
        for file in &pr.files {
            md.push_str(&format!(
                "- `{}` ({}): +{} -{}\n",
                file.path, file.status, file.additions, file.deletions
            ));
        }
        if !pr.files.is_empty() {
            md.push('\n');
        }
    }

    md.push_str("<details><summary>Prompt</summary>\n\n```text\n");
    md.push_str(prompt.trim_end());
    md.push_str("\n```\n\n</details>\n\n");

    md.push_str("## Context & Opinion\n\n");
    md.push_str(&answer);
    md.push('\n');
    md
}
