//! Question answering handlers

use std::future::Future;

use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::cli::handlers::info::handle_check;
use crate::cli::handlers::info::handle_stats;
use crate::cli::output::print_answer;
use crate::cli::output::print_error;
use crate::cli::output::print_info;
use crate::cli::output::print_prompt;
use crate::cli::output::print_success;
use crate::cli::output::print_warning;
use crate::models::Answer;
use crate::models::AnswerRequest;
use crate::models::HardwareProfile;
use crate::models::MAX_SOURCES;
use crate::rag::RagService;
use crate::Result;
use crate::VedaRagError;

/// Resolves on Ctrl+C; never resolves where the handler cannot be installed
pub async fn ctrl_c_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Answer one question, cancelling it if `interrupt` resolves first
pub async fn answer_until<F>(
    service: &RagService,
    request: &AnswerRequest,
    interrupt: F,
) -> Result<Answer>
where
    F: Future<Output = ()>,
{
    let cancel = CancellationToken::new();
    let answer = service.answer_with_cancel(request, &cancel);
    tokio::pin!(answer);

    tokio::select! {
        result = &mut answer => result,
        () = interrupt => {
            cancel.cancel();
            answer.await
        }
    }
}

/// Answer one question; Ctrl+C abandons the in-flight call
pub async fn handle_ask(
    service: &RagService,
    request: AnswerRequest,
    show_context: bool,
) -> Result<()> {
    print_info(&format!("Question: {}", request.question));
    if let Some(k) = request.override_k {
        print_info(&format!("Using {k} sources"));
    }

    let answer = answer_until(service, &request, ctrl_c_signal()).await?;
    print_answer(&answer, show_context);
    Ok(())
}

/// One parsed line of the interactive shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Empty,
    Quit,
    Check,
    Stats,
    Reset,
    /// `None` returns to complexity-based source counts
    Sources(Option<usize>),
    Invalid(String),
    Ask(String),
}

impl ShellCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }

        let mut parts = line.split_whitespace();
        let head = parts.next().unwrap_or_default().to_ascii_lowercase();
        let arg = parts.next();
        let extra = parts.next().is_some();

        match (head.as_str(), arg, extra) {
            ("quit" | "exit" | "q", None, _) => Self::Quit,
            ("check", None, _) => Self::Check,
            ("stats", None, _) => Self::Stats,
            ("reset", None, _) => Self::Reset,
            ("sources", Some(value), false) => parse_sources(value),
            ("sources", _, _) => {
                Self::Invalid(format!("usage: sources <1-{MAX_SOURCES}> | sources auto"))
            }
            _ => Self::Ask(line.to_string()),
        }
    }
}

fn parse_sources(value: &str) -> ShellCommand {
    if value.eq_ignore_ascii_case("auto") {
        return ShellCommand::Sources(None);
    }
    match value.parse::<usize>() {
        Ok(k) if (1..=MAX_SOURCES).contains(&k) => ShellCommand::Sources(Some(k)),
        _ => ShellCommand::Invalid(format!(
            "source count must be between 1 and {MAX_SOURCES}, got '{value}'"
        )),
    }
}

/// How an interactive session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellExit {
    Quit,
    EndOfInput,
    Interrupted,
}

/// Interactive shell on stdin; Ctrl+C at the prompt ends the session
pub async fn handle_interactive(service: &RagService, profile: HardwareProfile) -> Result<()> {
    println!("╔════════════════════════════════════════════════════════════════╗");
    println!("║  💬 Interactive Mode ({profile} profile)                           ");
    println!("║  Commands: quit, check, stats, sources <n>, sources auto, reset ║");
    println!("║  Ctrl+C cancels a running question, or exits at the prompt      ║");
    println!("╚════════════════════════════════════════════════════════════════╝");
    println!();

    run_shell(
        service,
        profile,
        BufReader::new(tokio::io::stdin()),
        ctrl_c_signal,
    )
    .await?;
    Ok(())
}

/// Read-eval loop; failed questions are reported and the session continues
///
/// `interrupt` is called once per wait. At the prompt it ends the session;
/// while a question runs it cancels only that question.
pub async fn run_shell<R, I, F>(
    service: &RagService,
    profile: HardwareProfile,
    input: R,
    mut interrupt: I,
) -> Result<ShellExit>
where
    R: AsyncBufRead + Unpin,
    I: FnMut() -> F,
    F: Future<Output = ()>,
{
    let mut lines = input.lines();
    let mut override_k: Option<usize> = None;

    loop {
        print_prompt("🙏 Question: ")?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            () = interrupt() => {
                println!();
                print_success("👋 Goodbye!");
                return Ok(ShellExit::Interrupted);
            }
        };
        let Some(line) = line else {
            println!();
            return Ok(ShellExit::EndOfInput);
        };

        match ShellCommand::parse(&line) {
            ShellCommand::Empty => {}
            ShellCommand::Quit => {
                print_success("👋 Goodbye!");
                return Ok(ShellExit::Quit);
            }
            ShellCommand::Check => handle_check(service, profile).await?,
            ShellCommand::Stats => {
                if let Err(e) = handle_stats(service).await {
                    print_error(&e.to_string());
                }
            }
            ShellCommand::Reset => {
                service.reset_unavailable();
                print_success("All models are candidates again");
            }
            ShellCommand::Sources(k) => {
                override_k = k;
                match k {
                    Some(k) => print_info(&format!("Using {k} sources per question")),
                    None => print_info("Source count follows question complexity"),
                }
            }
            ShellCommand::Invalid(msg) => print_warning(&msg),
            ShellCommand::Ask(question) => {
                let request = AnswerRequest::new(question, profile).with_sources(override_k);
                match answer_until(service, &request, interrupt()).await {
                    Ok(answer) => print_answer(&answer, false),
                    Err(e @ VedaRagError::Cancelled { .. }) => print_warning(&e.to_string()),
                    Err(e) => {
                        warn!("Question failed: {}", e);
                        print_error(&e.to_string());
                    }
                }
                println!();
            }
        }
    }
}
