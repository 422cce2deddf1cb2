//! Terminal chat loop over a single session.

use std::io::Write;

use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use medchat_chat::{ChatError, ChatService};
use medchat_core::types::AnswerResult;

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplInput {
    /// Free-text question, possibly prefixed with `new search:`.
    Ask(String),
    /// `/q N`: ask canned question N.
    Canned(usize),
    /// `/questions`
    ListQuestions,
    /// `/clear`
    Clear,
    /// `/help`
    Help,
    /// `/quit` or `/exit`
    Quit,
    Blank,
    Unknown(String),
}

impl ReplInput {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ReplInput::Blank;
        }
        if !line.starts_with('/') {
            return ReplInput::Ask(line.to_string());
        }

        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some("/questions"), None, _) => ReplInput::ListQuestions,
            (Some("/clear"), None, _) => ReplInput::Clear,
            (Some("/help"), None, _) => ReplInput::Help,
            (Some("/quit") | Some("/exit"), None, _) => ReplInput::Quit,
            (Some("/q"), Some(n), None) => match n.parse() {
                Ok(index) => ReplInput::Canned(index),
                Err(_) => ReplInput::Unknown(line.to_string()),
            },
            _ => ReplInput::Unknown(line.to_string()),
        }
    }
}

const HELP: &str = "\
Type a question and press Enter. Follow-ups use the conversation so far.
  new search: <question>   start over with a fresh conversation
  /questions               list the canned questions
  /q <n>                   ask canned question n
  /clear                   clear the conversation
  /quit                    exit (or Ctrl-D)";

/// Run the loop until EOF or `/quit`.
pub async fn run(chat: ChatService) -> std::io::Result<()> {
    println!(
        "{} {}",
        "medchat".bright_cyan().bold(),
        format!("({})", chat.backend()).bright_blue()
    );
    println!("{}", HELP.dimmed());
    print_questions(&chat);

    let mut session = chat.create_session().id;
    tracing::debug!(session_id = %session, "REPL session created");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", ">".bright_green().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        match ReplInput::parse(&line) {
            ReplInput::Blank => continue,
            ReplInput::Quit => break,
            ReplInput::Help => println!("{}", HELP.dimmed()),
            ReplInput::ListQuestions => print_questions(&chat),
            ReplInput::Unknown(cmd) => {
                println!("{} {}", "Unknown command:".yellow(), cmd);
            }
            ReplInput::Clear => match chat.clear_session(session).await {
                Ok(()) => println!("{}", "Conversation cleared.".dimmed()),
                Err(ChatError::SessionNotFound(_)) => {
                    session = chat.create_session().id;
                    println!("{}", "Conversation cleared.".dimmed());
                }
                Err(e) => print_error(&e),
            },
            ReplInput::Ask(question) => {
                let result = chat.ask(session, &question).await;
                session = handle_result(&chat, session, result);
            }
            ReplInput::Canned(index) => {
                if let Some(doc) = chat.canned_questions().get(index) {
                    println!("{}", doc.text.italic());
                }
                let result = chat.ask_canned(session, index).await;
                session = handle_result(&chat, session, result);
            }
        }
    }

    println!("{}", "Goodbye.".dimmed());
    Ok(())
}

/// Print the outcome of a turn, returning the session to use next.
fn handle_result(
    chat: &ChatService,
    session: Uuid,
    result: Result<AnswerResult, ChatError>,
) -> Uuid {
    match result {
        Ok(answer) => {
            print_answer(&answer);
            session
        }
        Err(ChatError::SessionNotFound(_)) => {
            println!(
                "{}",
                "Session expired, starting a new conversation. Please ask again.".yellow()
            );
            chat.create_session().id
        }
        Err(e) => {
            print_error(&e);
            session
        }
    }
}

fn print_answer(answer: &AnswerResult) {
    println!();
    println!("{}", answer.answer_text.trim());
    if !answer.source_documents.is_empty() {
        println!();
        println!("{}", "Sources:".bright_cyan());
        for id in answer.source_ids() {
            println!("  {} {}", "-".bright_cyan(), id.cyan());
        }
    }
    println!();
}

fn print_error(err: &ChatError) {
    println!("{} {}", "Error:".red().bold(), err.to_string().red());
}

fn print_questions(chat: &ChatService) {
    let questions = chat.canned_questions();
    if questions.is_empty() {
        return;
    }
    println!("{}", "Canned questions:".bright_cyan());
    for (i, doc) in questions.iter().enumerate() {
        let preview: String = doc.text.chars().take(80).collect();
        println!("  {} {}", format!("[{}]", i).bright_blue(), preview);
    }
}
