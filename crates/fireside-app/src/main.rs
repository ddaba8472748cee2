//! Fireside - a friendly structured-interview companion.
//!
//! Chat transport over stdin/stdout: each line is one turn for the interview
//! supervisor. When an interview finishes, the reply goes out immediately and
//! the analyst report is generated on a background task, addressed to the
//! supervising recipient.

use anyhow::Result;
use clap::Parser;
use fireside_engine::report::{report_header, split_message, DEFAULT_MAX_MESSAGE_CHARS};
use fireside_engine::{CompletionClient, Supervisor};
use std::io::{self, BufRead};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "fireside",
    about = "Structured learning-style interviews over chat",
    long_about = "Fireside interviews a subject about how they like to learn, judges each\n\
                  answer's completeness, and writes a learning-profile report for a\n\
                  supervising recipient once the interview is done.",
    version
)]
struct Args {
    /// Identifier for the interview subject (one in-flight interview per id)
    #[arg(long, default_value = "local")]
    user: String,

    /// Maximum characters per outbound message before splitting
    #[arg(long, default_value_t = DEFAULT_MAX_MESSAGE_CHARS)]
    max_message_chars: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let client = CompletionClient::from_config();
    if !client.is_available() {
        eprintln!("  ! No API key found (OPENROUTER_API_KEY). Judging runs on heuristics only.");
    }
    let supervisor = Arc::new(Supervisor::new(client));

    println!("{}", supervisor.start(&args.user));

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let message = line.trim();
        if message.is_empty() {
            continue;
        }

        match message {
            "/quit" | "/exit" => break,
            "/start" => {
                println!("{}", supervisor.start(&args.user));
                continue;
            }
            "/reset" => {
                supervisor.reset(&args.user);
                println!("Okay, clean slate! Say hi whenever you're ready. 😊");
                continue;
            }
            "/progress" => {
                match supervisor.progress(&args.user).await {
                    Some(p) => println!(
                        "Question {}/{} ({}%) — {} answered, state: {}",
                        p.current_question,
                        p.total_questions,
                        p.progress_percent,
                        p.answered_count,
                        p.state.as_str()
                    ),
                    None => println!("No interview in flight. Say hi to start one!"),
                }
                continue;
            }
            _ => {}
        }

        let outcome = supervisor.handle_turn(&args.user, message).await;
        for chunk in split_message(&outcome.reply_text, args.max_message_chars) {
            println!("{}", chunk);
        }

        // The completion reply above already went out; the report is
        // fire-and-forget so further turns are never blocked on it.
        if outcome.should_trigger_analysis {
            if let Some(data) = outcome.interview_data {
                let supervisor = Arc::clone(&supervisor);
                let user = args.user.clone();
                let max_chars = args.max_message_chars;
                tokio::spawn(async move {
                    let report = supervisor.generate_report(&data).await;
                    let full = format!(
                        "{}{}",
                        report_header(&data.name, data.age, &user),
                        report
                    );
                    for chunk in split_message(&full, max_chars) {
                        println!("\n[to supervisor]\n{}", chunk);
                    }
                });
            }
        }
    }

    Ok(())
}
