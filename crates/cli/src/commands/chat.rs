//! Chat command handler.
//!
//! Loads the repository once, then answers questions read line by line from
//! stdin until `exit` or end of input. Each question is independent.

use super::{load_session, print_answer, RepoArgs};
use clap::Args;
use explain_core::{config::AppConfig, AppResult};
use tokio::io::{AsyncBufReadExt, BufReader};

const EXIT_WORDS: [&str; 2] = ["exit", "quit"];

const SAMPLE_QUESTIONS: [&str; 3] = [
    "What are the main features of this repository?",
    "Explain how the code is structured.",
    "What is the purpose of this project?",
];

/// Load a repository and answer questions read from stdin
#[derive(Args, Debug)]
pub struct ChatCommand {
    #[command(flatten)]
    pub repo: RepoArgs,
}

impl ChatCommand {
    /// Execute the chat command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let explainer = load_session(config, &self.repo).await?;
        eprintln!("{}", banner());

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            eprint!("> ");
            let Some(line) = lines.next_line().await? else {
                break;
            };

            let question = line.trim();
            if question.is_empty() {
                continue;
            }
            if EXIT_WORDS.contains(&question.to_lowercase().as_str()) {
                break;
            }

            match explainer.ask(question).await {
                Ok(Some(answer)) => {
                    print_answer(&answer);
                    println!();
                }
                Ok(None) => eprintln!("Sorry, that question could not be answered. Try again."),
                Err(e) if e.is_recoverable() => eprintln!("{}", e),
                Err(e) => return Err(e),
            }
        }

        tracing::info!("Chat session ended");
        Ok(())
    }
}

fn banner() -> String {
    let mut text = String::from("Ask a question about the repository (type 'exit' to quit).\nFor example:");
    for question in SAMPLE_QUESTIONS {
        text.push_str("\n  - ");
        text.push_str(question);
    }
    text
}
