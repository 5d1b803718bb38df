//! Ask command handler.
//!
//! Loads the repository and answers a single question.

use super::{load_session, print_answer, RepoArgs};
use clap::Args;
use explain_core::{config::AppConfig, AppError, AppResult};
use explain_knowledge::{Answer, RepositoryReference};

/// Load a repository and answer one question
#[derive(Args, Debug)]
pub struct AskCommand {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// The question to ask
    pub question: String,
}

impl AskCommand {
    /// Execute the ask command.
    ///
    /// A question that could not be answered is not a fatal error: the cause
    /// is already logged, so only a notice is printed before exiting with
    /// status 1.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let question = self.question.trim();
        if question.is_empty() {
            return Err(AppError::Usage("Question cannot be empty".to_string()));
        }

        let explainer = load_session(config, &self.repo).await?;
        let answer = explainer.ask(question).await?;

        if !self.report(question, answer.as_ref(), explainer.loaded_repository())? {
            std::process::exit(1);
        }

        Ok(())
    }

    /// Print the answer, or a notice when there is none. Returns whether an
    /// answer was printed.
    fn report(
        &self,
        question: &str,
        answer: Option<&Answer>,
        repository: Option<&RepositoryReference>,
    ) -> AppResult<bool> {
        let Some(answer) = answer else {
            eprintln!("No answer could be produced; see the log for details.");
            return Ok(false);
        };

        if self.json {
            let output = serde_json::json!({
                "question": question,
                "answer": answer.text,
                "usage": answer.usage,
                "sources": answer.sources,
                "repository": repository,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            eprintln!("{}", answer.usage);
        } else {
            print_answer(answer);
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use explain_llm::UsageReport;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        ask: AskCommand,
    }

    fn command(args: &[&str]) -> AskCommand {
        let mut argv = vec!["repo-explain"];
        argv.extend_from_slice(args);
        TestCli::parse_from(argv).ask
    }

    #[test]
    fn test_missing_answer_is_reported_not_raised() {
        let cmd = command(&["--repo", ".", "what is this?"]);

        let printed = cmd.report("what is this?", None, None).unwrap();
        assert!(!printed);
    }

    #[test]
    fn test_answer_is_printed_as_json() {
        let cmd = command(&["--repo", ".", "--json", "what is this?"]);
        let answer = Answer {
            text: "A sample project.".to_string(),
            usage: UsageReport::default(),
            sources: Vec::new(),
        };

        let printed = cmd.report("what is this?", Some(&answer), None).unwrap();
        assert!(printed);
    }

    #[test]
    fn test_branch_defaults_to_main() {
        let cmd = command(&["--repo", "https://github.com/octo/app.git", "q"]);
        assert_eq!(cmd.repo.branch, "main");
        assert_eq!(cmd.question, "q");
    }
}
