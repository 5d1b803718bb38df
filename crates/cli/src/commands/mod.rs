//! Command handlers for the repo-explain CLI.
//!
//! Both commands share the repository arguments and the load step defined here.

pub mod ask;
pub mod chat;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use chat::ChatCommand;

use clap::Args;
use explain_core::{config::AppConfig, AppResult};
use explain_knowledge::{
    Answer, Explainer, FetchPolicy, FileFilter, LoadStats, RepoSource, RepositoryReference,
};

/// Which repository to load and how.
#[derive(Args, Debug, Clone)]
pub struct RepoArgs {
    /// Clone URL or local directory of the repository
    #[arg(short, long)]
    pub repo: String,

    /// Branch to check out (ignored for local directories)
    #[arg(short, long, default_value = "main")]
    pub branch: String,

    /// File suffix to index (default from config, ".py")
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Maximum fragments retrieved per question
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Remove any existing checkout and clone again
    #[arg(long)]
    pub refresh: bool,

    /// Reuse an existing checkout even if it is on another branch
    #[arg(long, conflicts_with = "refresh")]
    pub reuse: bool,
}

impl RepoArgs {
    pub fn policy(&self) -> FetchPolicy {
        if self.refresh {
            FetchPolicy::AlwaysRefetch
        } else if self.reuse {
            FetchPolicy::ReuseIfPresent
        } else {
            FetchPolicy::RefetchOnBranchChange
        }
    }

    pub fn reference(&self, config: &AppConfig) -> RepositoryReference {
        let filter = self
            .filter
            .clone()
            .unwrap_or_else(|| config.retrieval.file_filter.clone());

        RepositoryReference::new(RepoSource::parse(&self.repo))
            .with_branch(self.branch.clone())
            .with_filter(FileFilter::new(filter))
    }

    /// Apply per-command overrides and re-check the result.
    pub fn effective_config(&self, config: &AppConfig) -> AppResult<AppConfig> {
        let mut config = config.clone();
        if let Some(top_k) = self.top_k {
            config.retrieval.top_k = top_k;
        }
        config.retrieval.validate()?;
        Ok(config)
    }
}

/// Build the explainer and index the repository, reporting progress on stderr.
pub async fn load_session(config: &AppConfig, args: &RepoArgs) -> AppResult<Explainer> {
    let config = args.effective_config(config)?;
    let reference = args.reference(&config);

    let mut explainer = Explainer::from_app_config(&config, args.policy())?;
    tracing::debug!("Answering from the top {} fragments", explainer.config().top_k);

    eprintln!("Loading {} ...", reference);
    let stats = explainer.load(reference).await?;
    print_load_stats(&stats);

    Ok(explainer)
}

fn print_load_stats(stats: &LoadStats) {
    eprintln!(
        "Indexed {} fragments from {} files in {:.2}s{}",
        stats.fragments_indexed,
        stats.files_indexed,
        stats.duration_secs,
        if stats.reused_checkout {
            " (reused working copy)"
        } else {
            ""
        }
    );
    if stats.files_skipped > 0 {
        eprintln!("Skipped {} unreadable files", stats.files_skipped);
    }
}

/// Answer text and sources on stdout, usage on stderr.
pub fn print_answer(answer: &Answer) {
    println!("{}", answer.text.trim_end());

    if !answer.sources.is_empty() {
        println!();
        println!("Sources:");
        for source in &answer.sources {
            println!("  - {} (fragment {})", source.path, source.position);
        }
    }

    eprintln!("{}", answer.usage);
}
