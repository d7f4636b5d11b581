// committer-core/src/lib.rs

// declare modules
pub mod ai;
pub mod config;
pub mod document;
pub mod error;
pub mod git;
pub mod splitter;
pub mod ui;

#[cfg(test)]
pub(crate) mod testing;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use tracing::debug;

// re-export key structs/functions for external use by the cli crate
pub use console::style;

pub use crate::ai::{build_provider, CompletionProvider, MessageLoop, Outcome, Provider};
pub use crate::config::{Overrides, Settings};
pub use crate::document::{generate_documentation, DocumentRequest};
pub use crate::error::{CommitterError, GenerationError, GitError};
pub use crate::git::{GitRepo, Vcs};
pub use crate::splitter::{chunk_if_needed, ChunkConfig, TokenSplitter};
pub use crate::ui::{Interaction, Spinner, TerminalInteraction};

const NOTHING_TO_DO: &str = "nothing to do, exiting...";

// argument parsing struct shared with the cli crate
#[derive(Parser, Debug, Clone)]
#[command(
    name = "committer",
    version,
    about = "generate git commit messages with an llm"
)]
pub struct CoreCliArgs {
    #[command(subcommand)]
    pub command: Option<CoreCommand>,

    /// llm provider
    #[arg(long, global = true, value_enum)]
    pub provider: Option<Provider>,

    /// model name (defaults per provider)
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// bound on each llm call, e.g. 15s, 2m, 500ms
    #[arg(long = "llm-api-call-timeout", global = true, value_parser = config::parse_timeout)]
    pub timeout: Option<Duration>,

    /// inputs longer than this many characters are split into chunks
    #[arg(long, global = true)]
    pub chunk_threshold: Option<usize>,

    /// chunk size in tokens
    #[arg(long, global = true)]
    pub chunk_size: Option<usize>,

    /// tokens shared by consecutive chunks
    #[arg(long, global = true)]
    pub chunk_overlap: Option<usize>,

    /// tokenizer encoding or model name
    #[arg(long, global = true)]
    pub encoding: Option<String>,

    /// config file (defaults to the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// path to git repository (defaults to current directory)
    #[arg(short, long)]
    pub path: Option<PathBuf>,

    /// stage everything and accept the first generated message
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// push after committing without asking
    #[arg(long)]
    pub push: bool,

    /// tag the new commit without asking
    #[arg(long, value_name = "NAME")]
    pub tag: Option<String>,

    /// print the message instead of committing
    #[arg(long)]
    pub dry_run: bool,

    /// verbose diagnostics on stderr
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CoreCommand {
    /// generate markdown documentation for source files
    Document(DocumentArgs),
}

#[derive(Args, Debug, Clone)]
pub struct DocumentArgs {
    /// files to document (repeatable or comma separated)
    #[arg(short = 'f', long = "file-paths", value_delimiter = ',')]
    pub file_paths: Vec<PathBuf>,

    /// directories to walk (repeatable or comma separated)
    #[arg(short = 'd', long, value_delimiter = ',')]
    pub directories: Vec<PathBuf>,

    /// where to write the result
    #[arg(short, long, default_value = document::DEFAULT_OUTPUT)]
    pub output: PathBuf,
}

impl CoreCliArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            provider: self.provider,
            model: self.model.clone(),
            timeout: self.timeout,
            chunk_threshold: self.chunk_threshold,
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            encoding: self.encoding.clone(),
        }
    }

    pub fn commit_options(&self) -> CommitOptions {
        CommitOptions {
            yes: self.yes,
            push: self.push,
            tag: self.tag.clone(),
            dry_run: self.dry_run,
        }
    }
}

/// switches that change how the commit flow asks questions
#[derive(Debug, Clone, Default)]
pub struct CommitOptions {
    pub yes: bool,
    pub push: bool,
    pub tag: Option<String>,
    pub dry_run: bool,
}

/// how a run of the commit flow ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitReport {
    Committed {
        message: String,
        pushed: bool,
        tag: Option<String>,
    },
    DryRun(String),
    NothingToDo,
    Cancelled,
}

/// what a cli invocation produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowReport {
    Commit(CommitReport),
    Documentation(PathBuf),
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

// entry point used by the cli: environment, config, collaborators, then the flow
pub async fn execute_committer_flow(args: CoreCliArgs) -> Result<FlowReport> {
    dotenv().ok();

    let config_path = config::config_path(args.config.as_deref());
    let file = config::load_file_config(config_path.as_deref())?;
    let settings = Settings::resolve(&args.overrides(), env_var, file)
        .context("invalid configuration")?;
    debug!(?settings, "resolved settings");

    match &args.command {
        Some(CoreCommand::Document(doc)) => {
            let provider = build_provider(&settings, env_var)?;
            let request = DocumentRequest {
                files: doc.file_paths.clone(),
                directories: doc.directories.clone(),
                output: doc.output.clone(),
            };
            let ui = TerminalInteraction::new();
            let output =
                generate_documentation(&request, &settings, &ui, provider.as_ref()).await?;
            println!(
                "{} {}",
                style("✅ documentation written to").green().bold(),
                style(output.display()).yellow()
            );
            Ok(FlowReport::Documentation(output))
        }
        None => {
            let repo = GitRepo::new(args.path.clone().unwrap_or_else(|| PathBuf::from(".")));
            if !repo.is_repository() {
                return Err(GitError::NotARepository.into());
            }
            let provider = build_provider(&settings, env_var)?;
            let mut ui = TerminalInteraction::new();
            let report = commit_changes(
                &args.commit_options(),
                &settings,
                &repo,
                &mut ui,
                provider.as_ref(),
            )
            .await?;
            Ok(FlowReport::Commit(report))
        }
    }
}

fn nothing_to_do() -> CommitReport {
    println!("{}", style(NOTHING_TO_DO).dim());
    CommitReport::NothingToDo
}

// the core commit generation and interaction logic
pub async fn commit_changes(
    options: &CommitOptions,
    settings: &Settings,
    vcs: &dyn Vcs,
    ui: &mut dyn Interaction,
    provider: &dyn CompletionProvider,
) -> Result<CommitReport> {
    if !vcs.is_repository() {
        return Err(GitError::NotARepository.into());
    }

    if !vcs.is_dirty().context("failed to read working tree status")? {
        return Ok(nothing_to_do());
    }

    if !vcs.has_staged_changes().context("failed to check staged changes")? {
        let stage = options.yes || ui.confirm("would you like to add all changes?", false)?;
        if !stage {
            return Ok(nothing_to_do());
        }

        {
            let _spinner = ui.progress("staging changes...");
            vcs.stage_all().context("failed to stage changes")?;
        }
        if !vcs.has_staged_changes()? {
            return Ok(nothing_to_do());
        }
    }

    let diff = {
        let _spinner = ui.progress("reading staged diff...");
        vcs.diff().context("failed to read staged diff")?
    };
    let stats = {
        let _spinner = ui.progress("reading diff stats...");
        vcs.stats().context("failed to read diff stats")?
    };

    let chunks = chunk_if_needed(&diff, settings.chunk_threshold, &settings.chunk)?;
    debug!(chunks = chunks.len(), diff_bytes = diff.len(), "prepared staged diff");

    let outcome = MessageLoop::new(provider, &mut *ui, settings.timeout)
        .auto_approve(options.yes)
        .run(&stats, &chunks)
        .await?;

    let message = match outcome {
        Outcome::Cancelled => return Ok(nothing_to_do()),
        Outcome::Approved(message) | Outcome::WrittenByUser(message) => message,
    };
    if message.trim().is_empty() {
        return Err(CommitterError::EmptyResult.into());
    }

    if options.dry_run {
        ui.present("commit message (dry run):", &message);
        return Ok(CommitReport::DryRun(message));
    }

    {
        let _spinner = ui.progress("committing...");
        vcs.commit(&message).context("failed to commit")?;
    }
    println!("{}", style("✅ commit successful!").green().bold());

    let pushed = if options.push || (!options.yes && ui.confirm("would you like to push the commits?", true)?) {
        let _spinner = ui.progress("pushing...");
        vcs.push().context("failed to push")?;
        true
    } else {
        false
    };

    let tag = match &options.tag {
        Some(name) => Some(name.trim().to_string()),
        None if !options.yes && ui.confirm("would you like to tag the commit?", false)? => {
            Some(ask_tag_name(ui)?)
        }
        None => None,
    };

    if let Some(name) = &tag {
        vcs.tag(name).with_context(|| format!("failed to create tag '{name}'"))?;
        let _spinner = ui.progress("pushing tags...");
        vcs.push_tags().context("failed to push tags")?;
    }

    Ok(CommitReport::Committed {
        message,
        pushed,
        tag,
    })
}

fn ask_tag_name(ui: &mut dyn Interaction) -> Result<String> {
    loop {
        let name = ui.input("tag name")?;
        let name = name.trim();
        if git::is_valid_tag_name(name) {
            return Ok(name.to_string());
        }
        println!("{}", style(format!("'{name}' is not a valid tag name")).yellow());
    }
}
