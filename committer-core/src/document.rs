// documentation flow - read source files, send them in chunks, write markdown

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use futures::future::try_join_all;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use crate::ai::invoker::invoke;
use crate::ai::prompts::build_documentation_prompt;
use crate::ai::CompletionProvider;
use crate::config::Settings;
use crate::error::CommitterError;
use crate::splitter::chunk_if_needed;
use crate::ui::Interaction;

pub const DEFAULT_OUTPUT: &str = "documentation.md";

/// inputs and destination of one documentation run
#[derive(Debug, Clone)]
pub struct DocumentRequest {
    pub files: Vec<PathBuf>,
    pub directories: Vec<PathBuf>,
    pub output: PathBuf,
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.') && name != "." && name != "..")
}

/// explicit files first, then every regular file under each directory in name order
pub fn collect_paths(files: &[PathBuf], directories: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut paths = files.to_vec();

    for dir in directories {
        let walker = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

        for entry in walker {
            let entry = entry.with_context(|| format!("failed to walk {}", dir.display()))?;
            if entry.file_type().is_file() {
                paths.push(entry.into_path());
            }
        }
    }

    Ok(paths)
}

/// read every file concurrently; the first failure aborts the batch
pub async fn read_all(paths: &[PathBuf]) -> Result<Vec<String>> {
    try_join_all(paths.iter().map(|path| read_one(path))).await
}

async fn read_one(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

/// generate documentation for the requested files and write it to `request.output`
pub async fn generate_documentation(
    request: &DocumentRequest,
    settings: &Settings,
    ui: &dyn Interaction,
    provider: &dyn CompletionProvider,
) -> Result<PathBuf> {
    let paths = collect_paths(&request.files, &request.directories)?;
    if paths.is_empty() {
        return Err(CommitterError::NoDocumentInputs.into());
    }
    debug!(files = paths.len(), "collected documentation inputs");

    let contents = {
        let _spinner = ui.progress("reading files...");
        read_all(&paths).await?
    };
    let source = contents.join("\n");

    let chunks = chunk_if_needed(&source, settings.chunk_threshold, &settings.chunk)?;
    let total = chunks.len();
    debug!(chunks = total, bytes = source.len(), "prepared documentation source");

    let mut sections = Vec::with_capacity(total);
    for (i, chunk) in chunks.iter().enumerate() {
        let prompt = build_documentation_prompt(chunk, i + 1, total);
        let _spinner = ui.progress(&format!("generating documentation ({} of {total})...", i + 1));
        let section = invoke(provider, &prompt, settings.timeout)
            .await
            .with_context(|| format!("failed to document chunk {} of {total}", i + 1))?;
        sections.push(section);
    }

    tokio::fs::write(&request.output, sections.join("\n"))
        .await
        .with_context(|| format!("failed to write {}", request.output.display()))?;

    info!(output = %request.output.display(), "wrote documentation");
    Ok(request.output.clone())
}
