// prompt construction - pure string templates, no i/o

/// note telling the model it only sees part of the change
pub const CHUNKED_NOTE: &str =
    "the diff was too large to send in one request, so it has been split into chunks.";

const COMMIT_REQUEST: &str =
    "generate a concise and descriptive git commit message for the following staged changes.";

/// build the prompt for one diff chunk
///
/// a single chunk gets the standard template; more than one adds the chunk
/// position and the note that the change was split. `extra_instructions` is
/// appended verbatim.
pub fn build_prompt(
    stats: &str,
    diff_chunk: &str,
    chunk_index: usize,
    total_chunks: usize,
    extra_instructions: &str,
) -> String {
    let mut prompt = String::with_capacity(stats.len() + diff_chunk.len() + 512);

    prompt.push_str(COMMIT_REQUEST);
    prompt.push('\n');
    if total_chunks > 1 {
        prompt.push_str(CHUNKED_NOTE);
        prompt.push('\n');
    }

    prompt.push_str("\nchange statistics:\n");
    prompt.push_str(stats);
    prompt.push_str("\n\n");

    if total_chunks > 1 {
        prompt.push_str(&chunk_heading(chunk_index, total_chunks));
    } else {
        prompt.push_str("code changes:");
    }
    prompt.push('\n');
    prompt.push_str(diff_chunk);
    prompt.push_str("\n\n");

    prompt.push_str("reply with the commit message only, without code fences or commentary.\n");

    if !extra_instructions.is_empty() {
        prompt.push('\n');
        prompt.push_str(extra_instructions);
        prompt.push('\n');
    }

    prompt
}

fn chunk_heading(chunk_index: usize, total_chunks: usize) -> String {
    format!("chunk {chunk_index} of {total_chunks}:")
}

const DOCUMENTATION_REQUEST: &str = r#"generate a markdown document describing the following codebase. the document must contain these sections:
- overview: what the codebase is, for example "a web application that lets users send email campaigns".
- features: an exhaustive, high-level list; each feature described in no more than 240 characters, for example "users can track the performance of their campaigns".
- architecture: how it is built, for example "a react frontend and a rust backend running on docker, backed by postgresql and redis"."#;

/// build the documentation prompt for one chunk of concatenated source files
pub fn build_documentation_prompt(content: &str, chunk_index: usize, total_chunks: usize) -> String {
    let mut prompt = String::from(DOCUMENTATION_REQUEST);
    prompt.push_str("\n\n");

    if total_chunks > 1 {
        prompt.push_str("the codebase was too large to send in one request, so it has been split into chunks.\n\n");
        prompt.push_str(&chunk_heading(chunk_index, total_chunks));
        prompt.push('\n');
    }

    prompt.push_str(content);
    prompt
}

/// how the user wants the next candidate to differ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refinement {
    MoreSuccinct,
    MoreTechnical,
    LessTechnical,
    /// user describes the change in their own words
    Describe,
}

impl Refinement {
    pub const ALL: [Refinement; 4] = [
        Refinement::MoreSuccinct,
        Refinement::MoreTechnical,
        Refinement::LessTechnical,
        Refinement::Describe,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Refinement::MoreSuccinct => "make it more succinct",
            Refinement::MoreTechnical => "make it more technical",
            Refinement::LessTechnical => "make it less technical",
            Refinement::Describe => "describe what should change",
        }
    }

    /// fixed instruction text; `None` when the user supplies it
    pub fn instructions(self) -> Option<&'static str> {
        match self {
            Refinement::MoreSuccinct => Some(MORE_SUCCINCT),
            Refinement::MoreTechnical => Some(MORE_TECHNICAL),
            Refinement::LessTechnical => Some(LESS_TECHNICAL),
            Refinement::Describe => None,
        }
    }
}

const MORE_SUCCINCT: &str =
    "make the commit message more succinct while still conveying the essence of the change.";

const MORE_TECHNICAL: &str = r#"make the commit message more technical, adding context and detail that help engineers understand the change where the diff allows it:

1. name the functions, data structures or algorithms that changed.
2. name the files or modules affected.
3. for bug fixes, briefly describe the root cause and the fix.
4. for new features, outline the core implementation approach.
5. keep the language concise and accurate.

examples:
- "speed up user lookup in user_auth.py with an index on email"
- "replace linear scan with a red-black tree in data_processor.cpp"
- "guard worker queue with a mutex to fix race in thread pool"

balance depth with clarity and favour information that helps review and maintenance. stay under 1000 characters."#;

const LESS_TECHNICAL: &str = r#"make the commit message non-technical and suitable for a general audience. keep it brief while conveying the essence of the change. examples:

- updating dependencies: "update dependencies"
- fixing a bug: "fix login issue"
- adding a feature: "add dark mode"
- refactoring: "tidy up code structure"

for larger changes summarise the overall impact instead of listing details. if there are several significant changes, use a bulleted list."#;
