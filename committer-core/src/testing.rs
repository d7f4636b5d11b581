// scripted collaborators for unit tests

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::ai::generation::ReviewChoice;
use crate::ai::prompts::Refinement;
use crate::ai::CompletionProvider;
use crate::error::{CompletionError, GitError};
use crate::git::Vcs;
use crate::ui::{Interaction, Spinner};

/// one scripted reply to an interactive prompt
#[derive(Debug, Clone)]
pub(crate) enum Answer {
    Select(usize),
    Confirm(bool),
    Input(String),
    Compose(Option<String>),
}

impl Answer {
    pub(crate) fn review(choice: ReviewChoice) -> Self {
        let index = ReviewChoice::ALL
            .iter()
            .position(|c| *c == choice)
            .unwrap();
        Answer::Select(index)
    }

    pub(crate) fn refine(refinement: Refinement) -> Self {
        let index = Refinement::ALL
            .iter()
            .position(|r| *r == refinement)
            .unwrap();
        Answer::Select(index)
    }
}

/// replays answers in order; optionally loops over the script forever
pub(crate) struct ScriptedInteraction {
    script: Vec<Answer>,
    next: usize,
    cycle: bool,
    pub presented: Vec<(String, String)>,
    pub asked: Vec<String>,
}

impl ScriptedInteraction {
    pub(crate) fn new(script: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            script: script.into_iter().collect(),
            next: 0,
            cycle: false,
            presented: Vec::new(),
            asked: Vec::new(),
        }
    }

    pub(crate) fn cycling(script: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            cycle: true,
            ..Self::new(script)
        }
    }

    fn answer(&mut self, prompt: &str) -> io::Result<Answer> {
        self.asked.push(prompt.to_string());
        if self.cycle && !self.script.is_empty() && self.next >= self.script.len() {
            self.next = 0;
        }
        let answer = self.script.get(self.next).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("no scripted answer for '{prompt}'"),
            )
        })?;
        self.next += 1;
        Ok(answer)
    }

    fn mismatch(prompt: &str, answer: &Answer) -> io::Error {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("scripted answer {answer:?} does not fit '{prompt}'"),
        )
    }
}

impl Interaction for ScriptedInteraction {
    fn select(&mut self, prompt: &str, items: &[&str], _default: usize) -> io::Result<usize> {
        match self.answer(prompt)? {
            Answer::Select(index) if index < items.len() => Ok(index),
            other => Err(Self::mismatch(prompt, &other)),
        }
    }

    fn confirm(&mut self, prompt: &str, _default: bool) -> io::Result<bool> {
        match self.answer(prompt)? {
            Answer::Confirm(yes) => Ok(yes),
            other => Err(Self::mismatch(prompt, &other)),
        }
    }

    fn input(&mut self, prompt: &str) -> io::Result<String> {
        match self.answer(prompt)? {
            Answer::Input(text) => Ok(text),
            other => Err(Self::mismatch(prompt, &other)),
        }
    }

    fn compose(&mut self, prompt: &str) -> io::Result<Option<String>> {
        match self.answer(prompt)? {
            Answer::Compose(text) => Ok(text),
            other => Err(Self::mismatch(prompt, &other)),
        }
    }

    fn present(&mut self, title: &str, body: &str) {
        self.presented.push((title.to_string(), body.to_string()));
    }

    fn progress(&self, _label: &str) -> Spinner {
        Spinner::hidden()
    }
}

/// returns queued replies, then `candidate <n>` for every further call
pub(crate) struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, CompletionError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub(crate) fn new() -> Self {
        Self::replying([])
    }

    pub(crate) fn replying(
        replies: impl IntoIterator<Item = Result<String, CompletionError>>,
    ) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let call = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len()
        };
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("candidate {call}")))
    }
}

/// in-memory repository state recording every write
#[derive(Default)]
pub(crate) struct FakeVcs {
    pub not_a_repository: bool,
    pub staged: Cell<bool>,
    pub unstaged: bool,
    pub diff: String,
    pub stats: String,
    pub fail_push: bool,
    pub staged_all: Cell<bool>,
    pub commits: RefCell<Vec<String>>,
    pub pushes: Cell<usize>,
    pub tags: RefCell<Vec<String>>,
    pub tag_pushes: Cell<usize>,
}

impl FakeVcs {
    pub(crate) fn with_staged(diff: &str, stats: &str) -> Self {
        Self {
            staged: Cell::new(true),
            diff: diff.to_string(),
            stats: stats.to_string(),
            ..Self::default()
        }
    }
}

impl Vcs for FakeVcs {
    fn is_repository(&self) -> bool {
        !self.not_a_repository
    }

    fn has_staged_changes(&self) -> Result<bool, GitError> {
        Ok(self.staged.get())
    }

    fn is_dirty(&self) -> Result<bool, GitError> {
        Ok(self.staged.get() || self.unstaged)
    }

    fn stage_all(&self) -> Result<(), GitError> {
        self.staged_all.set(true);
        if self.unstaged {
            self.staged.set(true);
        }
        Ok(())
    }

    fn diff(&self) -> Result<String, GitError> {
        Ok(self.diff.clone())
    }

    fn stats(&self) -> Result<String, GitError> {
        Ok(self.stats.clone())
    }

    fn commit(&self, message: &str) -> Result<(), GitError> {
        self.commits.borrow_mut().push(message.to_string());
        self.staged.set(false);
        Ok(())
    }

    fn push(&self) -> Result<(), GitError> {
        if self.fail_push {
            return Err(GitError::CommandFailed {
                args: "push".into(),
                stderr: "no upstream".into(),
            });
        }
        self.pushes.set(self.pushes.get() + 1);
        Ok(())
    }

    fn tag(&self, name: &str) -> Result<(), GitError> {
        if !crate::git::is_valid_tag_name(name) {
            return Err(GitError::InvalidTag(name.to_string()));
        }
        self.tags.borrow_mut().push(name.to_string());
        Ok(())
    }

    fn push_tags(&self) -> Result<(), GitError> {
        self.tag_pushes.set(self.tag_pushes.get() + 1);
        Ok(())
    }
}
