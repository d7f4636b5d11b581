// terminal interaction - prompts, the external editor and the progress spinner

use std::env;
use std::fs::{self, File};
use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use console::style;
use crossterm::terminal::disable_raw_mode;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};
use which::which;

/// everything the flows ask of the person at the keyboard
pub trait Interaction {
    /// pick one of `items`, returning its index
    fn select(&mut self, prompt: &str, items: &[&str], default: usize) -> io::Result<usize>;
    fn confirm(&mut self, prompt: &str, default: bool) -> io::Result<bool>;
    /// single line of non-empty text
    fn input(&mut self, prompt: &str) -> io::Result<String>;
    /// multi-line entry; `None` when the user aborts
    fn compose(&mut self, prompt: &str) -> io::Result<Option<String>>;
    fn present(&mut self, title: &str, body: &str);
    /// start a spinner that stops when the handle is dropped
    fn progress(&self, label: &str) -> Spinner;
}

/// dialoguer prompts on the controlling terminal
pub struct TerminalInteraction {
    theme: ColorfulTheme,
}

impl TerminalInteraction {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for TerminalInteraction {
    fn default() -> Self {
        Self::new()
    }
}

fn prompt_error(e: dialoguer::Error) -> io::Error {
    io::Error::other(e)
}

impl Interaction for TerminalInteraction {
    fn select(&mut self, prompt: &str, items: &[&str], default: usize) -> io::Result<usize> {
        Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .items(items)
            .interact()
            .map_err(prompt_error)
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> io::Result<bool> {
        Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(prompt_error)
    }

    fn input(&mut self, prompt: &str) -> io::Result<String> {
        Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .validate_with(|text: &String| -> Result<(), &str> {
                if text.trim().is_empty() {
                    Err("please enter some text")
                } else {
                    Ok(())
                }
            })
            .interact_text()
            .map_err(prompt_error)
    }

    fn compose(&mut self, prompt: &str) -> io::Result<Option<String>> {
        println!("{}", style("opening editor for commit message...").cyan());
        open_editor(prompt)
    }

    fn present(&mut self, title: &str, body: &str) {
        println!("\n{}\n", style(title).green().bold());
        println!("{}", style(body).yellow());
        println!();
    }

    fn progress(&self, label: &str) -> Spinner {
        Spinner::start(label)
    }
}

/// lines starting with this are dropped from editor output
const COMMENT_PREFIX: char = '#';

/// edit an empty message in the user's editor, with `prompt` as a comment header
fn open_editor(prompt: &str) -> io::Result<Option<String>> {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let tmp_path = env::temp_dir().join(format!("committer-{millis}.txt"));

    {
        let mut file = File::create(&tmp_path)?;
        writeln!(file, "\n{COMMENT_PREFIX} {prompt}")?;
        writeln!(
            file,
            "{COMMENT_PREFIX} lines starting with '{COMMENT_PREFIX}' are ignored; an empty message aborts"
        )?;
    }

    let _ = disable_raw_mode();

    let editor = pick_editor();
    let mut parts = editor.split_whitespace();
    let executable = parts.next().unwrap_or("nano");
    let editor_args: Vec<&str> = parts.collect();
    debug!(editor = %editor, path = %tmp_path.display(), "launching editor");

    let status = Command::new(executable)
        .args(&editor_args)
        .arg(&tmp_path)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status();

    let status = match status {
        Ok(status) => status,
        Err(e) => {
            let _ = fs::remove_file(&tmp_path);
            return Err(io::Error::new(
                e.kind(),
                format!("failed to execute editor '{editor}': {e}"),
            ));
        }
    };

    if !status.success() {
        warn!(editor = %editor, %status, "editor exited with error");
        eprintln!(
            "{}",
            style(format!("editor '{editor}' exited with error: {status}")).yellow()
        );
        let _ = fs::remove_file(&tmp_path);
        return Ok(None);
    }

    let edited = fs::read_to_string(&tmp_path)?;
    let _ = fs::remove_file(&tmp_path);

    Ok(strip_comments(&edited))
}

/// `$VISUAL`, `$EDITOR`, else the first known editor on `PATH`
fn pick_editor() -> String {
    if let Ok(visual) = env::var("VISUAL") {
        return visual;
    }
    if let Ok(editor) = env::var("EDITOR") {
        return editor;
    }

    let candidates = ["code -w", "nvim", "vim", "vi", "nano"];
    candidates
        .iter()
        .find(|cand| {
            cand.split_whitespace()
                .next()
                .is_some_and(|bin| which(bin).is_ok())
        })
        .map(|cand| cand.to_string())
        .unwrap_or_else(|| "nano".to_string())
}

/// drop comment lines, leading blank lines and trailing whitespace; `None` if nothing is left
///
/// indentation of the first line is kept as typed
fn strip_comments(raw: &str) -> Option<String> {
    let kept: Vec<&str> = raw
        .lines()
        .filter(|line| !line.trim_start().starts_with(COMMENT_PREFIX))
        .skip_while(|line| line.trim().is_empty())
        .collect();
    let text = kept.join("\n");
    let text = text.trim_end();

    (!text.is_empty()).then(|| text.to_string())
}

/// set while a visible spinner owns the terminal
static SPINNER_ACTIVE: Mutex<bool> = Mutex::new(false);

const TICKS: [&str; 10] = [
    "📊 ⠋", "📊 ⠙", "📊 ⠹", "📊 ⠸", "📊 ⠼", "📊 ⠴", "📊 ⠦", "📊 ⠧", "📊 ⠇", "📊 ⠏",
];

/// scoped progress indicator; stops on drop
///
/// only one spinner can be live at a time. starting a second while the first
/// is running yields an inert handle.
pub struct Spinner {
    bar: Option<ProgressBar>,
}

impl Spinner {
    pub fn start(label: &str) -> Self {
        let mut active = SPINNER_ACTIVE
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *active {
            debug!(label, "spinner already running");
            return Self::hidden();
        }
        *active = true;

        let style = ProgressStyle::default_spinner()
            .tick_strings(&TICKS)
            .template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let bar = ProgressBar::new_spinner();
        bar.set_style(style);
        bar.set_message(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));

        Self { bar: Some(bar) }
    }

    /// a handle that draws nothing and holds no lock
    pub fn hidden() -> Self {
        Self { bar: None }
    }

    pub fn is_active(&self) -> bool {
        self.bar.is_some()
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
            let mut active = SPINNER_ACTIVE
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *active = false;
        }
    }
}
