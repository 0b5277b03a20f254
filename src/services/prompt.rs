use std::io::{self, BufRead, Write};

use futures::{FutureExt, future::BoxFuture};
use thiserror::Error;

/// Index of the confirming choice in every [`PromptRequest`].
pub const CONFIRM_INDEX: usize = 0;

/// Blocking question asked to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    /// Dialog title.
    pub title: String,
    /// Question body.
    pub message: String,
    /// Choice labels; the first one confirms.
    pub choices: Vec<String>,
}

impl PromptRequest {
    /// Question asked when a launch reported that the game needs an update.
    pub fn update_available() -> Self {
        Self {
            title: "Game Needs Update".into(),
            message: "This game has an update, do you wish to update now?".into(),
            choices: vec!["YES".into(), "NO".into()],
        }
    }
}

/// Failure to collect an answer.
#[derive(Debug, Error)]
pub enum PromptError {
    /// The prompt was closed without an answer.
    #[error("prompt closed without an answer")]
    Closed,
    /// Reading the answer failed.
    #[error("failed to read prompt answer")]
    Io(#[from] io::Error),
}

/// Service asking the user to pick one of the choices of a [`PromptRequest`].
pub trait ConfirmPrompt: Send + Sync {
    /// Resolve with the index of the selected choice.
    fn confirm(&self, request: PromptRequest) -> BoxFuture<'static, Result<usize, PromptError>>;
}

/// Prompt reading the answer from the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsolePrompt;

impl ConfirmPrompt for ConsolePrompt {
    fn confirm(&self, request: PromptRequest) -> BoxFuture<'static, Result<usize, PromptError>> {
        async move {
            tokio::task::spawn_blocking(move || ask_on_terminal(&request))
                .await
                .map_err(|_| PromptError::Closed)?
        }
        .boxed()
    }
}

fn ask_on_terminal(request: &PromptRequest) -> Result<usize, PromptError> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();

    loop {
        writeln!(stdout, "{}: {}", request.title, request.message)?;
        for (index, choice) in request.choices.iter().enumerate() {
            writeln!(stdout, "  {}) {choice}", index + 1)?;
        }
        write!(stdout, "> ")?;
        stdout.flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Err(PromptError::Closed);
        }
        if let Some(index) = parse_choice(&line, &request.choices) {
            return Ok(index);
        }
    }
}

/// Match a typed answer against the choices, by 1-based number or by label.
pub fn parse_choice(input: &str, choices: &[String]) -> Option<usize> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(number) = input.parse::<usize>() {
        return (1..=choices.len()).contains(&number).then(|| number - 1);
    }

    if let Some(index) = choices
        .iter()
        .position(|choice| choice.eq_ignore_ascii_case(input))
    {
        return Some(index);
    }

    // Single-letter shortcuts, as long as they are unambiguous.
    let mut chars = input.chars();
    let (Some(initial), None) = (chars.next(), chars.next()) else {
        return None;
    };
    let mut matching = choices.iter().enumerate().filter(|(_, choice)| {
        choice
            .chars()
            .next()
            .is_some_and(|first| first.eq_ignore_ascii_case(&initial))
    });
    match (matching.next(), matching.next()) {
        (Some((index, _)), None) => Some(index),
        _ => None,
    }
}
