//! Command input: queued commands first, then the interactive line editor

use std::collections::VecDeque;
use std::path::PathBuf;

use rustyline::DefaultEditor;
use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use thiserror::Error;
use tracing::{debug, warn};

/// Maximum number of entries kept in the history file
pub const MAX_HISTORY: usize = 1000;

/// Why no command could be read
#[derive(Error, Debug)]
pub enum InputError {
    /// Input stream exhausted (Ctrl-D or end of piped input)
    #[error("end of input")]
    EndOfInput,

    /// User interrupted the read (Ctrl-C)
    #[error("interrupted")]
    Interrupted,

    /// Line editor failure
    #[error("line editor: {0}")]
    Reader(String),
}

impl InputError {
    /// Whether the error ends the session cleanly
    #[must_use]
    pub fn is_end_of_input(&self) -> bool {
        matches!(self, InputError::EndOfInput | InputError::Interrupted)
    }
}

/// Blocking source of interactively typed lines
pub trait LineReader {
    /// Show `prompt` without a line break and read one line
    ///
    /// # Errors
    /// Returns `InputError::EndOfInput` once input is exhausted
    fn read_line(&mut self, prompt: &str) -> Result<String, InputError>;

    /// Called once when the session ends
    fn finish(&mut self) {}
}

/// Where the next command comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandSource {
    /// Head of the queue
    Queued(String),
    /// Queue empty, ask the user
    Interactive,
}

/// FIFO of pending commands backed by a line reader
#[derive(Debug)]
pub struct CommandInput<R> {
    queue: VecDeque<String>,
    prompt: String,
    reader: R,
}

impl<R: LineReader> CommandInput<R> {
    /// Create an empty input with the given prompt
    pub fn new(reader: R, prompt: impl Into<String>) -> Self {
        Self {
            queue: VecDeque::new(),
            prompt: prompt.into(),
            reader,
        }
    }

    /// Append a command to the tail of the queue
    pub fn enqueue(&mut self, command: impl Into<String>) {
        self.queue.push_back(command.into());
    }

    /// Number of queued commands
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Prompt shown on the next interactive read
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Replace the prompt
    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    /// Take the head of the queue, or decide to read interactively
    fn next_source(&mut self) -> CommandSource {
        match self.queue.pop_front() {
            Some(command) => CommandSource::Queued(command),
            None => CommandSource::Interactive,
        }
    }

    /// Next command: the queue head, else a line typed at the current prompt
    ///
    /// # Errors
    /// Returns `InputError::EndOfInput` when the queue is empty and
    /// interactive input is exhausted
    pub fn next_command(&mut self) -> Result<String, InputError> {
        match self.next_source() {
            CommandSource::Queued(command) => {
                debug!(remaining = self.queue.len(), "took queued command");
                Ok(command)
            }
            CommandSource::Interactive => self.reader.read_line(&self.prompt),
        }
    }

    /// Signal the reader that the session is over
    pub fn finish(&mut self) {
        self.reader.finish();
    }

    /// Access the underlying reader
    pub fn reader(&self) -> &R {
        &self.reader
    }
}

/// `rustyline` editor with a persistent history file
pub struct EditorReader {
    editor: DefaultEditor,
    history: Option<PathBuf>,
}

impl std::fmt::Debug for EditorReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorReader")
            .field("history", &self.history)
            .finish_non_exhaustive()
    }
}

impl EditorReader {
    /// Create an editor, loading history from `history` when it exists
    ///
    /// # Errors
    /// Returns `InputError::Reader` if the terminal cannot be set up
    pub fn new(history: Option<PathBuf>) -> Result<Self, InputError> {
        let mut editor = DefaultEditor::new().map_err(|e| InputError::Reader(e.to_string()))?;
        editor
            .set_max_history_size(MAX_HISTORY)
            .map_err(|e| InputError::Reader(e.to_string()))?;

        if let Some(path) = &history {
            if path.exists() {
                if let Err(e) = editor.load_history(path) {
                    warn!(path = %path.display(), error = %e, "failed to load history");
                }
            }
        }

        Ok(Self { editor, history })
    }
}

impl LineReader for EditorReader {
    fn read_line(&mut self, prompt: &str) -> Result<String, InputError> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(line)
            }
            Err(ReadlineError::Eof) => Err(InputError::EndOfInput),
            Err(ReadlineError::Interrupted) => Err(InputError::Interrupted),
            Err(e) => Err(InputError::Reader(e.to_string())),
        }
    }

    fn finish(&mut self) {
        if let Some(path) = &self.history {
            if let Err(e) = self.editor.save_history(path) {
                warn!(path = %path.display(), error = %e, "failed to save history");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reader that replays lines and records the prompts it was shown
    #[derive(Default)]
    struct ScriptedReader {
        lines: VecDeque<String>,
        prompts: Vec<String>,
    }

    impl LineReader for ScriptedReader {
        fn read_line(&mut self, prompt: &str) -> Result<String, InputError> {
            self.prompts.push(prompt.to_string());
            self.lines.pop_front().ok_or(InputError::EndOfInput)
        }
    }

    #[test]
    fn test_queue_before_interactive() {
        let reader = ScriptedReader {
            lines: VecDeque::from(vec!["typed".to_string()]),
            ..Default::default()
        };
        let mut input = CommandInput::new(reader, "xi52# ");
        input.enqueue("a");
        input.enqueue("b");

        assert_eq!(input.next_command().unwrap(), "a");
        assert_eq!(input.next_command().unwrap(), "b");
        assert!(input.reader().prompts.is_empty());

        assert_eq!(input.next_command().unwrap(), "typed");
        assert_eq!(input.reader().prompts, vec!["xi52# "]);
    }

    #[test]
    fn test_prompt_read_fresh() {
        let reader = ScriptedReader {
            lines: VecDeque::from(vec!["one".to_string(), "two".to_string()]),
            ..Default::default()
        };
        let mut input = CommandInput::new(reader, "first# ");

        input.next_command().unwrap();
        input.set_prompt("second# ");
        input.next_command().unwrap();

        assert_eq!(input.reader().prompts, vec!["first# ", "second# "]);
    }

    #[test]
    fn test_end_of_input() {
        let mut input = CommandInput::new(ScriptedReader::default(), "> ");
        let err = input.next_command().unwrap_err();
        assert!(err.is_end_of_input());
    }

    #[test]
    fn test_next_source() {
        let mut input = CommandInput::new(ScriptedReader::default(), "> ");
        input.enqueue("show clock");
        assert_eq!(
            input.next_source(),
            CommandSource::Queued("show clock".to_string())
        );
        assert_eq!(input.next_source(), CommandSource::Interactive);
        assert_eq!(input.pending(), 0);
    }
}
