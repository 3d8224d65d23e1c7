//! The read-dispatch-print session loop

use std::io::Write;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace};

use crate::dispatch;
use crate::environment::Environment;
use crate::error::CoreError;
use crate::input::{CommandInput, LineReader};
use crate::reconcile::reconcile;
use crate::state::SessionState;

/// Line printed when the appliances end the session
pub const GOODBYE_LINE: &str = "Goodbye\n";

/// Where commands come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMode {
    /// Every command is typed by the user
    InteractiveOnly,
    /// These commands run first, then the user takes over
    BatchThenInteractive(Vec<String>),
}

impl SessionMode {
    /// Batch mode from the contents of a command file, one command per line
    #[must_use]
    pub fn batch_from_text(text: &str) -> Self {
        SessionMode::BatchThenInteractive(text.lines().map(str::to_string).collect())
    }
}

/// Why the session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// An appliance response contained the goodbye marker
    Goodbye,
    /// The user closed interactive input
    EndOfInput,
}

/// Summary of a finished session
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    pub commands_executed: usize,
    pub appliances: usize,
    pub duration: Duration,
}

/// Drives one session against an environment
///
/// Output is written to `out` and flushed after every block so it is visible
/// before the next prompt.
///
/// State changes are checked against `SessionState::can_transition_to` in
/// debug builds only; release builds record the new state without checking.
pub struct SessionLoop<R, W> {
    environment: Environment,
    input: CommandInput<R>,
    out: W,
    domain: String,
    mode: SessionMode,
    state: SessionState,
    commands_executed: usize,
}

impl<R: LineReader, W: Write> SessionLoop<R, W> {
    /// Create a session loop
    pub fn new(
        environment: Environment,
        reader: R,
        out: W,
        domain: impl Into<String>,
        mode: SessionMode,
    ) -> Self {
        Self {
            environment,
            input: CommandInput::new(reader, ""),
            out,
            domain: domain.into(),
            mode,
            state: SessionState::Connecting,
            commands_executed: 0,
        }
    }

    /// Run until goodbye, end of input or an error
    ///
    /// Sessions are disconnected and the reader finished on every path.
    ///
    /// # Errors
    /// Returns the first appliance, input or output failure
    pub async fn run(&mut self) -> Result<SessionReport, CoreError> {
        let start = Instant::now();
        let result = self.drive().await;

        dispatch::disconnect_all(&mut self.environment).await;
        self.input.finish();

        let outcome = result?;
        info!(
            outcome = ?outcome,
            commands = self.commands_executed,
            "session ended"
        );
        Ok(SessionReport {
            outcome,
            commands_executed: self.commands_executed,
            appliances: self.environment.len(),
            duration: start.elapsed(),
        })
    }

    async fn drive(&mut self) -> Result<SessionOutcome, CoreError> {
        let banners = dispatch::connect_all(&mut self.environment, &self.domain).await?;

        self.transition(SessionState::InitialDisplay);
        let initial = reconcile(&banners, &self.environment.hostnames());
        self.display(&initial.display)?;
        self.input.set_prompt(initial.prompt);

        if let SessionMode::BatchThenInteractive(lines) = &mut self.mode {
            for line in std::mem::take(lines) {
                self.input.enqueue(line);
            }
            debug!(queued = self.input.pending(), "batch commands queued");
        }

        loop {
            self.transition(SessionState::AwaitingCommand);
            let command = match self.input.next_command() {
                Ok(command) => command,
                Err(e) if e.is_end_of_input() => {
                    self.transition(SessionState::Terminated);
                    return Ok(SessionOutcome::EndOfInput);
                }
                Err(e) => return Err(e.into()),
            };

            self.transition(SessionState::Dispatching);
            let responses = dispatch::send_to_all(&command, &mut self.environment).await?;
            self.commands_executed += 1;

            self.transition(SessionState::Reconciling);
            let reconciled = reconcile(&responses, &self.environment.hostnames());
            let finished = reconciled.is_goodbye();

            self.transition(SessionState::Displaying);
            self.display(&reconciled.display)?;
            self.input.set_prompt(reconciled.prompt);

            if finished {
                self.display(GOODBYE_LINE)?;
                self.transition(SessionState::Terminated);
                return Ok(SessionOutcome::Goodbye);
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        trace!(from = %self.state, to = %next, "session state");
        self.state = next;
    }

    fn display(&mut self, text: &str) -> Result<(), CoreError> {
        self.out.write_all(text.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}
