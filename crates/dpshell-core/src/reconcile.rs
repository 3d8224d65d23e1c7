//! Response reconciliation
//!
//! When every appliance answers a command identically the answer is shown
//! once, as if there were a single appliance. Otherwise each response is shown
//! under its appliance's hostname. Either way the last line of the result is
//! the appliance prompt: it is held back from the output and becomes the
//! prompt for the next command.

/// Substring that marks the end of the remote session
pub const GOODBYE: &str = "Goodbye";

/// Trailer appended after per-appliance output
const PER_APPLIANCE_TRAILER: &str = "\n\n> ";

/// Output of one reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    /// Text to print, always ending in a line break
    pub display: String,
    /// Prompt for the next interactive read, always ending in a space
    pub prompt: String,
}

impl Reconciled {
    /// Whether the appliances said goodbye
    #[must_use]
    pub fn is_goodbye(&self) -> bool {
        self.prompt.contains(GOODBYE) || self.display.contains(GOODBYE)
    }
}

/// True when every response equals the first (vacuously true for zero or one)
#[must_use]
pub fn all_identical(responses: &[String]) -> bool {
    match responses.split_first() {
        Some((first, rest)) => rest.iter().all(|r| r == first),
        None => true,
    }
}

/// Render responses as one block of text before the prompt is split off
#[must_use]
pub fn render<S: AsRef<str>>(responses: &[String], hostnames: &[S]) -> String {
    if all_identical(responses) {
        return responses.first().cloned().unwrap_or_default();
    }

    let mut text = String::new();
    for (hostname, response) in hostnames.iter().zip(responses) {
        text.push_str("\n\n");
        text.push_str(hostname.as_ref());
        text.push_str("\n----\n\n");
        text.push_str(response);
    }
    text.push_str(PER_APPLIANCE_TRAILER);
    text
}

/// Split rendered text into the printed part and the next prompt
///
/// Everything after the final line break (possibly nothing) plus a space is
/// the prompt. The lines before it are rejoined with `\n` and given a trailing
/// `\n`. A `\r` directly before a line break belongs to the line break.
#[must_use]
pub fn split_prompt(text: &str) -> Reconciled {
    let (body, last) = match text.rfind('\n') {
        Some(idx) => (Some(&text[..idx]), &text[idx + 1..]),
        None => (None, text),
    };

    let mut display = String::with_capacity(text.len() + 1);
    if let Some(body) = body {
        for (i, line) in body.split('\n').enumerate() {
            if i > 0 {
                display.push('\n');
            }
            display.push_str(line.strip_suffix('\r').unwrap_or(line));
        }
    }
    display.push('\n');

    Reconciled {
        display,
        prompt: format!("{last} "),
    }
}

/// Reconcile one round of responses from appliances named `hostnames`
#[must_use]
pub fn reconcile<S: AsRef<str>>(responses: &[String], hostnames: &[S]) -> Reconciled {
    split_prompt(&render(responses, hostnames))
}
