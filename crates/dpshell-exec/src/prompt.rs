//! Recognizing the appliance CLI's input cues in raw shell output

/// What the appliance is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// `login: `
    Login,
    /// `Password: `
    Password,
    /// `Domain: ` or `Domain (? for all): `
    Domain,
    /// A command prompt such as `xi52# ` or `xi52(config)# `
    Command,
}

/// Classify the trailing line of `output`
///
/// Returns `None` unless the output ends in a prompt: a final line that does
/// not end in a line break and ends with a space after the cue character.
#[must_use]
pub fn detect(output: &str) -> Option<PromptKind> {
    let last = output.rsplit('\n').next().unwrap_or(output);
    let last = last.trim_start_matches('\r');
    if !last.ends_with(' ') {
        return None;
    }

    let cue = last.trim_end().to_ascii_lowercase();
    if cue.ends_with("login:") {
        Some(PromptKind::Login)
    } else if cue.ends_with("password:") {
        Some(PromptKind::Password)
    } else if cue.starts_with("domain") && cue.ends_with(':') {
        Some(PromptKind::Domain)
    } else if cue.ends_with('#') || cue.ends_with('>') {
        Some(PromptKind::Command)
    } else {
        None
    }
}

/// Shell output collected so far, checked for a prompt as it grows
///
/// Only the bytes after the last line break are decoded on each push.
#[derive(Debug, Default)]
pub struct PromptScanner {
    buf: Vec<u8>,
    line_start: usize,
}

impl PromptScanner {
    /// Append a chunk and classify the new trailing line
    pub fn push(&mut self, data: &[u8]) -> Option<PromptKind> {
        let fresh = self.buf.len();
        self.buf.extend_from_slice(data);
        if let Some(pos) = data.iter().rposition(|&b| b == b'\n') {
            self.line_start = fresh + pos + 1;
        }
        detect(&String::from_utf8_lossy(&self.buf[self.line_start..]))
    }

    /// Everything pushed so far
    #[must_use]
    pub fn into_text(self) -> String {
        String::from_utf8_lossy(&self.buf).into_owned()
    }
}

/// Upper bound on login exchanges before giving up
pub const MAX_LOGIN_STEPS: usize = 8;

/// Which login answer to type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    User,
    Password,
    Domain,
}

/// What to do after reading up to a login cue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStep {
    /// Type the given answer
    Reply(LoginField),
    /// Command prompt reached, login done
    Ready,
    /// Shell closed before a command prompt
    Closed,
    /// `login:` shown again, the appliance refused the credentials
    Rejected,
    /// `MAX_LOGIN_STEPS` cues answered without a command prompt
    Exhausted,
}

/// Drives the login exchange one cue at a time
#[derive(Debug, Default)]
pub struct LoginSequence {
    steps: usize,
    logins: usize,
}

impl LoginSequence {
    /// Decide the next step for the cue that ended the last read
    pub fn next_step(&mut self, cue: Option<PromptKind>) -> LoginStep {
        let field = match cue {
            None => return LoginStep::Closed,
            Some(PromptKind::Command) => return LoginStep::Ready,
            Some(PromptKind::Login) => {
                self.logins += 1;
                if self.logins > 1 {
                    return LoginStep::Rejected;
                }
                LoginField::User
            }
            Some(PromptKind::Password) => LoginField::Password,
            Some(PromptKind::Domain) => LoginField::Domain,
        };

        self.steps += 1;
        if self.steps > MAX_LOGIN_STEPS {
            return LoginStep::Exhausted;
        }
        LoginStep::Reply(field)
    }
}
