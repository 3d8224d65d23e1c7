use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use dpshell_core::*;
use dpshell_exec::{ApplianceClient, ExecError};

// Mock implementations
#[derive(Default)]
struct Log {
    commands: Vec<(String, String)>,
    disconnected: Vec<String>,
}

struct MockAppliance {
    name: String,
    banner: String,
    responses: HashMap<String, String>,
    fail_on: Option<String>,
    fail_connect: bool,
    connected: bool,
    log: Arc<Mutex<Log>>,
}

impl MockAppliance {
    fn new(name: &str, log: &Arc<Mutex<Log>>) -> Self {
        Self {
            name: name.to_string(),
            banner: "Welcome to DataPower\nxi52# ".to_string(),
            responses: HashMap::new(),
            fail_on: None,
            fail_connect: false,
            connected: false,
            log: Arc::clone(log),
        }
    }

    fn respond(mut self, command: &str, response: &str) -> Self {
        self.responses
            .insert(command.to_string(), response.to_string());
        self
    }

    fn fail_on(mut self, command: &str) -> Self {
        self.fail_on = Some(command.to_string());
        self
    }

    fn banner(mut self, banner: &str) -> Self {
        self.banner = banner.to_string();
        self
    }

    fn fail_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }
}

#[async_trait]
impl ApplianceClient for MockAppliance {
    fn hostname(&self) -> &str {
        &self.name
    }

    async fn connect(&mut self, _domain: &str) -> Result<String, ExecError> {
        if self.fail_connect {
            return Err(ExecError::ConnectionFailed("connection refused".to_string()));
        }
        self.connected = true;
        Ok(self.banner.clone())
    }

    async fn execute(&mut self, command: &str) -> Result<String, ExecError> {
        self.log
            .lock()
            .unwrap()
            .commands
            .push((self.name.clone(), command.to_string()));
        if self.fail_on.as_deref() == Some(command) {
            return Err(ExecError::IoError("broken pipe".to_string()));
        }
        Ok(self
            .responses
            .get(command)
            .cloned()
            .unwrap_or_else(|| format!("{command}: ok\nxi52# ")))
    }

    async fn disconnect(&mut self) -> Result<(), ExecError> {
        self.connected = false;
        self.log.lock().unwrap().disconnected.push(self.name.clone());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

#[derive(Default)]
struct ScriptedReader {
    lines: VecDeque<String>,
    prompts: Arc<Mutex<Vec<String>>>,
    interrupt_at_end: bool,
}

impl ScriptedReader {
    fn new(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|l| (*l).to_string()).collect(),
            prompts: Arc::default(),
            interrupt_at_end: false,
        }
    }

    /// Finish with Ctrl-C instead of Ctrl-D
    fn interrupted(mut self) -> Self {
        self.interrupt_at_end = true;
        self
    }
}

impl LineReader for ScriptedReader {
    fn read_line(&mut self, prompt: &str) -> Result<String, InputError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.lines.pop_front() {
            Some(line) => Ok(line),
            None if self.interrupt_at_end => Err(InputError::Interrupted),
            None => Err(InputError::EndOfInput),
        }
    }
}

fn environment(appliances: Vec<MockAppliance>) -> Environment {
    let boxed: Vec<Box<dyn ApplianceClient>> = appliances
        .into_iter()
        .map(|a| Box::new(a) as Box<dyn ApplianceClient>)
        .collect();
    Environment::new(boxed).unwrap()
}

async fn run_session(
    env: Environment,
    reader: ScriptedReader,
    mode: SessionMode,
) -> (Result<SessionReport, CoreError>, String) {
    let mut out = Vec::new();
    let result = {
        let mut session = SessionLoop::new(env, reader, &mut out, "default", mode);
        session.run().await
    };
    (result, String::from_utf8(out).unwrap())
}

#[tokio::test]
async fn test_identical_appliances_look_like_one() {
    let log = Arc::default();
    let env = environment(vec![
        MockAppliance::new("dp1", &log),
        MockAppliance::new("dp2", &log),
    ]);
    let reader = ScriptedReader::new(&["show clock"]);
    let prompts = Arc::clone(&reader.prompts);

    let (result, output) = run_session(env, reader, SessionMode::InteractiveOnly).await;
    let report = result.unwrap();

    assert_eq!(report.outcome, SessionOutcome::EndOfInput);
    assert_eq!(report.commands_executed, 1);
    assert_eq!(output, "Welcome to DataPower\nshow clock: ok\n");
    assert_eq!(*prompts.lock().unwrap(), vec!["xi52#  ", "xi52#  "]);
}

#[tokio::test]
async fn test_differing_appliances_are_attributed() {
    let log = Arc::default();
    let env = environment(vec![
        MockAppliance::new("dp1", &log).respond("show version", "7.5\nxi52# "),
        MockAppliance::new("dp2", &log).respond("show version", "10.0\nxi52# "),
    ]);
    let reader = ScriptedReader::new(&["show version"]);
    let prompts = Arc::clone(&reader.prompts);

    let (result, output) = run_session(env, reader, SessionMode::InteractiveOnly).await;
    result.unwrap();

    assert_eq!(
        output,
        "Welcome to DataPower\n\n\ndp1\n----\n\n7.5\nxi52# \n\ndp2\n----\n\n10.0\nxi52# \n\n"
    );
    assert_eq!(prompts.lock().unwrap()[1], ">  ");
}

#[tokio::test]
async fn test_differing_banners_are_attributed() {
    let log = Arc::default();
    let env = environment(vec![
        MockAppliance::new("dp1", &log).banner("Welcome to DataPower\nxi52# "),
        MockAppliance::new("dp2", &log).banner("Welcome to DataPower\nxi53# "),
    ]);
    let reader = ScriptedReader::new(&["show clock"]);
    let prompts = Arc::clone(&reader.prompts);

    let (result, output) = run_session(env, reader, SessionMode::InteractiveOnly).await;
    result.unwrap();

    assert!(output.starts_with(
        "\n\ndp1\n----\n\nWelcome to DataPower\nxi52# \n\ndp2\n----\n\nWelcome to DataPower\nxi53# \n\n"
    ));
    assert!(output.ends_with("show clock: ok\n"));
    let prompts = prompts.lock().unwrap();
    assert_eq!(prompts[0], ">  ");
    assert_eq!(prompts[1], "xi52#  ");
}

#[tokio::test]
async fn test_goodbye_in_banner_does_not_end_session() {
    let log: Arc<Mutex<Log>> = Arc::default();
    let env = environment(vec![
        MockAppliance::new("dp1", &log).banner("Goodbye to the old firmware\nxi52# "),
    ]);
    let reader = ScriptedReader::new(&["show clock"]);

    let (result, output) = run_session(env, reader, SessionMode::InteractiveOnly).await;
    let report = result.unwrap();

    assert_eq!(report.outcome, SessionOutcome::EndOfInput);
    assert_eq!(report.commands_executed, 1);
    assert!(!output.ends_with("Goodbye\n"));
    assert_eq!(log.lock().unwrap().commands.len(), 1);
}

#[tokio::test]
async fn test_connect_failure_disconnects_earlier_appliances() {
    let log: Arc<Mutex<Log>> = Arc::default();
    let env = environment(vec![
        MockAppliance::new("dp1", &log),
        MockAppliance::new("dp2", &log).fail_connect(),
        MockAppliance::new("dp3", &log),
    ]);
    let reader = ScriptedReader::new(&["show clock"]);
    let prompts = Arc::clone(&reader.prompts);

    let (result, output) = run_session(env, reader, SessionMode::InteractiveOnly).await;

    match result {
        Err(CoreError::Appliance { host, .. }) => assert_eq!(host, "dp2"),
        other => panic!("expected appliance error, got {other:?}"),
    }
    assert!(output.is_empty());
    assert!(prompts.lock().unwrap().is_empty());

    let log = log.lock().unwrap();
    assert!(log.commands.is_empty());
    assert_eq!(log.disconnected, vec!["dp1"]);
}

#[tokio::test]
async fn test_interrupt_ends_session_like_end_of_input() {
    let log: Arc<Mutex<Log>> = Arc::default();
    let env = environment(vec![MockAppliance::new("dp1", &log)]);
    let reader = ScriptedReader::new(&["show clock"]).interrupted();

    let (result, _output) = run_session(env, reader, SessionMode::InteractiveOnly).await;
    let report = result.unwrap();

    assert_eq!(report.outcome, SessionOutcome::EndOfInput);
    assert_eq!(report.commands_executed, 1);
    assert_eq!(log.lock().unwrap().disconnected, vec!["dp1"]);
}

#[tokio::test]
async fn test_goodbye_stops_dispatch() {
    let log: Arc<Mutex<Log>> = Arc::default();
    let env = environment(vec![
        MockAppliance::new("dp1", &log).respond("exit", "Goodbye.\n"),
        MockAppliance::new("dp2", &log).respond("exit", "Goodbye.\n"),
    ]);
    let reader = ScriptedReader::new(&["exit", "show clock"]);
    let prompts = Arc::clone(&reader.prompts);

    let (result, output) = run_session(env, reader, SessionMode::InteractiveOnly).await;
    let report = result.unwrap();

    assert_eq!(report.outcome, SessionOutcome::Goodbye);
    assert!(output.ends_with("Goodbye.\nGoodbye\n"));
    assert_eq!(prompts.lock().unwrap().len(), 1);

    let log = log.lock().unwrap();
    assert!(log.commands.iter().all(|(_, cmd)| cmd == "exit"));
    assert_eq!(log.disconnected, vec!["dp1", "dp2"]);
}

#[tokio::test]
async fn test_batch_then_interactive() {
    let log: Arc<Mutex<Log>> = Arc::default();
    let env = environment(vec![MockAppliance::new("dp1", &log)]);
    let reader = ScriptedReader::new(&["c"]);
    let prompts = Arc::clone(&reader.prompts);
    let mode = SessionMode::batch_from_text("a\nb\n");

    let (result, output) = run_session(env, reader, mode).await;
    let report = result.unwrap();

    assert_eq!(report.commands_executed, 3);
    assert_eq!(output, "Welcome to DataPower\na: ok\nb: ok\nc: ok\n");
    // only "c" and the final end-of-input read were interactive
    assert_eq!(prompts.lock().unwrap().len(), 2);

    let sent: Vec<String> = log
        .lock()
        .unwrap()
        .commands
        .iter()
        .map(|(_, cmd)| cmd.clone())
        .collect();
    assert_eq!(sent, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_goodbye_in_batch_skips_remaining_lines() {
    let log: Arc<Mutex<Log>> = Arc::default();
    let env = environment(vec![
        MockAppliance::new("dp1", &log).respond("exit", "Goodbye.\n"),
    ]);
    let reader = ScriptedReader::new(&["never"]);
    let prompts = Arc::clone(&reader.prompts);
    let mode = SessionMode::batch_from_text("show clock\nexit\nshow version\n");

    let (result, _output) = run_session(env, reader, mode).await;

    assert_eq!(result.unwrap().outcome, SessionOutcome::Goodbye);
    assert!(prompts.lock().unwrap().is_empty());
    assert_eq!(log.lock().unwrap().commands.len(), 2);
}

#[tokio::test]
async fn test_failure_aborts_round() {
    let log: Arc<Mutex<Log>> = Arc::default();
    let env = environment(vec![
        MockAppliance::new("dp1", &log),
        MockAppliance::new("dp2", &log).fail_on("show clock"),
        MockAppliance::new("dp3", &log),
    ]);
    let reader = ScriptedReader::new(&["show clock"]);

    let (result, _output) = run_session(env, reader, SessionMode::InteractiveOnly).await;

    match result {
        Err(CoreError::Appliance { host, .. }) => assert_eq!(host, "dp2"),
        other => panic!("expected appliance error, got {other:?}"),
    }

    let log = log.lock().unwrap();
    let hosts: Vec<&str> = log.commands.iter().map(|(h, _)| h.as_str()).collect();
    assert_eq!(hosts, vec!["dp1", "dp2"]);
    assert_eq!(log.disconnected.len(), 3);
}

#[tokio::test]
async fn test_responses_keep_appliance_order() {
    let log: Arc<Mutex<Log>> = Arc::default();
    let mut env = environment(vec![
        MockAppliance::new("a0", &log).respond("who", "a0"),
        MockAppliance::new("a1", &log).respond("who", "a1"),
        MockAppliance::new("a2", &log).respond("who", "a2"),
    ]);

    for _ in 0..3 {
        let responses = dpshell_core::dispatch::send_to_all("who", &mut env)
            .await
            .unwrap();
        assert_eq!(responses, vec!["a0", "a1", "a2"]);
    }
}

#[test]
fn test_empty_environment_rejected() {
    assert!(matches!(
        Environment::new(Vec::new()),
        Err(CoreError::ConfigError(_))
    ));
}
