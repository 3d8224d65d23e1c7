//! dpshell
//!
//! Interactive shell that relays CLI commands to one or more appliances over
//! SSH and shows their answers as one.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{ArgAction, Parser};
use color_eyre::Result;
use dpshell_core::{EditorReader, SessionLoop, SessionMode};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod config;
mod factory;

use config::Config;

/// Exit status for a bad batch file argument
const USAGE_EXIT_CODE: i32 = -1;

#[derive(Parser, Debug)]
#[command(name = "dpshell", version)]
#[command(about = "Send CLI commands to several appliances at once", long_about = None)]
struct Cli {
    /// Appliance to connect to, repeatable
    #[arg(short, long = "appliance", value_name = "HOST[:PORT]")]
    appliances: Vec<String>,

    /// Credentials, one for all appliances or one per appliance
    #[arg(short, long = "credentials", value_name = "USER:PASSWORD")]
    credentials: Vec<String>,

    /// Application domain to log into
    #[arg(short, long)]
    domain: Option<String>,

    /// File of commands to run before the interactive prompt, one per line
    #[arg(short, long, value_name = "PATH")]
    input_file: Option<PathBuf>,

    /// Seconds to wait for each appliance response
    #[arg(short, long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Command history file
    #[arg(long, value_name = "PATH")]
    history_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(Config::locate);
    let config = match &config_path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    init_tracing(cli.verbose, config.session.log_level.as_deref());
    match &config_path {
        Some(path) => debug!(path = %path.display(), "loaded config"),
        None => debug!("no config file found, using defaults"),
    }

    let mode = match &cli.input_file {
        Some(path) => batch_mode(path)?,
        None => SessionMode::InteractiveOnly,
    };

    let timeout = cli
        .timeout
        .map_or_else(|| config.session.timeout(), Duration::from_secs);
    let domain = cli
        .domain
        .clone()
        .unwrap_or_else(|| config.session.domain.clone());
    let history = cli
        .history_file
        .clone()
        .or_else(|| config.session.history_path());

    let targets = factory::resolve_targets(&cli.appliances, &cli.credentials, &config)?;
    let environment = factory::build_environment(targets, timeout)?;
    let reader = EditorReader::new(history)?;

    let mut session = SessionLoop::new(environment, reader, std::io::stdout(), domain, mode);
    let report = session.run().await?;

    info!(
        outcome = ?report.outcome,
        commands = report.commands_executed,
        appliances = report.appliances,
        duration = ?report.duration,
        "dpshell finished"
    );

    Ok(())
}

/// Read a batch file, exiting with a usage error if it is not a regular file
fn batch_mode(path: &Path) -> Result<SessionMode> {
    if !path.is_file() {
        println!("input_file must be a file containing cli commands to issue");
        std::process::exit(USAGE_EXIT_CODE);
    }
    let text = std::fs::read_to_string(path)?;
    Ok(SessionMode::batch_from_text(&text))
}

/// Log to stderr so appliance output on stdout stays byte-exact
fn init_tracing(verbose: u8, configured: Option<&str>) {
    let level = match verbose {
        0 => configured.unwrap_or("warn"),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_repeated_appliances() {
        let cli = Cli::try_parse_from([
            "dpshell",
            "-a",
            "dp1",
            "-a",
            "dp2:2222",
            "-c",
            "admin:pw",
            "-d",
            "production",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.appliances, vec!["dp1", "dp2:2222"]);
        assert_eq!(cli.credentials, vec!["admin:pw"]);
        assert_eq!(cli.domain.as_deref(), Some("production"));
        assert_eq!(cli.verbose, 2);
        assert!(cli.input_file.is_none());
    }

    #[test]
    fn test_cli_long_options() {
        let cli = Cli::try_parse_from([
            "dpshell",
            "--appliance",
            "dp1",
            "--input-file",
            "commands.txt",
            "--timeout",
            "5",
            "--history-file",
            "/tmp/history",
        ])
        .unwrap();

        assert_eq!(cli.input_file, Some(PathBuf::from("commands.txt")));
        assert_eq!(cli.timeout, Some(5));
        assert_eq!(cli.history_file, Some(PathBuf::from("/tmp/history")));
    }

    #[test]
    fn test_batch_mode_reads_lines() {
        let path = std::env::temp_dir().join(format!("dpshell_batch_{}", std::process::id()));
        std::fs::write(&path, "show clock\nshow version\n").unwrap();

        let mode = batch_mode(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(
            mode,
            SessionMode::BatchThenInteractive(vec![
                "show clock".to_string(),
                "show version".to_string()
            ])
        );
    }
}
