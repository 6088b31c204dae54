//! Argument parsing, configuration layering and command dispatch.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::anyhow;
use clap::{Args, Parser, Subcommand, ValueEnum};
use relink_config::{ConfigError, ConfigLoader, RelinkConfig, Verbosity, validate};
use relink_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
use uuid::Uuid;

use crate::client::{CliDependencies, CliError, CliResult, RunSummary, TelemetryEmitter};
use crate::commands::symlink::handle_symlink;

/// Entry point of the `relink` binary. Returns the process exit code after
/// reporting the run summary when telemetry is configured.
pub async fn run() -> i32 {
    let started = Instant::now();
    let cli = Cli::parse();
    let command_name = command_label(&cli.command);
    let site_env = cli.command.site_env().to_string();
    let trace_id = Uuid::new_v4().to_string();
    let telemetry = TelemetryEmitter::from_env();

    let (exit_code, message) = match execute(cli, &trace_id).await {
        Ok(()) => (0, None),
        Err(err) => {
            let message = err.display_message();
            eprintln!("error: {message}");
            (err.exit_code(), Some(message))
        }
    };

    if let Some(emitter) = &telemetry {
        emitter
            .emit(&RunSummary {
                trace_id: &trace_id,
                command: command_name,
                site_env: &site_env,
                succeeded: exit_code == 0,
                exit_code,
                error: message.as_deref(),
                elapsed_ms: RunSummary::elapsed_ms(started),
                build_sha: build_sha(),
            })
            .await;
    }

    exit_code
}

async fn execute(cli: Cli, trace_id: &str) -> CliResult<()> {
    install_logging(&cli)?;
    let config = load_config(&cli)?;
    let deps = CliDependencies::from_settings(&config.api, trace_id)?;
    dispatch(cli, &config, &deps).await
}

async fn dispatch(cli: Cli, config: &RelinkConfig, deps: &CliDependencies) -> CliResult<()> {
    match cli.command {
        Command::Symlink(args) => handle_symlink(deps, config, args, cli.output).await,
    }
}

#[derive(Parser)]
#[command(
    name = "relink",
    about = "Replace paths on hosted site environments with symlinks into the files area"
)]
pub(crate) struct Cli {
    #[arg(long, global = true, help = "Hosting API base URL")]
    pub(crate) api_url: Option<String>,
    #[arg(long, global = true, help = "Session token sent as a bearer credential")]
    pub(crate) session_token: Option<String>,
    #[arg(long, global = true, help = "HTTP timeout in seconds")]
    pub(crate) timeout: Option<u64>,
    #[arg(
        long,
        global = true,
        env = "RELINK_CONFIG",
        help = "JSON configuration file (defaults to ~/.relink/config.json when present)"
    )]
    pub(crate) config: Option<PathBuf>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for the provisioning report"
    )]
    pub(crate) output: OutputFormat,
    #[arg(
        long,
        global = true,
        env = "RELINK_LOG_FORMAT",
        value_parser = parse_log_format,
        default_value = "pretty",
        help = "Log output format (pretty or json)"
    )]
    pub(crate) log_format: LogFormat,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Replace a remote path with a symlink into the symlink target root.
    #[command(name = "remote:symlink", visible_alias = "symlink")]
    Symlink(SymlinkArgs),
}

impl Command {
    const fn verbose(&self) -> bool {
        match self {
            Self::Symlink(args) => args.verbose,
        }
    }

    fn site_env(&self) -> &str {
        match self {
            Self::Symlink(args) => &args.site_env,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub(crate) struct SymlinkArgs {
    #[arg(value_name = "SITE.ENV", help = "Target site environment, e.g. acme.dev")]
    pub(crate) site_env: String,
    #[arg(value_name = "SOURCE", help = "Remote path to replace, e.g. wp-content/cache")]
    pub(crate) source: String,
    #[arg(long, help = "Name under the symlink target root (defaults to the source name)")]
    pub(crate) destination: Option<String>,
    #[arg(
        long = "transfer-existing",
        alias = "transfer_existing",
        help = "Move the current source content to the destination"
    )]
    pub(crate) transfer_existing: bool,
    #[arg(
        long = "pointtofile",
        help = "Create an empty file instead of a directory when nothing is transferred"
    )]
    pub(crate) point_to_file: bool,
    #[arg(long, short, help = "Stream transfer output and log at debug level")]
    pub(crate) verbose: bool,
    #[arg(long, help = "Log transfer commands without running them")]
    pub(crate) dry_run: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Table,
    Json,
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Symlink(_) => "remote_symlink",
    }
}

fn parse_log_format(input: &str) -> Result<LogFormat, String> {
    input
        .parse::<LogFormat>()
        .map_err(|err| format!("{err}: '{input}'"))
}

fn install_logging(cli: &Cli) -> CliResult<()> {
    let level = if cli.command.verbose() {
        "debug"
    } else {
        DEFAULT_LOG_LEVEL
    };
    init_logging(&LoggingConfig {
        level,
        format: cli.log_format,
        build_sha: build_sha(),
    })
    .map_err(|err| CliError::failure(anyhow!("failed to initialise logging: {err}")))
}

/// Layer command-line flags over the loaded configuration and validate the
/// result.
pub(crate) fn load_config(cli: &Cli) -> CliResult<RelinkConfig> {
    load_config_from(cli, ConfigLoader::new())
}

fn load_config_from(cli: &Cli, mut loader: ConfigLoader) -> CliResult<RelinkConfig> {
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }
    let mut config = loader.load().map_err(config_error)?;
    apply_flags(&mut config, cli);
    validate(&config).map_err(config_error)?;
    Ok(config)
}

fn apply_flags(config: &mut RelinkConfig, cli: &Cli) {
    if let Some(url) = &cli.api_url {
        config.api.base_url.clone_from(url);
    }
    if let Some(token) = &cli.session_token {
        config.api.session_token = Some(token.clone());
    }
    if let Some(timeout) = cli.timeout {
        config.api.timeout_secs = timeout;
    }
    if cli.command.verbose() {
        config.transfer.verbosity = Verbosity::Verbose;
    }
}

fn config_error(err: ConfigError) -> CliError {
    CliError::validation(format!("invalid configuration: {}", err.detail()))
}
