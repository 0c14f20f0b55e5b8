/// Version injected at compile time via ESDETECTOR_VERSION env var (set by CI/CD),
/// or the crate version for local builds.
pub const VERSION: &str = match option_env!("ESDETECTOR_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use esdetector::config::Config;
use esdetector::es::ProviderContext;
use esdetector::host::{Host, Refreshed};
use esdetector::schema::PlanAction;
use esdetector::state::StateFile;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Manage OpenDistro anomaly detectors declaratively
#[derive(Parser, Debug)]
#[command(name = "esdetector", version = VERSION, about, long_about = None)]
struct Args {
    /// Elasticsearch endpoint
    #[arg(long, global = true)]
    url: Option<String>,

    /// Basic auth user
    #[arg(long, global = true)]
    username: Option<String>,

    /// Basic auth password
    #[arg(long, global = true)]
    password: Option<String>,

    /// Server version, skips detection (e.g. 7.10.2)
    #[arg(long, global = true)]
    es_version: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    insecure: bool,

    /// State file location
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show what apply would do
    Plan {
        name: String,
        /// Detector JSON file, `-` for stdin
        #[arg(long)]
        body: PathBuf,
    },
    /// Create or update a detector to match its declared body
    Apply {
        name: String,
        /// Detector JSON file, `-` for stdin
        #[arg(long)]
        body: PathBuf,
    },
    /// Re-read detectors from the server (all when no name is given)
    Refresh { names: Vec<String> },
    /// Delete a detector and forget it
    Destroy { name: String },
    /// Adopt an existing detector by id
    Import { name: String, id: String },
    /// Print the stored state of a detector
    Show { name: String },
    /// Print the effective provider configuration
    Config,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("esdetector {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(dir) = Config::config_dir() {
        return dir.join("esdetector.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".esdetector").join("esdetector.log");
    }
    PathBuf::from("esdetector.log")
}

/// Config file < environment < flags
fn effective_config(args: &Args) -> Config {
    let mut config = Config::load();
    config.apply_env();

    if let Some(url) = &args.url {
        config.url = Some(url.clone());
    }
    if let Some(username) = &args.username {
        config.username = Some(username.clone());
    }
    if let Some(password) = &args.password {
        config.password = Some(password.clone());
    }
    if let Some(version) = &args.es_version {
        config.elasticsearch_version = Some(version.clone());
    }
    if let Some(state) = &args.state {
        config.state_path = Some(state.clone());
    }
    config.insecure |= args.insecure;
    config
}

fn read_body(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut body = String::new();
        std::io::stdin()
            .read_to_string(&mut body)
            .context("Failed to read body from stdin")?;
        return Ok(body);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = setup_logging(args.log_level)?;

    let config = effective_config(&args);

    if let Command::Config = args.command {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let state_path = config.effective_state_path();
    let mut state = StateFile::load(&state_path)?;

    if let Command::Show { name } = &args.command {
        let Some(entry) = state.get(name) else {
            bail!("{} is not in state", name);
        };
        println!("{}", serde_json::to_string_pretty(entry)?);
        return Ok(());
    }

    let ctx = ProviderContext::connect(&config)
        .await
        .with_context(|| format!("Failed to connect to {}", config.effective_url()))?;
    let host = Host::new(ctx);

    let result = run(&host, &args.command, &mut state).await;
    state.save(&state_path)?;
    result
}

async fn run(host: &Host, command: &Command, state: &mut StateFile) -> Result<()> {
    match command {
        Command::Plan { name, body } => {
            let config = host.declared(read_body(body)?)?;
            let (action, prior) = host.plan(state, name, &config).await?;
            match action {
                PlanAction::Create => println!("+ {} will be created", name),
                PlanAction::Update => println!("~ {} ({}) will be updated", name, prior.id()),
                PlanAction::NoChange => println!("  {} ({}) is up to date", name, prior.id()),
            }
        }
        Command::Apply { name, body } => {
            let config = host.declared(read_body(body)?)?;
            let applied = host.apply(state, name, &config).await?;
            match applied.action {
                PlanAction::Create => println!("{} created with id {}", name, applied.id),
                PlanAction::Update => println!("{} ({}) updated", name, applied.id),
                PlanAction::NoChange => println!("{} ({}) is up to date", name, applied.id),
            }
        }
        Command::Refresh { names } => {
            let mut failed = 0;
            for (name, outcome) in host.refresh(state, names).await {
                match outcome {
                    Ok(Refreshed::Present(id)) => println!("{} ({}) refreshed", name, id),
                    Ok(Refreshed::Removed) => {
                        println!("{} no longer exists, removed from state", name)
                    }
                    Err(e) => {
                        failed += 1;
                        eprintln!("{}: {:#}", name, e);
                    }
                }
            }
            if failed > 0 {
                bail!("{} refresh(es) failed", failed);
            }
        }
        Command::Destroy { name } => {
            let id = host.destroy(state, name).await?;
            println!("{} ({}) destroyed", name, id);
        }
        Command::Import { name, id } => {
            host.import(state, name, id).await?;
            println!("{} imported from {}", name, id);
        }
        Command::Show { .. } | Command::Config => unreachable!("handled before connecting"),
    }
    Ok(())
}
