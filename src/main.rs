//! duopane - file operations with undo, from the command line.
//!
//! Usage:
//!   duopane copy SOURCES... DEST     Copy into a folder
//!   duopane move SOURCES... DEST     Move into a folder
//!   duopane delete PATHS...          Delete permanently
//!   duopane mkdir PATH               Create a folder
//!   duopane rename OLD NEW           Rename in place
//!   duopane history                  Show the audit log
//!   duopane shell                    Run commands from stdin, with undo

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Context, Result, bail, eyre};
use tracing::{Level, debug};
use tracing_subscriber::FmtSubscriber;

use duopane_core::EngineConfig;
use duopane_ops::{
    AuditSink, ChannelDispatcher, DispatchQueue, JsonlAuditLog, NullAuditLog, OperationRequest,
    OperationResult, OperationService, ProgressCallback,
};

#[derive(Parser)]
#[command(
    name = "duopane",
    version,
    about = "File operations with validation, progress and undo",
    long_about = "duopane runs the file-operation engine of a dual-pane file manager.\n\n\
                  Each subcommand validates before touching the disk. Use `duopane shell` \
                  to run several commands in one session and `undo` the last one."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GlobalArgs {
    /// Engine configuration file (JSON)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Audit log location (defaults to the platform data directory)
    #[arg(long, global = true, value_name = "FILE")]
    audit_log: Option<PathBuf>,

    /// Do not write the audit log
    #[arg(long, global = true)]
    no_audit: bool,

    /// More logging (repeat for debug output)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    #[command(flatten)]
    Op(OpCommand),

    /// Show recent entries of the audit log
    History {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,

        /// Remove every entry instead
        #[arg(long)]
        clear: bool,
    },

    /// Read commands from stdin; `undo` reverses the previous one
    Shell,
}

#[derive(Subcommand)]
enum OpCommand {
    /// Copy files and folders into DEST
    Copy {
        /// Sources followed by the destination folder
        #[arg(required = true, num_args = 2.., value_name = "SOURCES... DEST")]
        paths: Vec<PathBuf>,

        /// Give each copy a " - Copy" name instead of overwriting
        #[arg(short, long)]
        suffix: bool,
    },

    /// Move files and folders into DEST
    Move {
        /// Sources followed by the destination folder
        #[arg(required = true, num_args = 2.., value_name = "SOURCES... DEST")]
        paths: Vec<PathBuf>,
    },

    /// Delete files and folders permanently
    Delete {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Create a folder
    Mkdir { path: PathBuf },

    /// Rename a file or folder
    Rename { old: PathBuf, new: PathBuf },
}

impl OpCommand {
    fn into_request(self) -> OperationRequest {
        match self {
            Self::Copy { mut paths, suffix } => {
                let destination = paths.pop().unwrap_or_default();
                OperationRequest::copy(paths, destination, suffix)
            }
            Self::Move { mut paths } => {
                let destination = paths.pop().unwrap_or_default();
                OperationRequest::move_to(paths, destination)
            }
            Self::Delete { paths } => OperationRequest::delete(paths),
            Self::Mkdir { path } => OperationRequest::create_folder(path),
            Self::Rename { old, new } => {
                // A bare name renames within the same folder.
                let new = if new.components().count() == 1 {
                    old.with_file_name(new)
                } else {
                    new
                };
                OperationRequest::rename(old, new)
            }
        }
    }
}

/// One line typed into `duopane shell`.
#[derive(Parser)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand)]
enum ShellCommand {
    #[command(flatten)]
    Op(OpCommand),

    /// Reverse the most recent successful command
    Undo,

    /// Show what undo would reverse
    Last,

    /// Leave the shell
    #[command(alias = "quit")]
    Exit,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(&cli.global)?;

    let config = load_config(&cli.global)?;

    match cli.command {
        Command::History { limit, clear } => run_history(&cli.global, &config, limit, clear),
        Command::Op(op) => {
            let mut session = Session::start(&cli.global, config)?;
            let result = session.run(op.into_request());
            report(&result)
        }
        Command::Shell => {
            let session = Session::start(&cli.global, config)?;
            run_shell(session)
        }
    }
}

fn init_logging(global: &GlobalArgs) -> Result<()> {
    let level = match (global.quiet, global.verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::WARN,
        (false, 1) => Level::INFO,
        (false, _) => Level::DEBUG,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

fn load_config(global: &GlobalArgs) -> Result<EngineConfig> {
    let mut config = match &global.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => EngineConfig::default(),
    };

    if let Some(path) = &global.audit_log {
        config.audit_log = Some(path.clone());
    }

    debug!(
        "Backups up to {} per file, {} per delete",
        format_size(config.backup_size_limit),
        config
            .backup_budget
            .map(format_size)
            .unwrap_or_else(|| "unlimited".to_string())
    );

    Ok(config)
}

fn open_audit_log(config: &EngineConfig) -> Result<JsonlAuditLog> {
    let path = config.audit_log_path();
    JsonlAuditLog::open(&path)
        .with_context(|| format!("Failed to open audit log {}", path.display()))
}

/// A service plus the queue this thread drains for its callbacks.
struct Session {
    service: OperationService,
    queue: DispatchQueue,
}

impl Session {
    fn start(global: &GlobalArgs, config: EngineConfig) -> Result<Self> {
        let audit: Arc<dyn AuditSink> = if global.no_audit {
            Arc::new(NullAuditLog)
        } else {
            Arc::new(open_audit_log(&config)?)
        };

        let (dispatcher, queue) = ChannelDispatcher::new();
        let service = OperationService::new(config, Arc::new(dispatcher), audit)?;
        if !global.quiet {
            service.set_progress_callback(Some(Arc::new(ConsoleProgress)));
        }

        Ok(Self { service, queue })
    }

    fn run(&mut self, request: OperationRequest) -> OperationResult {
        let (tx, rx) = mpsc::channel();
        self.service.execute(request, move |result| {
            let _ = tx.send(result);
        });
        self.wait(rx)
    }

    fn undo(&mut self) -> OperationResult {
        let (tx, rx) = mpsc::channel();
        self.service.undo_last(move |result| {
            let _ = tx.send(result);
        });
        self.wait(rx)
    }

    /// Run queued callbacks until the completion arrives.
    fn wait(&mut self, rx: mpsc::Receiver<OperationResult>) -> OperationResult {
        loop {
            if let Ok(result) = rx.try_recv() {
                return result;
            }
            match self.queue.blocking_next() {
                Some(job) => job(),
                None => {
                    return OperationResult::failure(
                        duopane_core::OpError::internal("Dispatch queue closed"),
                        None,
                    );
                }
            }
        }
    }
}

/// Prints progress to stderr.
struct ConsoleProgress;

impl ProgressCallback for ConsoleProgress {
    fn on_progress(&self, current: usize, total: usize, current_item: &str) {
        let mut stderr = io::stderr().lock();
        let _ = write!(stderr, "\r\x1b[2K[{current}/{total}] {}", truncate(current_item, 60));
        if current >= total {
            let _ = writeln!(stderr);
        }
        let _ = stderr.flush();
    }

    fn on_status_change(&self, status: &str) {
        eprintln!("{status}");
    }
}

fn report(result: &OperationResult) -> Result<()> {
    if result.is_success() {
        println!("{}", result.message());
        Ok(())
    } else {
        bail!("{}", result.message())
    }
}

fn run_shell(mut session: Session) -> Result<()> {
    let stdin = io::stdin();
    let interactive = std::io::IsTerminal::is_terminal(&stdin);

    loop {
        if interactive {
            print!("duopane> ");
            io::stdout().flush()?;
        }

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() || words[0].starts_with('#') {
            continue;
        }

        let parsed = match ShellLine::try_parse_from(words) {
            Ok(parsed) => parsed,
            Err(e) => {
                let _ = e.print();
                continue;
            }
        };

        let result = match parsed.command {
            ShellCommand::Op(op) => session.run(op.into_request()),
            ShellCommand::Undo => session.undo(),
            ShellCommand::Last => {
                match session.service.last_description() {
                    Some(description) => println!("{description}"),
                    None => println!("Nothing to undo"),
                }
                continue;
            }
            ShellCommand::Exit => break,
        };

        if result.is_success() {
            println!("{}", result.message());
        } else {
            eprintln!("error: {}", result.message());
        }
    }

    Ok(())
}

fn run_history(global: &GlobalArgs, config: &EngineConfig, limit: usize, clear: bool) -> Result<()> {
    if global.no_audit {
        return Err(eyre!("The audit log is disabled by --no-audit"));
    }
    let log = open_audit_log(config)?;

    if clear {
        log.clear().context("Failed to clear audit log")?;
        println!("Cleared {}", log.path().display());
        return Ok(());
    }

    let entries = log.read_recent(limit);
    if entries.is_empty() {
        println!("No operations recorded in {}", log.path().display());
        return Ok(());
    }

    for entry in entries {
        println!(
            "{}  {:<7}  {:<13}  {}",
            entry.display_time(),
            entry.status.to_string(),
            entry.operation_type,
            entry.description
        );
        if let Some(error) = entry.error {
            println!("{:>18}  {error}", "");
        }
    }

    Ok(())
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Truncate a string to at most `max_chars` characters.
fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}
