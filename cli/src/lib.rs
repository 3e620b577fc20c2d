//! Command line front end for the directory mirror.
//!
//! Resolves the source and target directories against the repository root,
//! prints the startup banner and runs the supervisor until Ctrl-C.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use directory_mirror::{MirrorConfig, MirrorError, Supervisor, WatchStrategy};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Argument help printed when the arguments cannot be parsed.
pub const USAGE: &str = "\
First argument: source project, relative to repository root, example: 'src/SourceProject/'
Second argument: target project, relative to repository root, example: 'src/TargetProject/'
Third argument: filters, semicolon separated list of extensions, example: *.cshtml;*.pdf
Fourth argument: optional black-listed directory names, semicolon separated, example: bin;obj;node_modules";

/// Markers identifying a version control root.
const VCS_MARKERS: [&str; 3] = [".git", ".hg", ".svn"];

/// Mirror files matching filters from a source project into a target project.
#[derive(Debug, Parser)]
#[command(name = "directory-mirror", version, about, after_help = USAGE)]
pub struct Cli {
    /// Source directory, relative to the repository root.
    pub source: PathBuf,

    /// Target directory, relative to the repository root.
    pub target: PathBuf,

    /// Semicolon separated file filters, e.g. `*.json;*.pdf`.
    pub filters: String,

    /// Semicolon separated directory names to black-list in addition to the defaults.
    pub blacklist: Option<String>,

    /// Resolve directories against this root instead of the discovered repository root.
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Additional black-listed file extension (repeatable).
    #[arg(long = "exclude-extension", value_name = "EXT")]
    pub exclude_extensions: Vec<String>,

    /// How watches are installed below the source directory.
    #[arg(long, value_enum, default_value_t = StrategyArg::Recursive)]
    pub strategy: StrategyArg,
}

/// Command line spelling of [`WatchStrategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    /// One recursive watch per filter.
    Recursive,
    /// One watch per directory, discovered at startup.
    PerDirectory,
}

impl From<StrategyArg> for WatchStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Recursive => Self::Recursive,
            StrategyArg::PerDirectory => Self::PerDirectory,
        }
    }
}

impl Cli {
    /// Build the mirror configuration with directories resolved against `root`.
    pub fn to_config(&self, root: &Path) -> MirrorConfig {
        let mut config = MirrorConfig::new(
            resolve_dir(root, &self.source),
            resolve_dir(root, &self.target),
        )
        .with_patterns(split_list(&self.filters))
        .with_strategy(self.strategy.into());

        if let Some(blacklist) = &self.blacklist {
            for name in split_list(blacklist) {
                config = config.blacklist_dir(name);
            }
        }

        for extension in &self.exclude_extensions {
            config = config.blacklist_extension(extension.as_str());
        }

        config
    }
}

/// Split a semicolon separated list, dropping empty entries.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

/// Find the nearest ancestor of `start` (inclusive) that is a version control root.
pub fn find_vcs_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| VCS_MARKERS.iter().any(|marker| dir.join(marker).exists()))
        .map(Path::to_path_buf)
}

/// Join `relative` onto `root`, canonicalizing when the directory exists so
/// that paths reported by the OS share its prefix.
fn resolve_dir(root: &Path, relative: &Path) -> PathBuf {
    let joined = root.join(relative);
    dunce::canonicalize(&joined).unwrap_or(joined)
}

/// The startup banner echoing the effective configuration.
pub fn banner(config: &MirrorConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Using source directory '{}'", config.source_root.display());
    let _ = writeln!(out, "Using target directory '{}'", config.target_root.display());

    let sections = [
        ("Black-listed", &config.blacklisted_dir_names),
        ("Filters", &config.patterns),
        ("Black-listed file extensions", &config.blacklisted_extensions),
    ];
    for (title, items) in sections {
        let _ = writeln!(out);
        let _ = writeln!(out, "[{title}]");
        for item in items {
            let _ = writeln!(out, "\t* '{item}'");
        }
    }

    out
}

/// Run the mirror for parsed arguments and map the result to an exit code.
pub async fn run(cli: Cli) -> ExitCode {
    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => exit_code_for(&err),
    }
}

fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<MirrorError>() {
        // A missing directory means there is nothing to do.
        Some(mirror_err) if mirror_err.is_precondition() => {
            println!("{mirror_err}");
            ExitCode::SUCCESS
        }
        _ => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> anyhow::Result<()> {
    let root = resolve_root(cli.root.as_deref())?;
    info!("Using root directory '{}'", root.display());

    let mut supervisor = Supervisor::new(cli.to_config(&root))?;
    supervisor.check_preconditions()?;

    print!("{}", banner(supervisor.config()));
    println!();

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_cancel.cancel();
    });

    supervisor.run(cancel).await?;
    Ok(())
}

/// The absolute directory that source and target are resolved against:
/// `root` when given, else the enclosing version control root.
fn resolve_root(root: Option<&Path>) -> anyhow::Result<PathBuf> {
    let root = match root {
        Some(root) => root.to_path_buf(),
        None => {
            let cwd = std::env::current_dir().context("cannot read current directory")?;
            find_vcs_root(&cwd).with_context(|| {
                format!("no version control root found above '{}'", cwd.display())
            })?
        }
    };

    dunce::canonicalize(&root)
        .with_context(|| format!("cannot resolve root directory '{}'", root.display()))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
