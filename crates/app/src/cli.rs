use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use directories::ProjectDirs;
use std::io::Read;
use std::path::{Path, PathBuf};

use ngscan_core::{Scope, Settings};
use ngscan_ocr::Source;

const STDIN_NAME: &str = "<stdin>";

#[derive(Debug, Parser)]
/// Recover NG identifiers from noisy OCR text. Each source is the OCR output
/// of one scanned image; every line is a candidate, and only identifiers seen
/// often enough survive the consensus vote.
#[command(name = "ngscan", version)]
pub struct Args {
    /// OCR text dumps, one per source image. Reads stdin when empty or `-`.
    pub sources: Vec<PathBuf>,

    /// Require more observations before trusting an identifier.
    #[arg(long)]
    pub strict: bool,

    /// Pool lines per image (`per-image`) or across all sources (`batch`).
    #[arg(long)]
    pub scope: Option<Scope>,

    /// TOML settings file. Defaults to `config.toml` in the user config dir.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Sorted IDs, one per line.
    Text,
    /// The full batch report.
    Json,
}

/// Settings from the config file, overridden by command-line flags.
pub fn resolve_settings(args: &Args) -> Result<Settings> {
    let mut settings = match config_path(args.config.as_deref()) {
        Some(path) => {
            tracing::debug!("Loading config from {}", path.display());
            Settings::load(&path)
                .with_context(|| format!("Failed to load config {}", path.display()))?
        }
        None => Settings::default(),
    };

    settings.strict |= args.strict;
    if let Some(scope) = args.scope {
        settings.scope = scope;
    }
    Ok(settings)
}

/// An explicit path always wins; the default location is used only if present.
fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let dirs = ProjectDirs::from("com", "ngscan", "ngscan")?;
    let path = dirs.config_dir().join("config.toml");
    path.exists().then_some(path)
}

/// Turn the positional arguments into sources, reading `-` from `stdin`.
pub fn build_sources<R: Read>(paths: &[PathBuf], mut stdin: R) -> Result<Vec<Source>> {
    let stdin_only = [PathBuf::from("-")];
    let paths = if paths.is_empty() { &stdin_only[..] } else { paths };

    let mut sources = Vec::with_capacity(paths.len());
    let mut stdin_used = false;
    for path in paths {
        if path.as_os_str() != "-" {
            sources.push(Source::File(path.clone()));
            continue;
        }
        if stdin_used {
            bail!("stdin (`-`) can only be given once");
        }
        stdin_used = true;
        let mut data = Vec::new();
        stdin.read_to_end(&mut data).context("Failed to read stdin")?;
        sources.push(Source::Memory { name: STDIN_NAME.to_string(), data });
    }
    Ok(sources)
}
