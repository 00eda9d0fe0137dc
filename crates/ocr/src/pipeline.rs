use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;

use ngscan_core::{AcceptedIds, Candidate, Consensus, ConsensusPolicy, LineNormalizer, Scope, Strictness};

use crate::recognizer::{split_lines, OcrBackend};
use crate::types::{BatchReport, ImageReport};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A source image to scan: a file on disk or bytes already in memory.
#[derive(Debug, Clone)]
pub enum Source {
    File(PathBuf),
    Memory { name: String, data: Vec<u8> },
}

impl Source {
    pub fn name(&self) -> String {
        match self {
            Source::File(path) => path.display().to_string(),
            Source::Memory { name, .. } => name.clone(),
        }
    }

    async fn read(self) -> Result<Arc<[u8]>, PipelineError> {
        match self {
            Source::File(path) => tokio::fs::read(&path)
                .await
                .map(Arc::from)
                .map_err(|source| PipelineError::Io { path, source }),
            Source::Memory { data, .. } => Ok(Arc::from(data)),
        }
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Source::File(path)
    }
}

/// Lines pooled from every recognition pass over one source.
#[derive(Debug, Default)]
pub struct PassOutcome {
    pub lines: Vec<String>,
    pub failed_passes: usize,
}

/// One scanned source before any consensus decision.
struct Scanned {
    source: String,
    lines: usize,
    failed_passes: usize,
    candidates: Vec<Candidate>,
}

impl Scanned {
    fn into_report(self) -> ImageReport {
        ImageReport {
            source: self.source,
            lines: self.lines,
            candidates: self.candidates.len(),
            failed_passes: self.failed_passes,
            dominant_prefix: None,
            ids: vec![],
            error: None,
        }
    }
}

/// Orchestrates: read → every recognition pass (joined) → normalize → consensus.
pub struct ScanPipeline {
    passes: Vec<Arc<dyn OcrBackend>>,
    consensus: Consensus,
    strictness: Strictness,
}

impl ScanPipeline {
    pub fn new(policy: ConsensusPolicy, strictness: Strictness) -> Self {
        Self {
            passes: Vec::new(),
            consensus: Consensus::new(policy),
            strictness,
        }
    }

    /// Add a recognition pass. Every pass runs over every source.
    pub fn with_pass<B: OcrBackend + 'static>(mut self, backend: B) -> Self {
        self.passes.push(Arc::new(backend));
        self
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Run every pass concurrently and join them all. A pass that fails
    /// contributes no lines.
    pub async fn collect_lines(&self, data: Arc<[u8]>) -> PassOutcome {
        let mut set = JoinSet::new();
        for pass in &self.passes {
            let pass = Arc::clone(pass);
            let data = Arc::clone(&data);
            set.spawn_blocking(move || {
                let result = pass.recognize(&data);
                (pass.name().to_string(), result)
            });
        }

        let mut outcome = PassOutcome::default();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((_, Ok(text))) => outcome.lines.extend(split_lines(&text)),
                Ok((name, Err(e))) => {
                    tracing::warn!(pass = %name, "Recognition pass failed: {e}");
                    outcome.failed_passes += 1;
                }
                Err(e) => {
                    tracing::warn!("Recognition pass aborted: {e}");
                    outcome.failed_passes += 1;
                }
            }
        }
        outcome
    }

    /// Scan and decide a single file on its own.
    pub async fn process_file(&self, path: &Path) -> ImageReport {
        self.process_source(Source::File(path.to_path_buf())).await
    }

    /// Scan and decide in-memory source bytes on their own.
    pub async fn process_bytes(&self, name: &str, data: Vec<u8>) -> ImageReport {
        self.process_source(Source::Memory { name: name.to_string(), data }).await
    }

    pub async fn process_source(&self, source: Source) -> ImageReport {
        match self.scan(source).await {
            Ok(scanned) => self.decide(scanned),
            Err(report) => report,
        }
    }

    /// Scan every source in order and decide under `scope`.
    ///
    /// Per-image scope decides each source separately and unions the results;
    /// batch scope pools every candidate and decides once.
    pub async fn process_batch<I>(&self, sources: I, scope: Scope) -> BatchReport
    where
        I: IntoIterator,
        I::Item: Into<Source>,
    {
        let mut images = Vec::new();
        let mut pooled = Vec::new();
        let mut ids = AcceptedIds::default();

        for source in sources {
            let scanned = match self.scan(source.into()).await {
                Ok(scanned) => scanned,
                Err(report) => {
                    images.push(report);
                    continue;
                }
            };
            match scope {
                Scope::PerImage => {
                    let report = self.decide(scanned);
                    ids.extend(report.ids.iter().cloned());
                    images.push(report);
                }
                Scope::Batch => {
                    pooled.extend(scanned.candidates.iter().cloned());
                    images.push(scanned.into_report());
                }
            }
        }

        let dominant_prefix = match scope {
            Scope::PerImage => None,
            Scope::Batch => {
                let decision = self.consensus.report(pooled, Scope::Batch, self.strictness);
                tracing::debug!(
                    dominant = ?decision.dominant_prefix,
                    selection = ?decision.selection,
                    distinct = decision.tally.distinct(),
                    "Batch consensus"
                );
                ids = decision.accepted;
                decision.dominant_prefix
            }
        };

        tracing::info!(
            "Extracted {} unique IDs from {} sources ({scope})",
            ids.len(),
            images.len()
        );

        BatchReport {
            scope,
            strictness: self.strictness,
            images,
            dominant_prefix,
            ids,
        }
    }

    /// Read and recognize one source. A read failure yields the finished error report.
    async fn scan(&self, source: Source) -> Result<Scanned, ImageReport> {
        let name = source.name();
        let data = match source.read().await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("Skipping {name}: {e}");
                return Err(ImageReport::failed(name, e.to_string()));
            }
        };

        let outcome = self.collect_lines(data).await;
        let candidates: Vec<Candidate> = outcome
            .lines
            .iter()
            .filter_map(|line| match LineNormalizer::inspect(line) {
                Ok(candidate) => Some(candidate),
                Err(rejection) => {
                    tracing::trace!(%line, "Rejected: {rejection}");
                    None
                }
            })
            .collect();

        tracing::info!(
            "Scanned {name}: {} lines, {} candidates",
            outcome.lines.len(),
            candidates.len()
        );

        Ok(Scanned {
            source: name,
            lines: outcome.lines.len(),
            failed_passes: outcome.failed_passes,
            candidates,
        })
    }

    fn decide(&self, scanned: Scanned) -> ImageReport {
        let decision = self
            .consensus
            .report(scanned.candidates.iter().cloned(), Scope::PerImage, self.strictness);
        tracing::debug!(
            source = %scanned.source,
            dominant = ?decision.dominant_prefix,
            selection = ?decision.selection,
            accepted = decision.accepted.len(),
            "Image consensus"
        );
        if decision.accepted.is_empty() {
            tracing::info!("No IDs found in {}", scanned.source);
        }

        let dominant_prefix = decision.dominant_prefix;
        let ids = decision.accepted.into_vec();
        ImageReport {
            dominant_prefix,
            ids,
            ..scanned.into_report()
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
