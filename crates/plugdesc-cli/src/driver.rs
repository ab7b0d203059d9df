//! The host side of the round protocol: feeding sources, threading the
//! deferred declarations and deciding when to stop

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use plugdesc_ast::{
    create_backend, discover_sources, source_extension, Declaration, Diagnostic, ProcessingBackend,
    Severity, SourceFile,
};
use plugdesc_config::{BackendChoice, ProcessorConfig};
use plugdesc_processor::{DescriptorGenerator, WrittenDescriptor};

/// Everything a finished run produced
#[derive(Debug)]
pub struct ProcessReport {
    pub backend: BackendChoice,
    pub output_dir: PathBuf,
    pub rounds: usize,
    pub sources: usize,
    pub written: Vec<WrittenDescriptor>,
    pub unresolved: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl ProcessReport {
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn succeeded(&self) -> bool {
        self.error_count() == 0
    }
}

/// Source files under the roots that no earlier round has seen
struct SourceFeed<'a> {
    roots: &'a [PathBuf],
    extension: &'static str,
    seen: BTreeSet<PathBuf>,
}

impl<'a> SourceFeed<'a> {
    fn new(roots: &'a [PathBuf], backend: BackendChoice) -> Self {
        SourceFeed {
            roots,
            extension: source_extension(backend),
            seen: BTreeSet::new(),
        }
    }

    fn next_round(&mut self) -> Result<Vec<SourceFile>> {
        let found = discover_sources(self.roots, self.extension)
            .context("Failed to scan source roots")?;
        let mut fresh = Vec::new();
        for path in found {
            if self.seen.contains(&path) {
                continue;
            }
            let source = SourceFile::read(&path)
                .with_context(|| format!("Failed to read source file {}", path.display()))?;
            self.seen.insert(path);
            fresh.push(source);
        }
        Ok(fresh)
    }

    fn total(&self) -> usize {
        self.seen.len()
    }
}

/// Run rounds until nothing is deferred, nothing moves, or the round
/// limit is reached
pub fn run(
    config: &ProcessorConfig,
    roots: &[PathBuf],
    output_dir: &Path,
) -> Result<ProcessReport> {
    let start = Instant::now();
    let mut backend = create_backend(config.backend, config, output_dir.to_path_buf());
    let generator = DescriptorGenerator::new(config);
    let mut feed = SourceFeed::new(roots, config.backend);

    let mut deferred: Vec<Declaration> = Vec::new();
    let mut written = Vec::new();
    let mut rounds = 0;

    while rounds < config.max_rounds {
        let fresh = feed.next_round()?;
        let fed = fresh.len();
        rounds += 1;
        debug!("Round {}: {} new source file(s)", rounds, fed);

        backend.begin_round(fresh);
        let carried = deferred.clone();
        let outcome = generator.process_round(backend.as_mut(), deferred);
        written.extend(outcome.written);
        deferred = outcome.deferred;

        if deferred.is_empty() {
            break;
        }
        if fed == 0 && deferred == carried {
            debug!("Round {} made no progress, stopping", rounds);
            break;
        }
    }

    report_unresolved(backend.as_mut(), config, &deferred, rounds);

    info!(
        "Processed {} source file(s) in {} round(s) in {:.3}ms",
        feed.total(),
        rounds,
        start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(ProcessReport {
        backend: config.backend,
        output_dir: output_dir.to_path_buf(),
        rounds,
        sources: feed.total(),
        written,
        unresolved: deferred.len(),
        diagnostics: backend.diagnostics().to_vec(),
    })
}

fn report_unresolved(
    backend: &mut dyn ProcessingBackend,
    config: &ProcessorConfig,
    deferred: &[Declaration],
    rounds: usize,
) {
    let marker = config
        .marker_annotation
        .rsplit('.')
        .next()
        .unwrap_or(&config.marker_annotation);
    for decl in deferred {
        backend.log_error(
            &format!(
                "unresolved references in the @{} arguments of '{}' after {} round(s)",
                marker,
                decl.simple_name(),
                rounds
            ),
            Some(decl),
            None,
        );
    }
}
