use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::accumulator::CoreAccumulator;
use crate::emit::{artifact_path, Emitter};
use crate::filters::apply_site_filters;
use crate::filters::Rejection;
use crate::genotype::{resolve_site, CallThresholds};
use crate::input::open_input;
use crate::postprocess;
use crate::record::{Line, ParseErrorKind, Reader, VariantSite};
use crate::registry::SampleRegistry;
use crate::report::{RunReport, RunSummary};

/// Configuration required to drive one extraction run.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub input: PathBuf,
    /// Output name prefix; every artifact is `<prefix>.<ext>`.
    pub output_prefix: PathBuf,
    pub min_depth: u32,
    pub min_fraction: f64,
    pub min_quality: u32,
    pub exclude_reference: bool,
    pub allow_substitution: bool,
    pub missing_char: char,
    pub gap_char: char,
    /// Explicit inclusion subset; `None` includes all header samples.
    pub samples: Option<Vec<String>>,
    /// Run bgzip/tabix on the filtered VCF afterwards.
    pub index_output: bool,
    /// Original command line, echoed into the run report.
    pub invocation: String,
}

impl CoreConfig {
    fn thresholds(&self) -> CallThresholds {
        CallThresholds {
            min_depth: self.min_depth,
            min_fraction: self.min_fraction,
            allow_substitution: self.allow_substitution,
            missing_char: self.missing_char,
        }
    }
}

/// Streams the input once: every data record flows through the filter
/// chain, the genotype resolver, and the core accumulator; survivors are
/// emitted, everything else is logged and skipped. The run always completes
/// and produces all artifacts, even if zero sites qualify.
pub fn extract_core_file(config: CoreConfig) -> Result<RunSummary> {
    tracing::info!(
        input = %config.input.display(),
        output = %config.output_prefix.display(),
        min_depth = config.min_depth,
        min_fraction = config.min_fraction,
        min_quality = config.min_quality,
        "starting core extraction",
    );

    let reader = Reader::new(open_input(&config.input)?);
    let thresholds = config.thresholds();

    let mut summary = RunSummary::default();
    let mut comments: Vec<String> = Vec::new();
    let mut state: Option<(SampleRegistry, Emitter, CoreAccumulator)> = None;

    for result in reader {
        let line = match result {
            Ok(line) => line,
            Err(e) => {
                if matches!(e.kind, ParseErrorKind::Io(_)) {
                    return Err(e).context("failed to read input stream");
                }
                summary.parse_errors += 1;
                tracing::warn!(error = %e, "skipping malformed input line");
                continue;
            }
        };

        match line {
            Line::Comment(comment) => {
                if state.is_none() {
                    comments.push(comment);
                } else {
                    tracing::debug!("ignoring comment after the header");
                }
            }
            Line::Header { samples, raw } => {
                if state.is_some() {
                    tracing::debug!("ignoring repeated header (first wins)");
                    continue;
                }

                let registry = SampleRegistry::from_header(
                    &samples,
                    config.samples.as_deref(),
                    !config.exclude_reference,
                )
                .context("failed to resolve the sample inclusion set")?;
                tracing::info!(samples = registry.len(), "sample registry established");

                let emitter = Emitter::create(
                    &config.output_prefix,
                    &registry,
                    &comments,
                    &raw,
                    config.missing_char,
                    config.gap_char,
                )?;
                let accumulator = CoreAccumulator::new(registry.len());

                summary.sample_count = registry.len();
                state = Some((registry, emitter, accumulator));
            }
            Line::Site(site) => {
                let Some((registry, emitter, accumulator)) = state.as_mut() else {
                    bail!(
                        "data record at {} precedes the sample header",
                        site.coordinate()
                    );
                };

                summary.records_seen += 1;
                let coordinate = site.coordinate();
                match evaluate_site(site, registry, &thresholds, config.min_quality, accumulator)
                {
                    Ok(core) => {
                        summary.core_sites += 1;
                        summary.core_bases += core.site.allele_length() as u64;
                        summary.substituted_calls += core
                            .calls
                            .iter()
                            .filter(|call| call.is_substituted())
                            .count() as u64;
                        emitter.write_site(&core)?;
                    }
                    Err(rejection) => {
                        summary.record_rejection(&rejection);
                        tracing::warn!(site = %coordinate, reason = %rejection, "site skipped");
                    }
                }
            }
        }
    }

    let Some((registry, emitter, accumulator)) = state else {
        bail!("input contains no header with sample identifiers");
    };

    let report = RunReport::new(
        &config.invocation,
        config.min_depth,
        config.min_fraction,
        config.min_quality,
        config.missing_char,
        config.gap_char,
        !config.exclude_reference,
        config.allow_substitution,
        &registry,
        &summary,
    );

    let alignment = accumulator.into_alignment(&registry);
    emitter.finish(&alignment, &report)?;

    if config.index_output {
        postprocess::compress_and_index(&artifact_path(&config.output_prefix, "vcf"));
    }

    tracing::info!(
        core_sites = summary.core_sites,
        core_bases = summary.core_bases,
        "core extraction finished",
    );

    Ok(summary)
}

/// Pure per-site evaluation: site filters, then per-sample resolution, then
/// the accumulator's degenerate-column check. The first failure rejects the
/// site with its reason.
fn evaluate_site(
    site: VariantSite,
    registry: &SampleRegistry,
    thresholds: &CallThresholds,
    min_quality: u32,
    accumulator: &mut CoreAccumulator,
) -> Result<crate::accumulator::CoreSite, Rejection> {
    apply_site_filters(&site, min_quality)?;
    let calls = resolve_site(&site, registry, thresholds)?;
    accumulator.accept(site, calls)
}
