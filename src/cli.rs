use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use crate::{extract_core_file, CoreConfig, RunSummary};

#[derive(Debug, Parser)]
#[command(author, version, about = "Extract a core-genome SNP/MNP alignment from a multi-sample VCF", long_about = None)]
struct Cli {
    /// Combined multi-sample VCF (plain or gzip/BGZF compressed)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output name prefix; every artifact is written as <PREFIX>.<ext>
    #[arg(long, short, value_name = "PREFIX")]
    output: PathBuf,

    /// Minimum per-sample read depth for a confident call
    #[arg(long, default_value_t = 10)]
    min_depth: u32,

    /// Minimum fraction of reads supporting the called allele
    #[arg(long, default_value_t = 0.9)]
    min_fraction: f64,

    /// Minimum site quality (zero/absent quality always passes)
    #[arg(long, default_value_t = 100)]
    min_quality: u32,

    /// Omit the synthetic reference row from the inclusion set
    #[arg(long)]
    exclude_reference: bool,

    /// Fill uncalled samples with the missing symbol instead of dropping
    /// the site
    #[arg(long)]
    allow_substitution: bool,

    /// Symbol for missing data in the alignment outputs (one character)
    #[arg(long, default_value_t = 'N', value_name = "CHAR")]
    missing_char: char,

    /// Gap symbol declared in the NEXUS output (one character)
    #[arg(long, default_value_t = '-', value_name = "CHAR")]
    gap_char: char,

    /// Restrict the inclusion set to these header samples (default: all)
    #[arg(long, value_name = "SAMPLE", value_delimiter = ',')]
    samples: Option<Vec<String>>,

    /// Skip bgzip/tabix post-processing of the filtered VCF
    #[arg(long)]
    no_index: bool,

    /// Logging verbosity (e.g. error, warn, info, debug)
    #[arg(long, default_value = "info")]
    log_level: String,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let invocation = std::env::args().collect::<Vec<_>>().join(" ");

    let config = CoreConfig {
        input: cli.input,
        output_prefix: cli.output,
        min_depth: cli.min_depth,
        min_fraction: cli.min_fraction,
        min_quality: cli.min_quality,
        exclude_reference: cli.exclude_reference,
        allow_substitution: cli.allow_substitution,
        missing_char: cli.missing_char,
        gap_char: cli.gap_char,
        samples: cli.samples,
        index_output: !cli.no_index,
        invocation,
    };

    let summary = extract_core_file(config).context("core extraction failed")?;
    print_summary(&summary);

    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .ok();
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!(
        "Processed {total} records; kept {core} core sites ({bases} bases) across {samples} samples.",
        total = summary.records_seen,
        core = summary.core_sites,
        bases = summary.core_bases,
        samples = summary.sample_count,
    );

    if summary.filtered_sites > 0 {
        println!(
            "Skipped {count} sites at the site-level filters.",
            count = summary.filtered_sites
        );
    }

    if summary.evidence_rejections > 0 {
        println!(
            "Skipped {count} sites on per-sample depth/fraction checks.",
            count = summary.evidence_rejections
        );
    }

    if summary.monomorphic_sites > 0 {
        println!(
            "Skipped {count} monomorphic sites.",
            count = summary.monomorphic_sites
        );
    }

    if summary.substituted_calls > 0 {
        println!(
            "Filled {count} uncalled samples with the missing symbol.",
            count = summary.substituted_calls
        );
    }

    if summary.parse_errors > 0 {
        println!(
            "Ignored {count} malformed input lines.",
            count = summary.parse_errors
        );
    }
}
