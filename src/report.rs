use std::io::Write;

use crate::filters::{Rejection, RejectionClass};
use crate::registry::SampleRegistry;

/// Counters accumulated over one run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunSummary {
    /// Data records seen (comments and headers excluded).
    pub records_seen: u64,
    /// Accepted core sites.
    pub core_sites: u64,
    /// Cumulative allele length over accepted sites.
    pub core_bases: u64,
    /// Included sample count (reference pseudo-sample included).
    pub sample_count: usize,
    /// Sites rejected by the site-level filter chain.
    pub filtered_sites: u64,
    /// Sites rejected by per-sample depth/fraction/decoding checks.
    pub evidence_rejections: u64,
    /// Sites rejected as monomorphic columns.
    pub monomorphic_sites: u64,
    /// Uncalled samples filled with the missing symbol.
    pub substituted_calls: u64,
    /// Malformed lines skipped outright.
    pub parse_errors: u64,
}

impl RunSummary {
    pub fn record_rejection(&mut self, rejection: &Rejection) {
        match rejection.class() {
            RejectionClass::Site => self.filtered_sites += 1,
            RejectionClass::Evidence => self.evidence_rejections += 1,
            RejectionClass::Degenerate => self.monomorphic_sites += 1,
        }
    }
}

/// The finalized key-value run report, written once after stream exhaustion.
#[derive(Clone, Debug)]
pub struct RunReport {
    pub invocation: String,
    pub timestamp: String,
    pub operator: String,
    pub min_depth: u32,
    pub min_fraction: f64,
    pub min_quality: u32,
    pub missing_char: char,
    pub gap_char: char,
    pub reference_included: bool,
    pub substitution_allowed: bool,
    pub samples: Vec<String>,
    pub core_sites: u64,
    pub core_bases: u64,
}

impl RunReport {
    pub fn new(
        invocation: &str,
        min_depth: u32,
        min_fraction: f64,
        min_quality: u32,
        missing_char: char,
        gap_char: char,
        reference_included: bool,
        substitution_allowed: bool,
        registry: &SampleRegistry,
        summary: &RunSummary,
    ) -> Self {
        let timestamp = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| String::from("unknown"));
        let operator = std::env::var("USER").unwrap_or_else(|_| String::from("unknown"));

        Self {
            invocation: invocation.to_string(),
            timestamp,
            operator,
            min_depth,
            min_fraction,
            min_quality,
            missing_char,
            gap_char,
            reference_included,
            substitution_allowed,
            samples: registry.ids().map(str::to_string).collect(),
            core_sites: summary.core_sites,
            core_bases: summary.core_bases,
        }
    }

    /// Serializes the report as tab-separated key-value lines.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "invocation\t{}", self.invocation)?;
        writeln!(writer, "version\t{}", env!("CARGO_PKG_VERSION"))?;
        writeln!(writer, "timestamp\t{}", self.timestamp)?;
        writeln!(writer, "operator\t{}", self.operator)?;
        writeln!(writer, "min_depth\t{}", self.min_depth)?;
        writeln!(writer, "min_fraction\t{}", self.min_fraction)?;
        writeln!(writer, "min_quality\t{}", self.min_quality)?;
        writeln!(writer, "missing_symbol\t{}", self.missing_char)?;
        writeln!(writer, "gap_symbol\t{}", self.gap_char)?;
        writeln!(writer, "reference_included\t{}", self.reference_included)?;
        writeln!(writer, "substitution_allowed\t{}", self.substitution_allowed)?;
        writeln!(writer, "sample_count\t{}", self.samples.len())?;
        writeln!(writer, "samples\t{}", self.samples.join(","))?;
        writeln!(writer, "core_sites\t{}", self.core_sites)?;
        writeln!(writer, "core_bases\t{}", self.core_bases)?;
        Ok(())
    }
}
