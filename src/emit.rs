use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::accumulator::{Alignment, CoreSite};
use crate::registry::SampleRegistry;
use crate::report::RunReport;

/// Sequence line width for the FASTA and NEXUS outputs.
const LINE_WIDTH: usize = 60;

/// Path of one output artifact: `<prefix>.<ext>`.
pub fn artifact_path(prefix: &Path, ext: &str) -> PathBuf {
    PathBuf::from(format!("{}.{ext}", prefix.display()))
}

/// Writes every per-site artifact, keeping one site ordinal consistent
/// across all of them, and the run-end alignment and report files.
pub struct Emitter {
    vcf: BufWriter<File>,
    bed: BufWriter<File>,
    gff: BufWriter<File>,
    csv: BufWriter<File>,
    prefix: PathBuf,
    label_stem: String,
    missing_char: char,
    gap_char: char,
}

impl Emitter {
    /// Creates all per-site output streams and writes their preambles:
    /// the input's verbatim comments and header into the filtered VCF, the
    /// GFF version pragma, and the CSV column header.
    pub fn create(
        prefix: &Path,
        registry: &SampleRegistry,
        comments: &[String],
        raw_header: &str,
        missing_char: char,
        gap_char: char,
    ) -> Result<Self> {
        if let Some(parent) = prefix.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create output directory {}", parent.display())
                })?;
            }
        }

        let open = |ext: &str| -> Result<BufWriter<File>> {
            let path = artifact_path(prefix, ext);
            let file = File::create(&path)
                .with_context(|| format!("failed to create output {}", path.display()))?;
            Ok(BufWriter::new(file))
        };

        let mut vcf = open("vcf")?;
        for comment in comments {
            writeln!(vcf, "{comment}")?;
        }
        writeln!(vcf, "{raw_header}")?;

        let mut gff = open("gff")?;
        writeln!(gff, "##gff-version 3")?;

        let mut csv = open("csv")?;
        writeln!(csv, "{}", csv_header(registry))?;

        let label_stem = prefix
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| String::from("core"));

        Ok(Self {
            vcf,
            bed: open("bed")?,
            gff,
            csv,
            prefix: prefix.to_path_buf(),
            label_stem,
            missing_char,
            gap_char,
        })
    }

    /// Generated label for a site ordinal: `<prefix-stem><zero-padded n>`.
    pub fn label(&self, ordinal: u64) -> String {
        format!("{}{:05}", self.label_stem, ordinal)
    }

    /// Emits one accepted site into every per-site output stream.
    pub fn write_site(&mut self, core: &CoreSite) -> Result<()> {
        let label = self.label(core.ordinal);
        writeln!(self.vcf, "{}", core.site.raw)?;
        writeln!(self.bed, "{}", bed_row(core, &label))?;
        writeln!(self.gff, "{}", gff_row(core, &label))?;
        writeln!(self.csv, "{}", csv_row(core, &label))?;
        Ok(())
    }

    /// Finalizes the run: alignment files plus the key-value report.
    pub fn finish(mut self, alignment: &Alignment, report: &RunReport) -> Result<()> {
        self.vcf.flush()?;
        self.bed.flush()?;
        self.gff.flush()?;
        self.csv.flush()?;

        let fasta_path = artifact_path(&self.prefix, "fasta");
        let mut fasta = BufWriter::new(File::create(&fasta_path).with_context(|| {
            format!("failed to create alignment {}", fasta_path.display())
        })?);
        write_fasta(&mut fasta, alignment)?;
        fasta.flush()?;

        let nexus_path = artifact_path(&self.prefix, "nex");
        let mut nexus = BufWriter::new(File::create(&nexus_path).with_context(|| {
            format!("failed to create alignment {}", nexus_path.display())
        })?);
        write_nexus(&mut nexus, alignment, self.missing_char, self.gap_char)?;
        nexus.flush()?;

        let report_path = artifact_path(&self.prefix, "report");
        let mut out = BufWriter::new(File::create(&report_path).with_context(|| {
            format!("failed to create report {}", report_path.display())
        })?);
        report.write_to(&mut out)?;
        out.flush()?;

        tracing::info!(prefix = %self.prefix.display(), "wrote output artifacts");
        Ok(())
    }
}

fn csv_header(registry: &SampleRegistry) -> String {
    let mut columns = vec![
        String::from("#SEQ"),
        String::from("POS"),
        String::from("TYPE"),
    ];
    columns.extend(registry.ids().map(str::to_string));
    columns.extend(registry.ids().map(|id| format!("{id}_evidence")));
    columns.push(String::from("FEATURE"));
    columns.join(",")
}

/// `sequence, start(0-based), end, label`.
fn bed_row(core: &CoreSite, label: &str) -> String {
    format!(
        "{}\t{}\t{}\t{}",
        core.site.sequence,
        core.site.position - 1,
        core.end(),
        label
    )
}

/// GFF3 `variation` feature with the concatenated alleles as product.
fn gff_row(core: &CoreSite, label: &str) -> String {
    format!(
        "{}\t{}\tvariation\t{}\t{}\t.\t.\t.\tID={};product=\"{}\"",
        core.site.sequence,
        env!("CARGO_PKG_NAME"),
        core.site.position,
        core.end(),
        label,
        core.alleles
    )
}

fn csv_row(core: &CoreSite, label: &str) -> String {
    let kind = core
        .site
        .declared_types()
        .and_then(|types| types.first().map(|t| t.to_string()))
        .unwrap_or_else(|| String::from("."));

    let mut columns = vec![
        core.site.sequence.clone(),
        core.site.position.to_string(),
        kind,
    ];
    columns.extend(core.calls.iter().map(|call| call.allele.clone()));
    columns.extend(core.calls.iter().map(|call| call.evidence.clone()));
    columns.push(label.to_string());
    columns.join(",")
}

/// Plain per-sample sequence blocks, wrapped at a fixed width.
fn write_fasta<W: Write>(writer: &mut W, alignment: &Alignment) -> std::io::Result<()> {
    for row in &alignment.rows {
        writeln!(writer, ">{}", row.id)?;
        for chunk in chunks(&row.sequence) {
            writeln!(writer, "{chunk}")?;
        }
    }
    Ok(())
}

/// Interleaved NEXUS data block with declared taxon and character counts.
fn write_nexus<W: Write>(
    writer: &mut W,
    alignment: &Alignment,
    missing: char,
    gap: char,
) -> std::io::Result<()> {
    let ntax = alignment.rows.len();
    let nchar = alignment.length();
    let label_width = alignment
        .rows
        .iter()
        .map(|r| r.id.len())
        .max()
        .unwrap_or(0);

    writeln!(writer, "#NEXUS")?;
    writeln!(writer, "begin data;")?;
    writeln!(writer, "  dimensions ntax={ntax} nchar={nchar};")?;
    writeln!(
        writer,
        "  format datatype=dna interleave=yes missing={missing} gap={gap};"
    )?;
    writeln!(writer, "  matrix")?;

    let blocks = nchar.div_ceil(LINE_WIDTH).max(1);
    for block in 0..blocks {
        if nchar == 0 {
            break;
        }
        for row in &alignment.rows {
            let start = block * LINE_WIDTH;
            let end = (start + LINE_WIDTH).min(nchar);
            writeln!(
                writer,
                "  {:label_width$}  {}",
                row.id,
                &row.sequence[start..end]
            )?;
        }
        if block + 1 < blocks {
            writeln!(writer)?;
        }
    }

    writeln!(writer, "  ;")?;
    writeln!(writer, "end;")?;
    Ok(())
}

fn chunks(sequence: &str) -> impl Iterator<Item = &str> {
    sequence
        .as_bytes()
        .chunks(LINE_WIDTH)
        // buffers hold single-byte allele symbols only
        .map(|chunk| std::str::from_utf8(chunk).unwrap_or_default())
}
