use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::tempdir;

use vcf2core::{extract_core_file, CoreConfig};

const HEADER: &str = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tA\tB";

fn base_config(input: PathBuf, prefix: PathBuf) -> CoreConfig {
    CoreConfig {
        input,
        output_prefix: prefix,
        min_depth: 10,
        min_fraction: 0.9,
        min_quality: 100,
        exclude_reference: false,
        allow_substitution: false,
        missing_char: 'N',
        gap_char: '-',
        samples: None,
        index_output: false,
        invocation: String::from("vcf2core (integration test)"),
    }
}

fn write_input(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

/// Two comments, the header, and seven data records exercising each
/// rejection path plus two acceptable sites (one SNP, one MNP).
fn combined_vcf() -> String {
    let records = [
        // accepted: A carries the alternate at 19/20, B the reference at 14/15
        "chr1\t100\t.\tG\tA\t221\t.\tNUMALT=1;TYPE=snp\tGT:DP:RO:AO\t1:20:1:19\t0:15:14:1",
        // no variant called
        "chr1\t200\t.\tT\t.\t0\t.\tNUMALT=0\tGT:DP:RO:AO\t.\t.",
        // quality below the floor
        "chr1\t300\t.\tC\tT\t42\t.\tNUMALT=1;TYPE=snp\tGT:DP:RO:AO\t1:20:0:20\t1:20:0:20",
        // insertions are not representable in a fixed-width alignment
        "chr1\t400\t.\tC\tCAT\t300\t.\tNUMALT=1;TYPE=ins\tGT:DP:RO:AO\t1:20:0:20\t1:20:0:20",
        // B's depth of 8 rejects the whole site even though A qualifies
        "chr1\t500\t.\tG\tA\t221\t.\tNUMALT=1;TYPE=snp\tGT:DP:RO:AO\t1:20:1:19\t1:8:0:8",
        // accepted MNP
        "chr1\t600\t.\tGA\tTT\t180\t.\tNUMALT=1;TYPE=mnp\tGT:DP:RO:AO\t1:30:0:30\t1:25:1:24",
        // B has no call at all
        "chr1\t700\t.\tA\tC\t150\t.\tNUMALT=1;TYPE=snp\tGT:DP:RO:AO\t1:20:0:20\t.",
    ];
    format!(
        "##fileformat=VCFv4.1\n##source=freeBayes v1.3\n{HEADER}\n{}\n",
        records.join("\n")
    )
}

#[test]
fn full_run_keeps_only_core_sites() {
    let dir = tempdir().unwrap();
    let input = write_input(dir.path(), "calls.vcf", &combined_vcf());
    let prefix = dir.path().join("core");

    let summary = extract_core_file(base_config(input, prefix.clone())).unwrap();

    assert_eq!(summary.records_seen, 7);
    assert_eq!(summary.core_sites, 2);
    assert_eq!(summary.core_bases, 3);
    assert_eq!(summary.sample_count, 3);
    assert_eq!(summary.filtered_sites, 3);
    assert_eq!(summary.evidence_rejections, 2);
    assert_eq!(summary.monomorphic_sites, 0);
    assert_eq!(summary.parse_errors, 0);

    // Filtered VCF: verbatim comments + header + only the accepted lines.
    let vcf = fs::read_to_string(prefix.with_extension("vcf")).unwrap();
    let lines: Vec<&str> = vcf.lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], "##fileformat=VCFv4.1");
    assert_eq!(lines[1], "##source=freeBayes v1.3");
    assert_eq!(lines[2], HEADER);
    assert!(lines[3].starts_with("chr1\t100\t"));
    assert!(lines[4].starts_with("chr1\t600\t"));

    // All per-site artifacts share the same ordinals and coordinates.
    let bed = fs::read_to_string(prefix.with_extension("bed")).unwrap();
    assert_eq!(bed, "chr1\t99\t100\tcore00001\nchr1\t599\t601\tcore00002\n");

    let gff = fs::read_to_string(prefix.with_extension("gff")).unwrap();
    assert!(gff.starts_with("##gff-version 3\n"));
    assert!(gff.contains("chr1\tvcf2core\tvariation\t100\t100\t.\t.\t.\tID=core00001;product=\"GAG\""));
    assert!(gff.contains("chr1\tvcf2core\tvariation\t600\t601\t.\t.\t.\tID=core00002;product=\"GATTTT\""));

    let csv = fs::read_to_string(prefix.with_extension("csv")).unwrap();
    let rows: Vec<&str> = csv.lines().collect();
    assert_eq!(
        rows[0],
        "#SEQ,POS,TYPE,Reference,A,B,Reference_evidence,A_evidence,B_evidence,FEATURE"
    );
    assert_eq!(rows[1], "chr1,100,snp,G,A,G,,19/20,14/15,core00001");
    assert_eq!(rows[2], "chr1,600,mnp,GA,TT,TT,,30/30,24/25,core00002");

    // Alignment rows grow in lock-step: one reference row plus both samples.
    let fasta = fs::read_to_string(prefix.with_extension("fasta")).unwrap();
    assert_eq!(fasta, ">Reference\nGGA\n>A\nATT\n>B\nGTT\n");

    let nexus = fs::read_to_string(prefix.with_extension("nex")).unwrap();
    assert!(nexus.contains("dimensions ntax=3 nchar=3;"));
    assert!(nexus.contains("missing=N gap=-;"));

    let report = fs::read_to_string(prefix.with_extension("report")).unwrap();
    assert!(report.contains("core_sites\t2"));
    assert!(report.contains("core_bases\t3"));
    assert!(report.contains("samples\tReference,A,B"));
    assert!(report.contains("min_depth\t10"));
}

#[test]
fn gzip_input_matches_plain_input() {
    let dir = tempdir().unwrap();
    let contents = combined_vcf();

    let plain = write_input(dir.path(), "calls.vcf", &contents);
    let gz_path = dir.path().join("calls.vcf.gz");
    let mut encoder = GzEncoder::new(fs::File::create(&gz_path).unwrap(), Compression::default());
    encoder.write_all(contents.as_bytes()).unwrap();
    encoder.finish().unwrap();

    // Same prefix stem in separate directories: site labels embed the stem,
    // so only the directories may differ between the two runs.
    let plain_dir = tempdir().unwrap();
    let gz_dir = tempdir().unwrap();
    let plain_prefix = plain_dir.path().join("core");
    let gz_prefix = gz_dir.path().join("core");
    let plain_summary = extract_core_file(base_config(plain, plain_prefix.clone())).unwrap();
    let gz_summary = extract_core_file(base_config(gz_path, gz_prefix.clone())).unwrap();

    assert_eq!(plain_summary, gz_summary);
    for ext in ["vcf", "bed", "gff", "csv", "fasta", "nex"] {
        assert_eq!(
            fs::read(plain_prefix.with_extension(ext)).unwrap(),
            fs::read(gz_prefix.with_extension(ext)).unwrap(),
            "artifact {ext} differs between plain and gzip input"
        );
    }
}

#[test]
fn rerun_reproduces_identical_outputs() {
    let dir = tempdir().unwrap();
    let input = write_input(dir.path(), "calls.vcf", &combined_vcf());

    // Identical configuration apart from the output directory; the prefix
    // stem must match too, since it is embedded in every site label.
    let first_dir = tempdir().unwrap();
    let second_dir = tempdir().unwrap();
    let first = first_dir.path().join("core");
    let second = second_dir.path().join("core");
    let s1 = extract_core_file(base_config(input.clone(), first.clone())).unwrap();
    let s2 = extract_core_file(base_config(input, second.clone())).unwrap();

    assert_eq!(s1, s2);
    // Everything except the timestamped report is byte-identical.
    for ext in ["vcf", "bed", "gff", "csv", "fasta", "nex"] {
        assert_eq!(
            fs::read(first.with_extension(ext)).unwrap(),
            fs::read(second.with_extension(ext)).unwrap()
        );
    }
}

#[test]
fn substitution_policy_fills_uncalled_samples() {
    let dir = tempdir().unwrap();
    let input = write_input(
        dir.path(),
        "calls.vcf",
        &format!(
            "{HEADER}\nchr1\t700\t.\tA\tC\t150\t.\tNUMALT=1;TYPE=snp\tGT:DP:RO:AO\t1:20:0:20\t.\n"
        ),
    );
    let prefix = dir.path().join("core");

    let mut config = base_config(input, prefix.clone());
    config.allow_substitution = true;
    let summary = extract_core_file(config).unwrap();

    assert_eq!(summary.core_sites, 1);
    assert_eq!(summary.substituted_calls, 1);

    let fasta = fs::read_to_string(prefix.with_extension("fasta")).unwrap();
    assert_eq!(fasta, ">Reference\nA\n>A\nC\n>B\nN\n");

    // The substituted sample carries no evidence in the table.
    let csv = fs::read_to_string(prefix.with_extension("csv")).unwrap();
    assert!(csv.lines().nth(1).unwrap().ends_with("A,C,N,,20/20,,core00001"));
}

#[test]
fn shared_alternate_is_monomorphic_without_the_reference_row() {
    let dir = tempdir().unwrap();
    let header = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tA\tB\tC";
    let record =
        "chr1\t100\t.\tG\tT\t200\t.\tNUMALT=1;TYPE=snp\tGT:DP:RO:AO\t1:20:0:20\t1:30:0:30\t1:25:0:25";
    let input = write_input(dir.path(), "calls.vcf", &format!("{header}\n{record}\n"));

    // All three samples share the alternate: no signal once the reference
    // row is excluded.
    let mut config = base_config(input.clone(), dir.path().join("noref"));
    config.exclude_reference = true;
    let summary = extract_core_file(config).unwrap();
    assert_eq!(summary.core_sites, 0);
    assert_eq!(summary.monomorphic_sites, 1);

    // With the reference row included the same site is polymorphic.
    let summary = extract_core_file(base_config(input, dir.path().join("withref"))).unwrap();
    assert_eq!(summary.core_sites, 1);
    assert_eq!(summary.monomorphic_sites, 0);
}

#[test]
fn explicit_sample_subset_drives_the_decision() {
    let dir = tempdir().unwrap();
    let input = write_input(dir.path(), "calls.vcf", &combined_vcf());
    let prefix = dir.path().join("core");

    // Only B (plus the reference row): at chr1:100 B carries the reference
    // allele, so the column is monomorphic and rejected.
    let mut config = base_config(input, prefix.clone());
    config.samples = Some(vec![String::from("B")]);
    let summary = extract_core_file(config).unwrap();

    assert_eq!(summary.sample_count, 2);
    let fasta = fs::read_to_string(prefix.with_extension("fasta")).unwrap();
    let headers: Vec<&str> = fasta.lines().filter(|l| l.starts_with('>')).collect();
    assert_eq!(headers, vec![">Reference", ">B"]);
}

#[test]
fn malformed_lines_are_counted_and_skipped() {
    let dir = tempdir().unwrap();
    let input = write_input(
        dir.path(),
        "calls.vcf",
        &format!(
            "{HEADER}\nchr1\tbogus\t.\tG\tA\t200\t.\tNUMALT=1;TYPE=snp\tGT\t1\t1\n\
             chr1\t100\t.\tG\tA\t221\t.\tNUMALT=1;TYPE=snp\tGT:DP:RO:AO\t1:20:1:19\t0:15:14:1\n"
        ),
    );

    let summary = extract_core_file(base_config(input, dir.path().join("core"))).unwrap();
    assert_eq!(summary.parse_errors, 1);
    assert_eq!(summary.core_sites, 1);
}
