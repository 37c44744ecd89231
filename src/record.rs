use std::io::{self, BufRead};
use std::num::{ParseFloatError, ParseIntError};

use thiserror::Error;

/// Minimum number of tab-delimited fields in a usable data line:
/// CHROM, POS, ID, REF, ALT, QUAL, FILTER, INFO, FORMAT, plus samples.
const FIXED_FIELDS: usize = 9;

/// One classified line from the variant stream.
#[derive(Clone, Debug, PartialEq)]
pub enum Line {
    /// A `##` metadata line, copied verbatim to the filtered output.
    Comment(String),
    /// The `#CHROM` column header; carries the declared sample identifiers
    /// and the raw line for verbatim passthrough.
    Header { samples: Vec<String>, raw: String },
    /// A data record.
    Site(VariantSite),
}

/// Site-level fields of one data record, plus the raw per-sample fields.
#[derive(Clone, Debug, PartialEq)]
pub struct VariantSite {
    pub sequence: String,
    /// 1-based position.
    pub position: u64,
    pub reference: String,
    /// Ordered alternate alleles; empty when the ALT field was `.`.
    pub alternates: Vec<String>,
    /// `.` or absent quality resolves to `None`.
    pub quality: Option<f64>,
    pub info: InfoMap,
    /// Declared per-sample tag order (the FORMAT column).
    pub tags: Vec<String>,
    /// Raw colon-delimited value field per sample, in column order.
    pub sample_fields: Vec<String>,
    /// The original line, kept for verbatim passthrough on acceptance.
    pub raw: String,
}

impl VariantSite {
    /// Allele length of the site; filters guarantee alternates match it.
    pub fn allele_length(&self) -> usize {
        self.reference.len()
    }

    /// `sequence:position`, used in skip diagnostics.
    pub fn coordinate(&self) -> String {
        format!("{}:{}", self.sequence, self.position)
    }

    /// Raw evidence field for the sample at the given absolute column index.
    pub fn sample_field(&self, column: usize) -> Option<&str> {
        column
            .checked_sub(FIXED_FIELDS)
            .and_then(|i| self.sample_fields.get(i))
            .map(String::as_str)
    }

    /// Declared variant type per alternate, from the INFO `TYPE` attribute.
    pub fn declared_types(&self) -> Option<Vec<&str>> {
        match self.info.get("TYPE") {
            Some(Some(value)) => Some(value.split(',').collect()),
            _ => None,
        }
    }
}

/// Ordered decoding of the semicolon-separated INFO column.
///
/// Bareword keys (flags) map to `None`; `key=value` pairs keep the value.
/// Order is preserved so nothing downstream depends on hash iteration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InfoMap {
    entries: Vec<(String, Option<String>)>,
}

impl InfoMap {
    pub fn parse(raw: &str) -> Self {
        let mut entries = Vec::new();
        if raw == "." {
            return Self { entries };
        }
        for item in raw.split(';') {
            if item.is_empty() {
                continue;
            }
            match item.split_once('=') {
                Some((key, value)) => entries.push((key.to_string(), Some(value.to_string()))),
                None => entries.push((item.to_string(), None)),
            }
        }
        Self { entries }
    }

    /// Outer `None`: key absent. Inner `None`: bareword flag.
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_deref())
    }
}

/// One sample's evidence, decoded against the line's declared tag order.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleData {
    values: Vec<(String, String)>,
}

impl SampleData {
    pub fn get(&self, tag: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, v)| v.as_str())
    }
}

/// Errors raised while decoding one sample's colon-delimited field.
#[derive(Debug, Error, PartialEq)]
pub enum SampleDecodeError {
    #[error("sample field has {found} values for {expected} declared tags")]
    TagArity { expected: usize, found: usize },
}

/// Decodes a sample's colon-delimited field into a tag → value mapping.
///
/// A literal `.` field signals "no call" and resolves to `None`. A field
/// whose value count disagrees with the declared tag order fails clearly
/// rather than silently defaulting.
pub fn decode_sample(tags: &[String], raw: &str) -> Result<Option<SampleData>, SampleDecodeError> {
    if raw == "." {
        return Ok(None);
    }
    let values: Vec<&str> = raw.split(':').collect();
    if values.len() != tags.len() {
        return Err(SampleDecodeError::TagArity {
            expected: tags.len(),
            found: values.len(),
        });
    }
    Ok(Some(SampleData {
        values: tags
            .iter()
            .cloned()
            .zip(values.into_iter().map(str::to_string))
            .collect(),
    }))
}

/// Errors that can arise while parsing one line of the variant stream.
#[derive(Debug, Error)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    pub line: u64,
    pub raw: String,
    #[source]
    pub kind: ParseErrorKind,
}

#[derive(Debug, Error)]
pub enum ParseErrorKind {
    #[error("I/O error")]
    Io(#[from] io::Error),
    #[error("expected at least {FIXED_FIELDS} tab-delimited fields, found {0}")]
    FieldCount(usize),
    #[error("invalid position: {0}")]
    InvalidPosition(ParseIntError),
    #[error("invalid quality: {0}")]
    InvalidQuality(ParseFloatError),
    #[error("empty reference allele")]
    EmptyReference,
}

/// Iterator over classified lines of a variant stream.
///
/// Pure extraction: no rejection logic lives here. Comment and header lines
/// are yielded so the driver can copy them to the filtered output.
pub struct Reader<R> {
    inner: R,
    line: u64,
    buf: String,
}

impl<R> Reader<R>
where
    R: BufRead,
{
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line: 0,
            buf: String::new(),
        }
    }
}

impl<R> Iterator for Reader<R>
where
    R: BufRead,
{
    type Item = Result<Line, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.inner.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line += 1;
                    let trimmed = self.buf.trim_end_matches(['\n', '\r']);
                    if trimmed.is_empty() {
                        continue;
                    }

                    return Some(classify_line(trimmed).map_err(|kind| ParseError {
                        line: self.line,
                        raw: trimmed.to_string(),
                        kind,
                    }));
                }
                Err(e) => {
                    return Some(Err(ParseError {
                        line: self.line,
                        raw: String::new(),
                        kind: ParseErrorKind::Io(e),
                    }));
                }
            }
        }
    }
}

/// Reserved first-column marker of the sample header line.
const HEADER_MARKER: &str = "#CHROM";

fn classify_line(line: &str) -> Result<Line, ParseErrorKind> {
    if line.starts_with('#') {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields[0] != HEADER_MARKER {
            return Ok(Line::Comment(line.to_string()));
        }
        let samples = fields
            .iter()
            .skip(FIXED_FIELDS)
            .map(|s| s.to_string())
            .collect();
        return Ok(Line::Header {
            samples,
            raw: line.to_string(),
        });
    }

    parse_site(line).map(Line::Site)
}

fn parse_site(line: &str) -> Result<VariantSite, ParseErrorKind> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < FIXED_FIELDS {
        return Err(ParseErrorKind::FieldCount(fields.len()));
    }

    let position = fields[1]
        .parse::<u64>()
        .map_err(ParseErrorKind::InvalidPosition)?;

    let reference = fields[3];
    if reference.is_empty() {
        return Err(ParseErrorKind::EmptyReference);
    }

    let alternates = if fields[4] == "." {
        Vec::new()
    } else {
        fields[4].split(',').map(str::to_string).collect()
    };

    let quality = match fields[5] {
        "." | "" => None,
        raw => Some(raw.parse::<f64>().map_err(ParseErrorKind::InvalidQuality)?),
    };

    Ok(VariantSite {
        sequence: fields[0].to_string(),
        position,
        reference: reference.to_string(),
        alternates,
        quality,
        info: InfoMap::parse(fields[7]),
        tags: fields[8].split(':').map(str::to_string).collect(),
        sample_fields: fields[FIXED_FIELDS..]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        raw: line.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA_LINE: &str =
        "chr1\t42\t.\tG\tA\t221.5\t.\tNUMALT=1;TYPE=snp\tGT:DP:RO:AO\t1:20:1:19\t0:15:14:1";

    #[test]
    fn parses_data_line_fields() {
        let site = match classify_line(DATA_LINE).unwrap() {
            Line::Site(site) => site,
            other => panic!("expected site, got {other:?}"),
        };
        assert_eq!(site.sequence, "chr1");
        assert_eq!(site.position, 42);
        assert_eq!(site.reference, "G");
        assert_eq!(site.alternates, vec!["A"]);
        assert_eq!(site.quality, Some(221.5));
        assert_eq!(site.tags, vec!["GT", "DP", "RO", "AO"]);
        assert_eq!(site.sample_fields, vec!["1:20:1:19", "0:15:14:1"]);
        assert_eq!(site.allele_length(), 1);
        assert_eq!(site.coordinate(), "chr1:42");
    }

    #[test]
    fn dot_alt_yields_empty_alternates() {
        let line = "chr1\t5\t.\tG\t.\t.\t.\t.\tGT\t0";
        let site = match classify_line(line).unwrap() {
            Line::Site(site) => site,
            other => panic!("expected site, got {other:?}"),
        };
        assert!(site.alternates.is_empty());
        assert_eq!(site.quality, None);
    }

    #[test]
    fn info_map_handles_barewords_and_pairs() {
        let info = InfoMap::parse("NUMALT=2;IMPRECISE;TYPE=snp,snp");
        assert_eq!(info.get("NUMALT"), Some(Some("2")));
        assert_eq!(info.get("IMPRECISE"), Some(None));
        assert_eq!(info.get("TYPE"), Some(Some("snp,snp")));
        assert_eq!(info.get("DP"), None);
    }

    #[test]
    fn declared_types_split_per_alternate() {
        let site = match classify_line(
            "chr1\t7\t.\tGA\tTT,CC\t10\t.\tTYPE=mnp,mnp\tGT\t1\t2",
        )
        .unwrap()
        {
            Line::Site(site) => site,
            other => panic!("expected site, got {other:?}"),
        };
        assert_eq!(site.declared_types(), Some(vec!["mnp", "mnp"]));
    }

    #[test]
    fn decode_sample_zips_declared_tags() {
        let tags: Vec<String> = ["GT", "DP", "RO", "AO"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let data = decode_sample(&tags, "1:20:1:19").unwrap().unwrap();
        assert_eq!(data.get("GT"), Some("1"));
        assert_eq!(data.get("DP"), Some("20"));
        assert_eq!(data.get("AO"), Some("19"));
        assert_eq!(data.get("GL"), None);
    }

    #[test]
    fn decode_sample_dot_is_no_call() {
        let tags = vec![String::from("GT")];
        assert_eq!(decode_sample(&tags, ".").unwrap(), None);
    }

    #[test]
    fn decode_sample_rejects_arity_mismatch() {
        let tags: Vec<String> = ["GT", "DP"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            decode_sample(&tags, "1:20:19"),
            Err(SampleDecodeError::TagArity {
                expected: 2,
                found: 3
            })
        );
    }

    #[test]
    fn reader_classifies_comments_header_and_sites() {
        let data = format!(
            "##fileformat=VCFv4.1\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tA\tB\n{DATA_LINE}\n"
        );
        let mut reader = Reader::new(data.as_bytes());

        assert!(matches!(
            reader.next().unwrap().unwrap(),
            Line::Comment(ref c) if c == "##fileformat=VCFv4.1"
        ));
        match reader.next().unwrap().unwrap() {
            Line::Header { samples, .. } => assert_eq!(samples, vec!["A", "B"]),
            other => panic!("expected header, got {other:?}"),
        }
        assert!(matches!(reader.next().unwrap().unwrap(), Line::Site(_)));
        assert!(reader.next().is_none());
    }

    #[test]
    fn reader_reports_line_numbers_on_errors() {
        let data = "##c\nchr1\tnotanumber\t.\tG\tA\t.\t.\t.\tGT\t1\n";
        let mut reader = Reader::new(data.as_bytes());
        reader.next().unwrap().unwrap();
        let err = reader.next().unwrap().unwrap_err();
        assert_eq!(err.line, 2);
        assert!(matches!(err.kind, ParseErrorKind::InvalidPosition(_)));
    }

    #[test]
    fn short_line_is_a_field_count_error() {
        let err = parse_site("chr1\t10\t.\tG").unwrap_err();
        assert!(matches!(err, ParseErrorKind::FieldCount(4)));
    }
}
