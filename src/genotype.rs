use crate::filters::Rejection;
use crate::record::{decode_sample, SampleData, VariantSite};
use crate::registry::{Sample, SampleRegistry};

/// Position of a resolved allele within `[reference, alternates…]`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GenotypeIndex {
    /// 0 = reference, 1..=N = the Nth alternate.
    Called(usize),
    /// No call; the allele is the configured missing symbol, if substitution
    /// is permitted at all.
    Unresolved,
}

/// One sample's resolved call at one site.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleCall {
    pub sample: String,
    /// Resolved allele, always exactly the site's allele length.
    pub allele: String,
    pub genotype: GenotypeIndex,
    pub depth: u64,
    /// Observation counts aligned to `[reference, alt1, alt2, …]`; empty
    /// when evidence is not applicable.
    pub observations: Vec<u64>,
    /// `observed/depth`, or empty when evidence is not applicable.
    pub evidence: String,
}

impl SampleCall {
    /// The reference pseudo-sample resolves trivially: the site's reference
    /// allele, no numeric evidence.
    fn reference(sample: &Sample, site: &VariantSite) -> Self {
        Self {
            sample: sample.id.clone(),
            allele: site.reference.clone(),
            genotype: GenotypeIndex::Called(0),
            depth: 0,
            observations: Vec::new(),
            evidence: String::new(),
        }
    }

    /// Synthetic fill for an uncalled sample under the substitution policy.
    fn substituted(sample: &Sample, allele_length: usize, missing: char) -> Self {
        Self {
            sample: sample.id.clone(),
            allele: missing.to_string().repeat(allele_length),
            genotype: GenotypeIndex::Unresolved,
            depth: 0,
            observations: Vec::new(),
            evidence: String::new(),
        }
    }

    pub fn is_substituted(&self) -> bool {
        self.genotype == GenotypeIndex::Unresolved
    }
}

/// Per-sample confidence configuration.
#[derive(Clone, Copy, Debug)]
pub struct CallThresholds {
    pub min_depth: u32,
    pub min_fraction: f64,
    pub allow_substitution: bool,
    pub missing_char: char,
}

/// Resolves every included sample's call for one site.
///
/// Pure per-site evaluation: per-sample results are folded with a
/// short-circuiting "all must succeed" combinator, so a single sample's
/// depth or fraction failure rejects the whole site. Core status requires
/// uniform confidence across the full inclusion set.
pub fn resolve_site(
    site: &VariantSite,
    registry: &SampleRegistry,
    thresholds: &CallThresholds,
) -> Result<Vec<SampleCall>, Rejection> {
    registry
        .samples()
        .iter()
        .map(|sample| resolve_sample(site, sample, thresholds))
        .collect()
}

fn resolve_sample(
    site: &VariantSite,
    sample: &Sample,
    thresholds: &CallThresholds,
) -> Result<SampleCall, Rejection> {
    let Some(column) = sample.column else {
        return Ok(SampleCall::reference(sample, site));
    };

    let raw = site
        .sample_field(column)
        .ok_or_else(|| Rejection::MalformedSample {
            sample: sample.id.clone(),
            detail: String::from("record has fewer sample fields than the header"),
        })?;

    let data = decode_sample(&site.tags, raw).map_err(|e| Rejection::MalformedSample {
        sample: sample.id.clone(),
        detail: e.to_string(),
    })?;

    let Some(data) = data else {
        return unresolved(site, sample, thresholds);
    };

    let index = match genotype_index(&data, sample)? {
        GenotypeIndex::Called(index) => index,
        GenotypeIndex::Unresolved => return unresolved(site, sample, thresholds),
    };

    let allele = if index == 0 {
        site.reference.clone()
    } else {
        site.alternates
            .get(index - 1)
            .cloned()
            .ok_or_else(|| Rejection::UnknownGenotype {
                sample: sample.id.clone(),
                index,
            })?
    };

    let depth = numeric_tag(&data, "DP", sample)?;
    let observations = observation_counts(&data, sample, site.alternates.len())?;

    if depth < u64::from(thresholds.min_depth) {
        return Err(Rejection::DepthBelowFloor {
            sample: sample.id.clone(),
            depth,
            floor: thresholds.min_depth,
        });
    }

    let observed = observations[index];
    let fraction = if depth == 0 {
        0.0
    } else {
        observed as f64 / depth as f64
    };
    if fraction < thresholds.min_fraction {
        return Err(Rejection::FractionBelowFloor {
            sample: sample.id.clone(),
            fraction,
            floor: thresholds.min_fraction,
        });
    }

    Ok(SampleCall {
        sample: sample.id.clone(),
        allele,
        genotype: GenotypeIndex::Called(index),
        depth,
        observations,
        evidence: format!("{observed}/{depth}"),
    })
}

fn unresolved(
    site: &VariantSite,
    sample: &Sample,
    thresholds: &CallThresholds,
) -> Result<SampleCall, Rejection> {
    if thresholds.allow_substitution {
        Ok(SampleCall::substituted(
            sample,
            site.allele_length(),
            thresholds.missing_char,
        ))
    } else {
        Err(Rejection::SampleUncalled {
            sample: sample.id.clone(),
        })
    }
}

/// First allele index of the GT value; `.` means no call. Phased and
/// unphased separators are accepted, only the leading allele is used.
fn genotype_index(data: &SampleData, sample: &Sample) -> Result<GenotypeIndex, Rejection> {
    let raw = data.get("GT").ok_or_else(|| Rejection::MalformedSample {
        sample: sample.id.clone(),
        detail: String::from("missing GT tag"),
    })?;

    let first = raw
        .split(['/', '|'])
        .next()
        .unwrap_or_default();
    if first == "." {
        return Ok(GenotypeIndex::Unresolved);
    }

    first
        .parse::<usize>()
        .map(GenotypeIndex::Called)
        .map_err(|_| Rejection::MalformedSample {
            sample: sample.id.clone(),
            detail: format!("unparseable GT '{raw}'"),
        })
}

fn numeric_tag(data: &SampleData, tag: &str, sample: &Sample) -> Result<u64, Rejection> {
    let raw = data.get(tag).ok_or_else(|| Rejection::MalformedSample {
        sample: sample.id.clone(),
        detail: format!("missing {tag} tag"),
    })?;
    raw.parse::<u64>().map_err(|_| Rejection::MalformedSample {
        sample: sample.id.clone(),
        detail: format!("unparseable {tag} '{raw}'"),
    })
}

/// `[RO, AO1, AO2, …]`, validated against the site's alternate count.
fn observation_counts(
    data: &SampleData,
    sample: &Sample,
    alternate_count: usize,
) -> Result<Vec<u64>, Rejection> {
    let mut counts = Vec::with_capacity(alternate_count + 1);
    counts.push(numeric_tag(data, "RO", sample)?);

    let raw = data.get("AO").ok_or_else(|| Rejection::MalformedSample {
        sample: sample.id.clone(),
        detail: String::from("missing AO tag"),
    })?;
    for value in raw.split(',') {
        counts.push(value.parse::<u64>().map_err(|_| {
            Rejection::MalformedSample {
                sample: sample.id.clone(),
                detail: format!("unparseable AO '{raw}'"),
            }
        })?);
    }

    if counts.len() != alternate_count + 1 {
        return Err(Rejection::MalformedSample {
            sample: sample.id.clone(),
            detail: format!(
                "{} observation counts for {} alleles",
                counts.len(),
                alternate_count + 1
            ),
        });
    }

    Ok(counts)
}
