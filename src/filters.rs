use thiserror::Error;

use crate::record::VariantSite;

/// Every way a record can be refused core status.
///
/// All variants are recoverable: the offending site is logged and skipped,
/// never surfaced as a run failure.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Rejection {
    #[error("no variant called")]
    NoVariant,
    #[error("quality {quality} below floor {floor}")]
    QualityBelowFloor { quality: f64, floor: u32 },
    #[error("INFO reports zero alternate alleles")]
    NoAlternatesCalled,
    #[error("INFO attribute {key} is malformed: '{value}'")]
    MalformedAttribute { key: &'static str, value: String },
    #[error("no variant type declared for the site")]
    MissingTypeAttribute,
    #[error("unsupported variant type '{found}'")]
    UnsupportedType { found: String },
    #[error("mixed variant types across alternates ({found})")]
    MixedType { found: String },
    #[error("alternate allele '{alternate}' length differs from reference")]
    LengthMismatch { alternate: String },
    #[error("sample '{sample}' has no call")]
    SampleUncalled { sample: String },
    #[error("sample '{sample}' field is malformed: {detail}")]
    MalformedSample { sample: String, detail: String },
    #[error("sample '{sample}' genotype index {index} has no matching allele")]
    UnknownGenotype { sample: String, index: usize },
    #[error("sample '{sample}' depth {depth} below floor {floor}")]
    DepthBelowFloor {
        sample: String,
        depth: u64,
        floor: u32,
    },
    #[error("sample '{sample}' call fraction {fraction:.3} below floor {floor}")]
    FractionBelowFloor {
        sample: String,
        fraction: f64,
        floor: f64,
    },
    #[error("all samples share one allele (monomorphic)")]
    Monomorphic,
    #[error("resolved {found} calls for {expected} included samples")]
    CallCountMismatch { expected: usize, found: usize },
}

/// Coarse buckets for run counters.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RejectionClass {
    /// Site-level predicate, independent of sample data.
    Site,
    /// Per-sample confidence or decoding failure.
    Evidence,
    /// Degenerate resulting column.
    Degenerate,
}

impl Rejection {
    pub fn class(&self) -> RejectionClass {
        match self {
            Rejection::NoVariant
            | Rejection::QualityBelowFloor { .. }
            | Rejection::NoAlternatesCalled
            | Rejection::MalformedAttribute { .. }
            | Rejection::MissingTypeAttribute
            | Rejection::UnsupportedType { .. }
            | Rejection::MixedType { .. }
            | Rejection::LengthMismatch { .. } => RejectionClass::Site,
            Rejection::SampleUncalled { .. }
            | Rejection::MalformedSample { .. }
            | Rejection::UnknownGenotype { .. }
            | Rejection::DepthBelowFloor { .. }
            | Rejection::FractionBelowFloor { .. } => RejectionClass::Evidence,
            Rejection::Monomorphic | Rejection::CallCountMismatch { .. } => {
                RejectionClass::Degenerate
            }
        }
    }
}

/// Variant classes the alignment can represent: fixed-length substitutions.
const ACCEPTED_TYPES: [&str; 2] = ["snp", "mnp"];

/// Applies the site-level predicates in their fixed order; the first failing
/// predicate rejects the site and later predicates are not evaluated.
///
/// Only uniform-length substitution sites survive; any variable-length event
/// would desynchronize the per-sample alignment buffers.
pub fn apply_site_filters(site: &VariantSite, min_quality: u32) -> Result<(), Rejection> {
    // 1. Has variant
    if site.alternates.is_empty() {
        return Err(Rejection::NoVariant);
    }

    // 2. Quality floor; zero/absent quality means "not applicable"
    if let Some(quality) = site.quality {
        if quality > 0.0 && quality < f64::from(min_quality) {
            return Err(Rejection::QualityBelowFloor {
                quality,
                floor: min_quality,
            });
        }
    }

    // 3. Non-monomorphic by attribute
    if let Some(Some(raw)) = site.info.get("NUMALT") {
        let numalt: u64 = raw.parse().map_err(|_| Rejection::MalformedAttribute {
            key: "NUMALT",
            value: raw.to_string(),
        })?;
        if numalt == 0 {
            return Err(Rejection::NoAlternatesCalled);
        }
    }

    // 4. Allele class: uniformly snp or uniformly mnp
    let types = site
        .declared_types()
        .ok_or(Rejection::MissingTypeAttribute)?;
    let first = types.first().copied().unwrap_or_default();
    if !ACCEPTED_TYPES.contains(&first) {
        return Err(Rejection::UnsupportedType {
            found: first.to_string(),
        });
    }
    if types.iter().any(|t| *t != first) {
        return Err(Rejection::MixedType {
            found: types.join(","),
        });
    }

    // 5. Uniform allele length
    let length = site.allele_length();
    for alternate in &site.alternates {
        if alternate.len() != length {
            return Err(Rejection::LengthMismatch {
                alternate: alternate.clone(),
            });
        }
    }

    Ok(())
}
