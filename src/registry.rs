use thiserror::Error;

/// Identifier of the synthetic reference pseudo-sample.
pub const REFERENCE_ID: &str = "Reference";

/// First absolute column index holding sample data in a record.
const FIRST_SAMPLE_COLUMN: usize = 9;

/// One included sample: identity plus its column in the data fields.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Sample {
    pub id: String,
    /// Absolute field index; `None` for the reference pseudo-sample, which
    /// is never looked up by column.
    pub column: Option<usize>,
}

impl Sample {
    pub fn is_reference(&self) -> bool {
        self.column.is_none()
    }
}

/// Errors raised while fixing the sample inclusion set.
#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("requested sample '{0}' is absent from the header")]
    UnknownSample(String),
    #[error("header declares no sample identifiers")]
    NoSamples,
}

/// The header-derived identifier → column mapping and inclusion set.
///
/// Created once from the first header line and immutable thereafter; the
/// inclusion order here is the order every per-sample artifact uses.
#[derive(Clone, Debug)]
pub struct SampleRegistry {
    samples: Vec<Sample>,
}

impl SampleRegistry {
    /// Resolves the inclusion set against the header's declared samples.
    ///
    /// With no explicit request all header samples are included, in header
    /// order. An explicit request is honored in its own order and fails
    /// loudly on identifiers the header does not declare. The reference
    /// pseudo-sample is prepended unless suppressed.
    pub fn from_header(
        header_samples: &[String],
        requested: Option<&[String]>,
        include_reference: bool,
    ) -> Result<Self, RegistryError> {
        if header_samples.is_empty() {
            return Err(RegistryError::NoSamples);
        }

        let column_of = |id: &str| -> Option<usize> {
            header_samples
                .iter()
                .position(|s| s == id)
                .map(|i| FIRST_SAMPLE_COLUMN + i)
        };

        let mut samples = Vec::new();
        if include_reference {
            samples.push(Sample {
                id: REFERENCE_ID.to_string(),
                column: None,
            });
        }

        match requested {
            Some(ids) => {
                for id in ids {
                    let column = column_of(id)
                        .ok_or_else(|| RegistryError::UnknownSample(id.clone()))?;
                    samples.push(Sample {
                        id: id.clone(),
                        column: Some(column),
                    });
                }
            }
            None => {
                for (i, id) in header_samples.iter().enumerate() {
                    samples.push(Sample {
                        id: id.clone(),
                        column: Some(FIRST_SAMPLE_COLUMN + i),
                    });
                }
            }
        }

        Ok(Self { samples })
    }

    /// Included samples, in inclusion order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.samples.iter().map(|s| s.id.as_str())
    }
}
