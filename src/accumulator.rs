use crate::filters::Rejection;
use crate::genotype::SampleCall;
use crate::record::VariantSite;
use crate::registry::SampleRegistry;

/// A finalized core site: the variant plus exactly one call per included
/// sample, ready for emission.
#[derive(Clone, Debug)]
pub struct CoreSite {
    pub site: VariantSite,
    pub calls: Vec<SampleCall>,
    /// All resolved alleles concatenated in inclusion order.
    pub alleles: String,
    /// 1-based, monotonically increasing across the run.
    pub ordinal: u64,
}

impl CoreSite {
    /// 1-based inclusive end position of the site.
    pub fn end(&self) -> u64 {
        self.site.position + self.site.allele_length() as u64 - 1
    }
}

/// One row of the final multiple-sequence alignment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlignmentRow {
    pub id: String,
    pub sequence: String,
}

/// The finished alignment, handed read-only to the emitter at run end.
#[derive(Clone, Debug, Default)]
pub struct Alignment {
    pub rows: Vec<AlignmentRow>,
}

impl Alignment {
    /// Column count; identical for every row by construction.
    pub fn length(&self) -> usize {
        self.rows.first().map_or(0, |r| r.sequence.len())
    }
}

/// Owns the per-sample alignment buffers and the run-monotonic counters.
///
/// Buffers grow in lock-step, once per accepted site, for every included
/// sample simultaneously; at any point in the run they all have equal
/// length.
#[derive(Debug)]
pub struct CoreAccumulator {
    buffers: Vec<String>,
    accepted: u64,
    core_bases: u64,
}

impl CoreAccumulator {
    pub fn new(sample_count: usize) -> Self {
        Self {
            buffers: vec![String::new(); sample_count],
            accepted: 0,
            core_bases: 0,
        }
    }

    /// Accepts or rejects one fully resolved site.
    ///
    /// The resolver already guarantees one call per included sample; the
    /// count is re-validated here anyway. A column where every sample's
    /// allele string is byte-identical carries no signal and is rejected as
    /// monomorphic even though the individual calls passed; this guards
    /// against the case where the reference sample is excluded and all
    /// remaining samples share one alternate allele.
    pub fn accept(
        &mut self,
        site: VariantSite,
        calls: Vec<SampleCall>,
    ) -> Result<CoreSite, Rejection> {
        if calls.len() != self.buffers.len() {
            return Err(Rejection::CallCountMismatch {
                expected: self.buffers.len(),
                found: calls.len(),
            });
        }

        let monomorphic = calls
            .windows(2)
            .all(|pair| pair[0].allele == pair[1].allele);
        if monomorphic {
            return Err(Rejection::Monomorphic);
        }

        self.accepted += 1;
        self.core_bases += site.allele_length() as u64;

        let mut alleles = String::with_capacity(calls.len() * site.allele_length());
        for (buffer, call) in self.buffers.iter_mut().zip(&calls) {
            buffer.push_str(&call.allele);
            alleles.push_str(&call.allele);
        }

        Ok(CoreSite {
            site,
            calls,
            alleles,
            ordinal: self.accepted,
        })
    }

    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    pub fn core_bases(&self) -> u64 {
        self.core_bases
    }

    /// Length of every buffer (they are always equal).
    pub fn buffer_length(&self) -> usize {
        self.buffers.first().map_or(0, String::len)
    }

    /// Consumes the accumulator into the final alignment, rows in
    /// inclusion order.
    pub fn into_alignment(self, registry: &SampleRegistry) -> Alignment {
        let rows = registry
            .ids()
            .zip(self.buffers)
            .map(|(id, sequence)| AlignmentRow {
                id: id.to_string(),
                sequence,
            })
            .collect();
        Alignment { rows }
    }
}
