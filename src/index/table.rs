//! Predecessor max-LCP table and the profile seeding shared by both passes
//!
//! For every `(character, document)` pair the table holds the LCP between the
//! current suffix and the nearest already-scanned suffix whose BWT character is
//! `character` and whose preceding text position lies in `document`. Scanning
//! one position further can only lower those values (the LCP over a longer
//! stretch of the suffix array is a minimum over more entries), so each step
//! decays the whole table to the step's LCP and then resets the single pair
//! the step itself contributes.

use super::kernel::DecayKernel;
use super::types::{ALPHABET_SIZE, MAX_LCP};

/// Dense `ALPHABET_SIZE x num_docs` matrix of capped LCP values
pub struct PredecessorTable {
    num_docs: usize,
    values: Vec<u16>,
    kernel: DecayKernel,
}

impl PredecessorTable {
    pub fn new(num_docs: usize, kernel: DecayKernel) -> Self {
        Self {
            num_docs,
            values: vec![0; ALPHABET_SIZE * num_docs],
            kernel,
        }
    }

    #[inline]
    fn index(&self, ch: u8, doc: usize) -> usize {
        assert!(doc < self.num_docs, "document {} out of range", doc);
        ch as usize * self.num_docs + doc
    }

    #[inline]
    pub fn get(&self, ch: u8, doc: usize) -> u16 {
        self.values[self.index(ch, doc)]
    }

    #[inline]
    pub fn set(&mut self, ch: u8, doc: usize, value: u16) {
        let i = self.index(ch, doc);
        self.values[i] = value;
    }

    /// Row of `ch`, one entry per document
    pub fn row(&self, ch: u8) -> &[u16] {
        let start = ch as usize * self.num_docs;
        &self.values[start..start + self.num_docs]
    }

    /// Lower every entry to at most `bound`
    #[inline]
    pub fn decay(&mut self, bound: u16) {
        self.kernel.apply(&mut self.values, bound);
    }

    pub fn clear(&mut self) {
        self.values.fill(0);
    }

    pub fn kernel(&self) -> DecayKernel {
        self.kernel
    }
}

/// Which `(character, document)` pairs have been seen in the current pass
pub struct EncounteredMatrix {
    num_docs: usize,
    words: Vec<u64>,
}

impl EncounteredMatrix {
    pub fn new(num_docs: usize) -> Self {
        Self {
            num_docs,
            words: vec![0; (ALPHABET_SIZE * num_docs).div_ceil(64)],
        }
    }

    #[inline]
    fn bit(&self, ch: u8, doc: usize) -> usize {
        assert!(doc < self.num_docs, "document {} out of range", doc);
        ch as usize * self.num_docs + doc
    }

    #[inline]
    pub fn mark(&mut self, ch: u8, doc: usize) {
        let bit = self.bit(ch, doc);
        self.words[bit / 64] |= 1 << (bit % 64);
    }

    #[inline]
    pub fn contains(&self, ch: u8, doc: usize) -> bool {
        let bit = self.bit(ch, doc);
        self.words[bit / 64] & (1 << (bit % 64)) != 0
    }

    pub fn clear(&mut self) {
        self.words.fill(0);
    }
}

/// Direction of a scan over the suffix array, which fixes the order of the
/// table update relative to the profile seeding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDirection {
    /// First pass: the step's LCP links it to the previous suffix, so decay
    /// first and seed from the decayed table. The reset value is the length of
    /// the suffix at `pos_of_LF`.
    Forward,
    /// Second pass: the step's LCP links it to the suffix scanned just before
    /// (the next one in text order), so seed first, then reset with that LCP
    /// and decay.
    Backward,
}

/// One position of a scan
#[derive(Debug, Clone, Copy)]
pub struct ScanStep {
    pub bwt_ch: u8,
    pub doc_of_lf: usize,
    /// LCP with the previous suffix in suffix-array order
    pub lcp: u64,
    /// Value stored at `(bwt_ch, doc_of_lf)` after the step
    pub reset: u64,
}

/// Predecessor table, encountered matrix, and the seeding rule over them
pub struct ProfileTracker {
    table: PredecessorTable,
    encountered: EncounteredMatrix,
}

impl ProfileTracker {
    pub fn new(num_docs: usize, kernel: DecayKernel) -> Self {
        Self {
            table: PredecessorTable::new(num_docs, kernel),
            encountered: EncounteredMatrix::new(num_docs),
        }
    }

    /// Forget everything learned by the previous pass
    pub fn clear(&mut self) {
        self.table.clear();
        self.encountered.clear();
    }

    pub fn table(&self) -> &PredecessorTable {
        &self.table
    }

    /// Advance the scan by one position, seeding `profile` when given.
    ///
    /// Forward seeds carry the self-document entry (`step.reset`); backward
    /// seeds leave it at zero since the stored forward value already holds it.
    pub fn step(&mut self, direction: ScanDirection, step: &ScanStep, profile: Option<&mut [u32]>) {
        let lcp = cap(step.lcp);
        match direction {
            ScanDirection::Forward => {
                self.table.decay(lcp);
                self.table.set(step.bwt_ch, step.doc_of_lf, cap(step.reset));
                self.encountered.mark(step.bwt_ch, step.doc_of_lf);
                if let Some(profile) = profile {
                    self.seed(step, profile);
                    profile[step.doc_of_lf] = step.reset.min(u32::MAX as u64) as u32;
                }
            }
            ScanDirection::Backward => {
                if let Some(profile) = profile {
                    self.seed(step, profile);
                }
                self.encountered.mark(step.bwt_ch, step.doc_of_lf);
                self.table.set(step.bwt_ch, step.doc_of_lf, cap(step.reset));
                self.table.decay(lcp);
            }
        }
    }

    /// Entries for other documents are the table value plus one (the shared
    /// BWT character), or zero when the pair has not been seen yet.
    fn seed(&self, step: &ScanStep, profile: &mut [u32]) {
        let row = self.table.row(step.bwt_ch);
        for (doc, (slot, &value)) in profile.iter_mut().zip(row).enumerate() {
            *slot = if doc != step.doc_of_lf && self.encountered.contains(step.bwt_ch, doc) {
                value as u32 + 1
            } else {
                0
            };
        }
    }
}

#[inline]
fn cap(value: u64) -> u16 {
    value.min(MAX_LCP as u64) as u16
}
