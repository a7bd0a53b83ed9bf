//! Brute-force reference model shared by the integration tests

#![allow(dead_code)]

use pfp_dap::index::MAX_LCP;
use pfp_dap::{BuildConfig, BuildStats, DocumentBoundaries, DocumentMap, IndexFiles, PrefixFreeParse, build_index};
use std::path::Path;

/// Suffix array, LCP, BWT and profiles of `T$` computed directly
pub struct Reference {
    pub sa: Vec<usize>,
    pub lcp: Vec<u64>,
    pub bwt: Vec<u8>,
    pub doc_of_lf: Vec<usize>,
    pub num_docs: usize,
}

impl Reference {
    pub fn new(docs: &DocumentBoundaries) -> Self {
        let mut text = docs.text().to_vec();
        text.push(0);
        let n = text.len();

        let mut raw = vec![0; n];
        cdivsufsort::sort_in_place(&text, &mut raw);
        let sa: Vec<usize> = raw.iter().map(|&v| v as usize).collect();

        let lcp = kasai(&text, &sa);
        let bwt = sa.iter().map(|&p| if p == 0 { 0 } else { text[p - 1] }).collect();
        let doc_of_lf = sa
            .iter()
            .map(|&p| docs.doc_of(if p == 0 { n - 1 } else { p - 1 }))
            .collect();

        Self {
            sa,
            lcp,
            bwt,
            doc_of_lf,
            num_docs: docs.num_docs(),
        }
    }

    pub fn len(&self) -> usize {
        self.sa.len()
    }

    pub fn is_start(&self, i: usize) -> bool {
        i == 0 || self.bwt[i] != self.bwt[i - 1]
    }

    pub fn is_end(&self, i: usize) -> bool {
        i + 1 == self.len() || self.bwt[i] != self.bwt[i + 1]
    }

    pub fn runs(&self) -> Vec<(u8, u64)> {
        let mut runs: Vec<(u8, u64)> = Vec::new();
        for &ch in &self.bwt {
            match runs.last_mut() {
                Some((head, len)) if *head == ch => *len += 1,
                _ => runs.push((ch, 1)),
            }
        }
        runs
    }

    fn pos_of_lf(&self, i: usize) -> usize {
        if self.sa[i] == 0 { self.len() - 1 } else { self.sa[i] - 1 }
    }

    /// One plus the smallest LCP between `i` and the nearest position in
    /// `range` preceded by the same character from document `doc`
    fn nearest<I: Iterator<Item = usize>>(&self, i: usize, doc: usize, range: I, forward: bool) -> u64 {
        let mut min_lcp = u64::MAX;
        for k in range {
            // LCP[k] links k - 1 and k
            let link = if forward { self.lcp[k] } else { self.lcp[k + 1] };
            min_lcp = min_lcp.min(link);
            if self.bwt[k] == self.bwt[i] && self.doc_of_lf[k] == doc {
                return (min_lcp.min(MAX_LCP as u64) + 1).min(MAX_LCP as u64);
            }
        }
        0
    }

    fn self_entry(&self, i: usize) -> u16 {
        ((self.len() - self.pos_of_lf(i)) as u64).min(MAX_LCP as u64) as u16
    }

    /// Profile after the forward pass alone
    pub fn forward_profile(&self, i: usize) -> Vec<u16> {
        (0..self.num_docs)
            .map(|d| {
                if d == self.doc_of_lf[i] {
                    self.self_entry(i)
                } else {
                    self.nearest(i, d, (0..i).rev(), false) as u16
                }
            })
            .collect()
    }

    /// Final profile: the better of the nearest occurrence on either side
    pub fn profile(&self, i: usize) -> Vec<u16> {
        (0..self.num_docs)
            .map(|d| {
                if d == self.doc_of_lf[i] {
                    self.self_entry(i)
                } else {
                    let before = self.nearest(i, d, (0..i).rev(), false);
                    let after = self.nearest(i, d, i + 1..self.len(), true);
                    before.max(after) as u16
                }
            })
            .collect()
    }
}

/// Kasai et al. LCP, `lcp[i]` relating `sa[i - 1]` and `sa[i]`
pub fn kasai(text: &[u8], sa: &[usize]) -> Vec<u64> {
    let n = sa.len();
    let mut rank = vec![0; n];
    for (i, &p) in sa.iter().enumerate() {
        rank[p] = i;
    }
    let mut lcp = vec![0; n];
    let mut h = 0usize;
    for p in 0..n {
        if rank[p] > 0 {
            let q = sa[rank[p] - 1];
            while p + h < n && q + h < n && text[p + h] == text[q + h] {
                h += 1;
            }
            lcp[rank[p]] = h as u64;
            h = h.saturating_sub(1);
        } else {
            h = 0;
        }
    }
    lcp
}

/// Deterministic pseudo-random text over `alphabet`
pub fn random_text(len: usize, alphabet: &[u8], seed: u64) -> Vec<u8> {
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            alphabet[((state >> 33) % alphabet.len() as u64) as usize]
        })
        .collect()
}

/// Parse `docs` and build the index files at `prefix`
pub fn build<D: AsRef<[u8]>>(
    docs: &[D],
    window: usize,
    modulus: u64,
    prefix: &Path,
    config: &BuildConfig,
) -> (DocumentBoundaries, BuildStats, IndexFiles) {
    let docs = DocumentBoundaries::from_documents(docs).unwrap();
    let parse = PrefixFreeParse::build(docs.text(), window, modulus).unwrap();
    let stats = build_index(&parse, &docs, prefix, config).unwrap();
    let files = IndexFiles::open(prefix).unwrap();
    (docs, stats, files)
}
