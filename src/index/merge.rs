//! Suffix-merge driver
//!
//! Walks the dictionary suffix array and turns every proper phrase suffix into
//! the suffixes of the text it stands for:
//!
//! 1. Skip dictionary suffixes that cannot start a text suffix (inside the
//!    leading padding, whole phrases, or shorter than the window).
//! 2. Collect the following suffixes with the same string ("tied" suffixes).
//!    They come from different phrases, possibly preceded by different
//!    characters.
//! 3. Merge the occurrence lists of all tied phrases with a min-heap on the
//!    parse-BWT position. That position order is the order of the text
//!    suffixes, because what follows the shared string is the parse suffix
//!    after the phrase.
//!
//! The LCP of every emitted suffix with the previous one comes from the
//! dictionary LCP (between groups) or from the sampled LCP of the parse
//! (inside a group).

use super::types::SENTINEL_CHAR;
use crate::parse::{END_OF_DICT, ParseStructures};
use anyhow::{Context, Result};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// One position of the suffix array of the text, in suffix-array order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergedSuffix {
    /// Character preceding the suffix ([`SENTINEL_CHAR`] for the suffix at
    /// text start)
    pub bwt_ch: u8,
    /// Circular suffix-array value
    pub sa: u64,
    /// LCP with the previous suffix
    pub lcp: u64,
}

/// Cursor over the dictionary suffix array
#[derive(Debug, Clone, Copy)]
struct PhraseSuffix {
    /// Index into the dictionary suffix array
    i: usize,
    /// Dictionary offset of the suffix
    offset: usize,
    /// Phrase the suffix belongs to (1-based)
    phrase: usize,
    /// Length up to the phrase separator
    len: usize,
}

/// Remaining occurrences of one tied phrase
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct OccurrenceCursor {
    /// Parse-BWT position of the next occurrence (heap key)
    occ: usize,
    /// Index of `occ` in the occurrence list
    next: usize,
    end: usize,
    bwt_ch: u8,
}

pub struct SuffixMerge<'a, P: ParseStructures + ?Sized> {
    parse: &'a P,
    window: usize,
    /// `n - w + 1`, the period of circular suffix-array values
    modulus: u64,
}

impl<'a, P: ParseStructures + ?Sized> SuffixMerge<'a, P> {
    pub fn new(parse: &'a P) -> Result<Self> {
        let sa = parse.dict_suffix_array();
        anyhow::ensure!(!sa.is_empty(), "dictionary suffix array is empty");
        anyhow::ensure!(
            parse.dict()[sa[0]] == END_OF_DICT,
            "dictionary suffix array does not start with the dictionary terminator"
        );
        anyhow::ensure!(
            parse.dict_lcp().len() == sa.len(),
            "dictionary LCP and suffix array lengths differ ({} vs {})",
            parse.dict_lcp().len(),
            sa.len()
        );

        let window = parse.window();
        Ok(Self {
            parse,
            window,
            modulus: (parse.text_len() - window + 1) as u64,
        })
    }

    fn cursor(&self, i: usize) -> PhraseSuffix {
        let offset = self.parse.dict_suffix_array()[i];
        let phrase = self.parse.phrase_rank(offset);
        let next_start = self.parse.phrase_select(self.parse.phrase_rank(offset + 1) + 1);
        PhraseSuffix {
            i,
            offset,
            phrase,
            len: next_start - offset - 1,
        }
    }

    fn is_valid(&self, s: &PhraseSuffix) -> bool {
        s.offset >= self.window && !self.parse.is_phrase_start(s.offset) && s.len >= self.window
    }

    fn bwt_char(&self, s: &PhraseSuffix) -> u8 {
        if s.offset == self.window {
            SENTINEL_CHAR
        } else {
            self.parse.dict()[s.offset - 1]
        }
    }

    /// Run the merge, handing every suffix of the text to `emit` in
    /// suffix-array order. Returns the number of suffixes emitted.
    pub fn run<F>(&self, mut emit: F) -> Result<usize>
    where
        F: FnMut(MergedSuffix) -> Result<()>,
    {
        let sa_len = self.parse.dict_suffix_array().len();
        let dict_lcp = self.parse.dict_lcp();
        let ilist = self.parse.occurrence_list();

        let mut emitted = 0usize;
        let mut prev: Option<PhraseSuffix> = None;
        let mut heap = BinaryHeap::new();

        // Index 0 is the dictionary terminator
        let mut i = 1;
        while i < sa_len {
            let curr = self.cursor(i);
            if !self.is_valid(&curr) {
                i += 1;
                continue;
            }

            let mut tied = vec![curr];
            let mut next = i + 1;
            while next < sa_len && dict_lcp[next] >= curr.len {
                let s = self.cursor(next);
                if s.len == curr.len {
                    anyhow::ensure!(
                        self.is_valid(&s),
                        "dictionary suffix at offset {} ties with offset {} but is not a proper phrase suffix",
                        s.offset,
                        curr.offset
                    );
                    tied.push(s);
                }
                next += 1;
            }

            let first_lcp = match &prev {
                Some(p) => self.boundary_lcp(p, &curr)?,
                None => 0,
            };

            for s in &tied {
                let range = self.parse.occurrence_range(s.phrase);
                if !range.is_empty() {
                    heap.push(Reverse(OccurrenceCursor {
                        occ: ilist[range.start],
                        next: range.start,
                        end: range.end,
                        bwt_ch: self.bwt_char(s),
                    }));
                }
            }

            let mut prev_occ: Option<usize> = None;
            while let Some(Reverse(mut cursor)) = heap.pop() {
                let lcp = match prev_occ {
                    Some(p) => (curr.len + self.min_sampled_lcp(p, cursor.occ)?) as u64,
                    None => first_lcp,
                };
                let start = self
                    .parse
                    .text_position(cursor.occ)
                    .checked_sub(curr.len)
                    .with_context(|| {
                        format!("phrase occurrence {} ends before its suffix starts", cursor.occ)
                    })?;

                emit(MergedSuffix {
                    bwt_ch: cursor.bwt_ch,
                    sa: start as u64 % self.modulus,
                    lcp,
                })?;
                emitted += 1;
                prev_occ = Some(cursor.occ);

                cursor.next += 1;
                if cursor.next < cursor.end {
                    cursor.occ = ilist[cursor.next];
                    heap.push(Reverse(cursor));
                }
            }

            prev = tied.last().copied();
            i = next;
        }

        Ok(emitted)
    }

    /// LCP between the last suffix of the previous group and the first of
    /// the current one
    fn boundary_lcp(&self, prev: &PhraseSuffix, curr: &PhraseSuffix) -> Result<u64> {
        let dict_lcp = self.parse.dict_lcp();
        let mut lcp = dict_lcp[prev.i + 1..=curr.i]
            .iter()
            .copied()
            .min()
            .unwrap_or(0);

        if lcp >= curr.len && curr.len == prev.len {
            let ilist = self.parse.occurrence_list();
            let left = ilist[self.parse.occurrence_range(curr.phrase).start];
            let right = ilist[self.parse.occurrence_range(prev.phrase).end - 1];
            lcp += self.min_sampled_lcp(left, right)?;
        }
        Ok(lcp as u64)
    }

    /// Sampled LCP between two parse-BWT positions, minus the window the
    /// phrases overlap by
    fn min_sampled_lcp(&self, a: usize, b: usize) -> Result<usize> {
        let (left, right) = if a > b { (b, a) } else { (a, b) };
        anyhow::ensure!(left < right, "repeated parse-BWT position {}", left);

        let value = self.parse.min_sampled_lcp(left + 1, right);
        anyhow::ensure!(
            value >= self.window,
            "sampled LCP {} over ({}, {}] is shorter than the window",
            value,
            left,
            right
        );
        Ok(value - self.window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::PrefixFreeParse;

    /// Suffix array, BWT and LCP of `text$` by sorting
    fn naive(text: &[u8]) -> Vec<MergedSuffix> {
        let mut with_sentinel = text.to_vec();
        with_sentinel.push(0);
        let mut sa: Vec<usize> = (0..with_sentinel.len()).collect();
        sa.sort_by(|&a, &b| with_sentinel[a..].cmp(&with_sentinel[b..]));

        sa.iter()
            .enumerate()
            .map(|(k, &p)| {
                let lcp = if k == 0 {
                    0
                } else {
                    with_sentinel[sa[k - 1]..]
                        .iter()
                        .zip(&with_sentinel[p..])
                        .take_while(|(x, y)| x == y)
                        .count() as u64
                };
                let bwt_ch = if p == 0 { 0 } else { with_sentinel[p - 1] };
                MergedSuffix { bwt_ch, sa: p as u64, lcp }
            })
            .collect()
    }

    fn merged(text: &[u8], window: usize, modulus: u64) -> Vec<MergedSuffix> {
        let pfp = PrefixFreeParse::build(text, window, modulus).unwrap();
        let merge = SuffixMerge::new(&pfp).unwrap();
        let mut out = Vec::new();
        let count = merge
            .run(|s| {
                out.push(s);
                Ok(())
            })
            .unwrap();
        assert_eq!(count, out.len());
        out
    }

    #[test]
    fn test_matches_naive_on_repetitive_text() {
        let text = b"GATTACAGATTACATTAGGATTACAGATTACATTAGGATTACA";
        for (window, modulus) in [(2, 3), (3, 5), (4, 2)] {
            assert_eq!(merged(text, window, modulus), naive(text), "w={} p={}", window, modulus);
        }
    }

    #[test]
    fn test_single_phrase() {
        // No trigger fits, so the whole padded text is one phrase
        let text = b"ACGT";
        assert_eq!(merged(text, 6, 1000), naive(text));
    }

    #[test]
    fn test_first_suffix_is_sentinel() {
        let text = b"BANANABANDANA";
        let out = merged(text, 2, 3);
        assert_eq!(out.len(), text.len() + 1);
        assert_eq!(out[0].sa, text.len() as u64);
        assert_eq!(out[0].bwt_ch, b'A');
        assert_eq!(out[0].lcp, 0);
        assert_eq!(out.iter().filter(|s| s.bwt_ch == 0).count(), 1);
    }

    #[test]
    fn test_every_modulus_one_trigger() {
        // p = 1 makes every window a trigger: phrases are w + 1 bytes long
        let text = b"MISSISSIPPIMISSISSIPPI";
        assert_eq!(merged(text, 2, 1), naive(text));
    }
}
