//! In-memory prefix-free parse
//!
//! Builds every structure the construction reads from a parse:
//! 1. Pads the text to `D^w T D^w` and selects trigger windows whose
//!    Karp-Rabin hash is divisible by `p`
//! 2. Cuts phrases between consecutive triggers (overlapping by `w` bytes),
//!    deduplicates and ranks them lexicographically
//! 3. Sorts the dictionary suffixes, the parse suffixes, and derives the
//!    occurrence lists, phrase end positions and sampled LCP
//!
//! Sorting is comparison based, so this is meant for tests and modest inputs,
//! not for genome-scale collections.

use super::rmq::SparseTableRmq;
use super::{DOLLAR, END_OF_DICT, END_OF_WORD, MIN_TEXT_BYTE, ParseStructures};
use anyhow::Result;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::ops::Range;

/// Karp-Rabin modulus, a prime below 2^31
const KR_PRIME: u64 = 1_999_999_973;

/// Karp-Rabin base
const KR_BASE: u64 = 256;

/// Above this many suffixes the sorts run on the rayon pool
const PARALLEL_SORT_THRESHOLD: usize = 100_000;

/// A prefix-free parse held entirely in memory
pub struct PrefixFreeParse {
    window: usize,
    /// Length of the padded text
    n: usize,
    /// Phrase ids of the parse, in text order
    parse: Vec<usize>,
    dict: Vec<u8>,
    /// Phrase-boundary bitvector over `dict`
    boundaries: Vec<bool>,
    /// `ranks[i]` = number of set boundary bits in `[0, i)`
    ranks: Vec<usize>,
    /// Offsets of the set boundary bits
    selects: Vec<usize>,
    dict_sa: Vec<usize>,
    dict_lcp: Vec<usize>,
    /// Concatenated occurrence lists
    ilist: Vec<usize>,
    /// Phrase `q` owns `ilist[ilist_bounds[q - 1]..ilist_bounds[q]]`
    ilist_bounds: Vec<usize>,
    /// Phrase end (in `T` coordinates) per parse-BWT position
    pos_t: Vec<usize>,
    sampled_lcp: SparseTableRmq,
}

impl PrefixFreeParse {
    /// Parse `text` with window `window` and trigger modulus `modulus`
    pub fn build(text: &[u8], window: usize, modulus: u64) -> Result<Self> {
        anyhow::ensure!(window > 0, "window length must be positive");
        anyhow::ensure!(modulus > 0, "trigger modulus must be positive");
        anyhow::ensure!(!text.is_empty(), "cannot parse an empty text");
        if let Some(pos) = text.iter().position(|&b| b < MIN_TEXT_BYTE) {
            anyhow::bail!("text contains reserved byte 0x{:02x} at offset {}", text[pos], pos);
        }

        let mut padded = Vec::with_capacity(text.len() + 2 * window);
        padded.resize(window, DOLLAR);
        padded.extend_from_slice(text);
        padded.resize(text.len() + 2 * window, DOLLAR);
        let n = padded.len();

        // Phrase starts: the padded start plus every trigger window inside T
        let mut starts = vec![0];
        starts.extend(trigger_positions(&padded, window, text.len(), modulus));
        let ends: Vec<usize> = (0..starts.len())
            .map(|k| starts.get(k + 1).map_or(n, |&next| next + window))
            .collect();

        // Deduplicate and rank phrases lexicographically (1-based ids)
        let mut distinct: FxHashMap<&[u8], usize> = FxHashMap::default();
        for (&s, &e) in starts.iter().zip(&ends) {
            distinct.entry(&padded[s..e]).or_insert(0);
        }
        let mut sorted: Vec<&[u8]> = distinct.keys().copied().collect();
        sorted.sort_unstable();
        for (rank, phrase) in sorted.iter().enumerate() {
            distinct.insert(*phrase, rank + 1);
        }
        let parse: Vec<usize> = starts
            .iter()
            .zip(&ends)
            .map(|(&s, &e)| distinct[&padded[s..e]])
            .collect();

        let mut dict = Vec::with_capacity(sorted.iter().map(|p| p.len() + 1).sum::<usize>() + 1);
        for phrase in &sorted {
            dict.extend_from_slice(phrase);
            dict.push(END_OF_WORD);
        }
        dict.push(END_OF_DICT);

        let mut boundaries = vec![false; dict.len()];
        boundaries[0] = true;
        for i in 1..dict.len() {
            boundaries[i] = dict[i - 1] == END_OF_WORD;
        }
        let mut ranks = Vec::with_capacity(dict.len() + 1);
        let mut selects = Vec::new();
        ranks.push(0);
        for (i, &bit) in boundaries.iter().enumerate() {
            if bit {
                selects.push(i);
            }
            ranks.push(selects.len());
        }

        let (dict_sa, dict_lcp) = dictionary_suffix_array(&dict);

        // Suffix array and BWT of the parse, terminated by phrase id 0
        let mut terminated = parse.clone();
        terminated.push(0);
        let parse_sa = parse_suffix_array(&terminated);
        let parse_bwt: Vec<usize> = parse_sa
            .iter()
            .map(|&i| if i == 0 { 0 } else { terminated[i - 1] })
            .collect();

        // Inverted lists by counting sort over the parse BWT
        let num_phrases = sorted.len();
        let mut ilist_bounds = vec![0; num_phrases + 1];
        for &q in parse_bwt.iter().filter(|&&q| q != 0) {
            ilist_bounds[q] += 1;
        }
        for q in 1..=num_phrases {
            ilist_bounds[q] += ilist_bounds[q - 1];
        }
        let mut fill: Vec<usize> = ilist_bounds[..num_phrases].to_vec();
        let mut ilist = vec![0; ilist_bounds[num_phrases]];
        for (j, &q) in parse_bwt.iter().enumerate() {
            if q != 0 {
                ilist[fill[q - 1]] = j;
                fill[q - 1] += 1;
            }
        }

        let pos_t: Vec<usize> = parse_sa
            .iter()
            .map(|&i| if i == 0 { 0 } else { ends[i - 1] - window })
            .collect();

        // Text start of each parse suffix; the terminator starts at the final D^w
        let text_start = |i: usize| if i < starts.len() { starts[i] } else { n - window };
        let mut s_lcp = vec![0; parse_sa.len()];
        for j in 1..parse_sa.len() {
            s_lcp[j] = common_prefix(&padded[text_start(parse_sa[j - 1])..], &padded[text_start(parse_sa[j])..]);
        }

        Ok(Self {
            window,
            n,
            parse,
            dict,
            boundaries,
            ranks,
            selects,
            dict_sa,
            dict_lcp,
            ilist,
            ilist_bounds,
            pos_t,
            sampled_lcp: SparseTableRmq::new(&s_lcp),
        })
    }

    /// Number of distinct phrases
    pub fn num_phrases(&self) -> usize {
        self.ilist_bounds.len() - 1
    }

    /// Phrase ids of the parse in text order
    pub fn parse(&self) -> &[usize] {
        &self.parse
    }
}

impl ParseStructures for PrefixFreeParse {
    fn window(&self) -> usize {
        self.window
    }

    fn text_len(&self) -> usize {
        self.n
    }

    fn dict(&self) -> &[u8] {
        &self.dict
    }

    fn dict_suffix_array(&self) -> &[usize] {
        &self.dict_sa
    }

    fn dict_lcp(&self) -> &[usize] {
        &self.dict_lcp
    }

    fn is_phrase_start(&self, offset: usize) -> bool {
        self.boundaries[offset]
    }

    fn phrase_rank(&self, offset: usize) -> usize {
        self.ranks[offset]
    }

    fn phrase_select(&self, k: usize) -> usize {
        self.selects[k - 1]
    }

    fn occurrence_list(&self) -> &[usize] {
        &self.ilist
    }

    fn occurrence_range(&self, phrase: usize) -> Range<usize> {
        self.ilist_bounds[phrase - 1]..self.ilist_bounds[phrase]
    }

    fn text_position(&self, occ: usize) -> usize {
        self.pos_t[occ]
    }

    fn min_sampled_lcp(&self, left: usize, right: usize) -> usize {
        self.sampled_lcp.min(left, right)
    }
}

/// Start offsets of trigger windows lying entirely inside `T`
fn trigger_positions(padded: &[u8], window: usize, text_len: usize, modulus: u64) -> Vec<usize> {
    let mut triggers = Vec::new();
    if text_len < window {
        return triggers;
    }

    // KR_BASE^(window - 1), the weight of the byte leaving the window
    let mut top = 1u64;
    for _ in 1..window {
        top = top * KR_BASE % KR_PRIME;
    }

    let mut hash = 0u64;
    for &b in &padded[window..2 * window] {
        hash = (hash * KR_BASE + b as u64) % KR_PRIME;
    }
    for start in window..=text_len {
        if start > window {
            let out = padded[start - 1] as u64 * top % KR_PRIME;
            hash = (hash + KR_PRIME - out) % KR_PRIME;
            hash = (hash * KR_BASE + padded[start + window - 1] as u64) % KR_PRIME;
        }
        if hash % modulus == 0 {
            triggers.push(start);
        }
    }
    triggers
}

/// Compare dictionary suffixes; separators reached at the same depth are
/// ordered by offset so every phrase end is distinct.
fn compare_dict_suffixes(dict: &[u8], a: usize, b: usize) -> Ordering {
    let mut k = 0;
    loop {
        let (ca, cb) = (dict[a + k], dict[b + k]);
        if ca != cb {
            return ca.cmp(&cb);
        }
        if ca == END_OF_WORD || ca == END_OF_DICT {
            return a.cmp(&b);
        }
        k += 1;
    }
}

/// Common prefix of two dictionary suffixes, stopping at separators
fn dict_common_prefix(dict: &[u8], a: usize, b: usize) -> usize {
    dict[a..]
        .iter()
        .zip(&dict[b..])
        .take_while(|&(&x, &y)| x == y && x != END_OF_WORD && x != END_OF_DICT)
        .count()
}

fn dictionary_suffix_array(dict: &[u8]) -> (Vec<usize>, Vec<usize>) {
    let mut sa: Vec<usize> = (0..dict.len()).collect();
    if sa.len() > PARALLEL_SORT_THRESHOLD {
        sa.par_sort_unstable_by(|&a, &b| compare_dict_suffixes(dict, a, b));
    } else {
        sa.sort_unstable_by(|&a, &b| compare_dict_suffixes(dict, a, b));
    }

    let mut lcp = vec![0; sa.len()];
    for i in 1..sa.len() {
        lcp[i] = dict_common_prefix(dict, sa[i - 1], sa[i]);
    }
    (sa, lcp)
}

fn parse_suffix_array(terminated: &[usize]) -> Vec<usize> {
    let mut sa: Vec<usize> = (0..terminated.len()).collect();
    if sa.len() > PARALLEL_SORT_THRESHOLD {
        sa.par_sort_unstable_by(|&a, &b| terminated[a..].cmp(&terminated[b..]));
    } else {
        sa.sort_unstable_by(|&a, &b| terminated[a..].cmp(&terminated[b..]));
    }
    sa
}

fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phrases_tile_the_padded_text() {
        let text = b"GATTACAGATTACATTAGGATTACA";
        let pfp = PrefixFreeParse::build(text, 3, 5).unwrap();
        assert_eq!(pfp.text_len(), text.len() + 6);

        // Every phrase occurrence is counted once across the occurrence lists
        let total: usize = (1..=pfp.num_phrases())
            .map(|q| pfp.occurrence_range(q).len())
            .sum();
        assert_eq!(total, pfp.parse().len());

        // Lengths of the parse phrases overlap by exactly w
        let covered: usize = pfp
            .parse()
            .iter()
            .map(|&q| {
                let start = pfp.phrase_select(q);
                pfp.phrase_select(q + 1) - start - 1 - 3
            })
            .sum::<usize>()
            + 3;
        assert_eq!(covered, pfp.text_len());
    }

    #[test]
    fn test_first_phrase_starts_dictionary() {
        let pfp = PrefixFreeParse::build(b"ACGTACGTTTGACCA", 2, 3).unwrap();
        assert_eq!(&pfp.dict()[..2], &[DOLLAR, DOLLAR]);
        assert_eq!(pfp.dict()[pfp.dict().len() - 1], END_OF_DICT);
        assert_eq!(pfp.dict_suffix_array()[0], pfp.dict().len() - 1);
        assert_eq!(pfp.parse()[0], 1);
    }

    #[test]
    fn test_dictionary_lcp_stops_at_separators() {
        let pfp = PrefixFreeParse::build(b"ABABABABCABABABC", 2, 2).unwrap();
        let dict = pfp.dict();
        let sa = pfp.dict_suffix_array();
        for (i, &lcp) in pfp.dict_lcp().iter().enumerate().skip(1) {
            assert!(dict[sa[i]..sa[i] + lcp].iter().all(|&b| b > END_OF_WORD));
            assert!(compare_dict_suffixes(dict, sa[i - 1], sa[i]) == Ordering::Less);
        }
    }

    #[test]
    fn test_short_text_is_a_single_phrase() {
        let pfp = PrefixFreeParse::build(b"AC", 4, 7).unwrap();
        assert_eq!(pfp.parse(), &[1]);
        assert_eq!(pfp.num_phrases(), 1);
        assert_eq!(pfp.occurrence_range(1), 0..1);
    }

    #[test]
    fn test_rejects_reserved_bytes() {
        assert!(PrefixFreeParse::build(b"AC\x02GT", 2, 3).is_err());
        assert!(PrefixFreeParse::build(b"", 2, 3).is_err());
    }
}
