//! Prefix-free parse collaborators
//!
//! The construction in [`crate::index::build_index`] never builds a parse itself. It reads
//! the dictionary, the parse occurrence lists and the sampled LCP through the
//! [`ParseStructures`] trait, and maps text positions to documents through
//! [`DocumentMap`].
//!
//! ## Coordinates
//!
//! The parsed string is `S = D^w T D^w` where `D` is [`DOLLAR`]. Every
//! dictionary phrase is followed by [`END_OF_WORD`] and the dictionary ends
//! with [`END_OF_DICT`]. The phrase starting with `D^w` sorts first, so
//! dictionary offset `w` is the first byte of `T`. The indexed circular text is
//! `T$` of length `n - 2w + 1`.
//!
//! - `builder`: in-memory parse construction implementing [`ParseStructures`]
//! - `documents`: document boundaries implementing [`DocumentMap`]
//! - `rmq`: sparse-table range-minimum queries over the sampled LCP

pub mod builder;
pub mod documents;
pub mod rmq;

pub use builder::PrefixFreeParse;
pub use documents::DocumentBoundaries;
pub use rmq::SparseTableRmq;

use std::ops::Range;

/// Terminates the concatenated dictionary
pub const END_OF_DICT: u8 = 0x00;

/// Terminates every phrase in the dictionary
pub const END_OF_WORD: u8 = 0x01;

/// Padding byte placed `w` times before and after the text
pub const DOLLAR: u8 = 0x02;

/// Smallest byte allowed in the indexed text
pub const MIN_TEXT_BYTE: u8 = 0x03;

/// Read-only view of a prefix-free parse.
///
/// Phrase ids are 1-based; id 0 is the parse terminator.
pub trait ParseStructures {
    /// Window length `w` used to select trigger strings
    fn window(&self) -> usize;

    /// Length `n` of the padded text `S`
    fn text_len(&self) -> usize;

    /// Concatenated dictionary, phrases separated by [`END_OF_WORD`]
    fn dict(&self) -> &[u8];

    /// Suffix array of the dictionary
    fn dict_suffix_array(&self) -> &[usize];

    /// LCP array of the dictionary, `lcp[i]` relates `sa[i - 1]` and `sa[i]`.
    /// Values never extend across an [`END_OF_WORD`].
    fn dict_lcp(&self) -> &[usize];

    /// Whether `offset` starts a phrase (the phrase-boundary bitvector)
    fn is_phrase_start(&self, offset: usize) -> bool;

    /// Number of phrase starts in `[0, offset)`
    fn phrase_rank(&self, offset: usize) -> usize;

    /// Offset of the `k`-th phrase start (1-based). `k` one past the last
    /// phrase returns the dictionary length minus one.
    fn phrase_select(&self, k: usize) -> usize;

    /// Concatenated inverted occurrence lists of all phrases
    fn occurrence_list(&self) -> &[usize];

    /// Range of `phrase` inside [`occurrence_list`](Self::occurrence_list)
    fn occurrence_range(&self, phrase: usize) -> Range<usize>;

    /// End of the phrase occurrence at parse-BWT position `occ`, in `T`
    /// coordinates
    fn text_position(&self, occ: usize) -> usize;

    /// Minimum sampled LCP over the inclusive range `[left, right]`
    fn min_sampled_lcp(&self, left: usize, right: usize) -> usize;
}

/// Maps absolute positions of the indexed text to document ids
pub trait DocumentMap {
    /// Number of documents in the collection
    fn num_docs(&self) -> usize;

    /// Length of the indexed circular text, sentinel included
    fn total_len(&self) -> usize;

    /// Document that owns `pos`
    fn doc_of(&self, pos: usize) -> usize;
}
