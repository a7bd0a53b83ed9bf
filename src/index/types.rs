//! Types and on-disk constants for document array profile construction

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Largest LCP value stored in a scratch record or profile entry
pub const MAX_LCP: u16 = u16::MAX;

/// Bytes per profile entry
pub const DOC_WIDTH: usize = 2;

/// Bytes per scratch run record
pub const RUN_RECORD_SIZE: usize = 6;

/// Bytes per value in `*.ssa` / `*.esa` (each sample is a pair)
pub const SA_SAMPLE_BYTES: usize = 5;

/// Bytes per value in `*.lcp`
pub const LCP_BYTES: usize = 5;

/// Bytes per run length in `*.bwt.len`
pub const RUN_LEN_BYTES: usize = 5;

/// Bytes of the document-count header of `*.sdap` / `*.edap`
pub const DAP_HEADER_BYTES: usize = 8;

/// BWT character written for the suffix that starts the text
pub const SENTINEL_CHAR: u8 = 0x00;

/// Most documents a 16-bit scratch document id can address
pub const MAX_DOCS: usize = 1 << 16;

/// Alphabet size of the predecessor table
pub const ALPHABET_SIZE: usize = 256;

/// Output file extensions
pub mod ext {
    pub const LCP: &str = "lcp";
    pub const START_SAMPLES: &str = "ssa";
    pub const END_SAMPLES: &str = "esa";
    pub const BWT: &str = "bwt";
    pub const BWT_HEADS: &str = "bwt.heads";
    pub const BWT_LENGTHS: &str = "bwt.len";
    pub const START_PROFILES: &str = "sdap";
    pub const END_PROFILES: &str = "edap";
    pub const SCRATCH_RECORDS: &str = "tmp_lcp_data";
    pub const SCRATCH_PROFILES: &str = "tmp_dap_data";
}

/// `prefix` with `.ext` appended (not replacing any existing extension)
pub fn with_extension(prefix: &Path, ext: &str) -> PathBuf {
    let mut name = prefix.as_os_str().to_os_string();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// Configuration for building the index files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Write the BWT as run heads + run lengths (default: true)
    pub run_length_encode: bool,
    /// Capacity in bytes of each scratch stream; `None` computes an upper
    /// bound from the text length and document count
    pub scratch_capacity: Option<u64>,
    /// Prefix for the scratch files (default: the output prefix)
    pub temp_prefix: Option<PathBuf>,
    /// Report pass progress on stderr
    pub verbose: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            run_length_encode: true,
            scratch_capacity: None,
            temp_prefix: None,
            verbose: false,
        }
    }
}

/// Scratch capacity large enough for any text of `total_len` positions over
/// `num_docs` documents: one record per position and, at worst, one profile
/// per position.
pub fn scratch_capacity_for(total_len: usize, num_docs: usize) -> u64 {
    let records = total_len * RUN_RECORD_SIZE;
    let profiles = total_len * num_docs * DOC_WIDTH;
    records.max(profiles) as u64
}

/// Summary of a finished construction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Length of the indexed text, sentinel included
    pub total_len: u64,
    /// Number of documents
    pub num_docs: u64,
    /// Number of BWT runs
    pub num_runs: u64,
    /// Positions that start or end a run
    pub num_boundaries: u64,
    /// Decay kernel used for the predecessor table
    pub kernel: String,
}
