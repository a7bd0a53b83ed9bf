//! # pfp-dap - Document array profiles from prefix-free parsing
//!
//! Builds, from a prefix-free parse (PFP) of a concatenated multi-document
//! text, the run-length encoded BWT, the suffix-array samples at run
//! boundaries, the LCP array, and a **document array profile** for every run
//! boundary: for each document, the longest match between the suffix at that
//! boundary and the nearest suffix preceded by the same character in that
//! document. These are the inputs of pangenome exact-match classifiers.
//!
//! ## Architecture
//!
//! - [`parse`] - parse and document collaborators (traits plus in-memory
//!   implementations)
//! - [`index`] - suffix merge, two-pass profile construction, output files
//! - [`utils`] - fixed-width encoding and progress reporting
//!
//! ## Quick Start
//!
//! ```no_run
//! use pfp_dap::{BuildConfig, DocumentBoundaries, IndexFiles, PrefixFreeParse, build_index};
//! use std::path::Path;
//!
//! let docs = DocumentBoundaries::from_documents(["GATTACAGATTACA", "GATTACCGATTACA"]).unwrap();
//! let parse = PrefixFreeParse::build(docs.text(), 10, 100).unwrap();
//! build_index(&parse, &docs, Path::new("out/pair"), &BuildConfig::default()).unwrap();
//!
//! let files = IndexFiles::open(Path::new("out/pair")).unwrap();
//! for entry in files.start_profiles() {
//!     println!("{} {:?}", entry.bwt_ch as char, entry.values);
//! }
//! ```
//!
//! ## Output files
//!
//! | File | Content |
//! |---|---|
//! | `*.bwt.heads` + `*.bwt.len` (or `*.bwt`) | BWT runs |
//! | `*.ssa` / `*.esa` | `(position, SA)` at run starts / ends |
//! | `*.lcp` | LCP per position |
//! | `*.sdap` / `*.edap` | profiles at run starts / ends |

pub mod index;
pub mod parse;
pub mod utils;

pub use index::{BuildConfig, BuildStats, IndexFiles, build_index};
pub use parse::{DocumentBoundaries, DocumentMap, ParseStructures, PrefixFreeParse};
