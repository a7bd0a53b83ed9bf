//! Construction of the run-length BWT, LCP array, SA samples and document
//! array profiles from a prefix-free parse.
//!
//! ## Modules
//!
//! - [`merge`] - suffix-merge driver producing `(BWT char, SA, LCP)` in order
//! - [`table`] - predecessor max-LCP table and profile seeding
//! - [`kernel`] - vectorized decay of the table
//! - [`scratch`] - memory-mapped run-record and profile streams
//! - [`builder`] - the two passes
//! - [`writer`] / [`reader`] - permanent output files
//!
//! ```no_run
//! use pfp_dap::index::{BuildConfig, build_index};
//! use pfp_dap::parse::{DocumentBoundaries, PrefixFreeParse};
//! use std::path::Path;
//!
//! let docs = DocumentBoundaries::from_documents(["ACGTACGT", "ACGTTCGT"]).unwrap();
//! let parse = PrefixFreeParse::build(docs.text(), 10, 100).unwrap();
//! let stats = build_index(&parse, &docs, Path::new("out/genomes"), &BuildConfig::default()).unwrap();
//! println!("{} runs", stats.num_runs);
//! ```

pub mod builder;
pub mod kernel;
pub mod merge;
pub mod reader;
pub mod scratch;
pub mod table;
pub mod types;
pub mod writer;

pub use builder::build_index;
pub use kernel::DecayKernel;
pub use reader::{IndexFiles, ProfileEntry};
pub use types::*;
