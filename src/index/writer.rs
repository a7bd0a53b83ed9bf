//! Permanent output files
//!
//! Creates:
//! - `<prefix>.lcp`: one LCP value per position
//! - `<prefix>.ssa` / `<prefix>.esa`: `(position, SA value)` at run starts / ends
//! - `<prefix>.bwt.heads` + `<prefix>.bwt.len`, or `<prefix>.bwt` without RLE
//! - `<prefix>.sdap` / `<prefix>.edap`: document count header, then
//!   `(BWT character, profile)` per run start / end
//!
//! The BWT, LCP and samples are streamed during the first pass; the profile
//! files are written after the second pass.

use super::merge::MergedSuffix;
use super::types::{DAP_HEADER_BYTES, LCP_BYTES, RUN_LEN_BYTES, SA_SAMPLE_BYTES, ext, with_extension};
use crate::utils::encoding::write_uint_le;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Which profile file a boundary goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Start,
    End,
}

/// A buffered output file that names itself in errors
struct OutputFile {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl OutputFile {
    fn create(prefix: &Path, extension: &str) -> Result<Self> {
        let path = with_extension(prefix, extension);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(Self {
            path,
            writer: BufWriter::with_capacity(65536, file),
        })
    }

    fn write_uint(&mut self, value: u64, width: usize) -> Result<()> {
        write_uint_le(&mut self.writer, value, width)
            .with_context(|| format!("Failed to write to {}", self.path.display()))
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer
            .write_all(bytes)
            .with_context(|| format!("Failed to write to {}", self.path.display()))
    }

    fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("Failed to flush {}", self.path.display()))
    }
}

enum BwtSink {
    /// One byte per run plus its length
    RunLength { heads: OutputFile, lengths: OutputFile },
    /// One byte per position
    Plain(OutputFile),
}

/// Streams the BWT, LCP and SA samples, then the document profiles
pub struct IndexWriter {
    lcp: OutputFile,
    start_samples: OutputFile,
    end_samples: OutputFile,
    bwt: BwtSink,
    start_profiles: OutputFile,
    end_profiles: OutputFile,
    /// Character of the open run
    head: Option<u8>,
    run_len: u64,
    prev_sa: u64,
    /// Positions written so far
    position: u64,
    num_runs: u64,
}

impl IndexWriter {
    /// Create every output file for `prefix`, truncating existing ones
    pub fn create(prefix: &Path, num_docs: usize, run_length_encode: bool) -> Result<Self> {
        let bwt = if run_length_encode {
            BwtSink::RunLength {
                heads: OutputFile::create(prefix, ext::BWT_HEADS)?,
                lengths: OutputFile::create(prefix, ext::BWT_LENGTHS)?,
            }
        } else {
            BwtSink::Plain(OutputFile::create(prefix, ext::BWT)?)
        };

        let mut start_profiles = OutputFile::create(prefix, ext::START_PROFILES)?;
        let mut end_profiles = OutputFile::create(prefix, ext::END_PROFILES)?;
        start_profiles.write_uint(num_docs as u64, DAP_HEADER_BYTES)?;
        end_profiles.write_uint(num_docs as u64, DAP_HEADER_BYTES)?;

        Ok(Self {
            lcp: OutputFile::create(prefix, ext::LCP)?,
            start_samples: OutputFile::create(prefix, ext::START_SAMPLES)?,
            end_samples: OutputFile::create(prefix, ext::END_SAMPLES)?,
            bwt,
            start_profiles,
            end_profiles,
            head: None,
            run_len: 0,
            prev_sa: 0,
            position: 0,
            num_runs: 0,
        })
    }

    /// Append the next suffix in suffix-array order
    pub fn push_suffix(&mut self, suffix: &MergedSuffix) -> Result<()> {
        self.lcp.write_uint(suffix.lcp, LCP_BYTES)?;

        if self.head != Some(suffix.bwt_ch) {
            self.close_run()?;
            self.start_samples.write_uint(self.position, SA_SAMPLE_BYTES)?;
            self.start_samples.write_uint(suffix.sa, SA_SAMPLE_BYTES)?;
            self.head = Some(suffix.bwt_ch);
            self.num_runs += 1;
        }

        self.run_len += 1;
        self.prev_sa = suffix.sa;
        self.position += 1;
        Ok(())
    }

    /// Write the open run and its end sample
    fn close_run(&mut self) -> Result<()> {
        let Some(head) = self.head else {
            return Ok(());
        };

        match &mut self.bwt {
            BwtSink::RunLength { heads, lengths } => {
                heads.write_all(&[head])?;
                lengths.write_uint(self.run_len, RUN_LEN_BYTES)?;
            }
            BwtSink::Plain(out) => {
                for _ in 0..self.run_len {
                    out.write_all(&[head])?;
                }
            }
        }
        self.end_samples.write_uint(self.position - 1, SA_SAMPLE_BYTES)?;
        self.end_samples.write_uint(self.prev_sa, SA_SAMPLE_BYTES)?;
        self.run_len = 0;
        Ok(())
    }

    /// Close the last run and flush the BWT, LCP and sample files
    pub fn finish_bwt(&mut self) -> Result<()> {
        self.close_run()?;
        self.head = None;

        self.lcp.flush()?;
        self.start_samples.flush()?;
        self.end_samples.flush()?;
        match &mut self.bwt {
            BwtSink::RunLength { heads, lengths } => {
                heads.flush()?;
                lengths.flush()
            }
            BwtSink::Plain(out) => out.flush(),
        }
    }

    /// Append a profile (already little-endian encoded) to a profile file
    pub fn write_profile(&mut self, boundary: Boundary, bwt_ch: u8, raw: &[u8]) -> Result<()> {
        let out = match boundary {
            Boundary::Start => &mut self.start_profiles,
            Boundary::End => &mut self.end_profiles,
        };
        out.write_all(&[bwt_ch])?;
        out.write_all(raw)
    }

    /// Flush the profile files and return the number of BWT runs
    pub fn finish(mut self) -> Result<u64> {
        self.start_profiles.flush()?;
        self.end_profiles.flush()?;
        Ok(self.num_runs)
    }

    pub fn positions(&self) -> u64 {
        self.position
    }

    pub fn num_runs(&self) -> u64 {
        self.num_runs
    }
}
