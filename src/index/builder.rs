//! Two-pass construction of the BWT, LCP, SA samples and document profiles
//!
//! ## Pass 1 (forward)
//!
//! Consumes the suffix merge in suffix-array order. Every position becomes a
//! [`RunRecord`] in the record stream; the BWT, LCP and SA samples go straight
//! to the permanent files. Whether a position ends a run is only known once the
//! next position arrives, so each record waits one step in a pending slot.
//! Run boundaries also store a profile seeded from the nearest preceding
//! occurrence of every document.
//!
//! ## Pass 2 (backward)
//!
//! Re-reads the records in reverse with a cleared tracker and raises every
//! stored profile entry with the value against the nearest following
//! occurrence. The records are then streamed forward once more to write the
//! profile files in position order.

use super::kernel::DecayKernel;
use super::merge::{MergedSuffix, SuffixMerge};
use super::scratch::{ProfileStream, RunRecord, RunRecordStream};
use super::table::{ProfileTracker, ScanDirection, ScanStep};
use super::types::{BuildConfig, BuildStats, MAX_DOCS, ext, scratch_capacity_for, with_extension};
use super::writer::{Boundary, IndexWriter};
use crate::parse::{DocumentMap, ParseStructures};
use crate::utils::progress::{ProgressBar, pass_bar, tick};
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Instant;

/// Build every output file for `prefix` from a parse and its documents
pub fn build_index<P, D>(parse: &P, docs: &D, prefix: &Path, config: &BuildConfig) -> Result<BuildStats>
where
    P: ParseStructures + ?Sized,
    D: DocumentMap + ?Sized,
{
    let num_docs = docs.num_docs();
    anyhow::ensure!(num_docs > 0, "no documents to index");
    anyhow::ensure!(
        num_docs <= MAX_DOCS,
        "{} documents exceed the limit of {}",
        num_docs,
        MAX_DOCS
    );

    let total_len = docs.total_len();
    let window = parse.window();
    let expected = (parse.text_len() + 1)
        .checked_sub(2 * window)
        .context("parse is shorter than its padding")?;
    anyhow::ensure!(
        total_len == expected,
        "documents cover {} positions but the parse covers {}",
        total_len,
        expected
    );

    let merge = SuffixMerge::new(parse)?;
    let kernel = DecayKernel::detect();

    let scratch_prefix = config.temp_prefix.as_deref().unwrap_or(prefix);
    let capacity = config
        .scratch_capacity
        .unwrap_or_else(|| scratch_capacity_for(total_len, num_docs));
    let capacity = usize::try_from(capacity).context("scratch capacity does not fit in memory")?;

    let records = RunRecordStream::create(&with_extension(scratch_prefix, ext::SCRATCH_RECORDS), capacity)?;
    let profiles = ProfileStream::create(
        &with_extension(scratch_prefix, ext::SCRATCH_PROFILES),
        capacity,
        num_docs,
    )?;
    let mut writer = IndexWriter::create(prefix, num_docs, config.run_length_encode)?;
    let mut tracker = ProfileTracker::new(num_docs, kernel);

    // Pass 1
    if config.verbose {
        eprintln!(
            "Pass 1: merging {} suffixes over {} documents ({} kernel)",
            total_len,
            num_docs,
            kernel.name()
        );
    }
    let start = Instant::now();
    let bar = pass_bar(total_len as u64, "forward pass", config.verbose);

    let mut forward = ForwardPass::new(docs, &mut tracker, records, profiles);
    let emitted = merge.run(|suffix| {
        writer.push_suffix(&suffix)?;
        forward.step(&suffix)?;
        tick(&bar, writer.positions());
        Ok(())
    })?;
    let (records, mut profiles) = forward.finish()?;
    writer.finish_bwt()?;
    finish_bar(bar);

    anyhow::ensure!(
        emitted == total_len,
        "suffix merge produced {} suffixes for a text of length {}",
        emitted,
        total_len
    );
    if config.verbose {
        eprintln!(
            "Pass 1 done in {:.2?}: {} runs, {} boundaries",
            start.elapsed(),
            writer.num_runs(),
            profiles.len()
        );
    }

    // Pass 2
    let start = Instant::now();
    let bar = pass_bar(total_len as u64, "backward pass", config.verbose);
    refine_backward(&mut tracker, &records, &mut profiles, &bar)?;
    finish_bar(bar);

    write_profiles(&records, &profiles, &mut writer)?;
    let num_boundaries = profiles.len() as u64;
    let num_runs = writer.finish()?;
    if config.verbose {
        eprintln!("Pass 2 done in {:.2?}", start.elapsed());
    }

    records.remove()?;
    profiles.remove()?;

    Ok(BuildStats {
        total_len: total_len as u64,
        num_docs: num_docs as u64,
        num_runs,
        num_boundaries,
        kernel: kernel.name().to_string(),
    })
}

fn finish_bar(bar: Option<ProgressBar>) {
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
}

/// The previous position, held back until the next one decides whether it
/// ends a run
struct PendingSlot {
    record: Option<RunRecord>,
    /// Seeded profile of `record`, computed for every position
    profile: Vec<u32>,
}

impl PendingSlot {
    fn new(num_docs: usize) -> Self {
        Self {
            record: None,
            profile: vec![0; num_docs],
        }
    }

    fn last_char(&self) -> Option<u8> {
        self.record.map(|r| r.bwt_ch)
    }

    /// Write the held record, marking it as a run end when `closes_run`
    fn flush(&mut self, closes_run: bool, records: &mut RunRecordStream, profiles: &mut ProfileStream) -> Result<()> {
        if let Some(mut record) = self.record.take() {
            record.is_end |= closes_run;
            records.push(&record)?;
            if record.is_boundary() {
                profiles.push(&self.profile)?;
            }
        }
        Ok(())
    }

    /// Hold `record`; the returned buffer receives its profile
    fn hold(&mut self, record: RunRecord) -> &mut [u32] {
        debug_assert!(self.record.is_none());
        self.record = Some(record);
        &mut self.profile
    }
}

struct ForwardPass<'a, D: DocumentMap + ?Sized> {
    docs: &'a D,
    tracker: &'a mut ProfileTracker,
    records: RunRecordStream,
    profiles: ProfileStream,
    pending: PendingSlot,
    total_len: u64,
}

impl<'a, D: DocumentMap + ?Sized> ForwardPass<'a, D> {
    fn new(
        docs: &'a D,
        tracker: &'a mut ProfileTracker,
        records: RunRecordStream,
        profiles: ProfileStream,
    ) -> Self {
        Self {
            pending: PendingSlot::new(docs.num_docs()),
            total_len: docs.total_len() as u64,
            docs,
            tracker,
            records,
            profiles,
        }
    }

    fn step(&mut self, suffix: &MergedSuffix) -> Result<()> {
        let is_start = self.pending.last_char() != Some(suffix.bwt_ch);
        let has_prev = self.pending.record.is_some();
        self.pending
            .flush(is_start && has_prev, &mut self.records, &mut self.profiles)?;

        anyhow::ensure!(
            suffix.sa < self.total_len,
            "suffix-array value {} outside a text of length {}",
            suffix.sa,
            self.total_len
        );
        let pos_of_lf = if suffix.sa > 0 { suffix.sa - 1 } else { self.total_len - 1 };
        let doc = self.docs.doc_of(pos_of_lf as usize);
        let doc_id = u16::try_from(doc).with_context(|| format!("document id {} does not fit 16 bits", doc))?;

        let step = ScanStep {
            bwt_ch: suffix.bwt_ch,
            doc_of_lf: doc,
            lcp: suffix.lcp,
            reset: self.total_len - pos_of_lf,
        };
        let profile = self
            .pending
            .hold(RunRecord::new(is_start, suffix.bwt_ch, doc_id, suffix.lcp));
        self.tracker.step(ScanDirection::Forward, &step, Some(profile));
        Ok(())
    }

    /// Flush the last position, which always ends a run
    fn finish(mut self) -> Result<(RunRecordStream, ProfileStream)> {
        self.pending.flush(true, &mut self.records, &mut self.profiles)?;
        Ok((self.records, self.profiles))
    }
}

/// Raise every stored profile with the values seen scanning backward
fn refine_backward(
    tracker: &mut ProfileTracker,
    records: &RunRecordStream,
    profiles: &mut ProfileStream,
    bar: &Option<ProgressBar>,
) -> Result<()> {
    tracker.clear();
    let mut profile = vec![0u32; profiles.num_docs()];
    let mut remaining = profiles.len();

    for (scanned, index) in (0..records.len()).rev().enumerate() {
        let record = records.get(index);
        let step = ScanStep {
            bwt_ch: record.bwt_ch,
            doc_of_lf: record.doc_of_lf as usize,
            lcp: record.lcp as u64,
            reset: record.lcp as u64,
        };

        if record.is_boundary() {
            anyhow::ensure!(remaining > 0, "more run boundaries than stored profiles");
            remaining -= 1;
            tracker.step(ScanDirection::Backward, &step, Some(&mut profile));
            profiles.raise(remaining, &profile);
        } else {
            tracker.step(ScanDirection::Backward, &step, None);
        }
        tick(bar, scanned as u64);
    }

    anyhow::ensure!(
        remaining == 0,
        "{} stored profiles have no run boundary",
        remaining
    );
    Ok(())
}

/// Stream the refined profiles to the start and end profile files
fn write_profiles(records: &RunRecordStream, profiles: &ProfileStream, writer: &mut IndexWriter) -> Result<()> {
    let mut slot = 0;
    for index in 0..records.len() {
        let record = records.get(index);
        if !record.is_boundary() {
            continue;
        }
        let raw = profiles.raw(slot);
        if record.is_start {
            writer.write_profile(Boundary::Start, record.bwt_ch, raw)?;
        }
        if record.is_end {
            writer.write_profile(Boundary::End, record.bwt_ch, raw)?;
        }
        slot += 1;
    }
    Ok(())
}
