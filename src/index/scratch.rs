//! Scratch streams shared by the two construction passes
//!
//! Two append-only, fixed-record streams backed by memory-mapped files:
//! - run records, one [`RunRecord`] per text position (6 bytes each)
//! - document profiles, one 2-byte value per document for every run boundary
//!
//! Both are written forward during the first pass and revisited in reverse by
//! the second. All values are little-endian regardless of the host.

use super::types::{DOC_WIDTH, MAX_LCP, RUN_RECORD_SIZE};
use anyhow::{Context, Result};
use memmap2::MmapMut;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Per-position record of the first pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunRecord {
    pub is_start: bool,
    pub is_end: bool,
    pub bwt_ch: u8,
    /// Document of the position preceding this suffix in the text
    pub doc_of_lf: u16,
    /// LCP with the previous suffix, capped at [`MAX_LCP`]
    pub lcp: u16,
}

impl RunRecord {
    const START_FLAG: u8 = 0x2;
    const END_FLAG: u8 = 0x1;

    pub fn new(is_start: bool, bwt_ch: u8, doc_of_lf: u16, lcp: u64) -> Self {
        Self {
            is_start,
            is_end: false,
            bwt_ch,
            doc_of_lf,
            lcp: lcp.min(MAX_LCP as u64) as u16,
        }
    }

    /// Whether this position starts or ends a run
    #[inline]
    pub fn is_boundary(&self) -> bool {
        self.is_start || self.is_end
    }

    pub fn encode(&self) -> [u8; RUN_RECORD_SIZE] {
        let mut flags = 0;
        if self.is_start {
            flags |= Self::START_FLAG;
        }
        if self.is_end {
            flags |= Self::END_FLAG;
        }
        let doc = self.doc_of_lf.to_le_bytes();
        let lcp = self.lcp.to_le_bytes();
        [flags, self.bwt_ch, doc[0], doc[1], lcp[0], lcp[1]]
    }

    pub fn decode(bytes: &[u8]) -> Self {
        debug_assert!(bytes.len() >= RUN_RECORD_SIZE);
        Self {
            is_start: bytes[0] & Self::START_FLAG != 0,
            is_end: bytes[0] & Self::END_FLAG != 0,
            bwt_ch: bytes[1],
            doc_of_lf: u16::from_le_bytes([bytes[2], bytes[3]]),
            lcp: u16::from_le_bytes([bytes[4], bytes[5]]),
        }
    }
}

/// Removes a file when dropped unless disarmed
struct RemoveOnDrop {
    path: PathBuf,
    armed: bool,
}

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// A file mapped read-write at a fixed capacity.
///
/// Dropping the region unmaps it and removes the file, so scratch data never
/// outlives the construction even when it aborts. [`ScratchRegion::remove`]
/// does the same on the success path but reports failures.
pub struct ScratchRegion {
    mmap: MmapMut,
    /// Bytes appended so far
    len: usize,
    _file: File,
    // Declared last: the map and the descriptor are released before removal
    guard: RemoveOnDrop,
}

impl ScratchRegion {
    /// Create (truncating) `path` and map `capacity` bytes of it
    pub fn create(path: &Path, capacity: usize) -> Result<Self> {
        anyhow::ensure!(capacity > 0, "scratch capacity must be positive");

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("Failed to open scratch file {}", path.display()))?;
        file.set_len(capacity as u64)
            .with_context(|| format!("Failed to size scratch file {}", path.display()))?;
        let mmap = unsafe { MmapMut::map_mut(&file) }
            .with_context(|| format!("Failed to map scratch file {}", path.display()))?;

        Ok(Self {
            mmap,
            len: 0,
            _file: file,
            guard: RemoveOnDrop {
                path: path.to_path_buf(),
                armed: true,
            },
        })
    }

    pub fn path(&self) -> &Path {
        &self.guard.path
    }

    /// Unmap and delete the backing file
    pub fn remove(self) -> Result<()> {
        let Self {
            mmap,
            _file,
            mut guard,
            ..
        } = self;
        drop(mmap);
        drop(_file);
        guard.armed = false;
        std::fs::remove_file(&guard.path)
            .with_context(|| format!("Failed to delete scratch file {}", guard.path.display()))
    }

    pub fn capacity(&self) -> usize {
        self.mmap.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reserve `size` bytes at the end of the stream
    fn append(&mut self, size: usize) -> Result<&mut [u8]> {
        let start = self.len;
        anyhow::ensure!(
            start + size <= self.capacity(),
            "scratch file {} overflowed its capacity of {} bytes",
            self.path().display(),
            self.capacity()
        );
        self.len += size;
        Ok(&mut self.mmap[start..start + size])
    }

    #[inline]
    fn bytes(&self, offset: usize, size: usize) -> &[u8] {
        debug_assert!(offset + size <= self.len);
        &self.mmap[offset..offset + size]
    }

    #[inline]
    fn bytes_mut(&mut self, offset: usize, size: usize) -> &mut [u8] {
        debug_assert!(offset + size <= self.len);
        &mut self.mmap[offset..offset + size]
    }
}

/// Stream of [`RunRecord`]s, one per text position
pub struct RunRecordStream {
    region: ScratchRegion,
}

impl RunRecordStream {
    pub fn create(path: &Path, capacity: usize) -> Result<Self> {
        Ok(Self {
            region: ScratchRegion::create(path, capacity)?,
        })
    }

    pub fn push(&mut self, record: &RunRecord) -> Result<()> {
        self.region
            .append(RUN_RECORD_SIZE)?
            .copy_from_slice(&record.encode());
        Ok(())
    }

    /// Number of records written
    pub fn len(&self) -> usize {
        self.region.len() / RUN_RECORD_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.region.is_empty()
    }

    pub fn get(&self, index: usize) -> RunRecord {
        RunRecord::decode(self.region.bytes(index * RUN_RECORD_SIZE, RUN_RECORD_SIZE))
    }

    pub fn path(&self) -> &Path {
        self.region.path()
    }

    /// Delete the stream's file
    pub fn remove(self) -> Result<()> {
        self.region.remove()
    }
}

/// Stream of document profiles, `num_docs` 2-byte values each
pub struct ProfileStream {
    region: ScratchRegion,
    num_docs: usize,
}

impl ProfileStream {
    pub fn create(path: &Path, capacity: usize, num_docs: usize) -> Result<Self> {
        anyhow::ensure!(num_docs > 0, "profiles need at least one document");
        Ok(Self {
            region: ScratchRegion::create(path, capacity)?,
            num_docs,
        })
    }

    #[inline]
    fn profile_size(&self) -> usize {
        self.num_docs * DOC_WIDTH
    }

    /// Append a profile, clamping every entry to [`MAX_LCP`]
    pub fn push(&mut self, profile: &[u32]) -> Result<()> {
        debug_assert_eq!(profile.len(), self.num_docs);
        let size = self.profile_size();
        let out = self.region.append(size)?;
        for (chunk, &value) in out.chunks_exact_mut(DOC_WIDTH).zip(profile) {
            chunk.copy_from_slice(&clamp_lcp(value).to_le_bytes());
        }
        Ok(())
    }

    /// Number of profiles written
    pub fn len(&self) -> usize {
        self.region.len() / self.profile_size()
    }

    pub fn is_empty(&self) -> bool {
        self.region.is_empty()
    }

    pub fn num_docs(&self) -> usize {
        self.num_docs
    }

    /// Decode profile `index` into `out`
    pub fn read(&self, index: usize, out: &mut [u16]) {
        let size = self.profile_size();
        let bytes = self.region.bytes(index * size, size);
        for (value, chunk) in out.iter_mut().zip(bytes.chunks_exact(DOC_WIDTH)) {
            *value = u16::from_le_bytes([chunk[0], chunk[1]]);
        }
    }

    /// Raw little-endian bytes of profile `index`
    pub fn raw(&self, index: usize) -> &[u8] {
        let size = self.profile_size();
        self.region.bytes(index * size, size)
    }

    /// Raise every stored entry of profile `index` to at least `candidate`
    pub fn raise(&mut self, index: usize, candidate: &[u32]) {
        let size = self.profile_size();
        let bytes = self.region.bytes_mut(index * size, size);
        for (chunk, &value) in bytes.chunks_exact_mut(DOC_WIDTH).zip(candidate) {
            let stored = u16::from_le_bytes([chunk[0], chunk[1]]);
            let value = clamp_lcp(value);
            if stored < value {
                chunk.copy_from_slice(&value.to_le_bytes());
            }
        }
    }

    pub fn path(&self) -> &Path {
        self.region.path()
    }

    /// Delete the stream's file
    pub fn remove(self) -> Result<()> {
        self.region.remove()
    }
}

#[inline]
pub fn clamp_lcp(value: u32) -> u16 {
    value.min(MAX_LCP as u32) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_run_record_layout() {
        let record = RunRecord {
            is_start: true,
            is_end: false,
            bwt_ch: b'G',
            doc_of_lf: 0x0102,
            lcp: 0x0304,
        };
        assert_eq!(record.encode(), [0x2, b'G', 0x02, 0x01, 0x04, 0x03]);
        assert_eq!(RunRecord::decode(&record.encode()), record);

        let both = RunRecord { is_end: true, ..record };
        assert_eq!(both.encode()[0], 0x3);
    }

    #[test]
    fn test_run_record_caps_lcp() {
        let record = RunRecord::new(false, b'A', 0, 1 << 20);
        assert_eq!(record.lcp, MAX_LCP);
    }

    #[test]
    fn test_record_stream() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.tmp");
        let mut stream = RunRecordStream::create(&path, RUN_RECORD_SIZE * 2).unwrap();

        stream.push(&RunRecord::new(true, b'A', 1, 7)).unwrap();
        stream.push(&RunRecord::new(false, b'A', 2, 9)).unwrap();
        assert_eq!(stream.len(), 2);
        assert_eq!(stream.get(1).doc_of_lf, 2);
        assert_eq!(stream.get(0).lcp, 7);

        // Third record does not fit
        assert!(stream.push(&RunRecord::default()).is_err());
    }

    #[test]
    fn test_profile_stream_raise_only_tightens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dap.tmp");
        let mut stream = ProfileStream::create(&path, 64, 3).unwrap();

        stream.push(&[5, 0, 70_000]).unwrap();
        stream.raise(0, &[2, 4, 1]);

        let mut out = [0u16; 3];
        stream.read(0, &mut out);
        assert_eq!(out, [5, 4, MAX_LCP]);
        assert_eq!(stream.raw(0), &[5, 0, 4, 0, 0xFF, 0xFF]);
    }

    #[test]
    fn test_region_removed_on_drop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gone.tmp");
        {
            let _stream = RunRecordStream::create(&path, 12).unwrap();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_explicit_remove() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("explicit.tmp");
        let mut stream = ProfileStream::create(&path, 8, 2).unwrap();
        stream.push(&[1, 2]).unwrap();
        stream.remove().unwrap();
        assert!(!path.exists());
    }
}
