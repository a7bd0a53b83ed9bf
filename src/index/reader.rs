//! Read-only access to the output files of a construction

use super::types::{DAP_HEADER_BYTES, DOC_WIDTH, LCP_BYTES, RUN_LEN_BYTES, SA_SAMPLE_BYTES, ext, with_extension};
use crate::utils::encoding::decode_uint_le;
use anyhow::{Context, Result};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

/// Profile of one run boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileEntry {
    pub bwt_ch: u8,
    /// One capped LCP value per document
    pub values: Vec<u16>,
}

enum BwtFiles {
    RunLength { heads: Mmap, lengths: Mmap },
    Plain(Mmap),
}

/// Memory-mapped output files of one prefix
pub struct IndexFiles {
    lcp: Mmap,
    start_samples: Mmap,
    end_samples: Mmap,
    bwt: BwtFiles,
    start_profiles: Mmap,
    end_profiles: Mmap,
    num_docs: usize,
}

fn map(prefix: &Path, extension: &str) -> Result<Mmap> {
    let path = with_extension(prefix, extension);
    let file = File::open(&path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mmap = unsafe { Mmap::map(&file) }.with_context(|| format!("Failed to map {}", path.display()))?;
    Ok(mmap)
}

fn profile_header(bytes: &[u8], extension: &str) -> Result<usize> {
    anyhow::ensure!(
        bytes.len() >= DAP_HEADER_BYTES,
        "*.{} is shorter than its header",
        extension
    );
    let num_docs = decode_uint_le(bytes, DAP_HEADER_BYTES);
    usize::try_from(num_docs).with_context(|| format!("*.{} has an invalid document count", extension))
}

impl IndexFiles {
    /// Open the files written for `prefix`. The BWT is read run-length encoded
    /// when `<prefix>.bwt.heads` exists, plain otherwise.
    pub fn open(prefix: &Path) -> Result<Self> {
        let bwt = if with_extension(prefix, ext::BWT_HEADS).exists() {
            let heads = map(prefix, ext::BWT_HEADS)?;
            let lengths = map(prefix, ext::BWT_LENGTHS)?;
            anyhow::ensure!(
                lengths.len() == heads.len() * RUN_LEN_BYTES,
                "{} run heads but {} bytes of run lengths",
                heads.len(),
                lengths.len()
            );
            BwtFiles::RunLength { heads, lengths }
        } else {
            BwtFiles::Plain(map(prefix, ext::BWT)?)
        };

        let lcp = map(prefix, ext::LCP)?;
        anyhow::ensure!(lcp.len() % LCP_BYTES == 0, "truncated *.lcp file");
        let start_samples = map(prefix, ext::START_SAMPLES)?;
        let end_samples = map(prefix, ext::END_SAMPLES)?;
        for (samples, extension) in [(&start_samples, ext::START_SAMPLES), (&end_samples, ext::END_SAMPLES)] {
            anyhow::ensure!(
                samples.len() % (2 * SA_SAMPLE_BYTES) == 0,
                "truncated *.{} file",
                extension
            );
        }

        let start_profiles = map(prefix, ext::START_PROFILES)?;
        let end_profiles = map(prefix, ext::END_PROFILES)?;
        let num_docs = profile_header(&start_profiles, ext::START_PROFILES)?;
        anyhow::ensure!(
            profile_header(&end_profiles, ext::END_PROFILES)? == num_docs,
            "*.sdap and *.edap disagree on the document count"
        );
        anyhow::ensure!(num_docs > 0, "profile files declare zero documents");
        let entry = 1 + num_docs * DOC_WIDTH;
        for (profiles, extension) in [(&start_profiles, ext::START_PROFILES), (&end_profiles, ext::END_PROFILES)] {
            anyhow::ensure!(
                (profiles.len() - DAP_HEADER_BYTES) % entry == 0,
                "truncated *.{} file",
                extension
            );
        }

        Ok(Self {
            lcp,
            start_samples,
            end_samples,
            bwt,
            start_profiles,
            end_profiles,
            num_docs,
        })
    }

    pub fn num_docs(&self) -> usize {
        self.num_docs
    }

    /// Number of text positions, sentinel included
    pub fn len(&self) -> usize {
        self.lcp.len() / LCP_BYTES
    }

    pub fn is_empty(&self) -> bool {
        self.lcp.is_empty()
    }

    pub fn is_run_length_encoded(&self) -> bool {
        matches!(self.bwt, BwtFiles::RunLength { .. })
    }

    /// BWT runs as `(character, length)`
    pub fn runs(&self) -> Vec<(u8, u64)> {
        match &self.bwt {
            BwtFiles::RunLength { heads, lengths } => heads
                .iter()
                .zip(lengths.chunks_exact(RUN_LEN_BYTES))
                .map(|(&ch, len)| (ch, decode_uint_le(len, RUN_LEN_BYTES)))
                .collect(),
            BwtFiles::Plain(bwt) => {
                let mut runs: Vec<(u8, u64)> = Vec::new();
                for &ch in bwt.iter() {
                    match runs.last_mut() {
                        Some((head, len)) if *head == ch => *len += 1,
                        _ => runs.push((ch, 1)),
                    }
                }
                runs
            }
        }
    }

    /// The BWT, expanded to one byte per position
    pub fn bwt(&self) -> Vec<u8> {
        match &self.bwt {
            BwtFiles::Plain(bwt) => bwt.to_vec(),
            BwtFiles::RunLength { .. } => {
                let mut out = Vec::with_capacity(self.len());
                for (ch, len) in self.runs() {
                    out.extend(std::iter::repeat_n(ch, len as usize));
                }
                out
            }
        }
    }

    pub fn lcp(&self) -> Vec<u64> {
        self.lcp
            .chunks_exact(LCP_BYTES)
            .map(|c| decode_uint_le(c, LCP_BYTES))
            .collect()
    }

    /// `(position, SA value)` at every run start
    pub fn start_samples(&self) -> Vec<(u64, u64)> {
        decode_samples(&self.start_samples)
    }

    /// `(position, SA value)` at every run end
    pub fn end_samples(&self) -> Vec<(u64, u64)> {
        decode_samples(&self.end_samples)
    }

    pub fn start_profiles(&self) -> Vec<ProfileEntry> {
        self.decode_profiles(&self.start_profiles)
    }

    pub fn end_profiles(&self) -> Vec<ProfileEntry> {
        self.decode_profiles(&self.end_profiles)
    }

    fn decode_profiles(&self, bytes: &[u8]) -> Vec<ProfileEntry> {
        bytes[DAP_HEADER_BYTES..]
            .chunks_exact(1 + self.num_docs * DOC_WIDTH)
            .map(|entry| ProfileEntry {
                bwt_ch: entry[0],
                values: entry[1..]
                    .chunks_exact(DOC_WIDTH)
                    .map(|v| u16::from_le_bytes([v[0], v[1]]))
                    .collect(),
            })
            .collect()
    }
}

fn decode_samples(bytes: &[u8]) -> Vec<(u64, u64)> {
    bytes
        .chunks_exact(2 * SA_SAMPLE_BYTES)
        .map(|pair| {
            (
                decode_uint_le(pair, SA_SAMPLE_BYTES),
                decode_uint_le(&pair[SA_SAMPLE_BYTES..], SA_SAMPLE_BYTES),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::builder::build_index;
    use crate::index::types::BuildConfig;
    use crate::parse::{DocumentBoundaries, PrefixFreeParse};
    use tempfile::tempdir;

    #[test]
    fn test_open_reads_back_both_bwt_layouts() {
        let dir = tempdir().unwrap();
        let docs = DocumentBoundaries::from_documents(["BANANABANDANA", "CABANACABANA"]).unwrap();
        let pfp = PrefixFreeParse::build(docs.text(), 2, 3).unwrap();

        let rle = dir.path().join("rle");
        let plain = dir.path().join("plain");
        build_index(&pfp, &docs, &rle, &BuildConfig::default()).unwrap();
        let config = BuildConfig {
            run_length_encode: false,
            ..BuildConfig::default()
        };
        build_index(&pfp, &docs, &plain, &config).unwrap();

        let rle = IndexFiles::open(&rle).unwrap();
        let plain = IndexFiles::open(&plain).unwrap();
        assert!(rle.is_run_length_encoded());
        assert!(!plain.is_run_length_encoded());
        assert_eq!(rle.bwt(), plain.bwt());
        assert_eq!(rle.runs(), plain.runs());
        assert_eq!(rle.len(), 26);
        assert_eq!(rle.num_docs(), 2);
        assert_eq!(rle.start_profiles(), plain.start_profiles());
        assert_eq!(rle.start_samples().len(), rle.runs().len());
        assert_eq!(rle.end_samples().len(), rle.runs().len());
    }

    #[test]
    fn test_open_missing_prefix() {
        let dir = tempdir().unwrap();
        let err = IndexFiles::open(&dir.path().join("nothing")).err().unwrap();
        assert!(format!("{:#}", err).contains("Failed to open"));
    }
}
