//! Document boundaries over the concatenated text

use super::{DocumentMap, MIN_TEXT_BYTE};
use anyhow::Result;

/// Concatenates documents and maps positions back to document ids.
///
/// The sentinel that closes the circular text sits one past the last byte and
/// belongs to the last document.
#[derive(Debug, Clone, Default)]
pub struct DocumentBoundaries {
    /// Concatenated document text
    text: Vec<u8>,
    /// Exclusive end offset of every document
    ends: Vec<usize>,
}

impl DocumentBoundaries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a document. Empty documents are rejected because they own no
    /// position of the text.
    pub fn add_document(&mut self, content: &[u8]) -> Result<usize> {
        anyhow::ensure!(!content.is_empty(), "document {} is empty", self.ends.len());
        if let Some(pos) = content.iter().position(|&b| b < MIN_TEXT_BYTE) {
            anyhow::bail!(
                "document {} contains reserved byte 0x{:02x} at offset {}",
                self.ends.len(),
                content[pos],
                pos
            );
        }
        self.text.extend_from_slice(content);
        self.ends.push(self.text.len());
        Ok(self.ends.len() - 1)
    }

    /// Build boundaries from a list of documents
    pub fn from_documents<I, D>(docs: I) -> Result<Self>
    where
        I: IntoIterator<Item = D>,
        D: AsRef<[u8]>,
    {
        let mut boundaries = Self::new();
        for doc in docs {
            boundaries.add_document(doc.as_ref())?;
        }
        Ok(boundaries)
    }

    /// Concatenated text without the sentinel
    pub fn text(&self) -> &[u8] {
        &self.text
    }

    /// Exclusive end offsets of the documents
    pub fn ends(&self) -> &[usize] {
        &self.ends
    }
}

impl DocumentMap for DocumentBoundaries {
    fn num_docs(&self) -> usize {
        self.ends.len()
    }

    fn total_len(&self) -> usize {
        self.text.len() + 1
    }

    fn doc_of(&self, pos: usize) -> usize {
        debug_assert!(pos < self.total_len());
        self.ends
            .partition_point(|&end| end <= pos)
            .min(self.ends.len().saturating_sub(1))
    }
}
