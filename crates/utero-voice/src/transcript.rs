//! Session transcript with same-speaker coalescing

use utero_core::{TranscriptEntry, TranscriptSource};

#[derive(Clone, Debug, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment. Consecutive fragments from the same source are
    /// concatenated into one entry. Returns the index of the touched entry,
    /// or `None` for an empty fragment.
    pub fn push_fragment(&mut self, source: TranscriptSource, text: &str) -> Option<usize> {
        if text.is_empty() {
            return None;
        }
        match self.entries.last_mut() {
            Some(last) if last.source == source => last.text.push_str(text),
            _ => self.entries.push(TranscriptEntry {
                source,
                text: text.to_string(),
            }),
        }
        Some(self.entries.len() - 1)
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&TranscriptEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
