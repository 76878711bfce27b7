//! Remembers which page a list was on for each filter length.
//!
//! Typing narrows the results and usually sends the user back to page 0;
//! deleting characters should bring them back to the page they had reached
//! at that shorter filter. Entries deeper than `len + 1` are dropped when a
//! page is recorded at `len`, since the filter that produced them is gone.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PagingMemory {
    pages: Vec<Option<usize>>,
}

impl PagingMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_page(&mut self, prefix_len: usize, page: usize) {
        self.pages.truncate(prefix_len + 2);
        if self.pages.len() <= prefix_len {
            self.pages.resize(prefix_len + 1, None);
        }
        self.pages[prefix_len] = Some(page);
    }

    /// Remembered page for `prefix_len`, or 0.
    pub fn page_for(&self, prefix_len: usize) -> usize {
        self.pages.get(prefix_len).copied().flatten().unwrap_or(0)
    }

    pub fn reset(&mut self) {
        self.pages.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(Option::is_none)
    }
}
