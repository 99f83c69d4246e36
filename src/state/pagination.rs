/// Transient walk state for one listing
///
/// Never persisted: a crash mid-listing restarts that listing from page 1,
/// and the deduplicator filters out everything already claimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationState {
    /// Page being fetched, starting at 1
    pub page_index: u32,

    /// Pages in a row that produced no new ids
    pub consecutive_empty_pages: u32,

    /// New ids claimed since the last long pause
    pub new_since_last_pause: u32,
}

impl PaginationState {
    pub fn new() -> Self {
        Self {
            page_index: 1,
            consecutive_empty_pages: 0,
            new_since_last_pause: 0,
        }
    }

    /// Records a page carrying the explicit "no results" marker
    pub fn record_no_results(&mut self) {
        self.consecutive_empty_pages += 1;
    }

    /// Records a page that yielded `new_count` previously unseen ids
    pub fn record_page(&mut self, new_count: u32) {
        if new_count == 0 {
            self.consecutive_empty_pages += 1;
        } else {
            self.consecutive_empty_pages = 0;
            self.new_since_last_pause += new_count;
        }
    }

    /// Returns true once the empty-page threshold is reached
    pub fn is_exhausted(&self, max_consecutive_empty: u32) -> bool {
        self.consecutive_empty_pages >= max_consecutive_empty
    }

    /// Returns true if enough discoveries accumulated to warrant a long pause
    pub fn pause_due(&self, pause_every: u32) -> bool {
        pause_every > 0 && self.new_since_last_pause >= pause_every
    }

    pub fn reset_pause_counter(&mut self) {
        self.new_since_last_pause = 0;
    }

    pub fn advance(&mut self) {
        self.page_index += 1;
    }
}

impl Default for PaginationState {
    fn default() -> Self {
        Self::new()
    }
}
