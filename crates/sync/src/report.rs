use std::fmt;

/// Counters for one sync cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Valid inbound work orders found.
    pub inbound_seen: usize,
    /// Inbound files skipped as unreadable or invalid.
    pub rejected: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Inbound work orders whose upsert failed after retries.
    pub inbound_failed: usize,

    /// Unsynchronized work orders fetched from the store.
    pub outbound_seen: usize,
    pub written: usize,
    pub write_failed: usize,
    pub marked_synced: usize,
    pub mark_failed: usize,
}

impl CycleReport {
    /// True when every record the cycle looked at made it through.
    pub fn is_clean(&self) -> bool {
        self.rejected == 0
            && self.inbound_failed == 0
            && self.write_failed == 0
            && self.mark_failed == 0
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "inbound: {} seen, {} rejected, {} inserted, {} updated, {} unchanged, {} failed; \
             outbound: {} seen, {} written, {} write failures, {} marked synced, {} mark failures",
            self.inbound_seen,
            self.rejected,
            self.inserted,
            self.updated,
            self.unchanged,
            self.inbound_failed,
            self.outbound_seen,
            self.written,
            self.write_failed,
            self.marked_synced,
            self.mark_failed,
        )
    }
}
