use std::collections::HashSet;

use crate::{HarvestedRecord, RowIdentity};

/// Records in discovery order, indexed by identity.
///
/// Identities that failed extraction are remembered separately so a broken
/// row is reported once and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultSet {
    records: Vec<HarvestedRecord>,
    harvested: HashSet<RowIdentity>,
    skipped: HashSet<RowIdentity>,
    highest: Option<RowIdentity>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the record unless its identity was already harvested or skipped.
    /// Returns whether it was inserted.
    pub fn insert(&mut self, record: HarvestedRecord) -> bool {
        if !self.is_unseen(record.identity) {
            return false;
        }
        self.observe(record.identity);
        self.harvested.insert(record.identity);
        self.records.push(record);
        true
    }

    /// Marks an identity as skipped. Returns false if it was already known.
    pub fn mark_skipped(&mut self, identity: RowIdentity) -> bool {
        if !self.is_unseen(identity) {
            return false;
        }
        self.observe(identity);
        self.skipped.insert(identity);
        true
    }

    pub fn contains(&self, identity: RowIdentity) -> bool {
        self.harvested.contains(&identity)
    }

    pub fn is_unseen(&self, identity: RowIdentity) -> bool {
        !self.harvested.contains(&identity) && !self.skipped.contains(&identity)
    }

    /// Highest identity observed so far, harvested or skipped.
    pub fn highest(&self) -> Option<RowIdentity> {
        self.highest
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn records(&self) -> &[HarvestedRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<HarvestedRecord> {
        self.records
    }

    fn observe(&mut self, identity: RowIdentity) {
        self.highest = Some(self.highest.map_or(identity, |h| h.max(identity)));
    }
}
