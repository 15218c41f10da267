//! Append-only event journal
//!
//! Every state transition in the runtime lands here. Entries are never
//! edited or removed.

use std::sync::RwLock;
use tumen_types::{HierarchyError, HierarchyEvent, HierarchyResult, JournalEntry};

#[derive(Default)]
pub struct EventJournal {
    entries: RwLock<Vec<JournalEntry>>,
}

impl EventJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and return its entry id
    pub fn record(&self, event: HierarchyEvent) -> HierarchyResult<u64> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| HierarchyError::LockPoisoned)?;
        let entry_id = entries.len() as u64;
        entries.push(JournalEntry::new(entry_id, event));
        Ok(entry_id)
    }

    pub fn record_all(&self, events: Vec<HierarchyEvent>) -> HierarchyResult<()> {
        for event in events {
            self.record(event)?;
        }
        Ok(())
    }

    pub fn entries(&self) -> HierarchyResult<Vec<JournalEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| HierarchyError::LockPoisoned)?;
        Ok(entries.clone())
    }

    /// Entries with an id at or above `entry_id`
    pub fn entries_since(&self, entry_id: u64) -> HierarchyResult<Vec<JournalEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| HierarchyError::LockPoisoned)?;
        Ok(entries
            .iter()
            .filter(|e| e.entry_id >= entry_id)
            .cloned()
            .collect())
    }

    /// Number of recorded events matching `predicate`
    pub fn count_matching<F>(&self, predicate: F) -> HierarchyResult<usize>
    where
        F: Fn(&HierarchyEvent) -> bool,
    {
        let entries = self
            .entries
            .read()
            .map_err(|_| HierarchyError::LockPoisoned)?;
        Ok(entries.iter().filter(|e| predicate(&e.event)).count())
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tumen_types::{Tier, UnitId};

    #[test]
    fn test_entries_are_sequential() {
        let journal = EventJournal::new();
        let first = journal
            .record(HierarchyEvent::UnitCreated {
                unit: UnitId::new("a"),
                tier: Tier::Base,
            })
            .unwrap();
        let second = journal
            .record(HierarchyEvent::UnitCompleted {
                unit: UnitId::new("a"),
                tier: Tier::Base,
            })
            .unwrap();

        assert_eq!(first, 0);
        assert_eq!(second, 1);
        assert_eq!(journal.entries_since(1).unwrap().len(), 1);
        assert_eq!(
            journal
                .count_matching(|e| matches!(e, HierarchyEvent::UnitCompleted { .. }))
                .unwrap(),
            1
        );
    }
}
