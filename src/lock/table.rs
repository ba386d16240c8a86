//! Persisted lock table

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One lock table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    /// Seconds the lock stays valid after acquisition (0 = indefinitely)
    pub timeout_secs: u64,
    /// When the lock was taken
    pub acquired_at: DateTime<Utc>,
}

impl LockEntry {
    /// Create an entry acquired at `now`
    pub fn new(timeout_secs: u64, now: DateTime<Utc>) -> Self {
        Self {
            timeout_secs,
            acquired_at: now,
        }
    }

    /// When the entry goes stale, `None` if it never does
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        if self.timeout_secs == 0 {
            return None;
        }
        i64::try_from(self.timeout_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|timeout| self.acquired_at.checked_add_signed(timeout))
    }

    /// Whether the entry still holds the lock at `now`
    pub fn is_held_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(expires_at) => now < expires_at,
            None => true,
        }
    }
}

/// Mapping from lock key to entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockTable {
    entries: BTreeMap<String, LockEntry>,
}

impl LockTable {
    /// Claim `key` unless a live entry holds it; returns the new entry on success
    pub fn try_claim(
        &mut self,
        key: &str,
        timeout_secs: u64,
        now: DateTime<Utc>,
    ) -> Option<LockEntry> {
        if self.entries.get(key).is_some_and(|e| e.is_held_at(now)) {
            return None;
        }
        let entry = LockEntry::new(timeout_secs, now);
        self.entries.insert(key.to_string(), entry);
        Some(entry)
    }

    /// Remove the entry for `key` only if it is still the one described by `entry`
    pub fn remove_if(&mut self, key: &str, entry: &LockEntry) -> bool {
        if self.entries.get(key) == Some(entry) {
            self.entries.remove(key);
            return true;
        }
        false
    }

    /// Entry for `key`, stale or not
    pub fn get(&self, key: &str) -> Option<&LockEntry> {
        self.entries.get(key)
    }

    /// Number of entries, stale ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-15T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn entry_held_until_timeout() {
        let entry = LockEntry::new(15, t0());
        assert!(entry.is_held_at(t0()));
        assert!(entry.is_held_at(t0() + Duration::seconds(14)));
        assert!(!entry.is_held_at(t0() + Duration::seconds(15)));
    }

    #[test]
    fn zero_timeout_never_expires() {
        let entry = LockEntry::new(0, t0());
        assert!(entry.expires_at().is_none());
        assert!(entry.is_held_at(t0() + Duration::days(3650)));
    }

    #[test]
    fn huge_timeout_is_held() {
        let entry = LockEntry::new(u64::MAX, t0());
        assert!(entry.is_held_at(t0() + Duration::days(3650)));
    }

    #[test]
    fn claim_respects_live_entry() {
        let mut table = LockTable::default();
        assert!(table.try_claim("app", 15, t0()).is_some());
        assert!(table.try_claim("app", 15, t0() + Duration::seconds(5)).is_none());
        assert!(table.try_claim("other", 15, t0()).is_some());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn claim_replaces_stale_entry() {
        let mut table = LockTable::default();
        table.try_claim("app", 15, t0()).unwrap();

        let later = t0() + Duration::seconds(16);
        let entry = table.try_claim("app", 30, later).unwrap();

        assert_eq!(entry.acquired_at, later);
        assert_eq!(table.get("app"), Some(&entry));
    }

    #[test]
    fn remove_if_ignores_replaced_entry() {
        let mut table = LockTable::default();
        let original = table.try_claim("app", 15, t0()).unwrap();
        table
            .try_claim("app", 15, t0() + Duration::seconds(20))
            .unwrap();

        assert!(!table.remove_if("app", &original));
        assert!(table.get("app").is_some());
    }

    #[test]
    fn table_serializes_as_map() {
        let mut table = LockTable::default();
        table.try_claim("app", 15, t0()).unwrap();

        let json = serde_json::to_string(&table).unwrap();
        assert!(json.starts_with("{\"app\":"));
        assert!(json.contains("\"timeout_secs\":15"));
    }
}
