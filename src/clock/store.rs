use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::{ClockError, ClockResult};
use crate::storage::KeyValueStore;

pub const CITIES_KEY: &str = "worldClockCities";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockEntry {
    pub name: String,
    pub timezone: String,
}

impl ClockEntry {
    pub fn new(name: impl Into<String>, timezone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timezone: timezone.into(),
        }
    }
}

/// Durable, ordered list of clocks. Names are unique.
///
/// The in-memory copy only changes after the persisted copy was written, so a
/// failed write leaves both sides as they were.
pub struct ClockEntryStore {
    storage: Box<dyn KeyValueStore>,
    entries: Vec<ClockEntry>,
}

impl ClockEntryStore {
    pub fn open(storage: Box<dyn KeyValueStore>) -> Self {
        let entries = load_entries(storage.as_ref());
        debug!(count = entries.len(), "loaded clock entries");
        Self { storage, entries }
    }

    pub fn load_all(&self) -> Vec<ClockEntry> {
        load_entries(self.storage.as_ref())
    }

    pub fn save_all(&mut self, entries: &[ClockEntry]) -> ClockResult<()> {
        let payload = entries
            .iter()
            .map(|entry| json!({ "name": entry.name, "timezone": entry.timezone }))
            .collect::<Vec<_>>();
        self.storage.set(CITIES_KEY, Value::Array(payload))?;
        self.entries = entries.to_vec();
        Ok(())
    }

    pub fn add(&mut self, entry: ClockEntry) -> ClockResult<()> {
        if self.get(&entry.name).is_some() {
            return Err(ClockError::DuplicateName(entry.name));
        }
        let mut next = self.entries.clone();
        next.push(entry);
        self.save_all(&next)
    }

    /// Returns whether an entry was removed. Absent names cause no write.
    pub fn remove(&mut self, name: &str) -> ClockResult<bool> {
        if self.get(name).is_none() {
            return Ok(false);
        }
        let next = self
            .entries
            .iter()
            .filter(|entry| entry.name != name)
            .cloned()
            .collect::<Vec<_>>();
        self.save_all(&next)?;
        Ok(true)
    }

    pub fn get(&self, name: &str) -> Option<&ClockEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn entries(&self) -> &[ClockEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pretty JSON array of `{name, timezone}`, the format used for sharing.
    pub fn export_json(&self) -> String {
        serde_json::to_string_pretty(&self.load_all()).unwrap_or_else(|_| "[]".to_string())
    }
}

fn load_entries(storage: &dyn KeyValueStore) -> Vec<ClockEntry> {
    let Some(raw) = storage.get(CITIES_KEY) else {
        return Vec::new();
    };
    match parse_entries(raw) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(error = %err, "ignoring persisted clocks");
            Vec::new()
        }
    }
}

fn parse_entries(raw: Value) -> ClockResult<Vec<ClockEntry>> {
    let parsed = serde_json::from_value::<Vec<ClockEntry>>(raw).map_err(|err| {
        ClockError::PersistDataCorrupt {
            key: CITIES_KEY.to_string(),
            reason: err.to_string(),
        }
    })?;

    let mut names = HashSet::new();
    let mut entries = Vec::with_capacity(parsed.len());
    for entry in parsed {
        if !names.insert(entry.name.clone()) {
            warn!(name = %entry.name, "skipping duplicate persisted clock");
            continue;
        }
        entries.push(entry);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn store_with(memory: &MemoryStore) -> ClockEntryStore {
        ClockEntryStore::open(Box::new(memory.clone()))
    }

    #[test]
    fn empty_storage_loads_nothing() {
        let memory = MemoryStore::default();
        let store = store_with(&memory);
        assert!(store.is_empty());
        assert!(store.load_all().is_empty());
    }

    #[test]
    fn add_round_trips_through_load_all() {
        let memory = MemoryStore::default();
        let mut store = store_with(&memory);
        let tokyo = ClockEntry::new("Tokyo", "Asia/Tokyo");
        store.add(tokyo.clone()).expect("add");

        assert_eq!(store.load_all(), vec![tokyo.clone()]);
        let reopened = store_with(&memory);
        assert_eq!(reopened.entries(), &[tokyo]);
        assert_eq!(
            memory.raw(CITIES_KEY),
            Some(json!([{ "name": "Tokyo", "timezone": "Asia/Tokyo" }]))
        );
    }

    #[test]
    fn duplicate_name_is_rejected_without_changes() {
        let memory = MemoryStore::default();
        let mut store = store_with(&memory);
        store.add(ClockEntry::new("Home", "Europe/Paris")).expect("add");
        let writes_before = memory.write_count();

        let err = store
            .add(ClockEntry::new("Home", "Asia/Tokyo"))
            .expect_err("duplicate should fail");
        assert!(matches!(err, ClockError::DuplicateName(ref name) if name == "Home"));
        assert_eq!(memory.write_count(), writes_before);
        assert_eq!(store.load_all(), vec![ClockEntry::new("Home", "Europe/Paris")]);
    }

    #[test]
    fn removing_unknown_name_is_a_no_op() {
        let memory = MemoryStore::default();
        let mut store = store_with(&memory);
        store.add(ClockEntry::new("London", "Europe/London")).expect("add");
        let persisted = memory.raw(CITIES_KEY);
        let writes_before = memory.write_count();

        assert!(!store.remove("Nowhere").expect("remove"));
        assert_eq!(memory.write_count(), writes_before);
        assert_eq!(memory.raw(CITIES_KEY), persisted);
    }

    #[test]
    fn remove_keeps_remaining_order() {
        let memory = MemoryStore::default();
        let mut store = store_with(&memory);
        for (name, zone) in [
            ("A", "Asia/Tokyo"),
            ("B", "Europe/London"),
            ("C", "Asia/Dubai"),
        ] {
            store.add(ClockEntry::new(name, zone)).expect("add");
        }
        assert!(store.remove("B").expect("remove"));
        let names = store
            .load_all()
            .into_iter()
            .map(|entry| entry.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["A", "C"]);
    }

    #[test]
    fn malformed_persisted_value_is_treated_as_empty() {
        let memory = MemoryStore::with_value(CITIES_KEY, json!({ "name": "not-a-list" }));
        assert!(store_with(&memory).is_empty());

        let memory = MemoryStore::with_value(CITIES_KEY, json!([{ "name": "missing tz" }]));
        assert!(store_with(&memory).is_empty());
    }

    #[test]
    fn persisted_duplicates_keep_first_occurrence() {
        let memory = MemoryStore::with_value(
            CITIES_KEY,
            json!([
                { "name": "Home", "timezone": "Europe/Paris" },
                { "name": "Home", "timezone": "Asia/Tokyo" }
            ]),
        );
        let store = store_with(&memory);
        assert_eq!(store.entries(), &[ClockEntry::new("Home", "Europe/Paris")]);
    }

    #[test]
    fn export_is_a_json_array_of_entries() {
        let memory = MemoryStore::default();
        let mut store = store_with(&memory);
        store.add(ClockEntry::new("Dubai", "Asia/Dubai")).expect("add");
        let exported = serde_json::from_str::<Value>(&store.export_json()).expect("valid json");
        assert_eq!(exported, json!([{ "name": "Dubai", "timezone": "Asia/Dubai" }]));
    }
}
