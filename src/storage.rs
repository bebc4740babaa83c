use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{ClockError, ClockResult};

pub const STORAGE_FILE_NAME: &str = "storage.json";

/// Durable string-keyed storage of JSON values.
///
/// Readers treat a missing key and an unreadable backing document the same
/// way: `get` returns `None` and the caller falls back to its defaults.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value) -> ClockResult<()>;

    /// Writes all pairs in one go; either every key lands or none does.
    fn set_many(&mut self, values: Vec<(String, Value)>) -> ClockResult<()>;
}

/// All keys live in one JSON object on disk. Every `set` rewrites the whole
/// document through a temporary file followed by a rename.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn open(dir: &Path) -> ClockResult<Self> {
        fs::create_dir_all(dir).map_err(|source| ClockError::Storage {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: dir.join(STORAGE_FILE_NAME),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Malformed content reads as an empty document. A file that exists but
    /// cannot be read is an error, so nothing gets written over it.
    fn read_document(&self) -> ClockResult<Map<String, Value>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(ClockError::Storage {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => {
                warn!(path = %self.path.display(), "storage file is not a JSON object, starting empty");
                Ok(Map::new())
            }
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    line = err.line(),
                    column = err.column(),
                    "storage file holds invalid JSON, starting empty"
                );
                Ok(Map::new())
            }
        }
    }

    fn write_document(&self, document: Map<String, Value>) -> ClockResult<()> {
        let storage_err = |source| ClockError::Storage {
            path: self.path.clone(),
            source,
        };
        let text = serde_json::to_string_pretty(&Value::Object(document))
            .map_err(|err| storage_err(std::io::Error::other(err)))?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, format!("{text}\n")).map_err(storage_err)?;
        fs::rename(&staging, &self.path).map_err(storage_err)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        match self.read_document() {
            Ok(mut document) => document.remove(key),
            Err(err) => {
                warn!(error = %err, key, "storage read failed");
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: Value) -> ClockResult<()> {
        self.set_many(vec![(key.to_string(), value)])
    }

    fn set_many(&mut self, values: Vec<(String, Value)>) -> ClockResult<()> {
        let mut document = self.read_document()?;
        document.extend(values);
        self.write_document(document)
    }
}

#[cfg(test)]
pub use memory::MemoryStore;

#[cfg(test)]
mod memory {
    use std::cell::{Cell, RefCell};
    use std::collections::BTreeMap;
    use std::rc::Rc;

    use serde_json::Value;

    use super::KeyValueStore;
    use crate::error::ClockResult;

    /// Clones share one map, so a test can hand a store to its owner and
    /// still inspect what was written.
    #[derive(Debug, Clone, Default)]
    pub struct MemoryStore {
        values: Rc<RefCell<BTreeMap<String, Value>>>,
        writes: Rc<Cell<usize>>,
    }

    impl MemoryStore {
        pub fn with_value(key: &str, value: Value) -> Self {
            let store = Self::default();
            store.values.borrow_mut().insert(key.to_string(), value);
            store
        }

        pub fn raw(&self, key: &str) -> Option<Value> {
            self.values.borrow().get(key).cloned()
        }

        pub fn write_count(&self) -> usize {
            self.writes.get()
        }
    }

    impl KeyValueStore for MemoryStore {
        fn get(&self, key: &str) -> Option<Value> {
            self.values.borrow().get(key).cloned()
        }

        fn set(&mut self, key: &str, value: Value) -> ClockResult<()> {
            self.set_many(vec![(key.to_string(), value)])
        }

        fn set_many(&mut self, values: Vec<(String, Value)>) -> ClockResult<()> {
            self.values.borrow_mut().extend(values);
            self.writes.set(self.writes.get() + 1);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempdir().expect("tempdir");
        let store = JsonFileStore::open(dir.path()).expect("open");
        assert_eq!(store.get("theme"), None);
    }

    #[test]
    fn set_keeps_other_keys_and_survives_reopen() {
        let dir = tempdir().expect("tempdir");
        let mut store = JsonFileStore::open(dir.path()).expect("open");
        store.set("theme", json!("dark")).expect("set theme");
        store.set("dialStyle", json!("modern")).expect("set dial");

        let reopened = JsonFileStore::open(dir.path()).expect("reopen");
        assert_eq!(reopened.get("theme"), Some(json!("dark")));
        assert_eq!(reopened.get("dialStyle"), Some(json!("modern")));
        assert!(!dir.path().join("storage.json.tmp").exists());
    }

    #[test]
    fn invalid_json_document_is_treated_as_empty() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join(STORAGE_FILE_NAME), "{ not-valid-json ").expect("write");
        let mut store = JsonFileStore::open(dir.path()).expect("open");
        assert_eq!(store.get("theme"), None);

        store.set("theme", json!("light")).expect("set overwrites corrupt document");
        assert_eq!(store.get("theme"), Some(json!("light")));
    }

    #[test]
    fn unreadable_file_is_not_overwritten() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join(STORAGE_FILE_NAME);
        fs::create_dir(&path).expect("occupy storage path");
        fs::write(path.join("keep.txt"), "clocks").expect("write marker");
        let mut store = JsonFileStore::open(dir.path()).expect("open");

        assert_eq!(store.get("theme"), None);
        let err = store.set("theme", json!("dark")).expect_err("read failure");
        assert!(matches!(err, ClockError::Storage { .. }));
        assert!(path.is_dir());
        assert_eq!(
            fs::read_to_string(path.join("keep.txt")).expect("marker"),
            "clocks"
        );
        assert!(!dir.path().join("storage.json.tmp").exists());
    }

    #[test]
    fn set_many_writes_all_keys_once() {
        let dir = tempdir().expect("tempdir");
        let mut store = JsonFileStore::open(dir.path()).expect("open");
        store.set("worldClockCities", json!([])).expect("seed");
        store
            .set_many(vec![
                ("theme".to_string(), json!("dark")),
                ("timeFormat".to_string(), json!("12h")),
            ])
            .expect("set many");

        assert_eq!(store.get("theme"), Some(json!("dark")));
        assert_eq!(store.get("timeFormat"), Some(json!("12h")));
        assert_eq!(store.get("worldClockCities"), Some(json!([])));
    }

    #[test]
    fn non_object_document_is_treated_as_empty() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join(STORAGE_FILE_NAME), "[1, 2, 3]").expect("write");
        let store = JsonFileStore::open(dir.path()).expect("open");
        assert_eq!(store.get("worldClockCities"), None);
    }
}
