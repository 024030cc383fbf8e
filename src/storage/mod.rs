use crate::error::StoreError;
use crate::models::{SaveRequest, SavedGroup, SavedGroupMap, SessionKey};
use async_trait::async_trait;
use leptos::logging::{log, warn};
use serde::{de::DeserializeOwned, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

pub(crate) const SAVED_GROUPS_KEY: &str = "savedGroups";

/// External asynchronous key-value service.
#[async_trait(?Send)]
pub trait KeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError>;
    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError>;
}

/// `window.localStorage`, values kept as JSON strings.
#[derive(Clone, Debug)]
pub struct LocalStorageStore {
    storage: web_sys::Storage,
}

impl LocalStorageStore {
    pub fn open() -> Option<Self> {
        let storage = web_sys::window().and_then(|w| w.local_storage().ok().flatten())?;
        Some(Self { storage })
    }
}

#[async_trait(?Send)]
impl KeyValueStore for LocalStorageStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        let raw = self
            .storage
            .get_item(key)
            .map_err(|e| StoreError::Unavailable(format!("{e:?}")))?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        let json = serde_json::to_string(&value)?;
        self.storage
            .set_item(key, &json)
            .map_err(|e| StoreError::Unavailable(format!("{e:?}")))
    }
}

/// Process-local store. Nothing survives a reload.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<BTreeMap<String, serde_json::Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, key: &str) -> Option<serde_json::Value> {
        self.entries.borrow().get(key).cloned()
    }
}

#[async_trait(?Send)]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        self.entries.borrow_mut().insert(key.to_string(), value);
        Ok(())
    }
}

pub(crate) async fn load_json<T: DeserializeOwned>(
    backend: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match backend.get(key).await? {
        Some(v) => Ok(Some(serde_json::from_value(v)?)),
        None => Ok(None),
    }
}

pub(crate) async fn save_json<T: Serialize>(
    backend: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    backend.set(key, serde_json::to_value(value)?).await
}

/// Session key -> groups, kept under a single root key of the backend.
///
/// Every write is a full read-modify-write of that root entry; last writer wins.
#[derive(Clone)]
pub struct GroupStore {
    backend: Rc<dyn KeyValueStore>,
    root_key: String,
}

impl GroupStore {
    pub fn new(backend: Rc<dyn KeyValueStore>) -> Self {
        Self::with_root_key(backend, SAVED_GROUPS_KEY)
    }

    pub fn with_root_key(backend: Rc<dyn KeyValueStore>, root_key: impl Into<String>) -> Self {
        Self {
            backend,
            root_key: root_key.into(),
        }
    }

    async fn load_map(&self) -> Result<SavedGroupMap, StoreError> {
        match load_json::<SavedGroupMap>(self.backend.as_ref(), &self.root_key).await {
            Ok(map) => Ok(map.unwrap_or_default()),
            Err(StoreError::Serialization(e)) => {
                // Unreadable data is treated as empty; the next save overwrites it.
                warn!("Organizer: ignoring unreadable saved groups: {e}");
                Ok(SavedGroupMap::new())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn save(&self, session: &SessionKey, groups: Vec<SavedGroup>) -> Result<(), StoreError> {
        let mut map = self.load_map().await?;
        map.insert(session.as_str().to_string(), groups);
        save_json(self.backend.as_ref(), &self.root_key, &map).await
    }

    pub async fn load(&self, session: &SessionKey) -> Result<Vec<SavedGroup>, StoreError> {
        let mut map = self.load_map().await?;
        Ok(map.remove(session.as_str()).unwrap_or_default())
    }

    pub async fn reset(&self, session: &SessionKey) -> Result<(), StoreError> {
        let mut map = self.load_map().await?;
        if map.remove(session.as_str()).is_none() {
            return Ok(());
        }
        save_json(self.backend.as_ref(), &self.root_key, &map).await
    }

    /// Persist a mutation's result. Unpersisted sessions are a no-op.
    pub async fn apply(&self, request: SaveRequest) -> Result<(), StoreError> {
        let Some(session) = request.session else {
            log!("Organizer: no session key; grouping not persisted");
            return Ok(());
        };
        self.save(&session, request.groups).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    fn key(s: &str) -> SessionKey {
        SessionKey(s.to_string())
    }

    fn store() -> (MemoryStore, GroupStore) {
        let backend = MemoryStore::new();
        let store = GroupStore::new(Rc::new(backend.clone()));
        (backend, store)
    }

    #[test]
    fn test_load_missing_session_is_empty() {
        let (_, store) = store();
        assert!(block_on(store.load(&key("a"))).unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let (backend, store) = store();
        let groups = vec![SavedGroup::new("G", vec![2, 3, 4])];
        block_on(store.save(&key("a"), groups.clone())).unwrap();

        assert_eq!(block_on(store.load(&key("a"))).unwrap(), groups);
        assert_eq!(
            backend.raw(SAVED_GROUPS_KEY).unwrap(),
            serde_json::json!({"a": [{"name": "G", "indices": [2, 3, 4]}]})
        );
    }

    #[test]
    fn test_save_overwrites_only_its_session() {
        let (_, store) = store();
        block_on(store.save(&key("a"), vec![SavedGroup::new("x", vec![0])])).unwrap();
        block_on(store.save(&key("b"), vec![SavedGroup::new("y", vec![1])])).unwrap();
        block_on(store.save(&key("a"), vec![])).unwrap();

        assert!(block_on(store.load(&key("a"))).unwrap().is_empty());
        assert_eq!(
            block_on(store.load(&key("b"))).unwrap(),
            vec![SavedGroup::new("y", vec![1])]
        );
    }

    #[test]
    fn test_reset_leaves_other_sessions_byte_identical() {
        let (backend, store) = store();
        block_on(store.save(&key("A"), vec![SavedGroup::new("a", vec![0, 1])])).unwrap();
        block_on(store.save(&key("B"), vec![SavedGroup::new("b", vec![3, 4])])).unwrap();
        let before = serde_json::to_string(&backend.raw(SAVED_GROUPS_KEY).unwrap()["B"]).unwrap();

        block_on(store.reset(&key("A"))).unwrap();

        let root = backend.raw(SAVED_GROUPS_KEY).unwrap();
        assert!(root.get("A").is_none());
        assert_eq!(serde_json::to_string(&root["B"]).unwrap(), before);
    }

    #[test]
    fn test_apply_without_session_writes_nothing() {
        let (backend, store) = store();
        block_on(store.apply(SaveRequest {
            session: None,
            groups: vec![SavedGroup::new("g", vec![0])],
        }))
        .unwrap();
        assert!(backend.raw(SAVED_GROUPS_KEY).is_none());
    }

    #[test]
    fn test_unreadable_root_is_treated_as_empty() {
        let (backend, store) = store();
        block_on(backend.set(SAVED_GROUPS_KEY, serde_json::json!("garbage"))).unwrap();
        assert!(block_on(store.load(&key("a"))).unwrap().is_empty());
    }
}
