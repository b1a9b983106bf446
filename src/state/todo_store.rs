//! File-backed to-do list.
//!
//! The whole list lives in one JSON array and every mutation rewrites the
//! file. Read-modify-write cycles are serialized by an in-process lock, so
//! overlapping requests cannot lose each other's updates.

use crate::types::TodoItem;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};
use ulid::{Generator, Ulid};

/// Errors from the to-do store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("to-do item not found: {0}")]
    NotFound(String),

    #[error("to-do file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("to-do file is not a valid JSON list: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistent list of `{id, item}` records.
pub struct TodoStore {
    path: PathBuf,
    // Guards the file and hands out monotonic ids.
    ids: Mutex<Generator>,
}

impl TodoStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ids: Mutex::new(Generator::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an item and return its id.
    pub async fn add(&self, text: &str) -> Result<String, StoreError> {
        let mut ids = self.ids.lock().await;
        let mut items = self.read_all().await?;

        let id = ids.generate().unwrap_or_else(|_| Ulid::new()).to_string();
        items.push(TodoItem {
            id: id.clone(),
            item: text.to_string(),
        });
        self.write_all(&items).await?;

        info!("To-do added: {} ({} total)", id, items.len());
        Ok(id)
    }

    /// All items in insertion order.
    pub async fn list(&self) -> Result<Vec<TodoItem>, StoreError> {
        let _guard = self.ids.lock().await;
        self.read_all().await
    }

    /// Remove the item with the given id.
    pub async fn remove(&self, id: &str) -> Result<(), StoreError> {
        let _guard = self.ids.lock().await;
        let mut items = self.read_all().await?;

        let before = items.len();
        items.retain(|todo| todo.id != id);
        if items.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.write_all(&items).await?;

        info!("To-do removed: {}", id);
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<TodoItem>, StoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    async fn write_all(&self, items: &[TodoItem]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let contents = serde_json::to_string_pretty(items)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!("Wrote {} to-do items to {}", items.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn store_in(dir: &tempfile::TempDir) -> TodoStore {
        TodoStore::open(dir.path().join("todos.json"))
    }

    #[tokio::test]
    async fn add_list_remove_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let id = store.add("buy milk").await.unwrap();
        let items = store.list().await.unwrap();
        assert_eq!(
            items,
            vec![TodoItem {
                id: id.clone(),
                item: "buy milk".into()
            }]
        );

        store.remove(&id).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn removing_unknown_id_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.add("file the 10-K").await.unwrap();

        let err = store.remove("01ARZ3NDEKTSV4RRFFQ69G5FAV").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(ref id) if id == "01ARZ3NDEKTSV4RRFFQ69G5FAV"));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.add("draft NDA").await.unwrap();
        store.add("review lease").await.unwrap();

        let first = store.list().await.unwrap();
        let second = store.list().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].item, "draft NDA");
        assert_eq!(first[1].item, "review lease");
    }

    #[tokio::test]
    async fn ids_are_unique_and_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let a = store.add("a").await.unwrap();
        let b = store.add("b").await.unwrap();
        assert!(a < b);
    }

    #[tokio::test]
    async fn file_holds_a_plain_json_array_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let id = store_in(&dir).add("call opposing counsel").await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join("todos.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["id"], id.as_str());
        assert_eq!(value[0]["item"], "call opposing counsel");

        let reopened = store_in(&dir);
        assert_eq!(reopened.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_parent_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let store = TodoStore::open(dir.path().join("nested/deeper/todos.json"));
        assert!(store.list().await.unwrap().is_empty());

        store.add("x").await.unwrap();
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_a_json_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("todos.json"), "{not a list").unwrap();

        let err = store_in(&dir).list().await.unwrap_err();
        assert!(matches!(err, StoreError::Json(_)));
    }

    #[tokio::test]
    async fn concurrent_adds_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store_in(&dir));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.add(&format!("task {i}")).await.unwrap() })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.list().await.unwrap().len(), 16);
    }
}
