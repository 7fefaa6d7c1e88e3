use super::RegistryStore;
use crate::error::*;
use async_trait::async_trait;
use rustc_hash::FxHashMap as HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Default)]
/// In-process registry store. Clones share the same lists.
pub struct MemoryStore(Arc<Mutex<HashMap<String, Vec<String>>>>);

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> HarnessResult<MutexGuard<'_, HashMap<String, Vec<String>>>> {
    self
      .0
      .lock()
      .map_err(|e| HarnessError::StoreUnavailable(e.to_string()))
  }

  /// Keys currently held, sorted
  pub fn keys(&self) -> HarnessResult<Vec<String>> {
    let mut keys = self.lock()?.keys().cloned().collect::<Vec<_>>();
    keys.sort();
    Ok(keys)
  }

  /// True if nothing is stored
  pub fn is_empty(&self) -> HarnessResult<bool> {
    Ok(self.lock()?.is_empty())
  }
}

#[async_trait]
impl RegistryStore for MemoryStore {
  async fn append_to_list(&self, key: &str, values: &[String]) -> HarnessResult<()> {
    if values.is_empty() {
      return Ok(());
    }
    self
      .lock()?
      .entry(key.to_string())
      .or_default()
      .extend_from_slice(values);
    Ok(())
  }

  async fn delete(&self, key: &str) -> HarnessResult<()> {
    self.lock()?.remove(key);
    Ok(())
  }

  async fn list(&self, key: &str) -> HarnessResult<Vec<String>> {
    Ok(self.lock()?.get(key).cloned().unwrap_or_default())
  }

  async fn ping(&self) -> HarnessResult<()> {
    self.lock().map(|_| ())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tokio_test::block_on;

  fn strings(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn append_creates_then_extends() {
    let store = MemoryStore::new();
    block_on(store.append_to_list("k", &strings(&["a", "b"]))).unwrap();
    block_on(store.append_to_list("k", &strings(&["c"]))).unwrap();
    assert_eq!(block_on(store.list("k")).unwrap(), strings(&["a", "b", "c"]));
  }

  #[test]
  fn empty_append_does_not_create_key() {
    let store = MemoryStore::new();
    block_on(store.append_to_list("k", &[])).unwrap();
    assert!(store.is_empty().unwrap());
  }

  #[test]
  fn delete_is_idempotent() {
    let store = MemoryStore::new();
    block_on(store.append_to_list("k", &strings(&["a"]))).unwrap();
    block_on(store.delete("k")).unwrap();
    block_on(store.delete("k")).unwrap();
    assert!(block_on(store.list("k")).unwrap().is_empty());
  }

  #[test]
  fn clones_share_state() {
    let store = MemoryStore::new();
    let other = store.clone();
    block_on(other.append_to_list("k", &strings(&["a"]))).unwrap();
    assert_eq!(store.keys().unwrap(), vec!["k".to_string()]);
  }
}
