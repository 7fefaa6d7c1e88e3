use crate::{
  error::*,
  key::FrontendKey,
  log::*,
  route::{read_entry, FrontendEntry},
  store::RegistryStore,
};
use tokio::sync::Mutex;

/// Creates and removes frontend entries in the registry store, remembering what it created
/// so that every entry of a run can be removed at the end.
pub struct Registrar<S>
where
  S: RegistryStore,
{
  store: S,
  /// prefix used when a registration gives none
  default_prefix: String,
  /// keys registered and not yet unregistered, in registration order
  active: Mutex<Vec<FrontendKey>>,
}

impl<S> Registrar<S>
where
  S: RegistryStore,
{
  pub fn new(store: S, default_prefix: impl Into<String>) -> Self {
    Self {
      store,
      default_prefix: default_prefix.into(),
      active: Mutex::new(Vec::new()),
    }
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  /// Build the key for a registration, falling back to the default prefix
  pub fn key(&self, frontend: &str, proto: &str, prefix: &str) -> HarnessResult<FrontendKey> {
    let prefix = if prefix.is_empty() { self.default_prefix.as_str() } else { prefix };
    FrontendKey::new(frontend, proto, prefix)
  }

  /// Append `[frontend] + backends` to the entry of the frontend, creating it if absent.
  /// Registering the same frontend again adds backends to the same entry.
  pub async fn register<T>(&self, frontend: &str, backends: &[T], proto: &str, prefix: &str) -> HarnessResult<FrontendKey>
  where
    T: AsRef<str>,
  {
    let key = self.key(frontend, proto, prefix)?;
    let values = std::iter::once(frontend.to_string())
      .chain(backends.iter().map(|b| b.as_ref().to_string()))
      .collect::<Vec<_>>();
    self.store.append_to_list(&key.frontend_key(), &values).await?;
    info!("Registered {} with {} backend(s)", key, backends.len());

    let mut active = self.active.lock().await;
    if !active.contains(&key) {
      active.push(key.clone());
    }
    Ok(key)
  }

  /// Remove the entry of the frontend and its dead-backend marker. Unregistering twice is fine.
  pub async fn unregister(&self, frontend: &str, proto: &str, prefix: &str) -> HarnessResult<()> {
    let key = self.key(frontend, proto, prefix)?;
    self.unregister_key(&key).await
  }

  /// Same as [`Registrar::unregister`] for an already built key
  pub async fn unregister_key(&self, key: &FrontendKey) -> HarnessResult<()> {
    self.store.delete(&key.frontend_key()).await?;
    self.store.delete(&key.dead_key()).await?;
    self.active.lock().await.retain(|k| k != key);
    info!("Unregistered {}", key);
    Ok(())
  }

  /// Unregister every frontend registered through this registrar.
  /// Works on a snapshot, so the active set can change meanwhile. Every key is attempted even if one
  /// fails; the first error is returned and only the failed keys stay in the active set.
  pub async fn unregister_all(&self) -> HarnessResult<()> {
    let snapshot = self.active.lock().await.clone();
    let mut first_error = None;
    for key in snapshot.iter() {
      if let Err(e) = self.unregister_key(key).await {
        error!("Failed to unregister {key}: {e}");
        first_error.get_or_insert(e);
      }
    }
    match first_error {
      Some(e) => Err(e),
      None => Ok(()),
    }
  }

  /// Stored entry of a frontend
  pub async fn entry(&self, frontend: &str, proto: &str, prefix: &str) -> HarnessResult<FrontendEntry> {
    let key = self.key(frontend, proto, prefix)?;
    read_entry(&self.store, &key).await
  }

  /// Snapshot of the frontends currently registered through this registrar
  pub async fn active(&self) -> Vec<FrontendKey> {
    self.active.lock().await.clone()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::{DeleteFailingStore, MemoryStore};

  fn registrar() -> (Registrar<MemoryStore>, MemoryStore) {
    let store = MemoryStore::new();
    (Registrar::new(store.clone(), ""), store)
  }

  #[tokio::test]
  async fn register_writes_host_then_backends() {
    let (registrar, store) = registrar();
    registrar
      .register("a.com", &["http://127.0.0.1:2080", "http://127.0.0.1:2081"], "", "")
      .await
      .unwrap();
    assert_eq!(
      store.list("frontend:a.com").await.unwrap(),
      vec!["a.com", "http://127.0.0.1:2080", "http://127.0.0.1:2081"]
    );
    assert_eq!(registrar.active().await.len(), 1);
  }

  #[tokio::test]
  async fn second_registration_appends() {
    let (registrar, store) = registrar();
    registrar.register("a.com", &["http://b1"], "", "").await.unwrap();
    registrar.register("a.com", &["http://b2", "http://b3"], "", "").await.unwrap();

    let entry = registrar.entry("a.com", "", "").await.unwrap();
    assert_eq!(entry.backends, vec!["http://b1", "http://b2", "http://b3"]);
    assert_eq!(store.keys().unwrap(), vec!["frontend:a.com".to_string()]);
    assert_eq!(registrar.active().await.len(), 1);
  }

  #[tokio::test]
  async fn unregister_removes_entry_and_dead_marker() {
    let (registrar, store) = registrar();
    let key = registrar.register("a.com", &["http://b1"], "https", "p:").await.unwrap();
    // written by the proxy when a backend fails
    store.append_to_list(&key.dead_key(), &["0".to_string()]).await.unwrap();

    registrar.unregister("a.com", "https", "p:").await.unwrap();
    assert!(store.is_empty().unwrap());
    assert!(registrar.active().await.is_empty());
  }

  #[tokio::test]
  async fn unregister_is_idempotent() {
    let (registrar, _) = registrar();
    registrar.unregister("never.com", "", "").await.unwrap();
    registrar.register("a.com", &["http://b1"], "", "").await.unwrap();
    registrar.unregister("a.com", "", "").await.unwrap();
    registrar.unregister("a.com", "", "").await.unwrap();
  }

  #[tokio::test]
  async fn unregister_all_keeps_proto_and_prefix() {
    let (registrar, store) = registrar();
    registrar.register("a.com", &["http://b1"], "", "").await.unwrap();
    registrar.register("a.com", &["http://b1"], "https", "").await.unwrap();
    registrar.register("b.com", &["http://b2"], "", "p:").await.unwrap();
    // not tracked by this registrar
    store.append_to_list("frontend:other.com", &["other.com".to_string()]).await.unwrap();
    assert_eq!(registrar.active().await.len(), 3);

    registrar.unregister_all().await.unwrap();
    assert!(registrar.active().await.is_empty());
    assert_eq!(store.keys().unwrap(), vec!["frontend:other.com".to_string()]);
  }

  #[tokio::test]
  async fn unregister_all_goes_on_after_a_store_error() {
    let store = MemoryStore::new();
    let failing = DeleteFailingStore {
      inner: store.clone(),
      failing_key: "frontend:b.com".to_string(),
    };
    let registrar = Registrar::new(failing, "");
    registrar.register("a.com", &["http://b1"], "", "").await.unwrap();
    registrar.register("b.com", &["http://b2"], "", "").await.unwrap();
    registrar.register("c.com", &["http://b3"], "", "").await.unwrap();

    let res = registrar.unregister_all().await;
    assert!(matches!(res, Err(HarnessError::StoreUnavailable(_))));
    assert_eq!(store.keys().unwrap(), vec!["frontend:b.com".to_string()]);
    let remaining = registrar.active().await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].host(), "b.com");
  }

  #[tokio::test]
  async fn default_prefix_applies_when_none_given() {
    let store = MemoryStore::new();
    let registrar = Registrar::new(store.clone(), "run:");
    registrar.register("a.com", &["http://b1"], "", "").await.unwrap();
    registrar.register("a.com", &["http://b1"], "", "p:").await.unwrap();
    assert_eq!(
      store.keys().unwrap(),
      vec!["p:frontend:a.com".to_string(), "run:frontend:a.com".to_string()]
    );
  }

  #[tokio::test]
  async fn empty_frontend_is_rejected() {
    let (registrar, store) = registrar();
    let res = registrar.register("", &["http://b1"], "", "").await;
    assert!(matches!(res, Err(HarnessError::EmptyFrontendName)));
    assert!(store.is_empty().unwrap());
  }
}
