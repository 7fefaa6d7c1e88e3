mod memory;
#[cfg(feature = "redis-store")]
mod redis_store;

use crate::error::*;
use async_trait::async_trait;

pub use memory::MemoryStore;
#[cfg(feature = "redis-store")]
pub use redis_store::RedisStore;

#[async_trait]
/// Ordered-list key-value store holding frontend entries, read by the proxy on every request.
pub trait RegistryStore: Send + Sync {
  /// Append values to the list at `key`, creating it if absent. Order is preserved.
  async fn append_to_list(&self, key: &str, values: &[String]) -> HarnessResult<()>;

  /// Remove `key`. Removing an absent key is not an error.
  async fn delete(&self, key: &str) -> HarnessResult<()>;

  /// Read the whole list at `key`, empty if absent
  async fn list(&self, key: &str) -> HarnessResult<Vec<String>>;

  /// Check the store is reachable
  async fn ping(&self) -> HarnessResult<()>;
}

#[cfg(test)]
/// Memory store whose `delete` fails for one key
pub(crate) struct DeleteFailingStore {
  pub inner: MemoryStore,
  pub failing_key: String,
}

#[cfg(test)]
#[async_trait]
impl RegistryStore for DeleteFailingStore {
  async fn append_to_list(&self, key: &str, values: &[String]) -> HarnessResult<()> {
    self.inner.append_to_list(key, values).await
  }
  async fn delete(&self, key: &str) -> HarnessResult<()> {
    if key == self.failing_key {
      return Err(HarnessError::StoreUnavailable(format!("cannot delete {key}")));
    }
    self.inner.delete(key).await
  }
  async fn list(&self, key: &str) -> HarnessResult<Vec<String>> {
    self.inner.list(key).await
  }
  async fn ping(&self) -> HarnessResult<()> {
    self.inner.ping().await
  }
}
