use super::RegistryStore;
use crate::{error::*, log::*};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};

#[derive(Clone)]
/// Registry store backed by Redis lists, the layout the proxy reads
pub struct RedisStore {
  conn: ConnectionManager,
}

impl RedisStore {
  /// Connect to the store at `url`, e.g., redis://127.0.0.1/
  pub async fn connect(url: &str) -> HarnessResult<Self> {
    let client = redis::Client::open(url)?;
    let conn = ConnectionManager::new(client).await.map_err(|e| {
      error!("Failed to connect to registry store at {url}: {e}");
      HarnessError::Store(e)
    })?;
    info!("Connected to registry store at {url}");
    Ok(Self { conn })
  }
}

#[async_trait]
impl RegistryStore for RedisStore {
  async fn append_to_list(&self, key: &str, values: &[String]) -> HarnessResult<()> {
    if values.is_empty() {
      return Ok(());
    }
    let mut conn = self.conn.clone();
    let len: usize = conn.rpush(key, values.to_vec()).await?;
    debug!("RPUSH {key}: list length is now {len}");
    Ok(())
  }

  async fn delete(&self, key: &str) -> HarnessResult<()> {
    let mut conn = self.conn.clone();
    let _removed: usize = conn.del(key).await?;
    Ok(())
  }

  async fn list(&self, key: &str) -> HarnessResult<Vec<String>> {
    let mut conn = self.conn.clone();
    let values: Vec<String> = conn.lrange(key, 0, -1).await?;
    Ok(values)
  }

  async fn ping(&self) -> HarnessResult<()> {
    let mut conn = self.conn.clone();
    let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
    Ok(())
  }
}
