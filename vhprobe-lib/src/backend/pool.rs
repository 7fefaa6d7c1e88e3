use super::{BackendSpec, DisposableBackend};
use crate::{
  config::HarnessConfig,
  error::*,
  log::*,
  probe::{ProbeRequestBuilder, Prober},
};
use std::{
  net::{IpAddr, SocketAddr},
  sync::atomic::{AtomicUsize, Ordering},
  time::Duration,
};
use tokio::{sync::Mutex, time::sleep};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Reference to a backend owned by a [`BackendPool`]
pub struct BackendHandle {
  pub id: usize,
  pub addr: SocketAddr,
}

impl BackendHandle {
  pub fn port(&self) -> u16 {
    self.addr.port()
  }
  /// Url to register as a backend of a frontend
  pub fn url(&self) -> String {
    format!("http://{}", self.addr)
  }
}

/// Tracked set of disposable backends. Whatever is still running when the pool is dropped is stopped.
pub struct BackendPool {
  bind_ip: IpAddr,
  poll_interval: Duration,
  max_attempts: usize,
  prober: Prober,
  /// where readiness polls go instead of the backend itself, if set
  readiness_addr: Option<SocketAddr>,
  next_id: AtomicUsize,
  servers: Mutex<Vec<DisposableBackend>>,
}

impl BackendPool {
  pub fn new(config: &HarnessConfig, prober: Prober) -> Self {
    Self {
      bind_ip: config.backend_bind_addr,
      poll_interval: config.spawn_poll_interval,
      max_attempts: config.spawn_max_attempts.max(1),
      prober,
      readiness_addr: None,
      next_id: AtomicUsize::new(0),
      servers: Mutex::new(Vec::new()),
    }
  }

  /// Start a backend and wait until it answers a lightweight request.
  /// Gives up after the configured number of polls, stopping the server.
  pub async fn spawn(&self, spec: &BackendSpec) -> HarnessResult<BackendHandle> {
    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
    let backend = DisposableBackend::start(id, self.bind_ip, spec).await?;
    let addr = backend.addr();

    let poll_addr = self.readiness_addr.unwrap_or(addr);
    let probe = ProbeRequestBuilder::default().host("localhost").port(poll_addr.port()).build()?;
    let mut attempts = 0;
    loop {
      attempts += 1;
      if !self.prober.send_to(poll_addr, &probe).await?.is_unreachable() {
        break;
      }
      if attempts >= self.max_attempts {
        warn!("Backend #{id} on {addr} did not answer after {attempts} attempts");
        join_stopped(backend).await?;
        return Err(HarnessError::BackendNotReady {
          port: addr.port(),
          attempts,
        });
      }
      sleep(self.poll_interval).await;
    }

    info!("Backend #{id} spawned on {addr}");
    self.servers.lock().await.push(backend);
    Ok(BackendHandle { id, addr })
  }

  /// Stop a backend. Stopping one that is not tracked anymore is a no-op.
  pub async fn stop(&self, handle: &BackendHandle) -> HarnessResult<()> {
    let backend = {
      let mut servers = self.servers.lock().await;
      let Some(pos) = servers.iter().position(|s| s.id() == handle.id) else {
        debug!("Backend #{} is not running", handle.id);
        return Ok(());
      };
      servers.remove(pos)
    };
    join_stopped(backend).await
  }

  /// Stop every tracked backend. All of them are stopped even if one fails; the first error is returned.
  pub async fn stop_all(&self) -> HarnessResult<()> {
    let servers = std::mem::take(&mut *self.servers.lock().await);
    let mut first_error = None;
    for backend in servers {
      if let Err(e) = join_stopped(backend).await {
        error!("Failed to stop backend: {e}");
        first_error.get_or_insert(e);
      }
    }
    match first_error {
      Some(e) => Err(e),
      None => Ok(()),
    }
  }

  /// Handles of the running backends
  pub async fn handles(&self) -> Vec<BackendHandle> {
    self
      .servers
      .lock()
      .await
      .iter()
      .map(|s| BackendHandle {
        id: s.id(),
        addr: s.addr(),
      })
      .collect()
  }

  pub async fn len(&self) -> usize {
    self.servers.lock().await.len()
  }

  pub async fn is_empty(&self) -> bool {
    self.servers.lock().await.is_empty()
  }

  #[cfg(test)]
  fn poll_readiness_at(mut self, addr: SocketAddr) -> Self {
    self.readiness_addr = Some(addr);
    self
  }
}

/// Stop a backend off the async worker, as joining its thread blocks
async fn join_stopped(backend: DisposableBackend) -> HarnessResult<()> {
  let id = backend.id();
  tokio::task::spawn_blocking(move || backend.stop())
    .await
    .map_err(|_| HarnessError::BackendJoin(id))?
}
