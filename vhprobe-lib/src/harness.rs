use crate::{
  backend::{BackendHandle, BackendPool, BackendSpec},
  config::HarnessConfig,
  error::*,
  key::FrontendKey,
  log::*,
  probe::{ProbeOutcome, ProbeRequest, Prober},
  registrar::Registrar,
  store::RegistryStore,
};
use futures::FutureExt;
use std::{future::Future, panic::AssertUnwindSafe, sync::Arc};

/// Per-test fixture: registrar, prober and disposable backends sharing one configuration.
///
/// Construction fails when the proxy does not answer its readiness probe. Everything the fixture
/// created is removed by [`Harness::teardown`], which [`Harness::scoped`] runs on every exit path.
pub struct Harness<S>
where
  S: RegistryStore,
{
  config: HarnessConfig,
  prober: Prober,
  registrar: Registrar<S>,
  backends: BackendPool,
}

impl<S> Harness<S>
where
  S: RegistryStore,
{
  /// Check the store and the proxy are up, then build the fixture
  pub async fn connect(config: HarnessConfig, store: S) -> HarnessResult<Self> {
    config.ensure_valid()?;
    store.ping().await?;
    let prober = Prober::try_new(&config)?;
    prober.check_ready(&config.ping_host, config.http_port).await?;

    let registrar = Registrar::new(store, config.key_prefix.clone());
    let backends = BackendPool::new(&config, prober.clone());
    Ok(Self {
      config,
      prober,
      registrar,
      backends,
    })
  }

  pub fn config(&self) -> &HarnessConfig {
    &self.config
  }
  pub fn prober(&self) -> &Prober {
    &self.prober
  }
  pub fn registrar(&self) -> &Registrar<S> {
    &self.registrar
  }
  pub fn backends(&self) -> &BackendPool {
    &self.backends
  }

  /// Register backends for a frontend in the default scope
  pub async fn register<T>(&self, frontend: &str, backends: &[T]) -> HarnessResult<FrontendKey>
  where
    T: AsRef<str>,
  {
    self.registrar.register(frontend, backends, "", "").await
  }

  pub async fn unregister(&self, frontend: &str) -> HarnessResult<()> {
    self.registrar.unregister(frontend, "", "").await
  }

  pub async fn spawn_backend(&self, spec: &BackendSpec) -> HarnessResult<BackendHandle> {
    self.backends.spawn(spec).await
  }

  pub async fn stop_backend(&self, handle: &BackendHandle) -> HarnessResult<()> {
    self.backends.stop(handle).await
  }

  pub async fn probe(&self, probe: &ProbeRequest) -> HarnessResult<ProbeOutcome> {
    self.prober.send(probe).await
  }

  /// Status code the proxy answers for `host` on its plaintext port, -1 if unreachable
  pub async fn probe_status(&self, host: &str) -> HarnessResult<ProbeOutcome> {
    self.prober.status(host, self.config.http_port).await
  }

  /// Body the proxy answers for `host` on its plaintext port
  pub async fn probe_body(&self, host: &str) -> HarnessResult<ProbeOutcome> {
    self.prober.body(host, self.config.http_port).await
  }

  /// Stop all backends, then unregister all frontends.
  /// The second step runs even if the first fails.
  pub async fn teardown(&self) -> HarnessResult<()> {
    let stopped = self.backends.stop_all().await;
    let unregistered = self.registrar.unregister_all().await;
    match (stopped, unregistered) {
      (Ok(()), Ok(())) => Ok(()),
      (Err(e1), Err(e2)) => Err(HarnessError::Teardown(format!("{e1}; {e2}"))),
      (Err(e), _) | (_, Err(e)) => Err(e),
    }
  }

  /// Run a test body and tear down afterwards, whether the body returned or panicked.
  /// A panic is resumed once teardown is done.
  pub async fn scoped<F, Fut, R>(self, body: F) -> HarnessResult<R>
  where
    F: FnOnce(Arc<Self>) -> Fut,
    Fut: Future<Output = R>,
  {
    let harness = Arc::new(self);
    let outcome = AssertUnwindSafe(body(harness.clone())).catch_unwind().await;
    let teardown = harness.teardown().await;
    match outcome {
      Ok(res) => teardown.map(|_| res),
      Err(panic) => {
        if let Err(e) = teardown {
          error!("Teardown after a failed test body: {e}");
        }
        std::panic::resume_unwind(panic)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    backend::BackendSpec,
    config::HarnessConfigBuilder,
    store::{DeleteFailingStore, MemoryStore},
  };
  use std::time::Duration;

  /// Fixture without the readiness check, there is no proxy in unit tests
  fn harness<S: RegistryStore>(store: S) -> Harness<S> {
    let config = HarnessConfigBuilder::default()
      .proxy_host("127.0.0.1")
      .spawn_poll_interval(Duration::from_millis(50))
      .build()
      .unwrap();
    let prober = Prober::try_new(&config).unwrap();
    Harness {
      registrar: Registrar::new(store, ""),
      backends: BackendPool::new(&config, prober.clone()),
      prober,
      config,
    }
  }

  #[tokio::test]
  async fn teardown_runs_both_steps_when_unregistering_fails() {
    let store = MemoryStore::new();
    let harness = harness(DeleteFailingStore {
      inner: store.clone(),
      failing_key: "dead:b.com".to_string(),
    });
    let backend = harness.spawn_backend(&BackendSpec::on_port(0)).await.unwrap();
    harness.register("a.com", &[backend.url()]).await.unwrap();
    harness.register("b.com", &[backend.url()]).await.unwrap();

    let res = harness.teardown().await;
    assert!(matches!(res, Err(HarnessError::StoreUnavailable(_))));
    assert!(harness.backends().is_empty().await);
    assert!(harness
      .prober()
      .status("localhost", backend.port())
      .await
      .unwrap()
      .is_unreachable());
    // the entry of b.com goes before its marker delete fails, so only the active set keeps it
    assert!(store.keys().unwrap().is_empty());
    assert_eq!(harness.registrar().active().await.len(), 1);
  }

  #[tokio::test]
  async fn teardown_of_empty_fixture_succeeds() {
    let harness = harness(MemoryStore::new());
    harness.teardown().await.unwrap();
    harness.teardown().await.unwrap();
  }
}
