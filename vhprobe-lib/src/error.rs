use thiserror::Error;

pub type HarnessResult<T> = std::result::Result<T, HarnessError>;

/// Describes things that can go wrong in the harness
#[derive(Debug, Error)]
pub enum HarnessError {
  // general errors
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  // precondition errors
  #[error("Proxy should run on {addr} and answer 200 to the `{ping_host}` host: {hint}")]
  ProxyNotReady {
    addr: String,
    ping_host: String,
    hint: &'static str,
  },

  // registry errors
  #[error("Frontend name must not be empty")]
  EmptyFrontendName,
  #[cfg(feature = "redis-store")]
  #[error("Registry store error: {0}")]
  Store(#[from] redis::RedisError),
  #[error("Registry store error: {0}")]
  StoreUnavailable(String),

  // probe errors
  #[error("Invalid probe request: {0}")]
  InvalidProbeRequest(String),
  #[error("Failed to build probe request: {0}")]
  FailedToBuildProbeRequest(#[from] crate::probe::ProbeRequestBuilderError),
  #[error("Unsupported probe scheme: {0}")]
  UnsupportedProbeScheme(String),
  #[cfg(feature = "https-probe")]
  #[error("Failed to build TLS client config: {0}")]
  FailedToBuildTlsClient(#[from] rustls::Error),

  // disposable backend errors
  #[error("Failed to build backend spec: {0}")]
  FailedToBuildBackendSpec(#[from] crate::backend::BackendSpecBuilderError),
  #[error("Invalid backend header: {0}")]
  InvalidBackendHeader(String),
  #[error("Invalid backend status code: {0}")]
  InvalidBackendStatus(u16),
  #[error("Backend on port {port} did not answer after {attempts} attempts")]
  BackendNotReady { port: u16, attempts: usize },
  #[error("Backend thread exited before reporting its listener")]
  BackendStartAborted,
  #[error("Failed to join backend #{0}")]
  BackendJoin(usize),

  // config errors
  #[error("Failed to build harness config: {0}")]
  FailedToBuildConfig(#[from] crate::config::HarnessConfigBuilderError),
  #[error("Invalid harness config: {0}")]
  InvalidConfig(&'static str),

  // teardown errors
  #[error("Teardown failed: {0}")]
  Teardown(String),
}
