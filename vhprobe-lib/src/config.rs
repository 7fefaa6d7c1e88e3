use crate::{constants::*, error::*, probe::ProbeScheme};
use derive_builder::Builder;
use rand::Rng;
use std::{
  net::{IpAddr, Ipv4Addr},
  time::Duration,
};

/// Configuration parameters shared by the registrar, the prober and the disposable backends
#[derive(Builder, Debug, Clone, PartialEq, Eq)]
#[builder(default, build_fn(validate = "Self::validate"))]
pub struct HarnessConfig {
  #[builder(setter(into))]
  /// host name the proxy listens on
  pub proxy_host: String,
  /// plaintext http port of the proxy
  pub http_port: u16,
  /// TLS port of the proxy, used for `https` probes
  pub https_port: u16,

  #[builder(setter(into))]
  /// registry store location, e.g., redis://127.0.0.1/
  pub store_url: String,
  #[builder(setter(into))]
  /// prefix applied to registrations that do not give their own
  pub key_prefix: String,

  /// hard bound on a single probe, including the body
  pub probe_timeout: Duration,
  /// backoff between readiness polls of a spawned backend
  pub spawn_poll_interval: Duration,
  /// readiness polls before a spawned backend is given up
  pub spawn_max_attempts: usize,
  /// address disposable backends bind to
  pub backend_bind_addr: IpAddr,

  #[builder(setter(into))]
  /// reserved host name answered by the proxy itself
  pub ping_host: String,
}

impl Default for HarnessConfig {
  fn default() -> Self {
    Self {
      proxy_host: DEFAULT_PROXY_HOST.to_string(),
      http_port: DEFAULT_HTTP_PORT,
      https_port: DEFAULT_HTTPS_PORT,

      store_url: DEFAULT_STORE_URL.to_string(),
      key_prefix: String::new(),

      probe_timeout: Duration::from_millis(PROBE_TIMEOUT_MSEC),
      spawn_poll_interval: Duration::from_millis(SPAWN_POLL_INTERVAL_MSEC),
      spawn_max_attempts: SPAWN_MAX_ATTEMPTS,
      backend_bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),

      ping_host: PING_HOST.to_string(),
    }
  }
}

impl HarnessConfigBuilder {
  /// Use a fresh, unique key prefix so that entries of this run never collide with other runs.
  /// The proxy must read the same prefix to route them.
  pub fn run_namespace(&mut self) -> &mut Self {
    let tag: u32 = rand::thread_rng().gen();
    self.key_prefix = Some(format!("{RUN_NAMESPACE_PREFIX}{tag:08x}:"));
    self
  }

  fn validate(&self) -> Result<(), String> {
    let http_port = self.http_port.unwrap_or(DEFAULT_HTTP_PORT);
    let https_port = self.https_port.unwrap_or(DEFAULT_HTTPS_PORT);
    if http_port == 0 || https_port == 0 {
      return Err("proxy ports must be non-zero".to_string());
    }
    if http_port == https_port {
      return Err("http_port and https_port must be different".to_string());
    }
    if self.spawn_max_attempts == Some(0) {
      return Err("spawn_max_attempts must be at least 1".to_string());
    }
    Ok(())
  }
}

impl HarnessConfig {
  /// Port of the proxy serving the given scheme
  pub fn proxy_port(&self, scheme: ProbeScheme) -> u16 {
    match scheme {
      ProbeScheme::Http => self.http_port,
      ProbeScheme::Https => self.https_port,
    }
  }

  /// Reject settings that would make the harness hang or misroute
  pub fn ensure_valid(&self) -> HarnessResult<()> {
    if self.proxy_host.is_empty() {
      return Err(HarnessError::InvalidConfig("proxy_host must not be empty"));
    }
    if self.probe_timeout.is_zero() {
      return Err(HarnessError::InvalidConfig("probe_timeout must be positive"));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_matches_observed_proxy_setup() {
    let config = HarnessConfig::default();
    assert_eq!(config.http_port, 1080);
    assert_eq!(config.ping_host, "__ping__");
    assert_eq!(config.probe_timeout, Duration::from_secs(1));
    assert!(config.key_prefix.is_empty());
    assert_eq!(config.proxy_port(ProbeScheme::Https), DEFAULT_HTTPS_PORT);
  }

  #[test]
  fn builder_keeps_unset_fields_default() {
    let config = HarnessConfigBuilder::default().http_port(8080u16).build().unwrap();
    assert_eq!(config.http_port, 8080);
    assert_eq!(config.store_url, DEFAULT_STORE_URL);
    assert_eq!(config.spawn_max_attempts, SPAWN_MAX_ATTEMPTS);
  }

  #[test]
  fn builder_rejects_same_ports() {
    let res = HarnessConfigBuilder::default().http_port(8080u16).https_port(8080u16).build();
    assert!(res.is_err());
    let res = HarnessConfigBuilder::default().spawn_max_attempts(0usize).build();
    assert!(res.is_err());
  }

  #[test]
  fn run_namespace_is_unique_per_build() {
    let a = HarnessConfigBuilder::default().run_namespace().build().unwrap();
    let b = HarnessConfigBuilder::default().run_namespace().build().unwrap();
    assert!(a.key_prefix.starts_with(RUN_NAMESPACE_PREFIX));
    assert!(a.key_prefix.ends_with(':'));
    assert_ne!(a.key_prefix, b.key_prefix);
  }
}
