use crate::error::{anyhow, ensure};
use serde::Deserialize;
use std::{fs, net::IpAddr, time::Duration};
use vhprobe_lib::{HarnessConfig, HarnessConfigBuilder};

#[derive(Deserialize, Debug, Default, PartialEq, Eq, Clone)]
pub struct ConfigToml {
  pub proxy: Option<ProxyOption>,
  pub store: Option<StoreOption>,
  pub probe: Option<ProbeOption>,
  pub backend: Option<BackendOption>,
}

#[derive(Deserialize, Debug, Default, PartialEq, Eq, Clone)]
pub struct ProxyOption {
  pub host: Option<String>,
  pub http_port: Option<u16>,
  pub https_port: Option<u16>,
  pub ping_host: Option<String>,
}

#[derive(Deserialize, Debug, Default, PartialEq, Eq, Clone)]
pub struct StoreOption {
  pub url: Option<String>,
  pub key_prefix: Option<String>,
}

#[derive(Deserialize, Debug, Default, PartialEq, Eq, Clone)]
pub struct ProbeOption {
  pub timeout_msec: Option<u64>,
}

#[derive(Deserialize, Debug, Default, PartialEq, Eq, Clone)]
pub struct BackendOption {
  pub bind_address: Option<String>,
  pub poll_interval_msec: Option<u64>,
  pub max_attempts: Option<usize>,
}

impl ConfigToml {
  pub fn new(config_file: &str) -> std::result::Result<Self, anyhow::Error> {
    let config_str = fs::read_to_string(config_file)?;

    toml::from_str(&config_str).map_err(|e| anyhow!(e))
  }
}

impl TryInto<HarnessConfig> for &ConfigToml {
  type Error = anyhow::Error;

  fn try_into(self) -> std::result::Result<HarnessConfig, Self::Error> {
    let mut builder = HarnessConfigBuilder::default();

    if let Some(proxy) = &self.proxy {
      if let Some(host) = &proxy.host {
        ensure!(!host.is_empty(), "proxy.host must not be empty");
        builder.proxy_host(host);
      }
      if let Some(port) = proxy.http_port {
        builder.http_port(port);
      }
      if let Some(port) = proxy.https_port {
        builder.https_port(port);
      }
      if let Some(ping_host) = &proxy.ping_host {
        builder.ping_host(ping_host);
      }
    }

    if let Some(store) = &self.store {
      if let Some(url) = &store.url {
        builder.store_url(url);
      }
      if let Some(prefix) = &store.key_prefix {
        builder.key_prefix(prefix);
      }
    }

    if let Some(timeout) = self.probe.as_ref().and_then(|p| p.timeout_msec) {
      ensure!(timeout > 0, "probe.timeout_msec must be positive");
      builder.probe_timeout(Duration::from_millis(timeout));
    }

    if let Some(backend) = &self.backend {
      if let Some(addr) = &backend.bind_address {
        let addr = addr
          .parse::<IpAddr>()
          .map_err(|e| anyhow!("Invalid backend.bind_address {addr}: {e}"))?;
        builder.backend_bind_addr(addr);
      }
      if let Some(interval) = backend.poll_interval_msec {
        builder.spawn_poll_interval(Duration::from_millis(interval));
      }
      if let Some(attempts) = backend.max_attempts {
        builder.spawn_max_attempts(attempts);
      }
    }

    builder.build().map_err(|e| anyhow!("Invalid configuration: {e}"))
  }
}
