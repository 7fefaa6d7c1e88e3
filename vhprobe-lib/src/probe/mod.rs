mod outcome;
mod prober;
#[cfg(feature = "https-probe")]
mod tls;

use crate::{constants::DEFAULT_HTTP_PORT, error::*};
use derive_builder::Builder;
use std::str::FromStr;

pub use outcome::ProbeOutcome;
pub use prober::Prober;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Scheme used to reach the proxy
pub enum ProbeScheme {
  #[default]
  Http,
  Https,
}

impl ProbeScheme {
  pub fn as_str(&self) -> &'static str {
    match self {
      ProbeScheme::Http => "http",
      ProbeScheme::Https => "https",
    }
  }
}

impl FromStr for ProbeScheme {
  type Err = HarnessError;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "" | "http" => Ok(ProbeScheme::Http),
      "https" => Ok(ProbeScheme::Https),
      other => Err(HarnessError::UnsupportedProbeScheme(other.to_string())),
    }
  }
}

#[derive(Builder, Debug, Clone, PartialEq, Eq)]
/// Single GET issued to the proxy on behalf of a frontend host name
pub struct ProbeRequest {
  #[builder(setter(into))]
  /// value of the `Host` header, i.e., the frontend to be routed
  pub host: String,
  #[builder(default = "DEFAULT_HTTP_PORT")]
  /// port the proxy listens on
  pub port: u16,
  #[builder(default)]
  pub scheme: ProbeScheme,
  #[builder(default)]
  /// return the response body instead of the status code
  pub want_body: bool,
}
