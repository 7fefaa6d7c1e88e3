use crate::{
  constants::registry_keys::{DEAD, FRONTEND},
  error::*,
};
use std::fmt;

/// Identity of a single routing entry in the registry store.
///
/// The store key is composed as `[prefix]frontend:[proto:]hostname`, and the companion key
/// holding backends marked dead by the proxy as `[prefix]dead:[proto:]hostname`.
/// Absent prefix and proto leave no separator behind.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FrontendKey {
  /// frontend host name, e.g., example.com
  host: String,
  /// protocol scope like `https`, none for the default scope
  proto: Option<String>,
  /// key prefix, e.g., `p:`
  prefix: String,
}

impl FrontendKey {
  /// Build a key. Empty `proto` means no protocol scope, empty `prefix` means no prefix.
  pub fn new(host: impl Into<String>, proto: &str, prefix: &str) -> HarnessResult<Self> {
    let host = host.into();
    if host.is_empty() {
      return Err(HarnessError::EmptyFrontendName);
    }
    Ok(Self {
      host,
      proto: (!proto.is_empty()).then(|| proto.to_string()),
      prefix: prefix.to_string(),
    })
  }

  pub fn host(&self) -> &str {
    &self.host
  }
  pub fn proto(&self) -> Option<&str> {
    self.proto.as_deref()
  }
  pub fn prefix(&self) -> &str {
    &self.prefix
  }

  /// `[proto:]hostname`
  fn scoped_host(&self) -> String {
    match &self.proto {
      Some(proto) => format!("{proto}:{}", self.host),
      None => self.host.clone(),
    }
  }

  /// Store key of the frontend entry
  pub fn frontend_key(&self) -> String {
    format!("{}{FRONTEND}{}", self.prefix, self.scoped_host())
  }

  /// Store key of the dead-backend marker
  pub fn dead_key(&self) -> String {
    format!("{}{DEAD}{}", self.prefix, self.scoped_host())
  }
}

impl fmt::Display for FrontendKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.frontend_key())
  }
}
