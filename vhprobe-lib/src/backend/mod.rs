mod pool;
mod response;
mod server;
mod socket;

use derive_builder::Builder;

pub use pool::{BackendHandle, BackendPool};
pub use server::DisposableBackend;

#[derive(Builder, Debug, Clone, PartialEq, Eq)]
/// Fixed behavior of a disposable backend server
pub struct BackendSpec {
  #[builder(default)]
  /// port to listen on, 0 for an ephemeral one
  pub port: u16,
  #[builder(default = "200")]
  /// status code answered to GET and HEAD
  pub status: u16,
  #[builder(setter(custom), default)]
  /// extra response headers, in order
  pub headers: Vec<(String, String)>,
  #[builder(setter(into, strip_option), default)]
  /// response body, a placeholder text if none
  pub body: Option<String>,
}

impl BackendSpecBuilder {
  /// Add an extra response header
  pub fn header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
    self
      .headers
      .get_or_insert_with(Vec::new)
      .push((name.into(), value.into()));
    self
  }
}

impl BackendSpec {
  /// Plain `200 This is a body` backend on `port`
  pub fn on_port(port: u16) -> Self {
    Self {
      port,
      status: 200,
      headers: Vec::new(),
      body: None,
    }
  }
}
