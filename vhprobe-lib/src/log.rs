pub use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
/// Record of a single probe exchange, emitted at debug level
pub struct ProbeLog {
  pub frontend: String,
  pub uri: String,
  pub status: String,
  pub headers: String,
  pub payload: String,
}

impl ProbeLog {
  pub fn new(frontend: &str, uri: &hyper::Uri) -> Self {
    Self {
      frontend: frontend.to_string(),
      uri: uri.to_string(),
      status: "".to_string(),
      headers: "".to_string(),
      payload: "".to_string(),
    }
  }
  pub fn status_code(&mut self, status_code: &http::StatusCode) -> &mut Self {
    self.status = status_code.as_u16().to_string();
    self
  }
  pub fn headers(&mut self, headers: &http::HeaderMap) -> &mut Self {
    self.headers = format!("{:?}", headers);
    self
  }
  pub fn payload(&mut self, payload: &str) -> &mut Self {
    self.payload = payload.to_string();
    self
  }

  pub fn output(&self) {
    debug!(
      "Frontend: {}; {} -- {}; Headers: {}; Payload: \"{}\"",
      self.frontend, self.uri, self.status, self.headers, self.payload
    );
  }
}
