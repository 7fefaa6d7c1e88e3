use super::BackendSpec;
use crate::{constants::DEFAULT_BACKEND_BODY, error::*};
use bytes::Bytes;
use http::{
  header::{CONNECTION, CONTENT_LENGTH, TRANSFER_ENCODING},
  HeaderMap, HeaderName, HeaderValue, Method, Response, StatusCode,
};
use http_body_util::Full;

#[derive(Debug, Clone)]
/// Response served to every request, prepared once before the server starts
pub(super) struct FixedResponse {
  status: StatusCode,
  headers: HeaderMap,
  body: Bytes,
}

impl TryFrom<&BackendSpec> for FixedResponse {
  type Error = HarnessError;

  fn try_from(spec: &BackendSpec) -> Result<Self, Self::Error> {
    let status = StatusCode::from_u16(spec.status).map_err(|_| HarnessError::InvalidBackendStatus(spec.status))?;
    let mut headers = HeaderMap::new();
    for (name, value) in spec.headers.iter() {
      let name = HeaderName::try_from(name.as_str()).map_err(|e| HarnessError::InvalidBackendHeader(format!("{name}: {e}")))?;
      // the body is always sent with a fixed length
      if name == TRANSFER_ENCODING {
        return Err(HarnessError::InvalidBackendHeader(format!("{name} is not configurable")));
      }
      let value = HeaderValue::try_from(value.as_str()).map_err(|e| HarnessError::InvalidBackendHeader(format!("{name}: {e}")))?;
      headers.append(name, value);
    }
    let body = Bytes::from(spec.body.clone().unwrap_or_else(|| DEFAULT_BACKEND_BODY.to_string()));
    Ok(Self { status, headers, body })
  }
}

impl FixedResponse {
  /// GET and HEAD get the fixed response, anything else 501. The connection is always closed afterwards.
  pub(super) fn respond(&self, method: &Method) -> Response<Full<Bytes>> {
    let mut res = if method == Method::GET || method == Method::HEAD {
      let mut res = Response::new(Full::new(self.body.clone()));
      *res.status_mut() = self.status;
      *res.headers_mut() = self.headers.clone();
      res.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from(self.body.len()));
      res
    } else {
      let mut res = Response::new(Full::new(Bytes::new()));
      *res.status_mut() = StatusCode::NOT_IMPLEMENTED;
      res
    };
    res.headers_mut().insert(CONNECTION, HeaderValue::from_static("close"));
    res
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backend::BackendSpecBuilder;

  #[test]
  fn default_body_and_headers() {
    let spec = BackendSpecBuilder::default().header("X-Backend", "one").build().unwrap();
    let res = FixedResponse::try_from(&spec).unwrap().respond(&Method::GET);
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[CONTENT_LENGTH], DEFAULT_BACKEND_BODY.len().to_string().as_str());
    assert_eq!(res.headers()[CONNECTION], "close");
    assert_eq!(res.headers()["x-backend"], "one");
  }

  #[test]
  fn content_length_always_matches_body() {
    let spec = BackendSpecBuilder::default()
      .header("Content-Length", "3")
      .body("twelve bytes")
      .build()
      .unwrap();
    let res = FixedResponse::try_from(&spec).unwrap().respond(&Method::GET);
    assert_eq!(res.headers().get_all(CONTENT_LENGTH).iter().count(), 1);
    assert_eq!(res.headers()[CONTENT_LENGTH], "12");
  }

  #[test]
  fn head_is_answered_like_get() {
    let spec = BackendSpecBuilder::default().status(404u16).header("X-Backend", "one").build().unwrap();
    let response = FixedResponse::try_from(&spec).unwrap();
    let get = response.respond(&Method::GET);
    let head = response.respond(&Method::HEAD);
    assert_eq!(head.status(), get.status());
    assert_eq!(head.headers(), get.headers());
  }

  #[test]
  fn transfer_encoding_is_rejected() {
    let spec = BackendSpecBuilder::default().header("Transfer-Encoding", "chunked").build().unwrap();
    assert!(matches!(
      FixedResponse::try_from(&spec),
      Err(HarnessError::InvalidBackendHeader(_))
    ));
  }

  #[test]
  fn other_methods_are_not_implemented() {
    let spec = BackendSpec::on_port(0);
    let res = FixedResponse::try_from(&spec).unwrap().respond(&Method::POST);
    assert_eq!(res.status(), StatusCode::NOT_IMPLEMENTED);
    assert_eq!(res.headers()[CONNECTION], "close");
  }

  #[test]
  fn invalid_spec_is_rejected() {
    let spec = BackendSpecBuilder::default().status(42u16).build().unwrap();
    assert!(matches!(
      FixedResponse::try_from(&spec),
      Err(HarnessError::InvalidBackendStatus(42))
    ));
    let spec = BackendSpecBuilder::default().header("bad header", "v").build().unwrap();
    assert!(matches!(
      FixedResponse::try_from(&spec),
      Err(HarnessError::InvalidBackendHeader(_))
    ));
  }
}
