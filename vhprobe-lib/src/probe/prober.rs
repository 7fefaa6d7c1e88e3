use super::{ProbeOutcome, ProbeRequest, ProbeRequestBuilder};
use crate::{
  config::HarnessConfig,
  constants::{probe_headers, PROXY_NOT_READY_HINT},
  error::*,
  log::*,
};
use bytes::Bytes;
use http::{header, Method, Request, Uri};
use http_body_util::{BodyExt, Empty};
use hyper_util::{
  client::legacy::{connect::HttpConnector, Client},
  rt::TokioExecutor,
};
use std::{net::SocketAddr, time::Duration};
use tokio::time::timeout;

#[cfg(feature = "https-probe")]
type ProbeConnector = hyper_rustls::HttpsConnector<HttpConnector>;
#[cfg(not(feature = "https-probe"))]
type ProbeConnector = HttpConnector;

#[derive(Clone)]
/// Http client issuing probes against the proxy, or directly against a disposable backend
pub struct Prober {
  /// host name the proxy listens on
  target_host: String,
  /// hard bound on a single probe
  timeout: Duration,
  inner: Client<ProbeConnector, Empty<Bytes>>,
}

impl Prober {
  pub fn try_new(config: &HarnessConfig) -> HarnessResult<Self> {
    let mut http = HttpConnector::new();
    http.set_connect_timeout(Some(config.probe_timeout));
    http.set_nodelay(true);

    #[cfg(feature = "https-probe")]
    let connector = {
      http.enforce_http(false);
      hyper_rustls::HttpsConnectorBuilder::new()
        .with_tls_config(super::tls::insecure_client_config()?)
        .https_or_http()
        .enable_http1()
        .wrap_connector(http)
    };
    #[cfg(not(feature = "https-probe"))]
    let connector = http;

    // every probe opens a fresh connection, as the proxy is expected to dispatch per request
    let inner = Client::builder(TokioExecutor::new())
      .pool_max_idle_per_host(0)
      .build(connector);

    Ok(Self {
      target_host: config.proxy_host.clone(),
      timeout: config.probe_timeout,
      inner,
    })
  }

  /// Probe the proxy
  pub async fn send(&self, probe: &ProbeRequest) -> HarnessResult<ProbeOutcome> {
    let authority = format!("{}:{}", self.target_host, probe.port);
    self.exchange(&authority, probe).await
  }

  /// Probe a server at an explicit address, ignoring the configured proxy host and the port in `probe`
  pub async fn send_to(&self, addr: SocketAddr, probe: &ProbeRequest) -> HarnessResult<ProbeOutcome> {
    self.exchange(&addr.to_string(), probe).await
  }

  /// Status code of `GET /` for `host` over plaintext http
  pub async fn status(&self, host: &str, port: u16) -> HarnessResult<ProbeOutcome> {
    let probe = ProbeRequestBuilder::default().host(host).port(port).build()?;
    self.send(&probe).await
  }

  /// Body of `GET /` for `host` over plaintext http
  pub async fn body(&self, host: &str, port: u16) -> HarnessResult<ProbeOutcome> {
    let probe = ProbeRequestBuilder::default()
      .host(host)
      .port(port)
      .want_body(true)
      .build()?;
    self.send(&probe).await
  }

  /// Make sure the proxy answers 200 for the reserved ping host.
  /// Anything else is a precondition failure the whole run must stop on.
  pub async fn check_ready(&self, ping_host: &str, port: u16) -> HarnessResult<()> {
    match self.status(ping_host, port).await? {
      ProbeOutcome::Status(200) => {
        info!("Proxy is ready on {}:{}", self.target_host, port);
        Ok(())
      }
      outcome => {
        error!("Proxy is not ready on {}:{} (got {})", self.target_host, port, outcome);
        Err(HarnessError::ProxyNotReady {
          addr: format!("{}:{}", self.target_host, port),
          ping_host: ping_host.to_string(),
          hint: PROXY_NOT_READY_HINT,
        })
      }
    }
  }

  async fn exchange(&self, authority: &str, probe: &ProbeRequest) -> HarnessResult<ProbeOutcome> {
    #[cfg(not(feature = "https-probe"))]
    if probe.scheme == super::ProbeScheme::Https {
      return Err(HarnessError::UnsupportedProbeScheme(probe.scheme.as_str().to_string()));
    }

    let uri = Uri::builder()
      .scheme(probe.scheme.as_str())
      .authority(authority)
      .path_and_query("/")
      .build()
      .map_err(|e| HarnessError::InvalidProbeRequest(e.to_string()))?;
    let req = Request::builder()
      .method(Method::GET)
      .uri(uri.clone())
      .header(header::HOST, probe.host.as_str())
      .header(probe_headers::DEBUG_NAME, probe_headers::DEBUG_VALUE)
      .body(Empty::<Bytes>::new())
      .map_err(|e| HarnessError::InvalidProbeRequest(e.to_string()))?;

    // the timeout covers connect, response head and the whole body
    let exchange = async {
      let res = self.inner.request(req).await.map_err(|e| e.to_string())?;
      let (parts, body) = res.into_parts();
      let body = body.collect().await.map_err(|e| e.to_string())?.to_bytes();
      Ok::<_, String>((parts, body))
    };
    let (parts, body) = match timeout(self.timeout, exchange).await {
      Ok(Ok(v)) => v,
      Ok(Err(e)) => {
        debug!("Frontend: {}; {} unreachable: {}", probe.host, uri, e);
        return Ok(ProbeOutcome::Unreachable);
      }
      Err(_) => {
        debug!("Frontend: {}; {} timed out after {:?}", probe.host, uri, self.timeout);
        return Ok(ProbeOutcome::Unreachable);
      }
    };

    let text = String::from_utf8_lossy(&body).into_owned();
    ProbeLog::new(&probe.host, &uri)
      .status_code(&parts.status)
      .headers(&parts.headers)
      .payload(&text)
      .output();

    if probe.want_body {
      Ok(ProbeOutcome::Body(text))
    } else {
      Ok(ProbeOutcome::Status(parts.status.as_u16()))
    }
  }
}
