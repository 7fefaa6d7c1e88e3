#![allow(dead_code)]

use bytes::Bytes;
use http_body_util::{BodyExt, Empty, Full};
use hyper::{body::Incoming, header, server::conn::http1, service::service_fn, Request, Response, StatusCode};
use hyper_util::{
  client::legacy::{connect::HttpConnector, Client},
  rt::{TokioExecutor, TokioIo},
};
use std::{convert::Infallible, net::SocketAddr, time::Duration};
use tokio::{net::TcpListener, task::JoinHandle};
use vhprobe_lib::{
  resolve, FrontendKey, HarnessConfig, HarnessConfigBuilder, MemoryStore, RegistryStore, RouteDecision, PING_HOST,
};

type UpstreamClient = Client<HttpConnector, Empty<Bytes>>;

/// Minimal dynamic virtual-host proxy reading its routes from a `MemoryStore` on every request.
/// Always forwards to the first candidate and marks it dead when unreachable.
pub struct StubProxy {
  pub addr: SocketAddr,
  join_handle: JoinHandle<()>,
}

impl StubProxy {
  pub async fn start(store: MemoryStore) -> Self {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let client: UpstreamClient = Client::builder(TokioExecutor::new()).build_http();

    let join_handle = tokio::spawn(async move {
      while let Ok((stream, _)) = listener.accept().await {
        let store = store.clone();
        let client = client.clone();
        tokio::spawn(async move {
          let service = service_fn(move |req| handle(req, store.clone(), client.clone()));
          let _ = http1::Builder::new().serve_connection(TokioIo::new(stream), service).await;
        });
      }
    });
    Self { addr, join_handle }
  }

  pub fn port(&self) -> u16 {
    self.addr.port()
  }
}

impl Drop for StubProxy {
  fn drop(&mut self) {
    self.join_handle.abort();
  }
}

fn reply(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
  let mut res = Response::new(Full::new(body));
  *res.status_mut() = status;
  res
}

async fn handle(req: Request<Incoming>, store: MemoryStore, client: UpstreamClient) -> Result<Response<Full<Bytes>>, Infallible> {
  let host = req
    .headers()
    .get(header::HOST)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.split(':').next())
    .unwrap_or_default()
    .to_string();
  let Ok(key) = FrontendKey::new(host, "", "") else {
    return Ok(reply(StatusCode::BAD_REQUEST, Bytes::new()));
  };
  let decision = match resolve(&store, &key, PING_HOST).await {
    Ok(decision) => decision,
    Err(_) => return Ok(reply(StatusCode::INTERNAL_SERVER_ERROR, Bytes::new())),
  };

  let upstream = match decision {
    RouteDecision::Backends(upstreams) => upstreams[0].clone(),
    other => {
      let status = other.status_hint().unwrap_or(StatusCode::BAD_GATEWAY);
      return Ok(reply(status, Bytes::new()));
    }
  };

  let forwarded = async {
    let authority = upstream.authority().map(|a| a.as_str()).unwrap_or_default();
    let uri = format!("http://{}{}", authority, req.uri().path());
    let upstream_req = Request::get(uri).body(Empty::<Bytes>::new()).map_err(|e| e.to_string())?;
    let res = client.request(upstream_req).await.map_err(|e| e.to_string())?;
    let status = res.status();
    let body = res.into_body().collect().await.map_err(|e| e.to_string())?.to_bytes();
    Ok::<_, String>((status, body))
  };
  match forwarded.await {
    Ok((status, body)) => Ok(reply(status, body)),
    Err(_) => {
      let _ = store.append_to_list(&key.dead_key(), &["0".to_string()]).await;
      Ok(reply(StatusCode::BAD_GATEWAY, Bytes::new()))
    }
  }
}

/// Harness configuration pointing at a stub proxy
pub fn config_for(proxy: &StubProxy) -> HarnessConfig {
  HarnessConfigBuilder::default()
    .proxy_host("127.0.0.1")
    .http_port(proxy.port())
    .spawn_poll_interval(Duration::from_millis(50))
    .build()
    .unwrap()
}

/// A port nothing listens on
pub async fn closed_port() -> u16 {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  listener.local_addr().unwrap().port()
}
