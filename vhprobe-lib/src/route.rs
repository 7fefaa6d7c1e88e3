use crate::{error::*, key::FrontendKey, log::*, store::RegistryStore};
use http::{StatusCode, Uri};

/// Routing entry as stored: the canonical frontend host name, followed by backend URLs in selection order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrontendEntry {
  /// element 0, echoed and not used for routing
  pub host: Option<String>,
  /// elements 1..N
  pub backends: Vec<String>,
}

impl From<Vec<String>> for FrontendEntry {
  /// Each registration pushes the host name again ahead of its backends, so repeated host names are
  /// not backends.
  fn from(values: Vec<String>) -> Self {
    let mut values = values.into_iter();
    let Some(host) = values.next() else {
      return Self::default();
    };
    let backends = values.filter(|v| v != &host).collect();
    Self {
      host: Some(host),
      backends,
    }
  }
}

impl FrontendEntry {
  /// At least one backend is required for the proxy to route
  pub fn is_routable(&self) -> bool {
    !self.backends.is_empty()
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// What a conformant proxy does with a request for a given host name
pub enum RouteDecision {
  /// Reserved liveness host, answered by the proxy itself
  Ping,
  /// Candidate upstreams in registry order. Which one is chosen is left to the proxy.
  Backends(Vec<Uri>),
  /// Missing key or entry without backends
  NoRoute,
}

impl RouteDecision {
  /// Status the proxy answers with itself, none when the request is forwarded
  pub fn status_hint(&self) -> Option<StatusCode> {
    match self {
      RouteDecision::Ping => Some(StatusCode::OK),
      RouteDecision::NoRoute => Some(StatusCode::BAD_GATEWAY),
      RouteDecision::Backends(_) => None,
    }
  }
}

/// Read the entry for `key` from the store
pub async fn read_entry<S>(store: &S, key: &FrontendKey) -> HarnessResult<FrontendEntry>
where
  S: RegistryStore + ?Sized,
{
  let values = store.list(&key.frontend_key()).await?;
  Ok(FrontendEntry::from(values))
}

/// Resolve the route for `key` the way the proxy is expected to
pub async fn resolve<S>(store: &S, key: &FrontendKey, ping_host: &str) -> HarnessResult<RouteDecision>
where
  S: RegistryStore + ?Sized,
{
  if key.host() == ping_host {
    return Ok(RouteDecision::Ping);
  }
  let entry = read_entry(store, key).await?;
  let upstreams = entry
    .backends
    .iter()
    .filter_map(|b| match b.parse::<Uri>() {
      Ok(uri) if uri.scheme().is_some() && uri.authority().is_some() => Some(uri),
      _ => {
        warn!("Skip invalid backend url {b} for {key}");
        None
      }
    })
    .collect::<Vec<_>>();

  if upstreams.is_empty() {
    debug!("No route for {key}");
    return Ok(RouteDecision::NoRoute);
  }
  Ok(RouteDecision::Backends(upstreams))
}
