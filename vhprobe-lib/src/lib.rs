mod backend;
mod config;
mod constants;
mod error;
mod harness;
mod key;
mod log;
mod probe;
mod registrar;
mod route;
mod store;

pub use crate::{
  backend::{BackendHandle, BackendPool, BackendSpec, BackendSpecBuilder, BackendSpecBuilderError, DisposableBackend},
  config::{HarnessConfig, HarnessConfigBuilder, HarnessConfigBuilderError},
  constants::{DEFAULT_HTTPS_PORT, DEFAULT_HTTP_PORT, PING_HOST},
  error::{HarnessError, HarnessResult},
  harness::Harness,
  key::FrontendKey,
  probe::{ProbeOutcome, ProbeRequest, ProbeRequestBuilder, ProbeRequestBuilderError, ProbeScheme, Prober},
  registrar::Registrar,
  route::{read_entry, resolve, FrontendEntry, RouteDecision},
  store::{MemoryStore, RegistryStore},
};
#[cfg(feature = "redis-store")]
pub use crate::store::RedisStore;

pub mod reexports {
  pub use http::{StatusCode, Uri};
}
