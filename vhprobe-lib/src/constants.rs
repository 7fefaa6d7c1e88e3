pub const DEFAULT_PROXY_HOST: &str = "localhost";
pub const DEFAULT_HTTP_PORT: u16 = 1080;
pub const DEFAULT_HTTPS_PORT: u16 = 1443;
pub const DEFAULT_STORE_URL: &str = "redis://127.0.0.1/";
pub const PROBE_TIMEOUT_MSEC: u64 = 1_000;
pub const SPAWN_POLL_INTERVAL_MSEC: u64 = 500;
pub const SPAWN_MAX_ATTEMPTS: usize = 20;
pub const TCP_LISTEN_BACKLOG: u32 = 128;

/// Reserved host name the proxy must answer with 200 regardless of the registry
pub const PING_HOST: &str = "__ping__";
/// Remediation shown when the readiness check fails
pub const PROXY_NOT_READY_HINT: &str = "start the proxy first, e.g. `$ hipache -c config/config_test.json`";

/// Registry key layout
pub mod registry_keys {
  pub const FRONTEND: &str = "frontend:";
  pub const DEAD: &str = "dead:";
}

/// Headers sent with every probe
pub mod probe_headers {
  pub const DEBUG_NAME: &str = "x-debug";
  pub const DEBUG_VALUE: &str = "true";
}

/// Body served by a disposable backend when none is given
pub const DEFAULT_BACKEND_BODY: &str = "This is a body";

/// Prefix of a generated per-run registry namespace
pub const RUN_NAMESPACE_PREFIX: &str = "vhprobe-";
