use crate::{
  config::{Command, ConfigToml, Opts, Scope},
  constants::SERVE_BACKEND_ID,
  error::*,
  log::*,
};
use vhprobe_lib::{
  read_entry, reexports::Uri, resolve, BackendSpecBuilder, DisposableBackend, Harness, HarnessConfig, ProbeRequestBuilder,
  ProbeScheme, Prober, RedisStore, Registrar, RouteDecision,
};

/// Run one cli command against the configured proxy and registry
pub async fn run(opts: Opts) -> Result<(), anyhow::Error> {
  let config = load_config(opts.config_file_path.as_deref())?;

  match opts.command {
    Command::Check => check(config).await,
    Command::Register {
      frontend,
      backends,
      scope,
    } => register(&config, &frontend, &backends, &scope).await,
    Command::Unregister { frontend, scope } => unregister(&config, &frontend, &scope).await,
    Command::Show { frontend, scope } => show(&config, &frontend, &scope).await,
    Command::Probe {
      host,
      port,
      proto,
      body,
    } => probe(&config, host, port, &proto, body).await,
    Command::Serve {
      port,
      status,
      body,
      headers,
    } => serve(&config, port, status, body, headers).await,
  }
}

fn load_config(config_file_path: Option<&str>) -> Result<HarnessConfig, anyhow::Error> {
  let config_toml = match config_file_path {
    Some(path) => ConfigToml::new(path).with_context(|| format!("Invalid toml file: {path}"))?,
    None => ConfigToml::default(),
  };
  (&config_toml).try_into()
}

async fn registrar(config: &HarnessConfig) -> Result<Registrar<RedisStore>, anyhow::Error> {
  let store = RedisStore::connect(&config.store_url)
    .await
    .with_context(|| format!("Registry store is unreachable at {}", config.store_url))?;
  Ok(Registrar::new(store, config.key_prefix.clone()))
}

async fn check(config: HarnessConfig) -> Result<(), anyhow::Error> {
  let addr = format!("{}:{}", config.proxy_host, config.http_port);
  let store = RedisStore::connect(&config.store_url)
    .await
    .with_context(|| format!("Registry store is unreachable at {}", config.store_url))?;
  Harness::connect(config, store).await?;
  info!("Proxy at {addr} is ready");
  println!("ready");
  Ok(())
}

async fn register(config: &HarnessConfig, frontend: &str, backends: &[String], scope: &Scope) -> Result<(), anyhow::Error> {
  for backend in backends {
    let uri = backend
      .parse::<Uri>()
      .map_err(|e| anyhow!("Invalid backend url {backend}: {e}"))?;
    ensure!(
      uri.scheme().is_some() && uri.authority().is_some(),
      "Backend url must be absolute like http://127.0.0.1:2080: {backend}"
    );
  }
  let registrar = registrar(config).await?;
  let key = registrar
    .register(frontend, backends, &scope.proto, scope.prefix.as_deref().unwrap_or_default())
    .await?;
  println!("{}", key.frontend_key());
  Ok(())
}

async fn unregister(config: &HarnessConfig, frontend: &str, scope: &Scope) -> Result<(), anyhow::Error> {
  let registrar = registrar(config).await?;
  registrar
    .unregister(frontend, &scope.proto, scope.prefix.as_deref().unwrap_or_default())
    .await?;
  Ok(())
}

async fn show(config: &HarnessConfig, frontend: &str, scope: &Scope) -> Result<(), anyhow::Error> {
  let registrar = registrar(config).await?;
  let key = registrar.key(frontend, &scope.proto, scope.prefix.as_deref().unwrap_or_default())?;
  let entry = read_entry(registrar.store(), &key).await?;
  let decision = resolve(registrar.store(), &key, &config.ping_host).await?;

  println!("key: {}", key.frontend_key());
  println!("host: {}", entry.host.as_deref().unwrap_or("-"));
  println!("backends:");
  for backend in &entry.backends {
    println!("  - {backend}");
  }
  match &decision {
    RouteDecision::Ping => println!("route: answered by the proxy"),
    RouteDecision::Backends(candidates) => println!("route: forwarded to one of {} candidate(s)", candidates.len()),
    RouteDecision::NoRoute => println!("route: none"),
  }
  if let Some(status) = decision.status_hint() {
    println!("expected status: {}", status.as_u16());
  }
  debug!("{key} resolves to {decision:?}");
  Ok(())
}

async fn probe(config: &HarnessConfig, host: String, port: Option<u16>, proto: &str, want_body: bool) -> Result<(), anyhow::Error> {
  let scheme = proto.parse::<ProbeScheme>()?;
  let request = ProbeRequestBuilder::default()
    .host(host)
    .port(port.unwrap_or_else(|| config.proxy_port(scheme)))
    .scheme(scheme)
    .want_body(want_body)
    .build()?;
  let prober = Prober::try_new(config)?;
  let outcome = prober.send(&request).await?;
  println!("{outcome}");
  Ok(())
}

async fn serve(
  config: &HarnessConfig,
  port: u16,
  status: u16,
  body: Option<String>,
  headers: Vec<(String, String)>,
) -> Result<(), anyhow::Error> {
  let mut builder = BackendSpecBuilder::default();
  builder.port(port).status(status);
  if let Some(body) = body {
    builder.body(body);
  }
  for (name, value) in headers {
    builder.header(name, value);
  }
  let spec = builder.build()?;

  let backend = DisposableBackend::start(SERVE_BACKEND_ID, config.backend_bind_addr, &spec).await?;
  println!("{}", backend.url());

  tokio::signal::ctrl_c().await?;
  info!("Interrupted, stopping backend on port {}", backend.port());
  backend.stop()?;
  Ok(())
}
