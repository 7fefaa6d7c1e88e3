use crate::error::{anyhow, ensure};
use clap::{value_parser, Arg, ArgAction, ArgMatches};
use std::ffi::OsString;

/// Parsed options
#[derive(Debug, PartialEq, Eq)]
pub struct Opts {
  pub config_file_path: Option<String>,
  pub command: Command,
}

/// Key scope of a registry operation
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct Scope {
  pub proto: String,
  /// falls back to the configured key prefix when absent
  pub prefix: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
  Check,
  Register {
    frontend: String,
    backends: Vec<String>,
    scope: Scope,
  },
  Unregister {
    frontend: String,
    scope: Scope,
  },
  Show {
    frontend: String,
    scope: Scope,
  },
  Probe {
    host: String,
    port: Option<u16>,
    proto: String,
    body: bool,
  },
  Serve {
    port: u16,
    status: u16,
    body: Option<String>,
    headers: Vec<(String, String)>,
  },
}

fn scope_args() -> [Arg; 2] {
  [
    Arg::new("proto")
      .long("proto")
      .value_name("PROTO")
      .help("Protocol qualifier of the key, e.g., https"),
    Arg::new("prefix")
      .long("prefix")
      .value_name("PREFIX")
      .help("Key prefix, overrides the configured one"),
  ]
}

fn frontend_arg() -> Arg {
  Arg::new("frontend")
    .value_name("FRONTEND")
    .required(true)
    .help("Frontend host name")
}

fn build_command() -> clap::Command {
  let _ = include_str!("../../Cargo.toml");
  clap::command!()
    .subcommand_required(true)
    .arg_required_else_help(true)
    .arg(
      Arg::new("config_file")
        .long("config")
        .short('c')
        .value_name("FILE")
        .global(true)
        .help("Configuration file path like ./vhprobe.toml"),
    )
    .subcommand(clap::Command::new("check").about("Check the proxy answers its reserved ping host"))
    .subcommand(
      clap::Command::new("register")
        .about("Append backends to a frontend entry")
        .arg(frontend_arg())
        .arg(
          Arg::new("backends")
            .value_name("BACKEND")
            .required(true)
            .num_args(1..)
            .help("Backend urls like http://127.0.0.1:2080"),
        )
        .args(scope_args()),
    )
    .subcommand(
      clap::Command::new("unregister")
        .about("Delete a frontend entry and its dead-backend marker")
        .arg(frontend_arg())
        .args(scope_args()),
    )
    .subcommand(
      clap::Command::new("show")
        .about("Print a frontend entry and how a conformant proxy routes it")
        .arg(frontend_arg())
        .args(scope_args()),
    )
    .subcommand(
      clap::Command::new("probe")
        .about("Send one GET request to the proxy for a virtual host")
        .arg(Arg::new("host").value_name("HOST").required(true).help("Host header value"))
        .arg(
          Arg::new("port")
            .long("port")
            .short('p')
            .value_name("PORT")
            .value_parser(value_parser!(u16))
            .help("Proxy port, defaults to the configured port of the protocol"),
        )
        .arg(
          Arg::new("proto")
            .long("proto")
            .value_name("PROTO")
            .default_value("http")
            .help("http or https"),
        )
        .arg(
          Arg::new("body")
            .long("body")
            .short('b')
            .action(ArgAction::SetTrue)
            .help("Print the response body instead of the status code"),
        ),
    )
    .subcommand(
      clap::Command::new("serve")
        .about("Run one disposable backend in the foreground until interrupted")
        .arg(
          Arg::new("port")
            .value_name("PORT")
            .required(true)
            .value_parser(value_parser!(u16))
            .help("Listen port, 0 for an ephemeral one"),
        )
        .arg(
          Arg::new("status")
            .long("status")
            .short('s')
            .value_name("CODE")
            .default_value("200")
            .value_parser(value_parser!(u16))
            .help("Status code of every response"),
        )
        .arg(
          Arg::new("body")
            .long("body")
            .value_name("TEXT")
            .help("Body of every response"),
        )
        .arg(
          Arg::new("header")
            .long("header")
            .short('H')
            .value_name("NAME:VALUE")
            .action(ArgAction::Append)
            .help("Extra response header, repeatable"),
        ),
    )
}

fn parse_scope(matches: &ArgMatches) -> Scope {
  Scope {
    proto: matches.get_one::<String>("proto").cloned().unwrap_or_default(),
    prefix: matches.get_one::<String>("prefix").cloned(),
  }
}

fn parse_header(value: &str) -> Result<(String, String), anyhow::Error> {
  let (name, value) = value
    .split_once(':')
    .ok_or_else(|| anyhow!("Header must be given as NAME:VALUE: {value}"))?;
  let name = name.trim();
  ensure!(!name.is_empty(), "Header name must not be empty");
  Ok((name.to_string(), value.trim().to_string()))
}

fn required(matches: &ArgMatches, id: &str) -> Result<String, anyhow::Error> {
  matches
    .get_one::<String>(id)
    .cloned()
    .ok_or_else(|| anyhow!("Missing argument: {id}"))
}

/// Parse arg values passed from cli
pub fn parse_opts() -> Result<Opts, anyhow::Error> {
  parse_opts_from(std::env::args_os())
}

fn parse_opts_from<I, T>(args: I) -> Result<Opts, anyhow::Error>
where
  I: IntoIterator<Item = T>,
  T: Into<OsString> + Clone,
{
  let matches = build_command().try_get_matches_from(args).unwrap_or_else(|e| e.exit());
  let config_file_path = matches.get_one::<String>("config_file").cloned();

  let command = match matches.subcommand() {
    Some(("check", _)) => Command::Check,
    Some(("register", m)) => Command::Register {
      frontend: required(m, "frontend")?,
      backends: m.get_many::<String>("backends").into_iter().flatten().cloned().collect(),
      scope: parse_scope(m),
    },
    Some(("unregister", m)) => Command::Unregister {
      frontend: required(m, "frontend")?,
      scope: parse_scope(m),
    },
    Some(("show", m)) => Command::Show {
      frontend: required(m, "frontend")?,
      scope: parse_scope(m),
    },
    Some(("probe", m)) => Command::Probe {
      host: required(m, "host")?,
      port: m.get_one::<u16>("port").copied(),
      proto: m.get_one::<String>("proto").cloned().unwrap_or_default(),
      body: m.get_flag("body"),
    },
    Some(("serve", m)) => Command::Serve {
      port: m.get_one::<u16>("port").copied().unwrap_or_default(),
      status: m.get_one::<u16>("status").copied().unwrap_or(200),
      body: m.get_one::<String>("body").cloned(),
      headers: m
        .get_many::<String>("header")
        .into_iter()
        .flatten()
        .map(|h| parse_header(h))
        .collect::<Result<_, _>>()?,
    },
    _ => return Err(anyhow!("Unknown subcommand")),
  };

  Ok(Opts {
    config_file_path,
    command,
  })
}
