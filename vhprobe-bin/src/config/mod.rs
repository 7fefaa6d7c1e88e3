mod parse;
mod toml;

pub use {
  parse::{parse_opts, Command, Opts, Scope},
  toml::ConfigToml,
};
