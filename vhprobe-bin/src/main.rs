#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod commands;
mod config;
mod constants;
mod error;
mod log;

use crate::{commands::run, config::parse_opts, constants::THREAD_NAME, log::*};

fn main() {
  init_logger();

  let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
  runtime_builder.enable_all();
  runtime_builder.thread_name(THREAD_NAME);
  let runtime = match runtime_builder.build() {
    Ok(runtime) => runtime,
    Err(e) => {
      error!("Failed to build runtime: {e}");
      std::process::exit(1);
    }
  };

  runtime.block_on(async {
    let parsed_opts = match parse_opts() {
      Ok(v) => v,
      Err(e) => {
        error!("Invalid arguments: {e}");
        std::process::exit(1);
      }
    };

    if let Err(e) = run(parsed_opts).await {
      error!("vhprobe exited: {e:#}");
      std::process::exit(1);
    }
  });
}
