use super::{response::FixedResponse, socket::bind_tcp_socket, BackendSpec};
use crate::{constants::TCP_LISTEN_BACKLOG, error::*, log::*};
use hyper::{body::Incoming, server::conn::http1, service::service_fn, Request};
use hyper_util::rt::TokioIo;
use std::{
  convert::Infallible,
  net::{IpAddr, SocketAddr},
  sync::Arc,
  thread::JoinHandle,
};
use tokio::sync::oneshot;

/// A fixed-response http server running on its own OS thread and tokio runtime,
/// so that it keeps serving regardless of what the caller's runtime is doing.
/// Dropping it stops the server.
pub struct DisposableBackend {
  /// sequence number, unique within a pool
  id: usize,
  /// bound address, with the actual port when an ephemeral one was requested
  addr: SocketAddr,
  shutdown_tx: Option<oneshot::Sender<()>>,
  join_handle: Option<JoinHandle<()>>,
}

impl DisposableBackend {
  /// Bind and start serving. Returns once the listener is bound, not when it answers requests.
  pub async fn start(id: usize, bind_ip: IpAddr, spec: &BackendSpec) -> HarnessResult<Self> {
    let response = Arc::new(FixedResponse::try_from(spec)?);
    let listening_on = SocketAddr::new(bind_ip, spec.port);
    let (ready_tx, ready_rx) = oneshot::channel::<HarnessResult<SocketAddr>>();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let join_handle = std::thread::Builder::new()
      .name(format!("vhprobe-backend-{id}"))
      .spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
          Ok(runtime) => runtime,
          Err(e) => {
            let _ = ready_tx.send(Err(e.into()));
            return;
          }
        };
        runtime.block_on(serve(listening_on, response, ready_tx, shutdown_rx));
        // dropping the runtime aborts the connections still in flight
      })?;

    let mut backend = Self {
      id,
      addr: listening_on,
      shutdown_tx: Some(shutdown_tx),
      join_handle: Some(join_handle),
    };
    match ready_rx.await {
      Ok(Ok(addr)) => {
        backend.addr = addr;
        Ok(backend)
      }
      Ok(Err(e)) => {
        backend.shutdown()?;
        Err(e)
      }
      Err(_) => {
        backend.shutdown()?;
        Err(HarnessError::BackendStartAborted)
      }
    }
  }

  pub fn id(&self) -> usize {
    self.id
  }
  pub fn addr(&self) -> SocketAddr {
    self.addr
  }
  pub fn port(&self) -> u16 {
    self.addr.port()
  }
  /// Url to register as a backend of a frontend
  pub fn url(&self) -> String {
    format!("http://{}", self.addr)
  }

  /// Forcibly terminate the server and wait for its thread to finish
  pub fn stop(mut self) -> HarnessResult<()> {
    self.shutdown()
  }

  fn shutdown(&mut self) -> HarnessResult<()> {
    if let Some(tx) = self.shutdown_tx.take() {
      let _ = tx.send(());
    }
    if let Some(join_handle) = self.join_handle.take() {
      join_handle.join().map_err(|_| HarnessError::BackendJoin(self.id))?;
      info!("Backend #{} stopped on {}", self.id, self.addr);
    }
    Ok(())
  }
}

impl Drop for DisposableBackend {
  fn drop(&mut self) {
    if let Err(e) = self.shutdown() {
      error!("{e}");
    }
  }
}

/// Accept loop of a backend, until shutdown is signaled or its sender dropped
async fn serve(
  listening_on: SocketAddr,
  response: Arc<FixedResponse>,
  ready_tx: oneshot::Sender<HarnessResult<SocketAddr>>,
  mut shutdown_rx: oneshot::Receiver<()>,
) {
  let bound = async {
    let tcp_socket = bind_tcp_socket(&listening_on)?;
    let tcp_listener = tcp_socket.listen(TCP_LISTEN_BACKLOG)?;
    let local_addr = tcp_listener.local_addr()?;
    Ok::<_, HarnessError>((tcp_listener, local_addr))
  };
  let (tcp_listener, local_addr) = match bound.await {
    Ok(v) => v,
    Err(e) => {
      let _ = ready_tx.send(Err(e));
      return;
    }
  };
  if ready_tx.send(Ok(local_addr)).is_err() {
    return;
  }

  loop {
    tokio::select! {
      accepted = tcp_listener.accept() => {
        let (stream, peer_addr) = match accepted {
          Ok(v) => v,
          Err(e) => {
            error!("Backend on {local_addr} failed to accept: {e}");
            break;
          }
        };
        let response = response.clone();
        tokio::spawn(async move {
          let service = service_fn(move |req: Request<Incoming>| {
            let res = response.respond(req.method());
            async move { Ok::<_, Infallible>(res) }
          });
          if let Err(e) = http1::Builder::new().serve_connection(TokioIo::new(stream), service).await {
            debug!("Backend on {local_addr}: connection from {peer_addr} ended with error: {e}");
          }
        });
      }
      _ = &mut shutdown_rx => {
        break;
      }
    }
  }
}
