use crate::{error::*, log::*};
use std::net::SocketAddr;
use tokio::net::TcpSocket;

/// Bind TCP socket to the given `SocketAddr` with `SO_REUSEADDR`, so that a port freed by a stopped backend
/// can be bound again right away. `SO_REUSEPORT` is left off: two backends must never share a port.
pub(super) fn bind_tcp_socket(listening_on: &SocketAddr) -> HarnessResult<TcpSocket> {
  let tcp_socket = if listening_on.is_ipv6() {
    TcpSocket::new_v6()
  } else {
    TcpSocket::new_v4()
  }?;
  tcp_socket.set_reuseaddr(true)?;

  tcp_socket.bind(*listening_on).map_err(|e| {
    error!("Failed to bind TCP socket for backend on {}: {}", listening_on, e);
    HarnessError::Io(e)
  })?;

  Ok(tcp_socket)
}
