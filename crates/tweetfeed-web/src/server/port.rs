use super::ServeError;
use crate::prelude::*;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Scans `start..end` ascending and returns the first port that can be
/// exclusively bound on the loopback interface, or `None` when the whole
/// range is taken.
///
/// The probe listener is released before returning, so the port is only
/// known to have been free at probe time. A caller that re-binds later
/// races everything else on the machine; the serving path uses
/// [`bind_available_port`] instead, which has no such window.
pub fn find_available_port(start: u16, end: u16) -> Option<u16> {
    (start..end).find(|&port| {
        std::net::TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)).is_ok()
    })
}

/// Binds the first free port in `start..end` and keeps the listener for
/// serving.
pub(crate) async fn bind_available_port(
    host: IpAddr,
    start: u16,
    end: u16,
) -> Result<tokio::net::TcpListener, ServeError> {
    for port in start..end {
        match tokio::net::TcpListener::bind(SocketAddr::new(host, port)).await {
            Ok(listener) => return Ok(listener),
            Err(err) => debug!(port, %err, "port is taken, trying the next one"),
        }
    }

    Err(ServeError::PortUnavailable { start, end })
}
