use std::net::IpAddr;

use anyhow::{Context, Result};
use tokio::net::UdpSocket;
use tracing::{info, warn};

/// Public address used only to pick the outbound interface. Nothing is sent to it.
const ROUTE_PROBE_ADDR: &str = "8.8.8.8:80";

/// Discovers the LAN address a peer should dial to reach this machine,
/// falling back to `localhost` when there is no route.
pub async fn discover_local_ip() -> String {
    match probe_local_ip().await {
        Ok(ip) => {
            info!("Discovered local IP: {}", ip);
            ip.to_string()
        }
        Err(e) => {
            warn!("Could not discover local IP, falling back to localhost: {:#}", e);
            "localhost".to_string()
        }
    }
}

/// Connecting a UDP socket only selects a route, so its local address is the
/// interface the OS would use for outbound traffic.
async fn probe_local_ip() -> Result<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .context("Failed to bind probe socket")?;
    socket
        .connect(ROUTE_PROBE_ADDR)
        .await
        .context("No route to probe address")?;
    let ip = socket
        .local_addr()
        .context("Failed to read probe socket address")?
        .ip();
    anyhow::ensure!(!ip.is_unspecified(), "probe socket has no local address");
    Ok(ip)
}
