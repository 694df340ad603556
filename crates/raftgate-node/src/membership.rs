//! Cluster and gateway membership calls made by a node at startup.

use hyper::body::Bytes;
use hyper::StatusCode;
use raftgate_common::protocol::error::{GatewayError, Result};
use raftgate_common::protocol::{JoinRequest, ServiceJoinRequest};
use raftgate_common::transport::{BackendReply, HttpClient, HttpTransport};
use tracing::{debug, info};

/// Asks the node at `join_addr` to add this node to its cluster.
///
/// A follower answers with a redirect to the leader, which is followed once.
pub async fn join_cluster(client: &HttpClient, join_addr: &str, req: &JoinRequest) -> Result<()> {
    let url = format!("{}/join", HttpTransport::base_url(join_addr)?);
    let body = Bytes::from(serde_json::to_vec(req)?);

    let mut reply = client.post_json(&url, body.clone()).await?;
    if let Some(location) = reply.redirect_location().map(str::to_string) {
        debug!("join redirected to {}", location);
        reply = client.post_json(&location, body).await?;
    }

    check_reply(&url, &reply)?;
    info!("joined cluster via {} as {}", join_addr, req.id);
    Ok(())
}

/// Registers `service_addr` with the client gateway at `gateway_addr`.
pub async fn announce_to_gateway(client: &HttpClient, gateway_addr: &str, service_addr: &str) -> Result<()> {
    let url = format!("{}/service_join", HttpTransport::base_url(gateway_addr)?);
    let body = Bytes::from(serde_json::to_vec(&ServiceJoinRequest::new(service_addr))?);

    let reply = client.post_json(&url, body).await?;
    check_reply(&url, &reply)?;
    info!("announced {} to gateway {}", service_addr, gateway_addr);
    Ok(())
}

fn check_reply(url: &str, reply: &BackendReply) -> Result<()> {
    if reply.is_success() {
        return Ok(());
    }
    let detail = String::from_utf8_lossy(&reply.body);
    match reply.status {
        StatusCode::SERVICE_UNAVAILABLE => Err(GatewayError::Unavailable(format!("{}: {}", url, detail))),
        status if status.is_redirection() => Err(GatewayError::Redirect(
            reply.location.clone().unwrap_or_else(|| url.to_string()),
        )),
        status => Err(GatewayError::Internal(format!("{} answered {}: {}", url, status, detail))),
    }
}
