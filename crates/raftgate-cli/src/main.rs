//! # raftgate CLI Entry Point
//!
//! ## Usage
//!
//! ```bash
//! # Start the client gateway
//! raftgate gateway -b 127.0.0.1:50000
//!
//! # Start a first node and announce it to the gateway
//! raftgate node --id n1 -b 127.0.0.1:51000 --gateway 127.0.0.1:50000
//!
//! # Start a second node that joins through the first
//! raftgate node --id n2 -b 127.0.0.1:51001 --raft 127.0.0.1:52001 \
//!   --join 127.0.0.1:51000 --gateway 127.0.0.1:50000
//!
//! # Key-value calls (raw output, no logging)
//! raftgate set 127.0.0.1:50000 a=1 b=2
//! raftgate get 127.0.0.1:50000 a --level consistent
//! raftgate delete 127.0.0.1:50000 a
//! ```

use anyhow::Result;
use argh::FromArgs;
use raftgate_cli::bootstrap::{parse_bind, parse_pairs, resolve_public_addr, router_config, PUBLIC_ADDR_ENV};
use raftgate_client::KvClient;
use raftgate_common::protocol::{ConsistencyLevel, JoinRequest};
use raftgate_common::transport::HttpClient;
use raftgate_node::{announce_to_gateway, join_cluster, MemoryStore, NodeConfig, NodeGateway};
use raftgate_router::{ClientGateway, RequestRouter};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(FromArgs)]
/// raftgate - HTTP gateways in front of a replicated key-value store
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Gateway(GatewayArgs),
    Node(NodeArgs),
    Get(GetArgs),
    Set(SetArgs),
    Delete(DeleteArgs),
}

/// Arguments for the client gateway.
///
/// The gateway keeps a registry of node gateways, filled from `--service` and
/// from `POST /service_join` announcements, and routes every key-value call
/// to them.
#[derive(FromArgs)]
#[argh(subcommand, name = "gateway")]
/// start the client gateway
struct GatewayArgs {
    /// address to bind the gateway's HTTP server to
    #[argh(option, short = 'b', default = "\"127.0.0.1:50000\".into()")]
    bind: String,

    /// node gateway to register at startup (repeatable)
    #[argh(option, short = 's', long = "service")]
    services: Vec<String>,

    /// timeout for each call to a node in milliseconds
    #[argh(option, long = "request-timeout-ms", default = "5000")]
    request_timeout_ms: u64,

    /// deadline for one get or set across all nodes in milliseconds
    #[argh(option, long = "deadline-ms", default = "30000")]
    deadline_ms: u64,

    /// follow a node's redirect to the leader once instead of trying the next node
    #[argh(switch, long = "follow-redirects")]
    follow_redirects: bool,

    /// consecutive failures a node may accumulate before it is removed
    #[argh(option, long = "failure-threshold", default = "5")]
    failure_threshold: u32,
}

/// Arguments for a node gateway.
///
/// The node serves the key-value API over an in-process store. Without
/// `--join` it leads its own cluster; with `--join` it follows the node it
/// joined through, unless `--leader` names another one.
#[derive(FromArgs)]
#[argh(subcommand, name = "node")]
/// start a node gateway
struct NodeArgs {
    /// node id used for cluster membership
    #[argh(option)]
    id: String,

    /// address to bind the node's HTTP server to
    #[argh(option, short = 'b', default = "\"127.0.0.1:51000\".into()")]
    bind: String,

    /// replication address announced when joining
    #[argh(option, long = "raft", default = "\"127.0.0.1:52000\".into()")]
    raft: String,

    /// existing node to join through
    #[argh(option, long = "join")]
    join: Option<String>,

    /// HTTP address of the current leader
    #[argh(option, long = "leader")]
    leader: Option<String>,

    /// client gateway to announce this node to
    #[argh(option, long = "gateway")]
    gateway: Option<String>,

    /// address to advertise instead of the bound one
    ///
    /// Falls back to RAFTGATE_PUBLIC_ADDR, then to the bound address.
    #[argh(option, long = "public-addr")]
    public_addr: Option<String>,

    /// scheme used in redirect targets
    #[argh(option, long = "redirect-scheme", default = "\"http\".into()")]
    redirect_scheme: String,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "get")]
/// read a key and print its value
struct GetArgs {
    /// gateway or node address
    #[argh(positional)]
    server_address: String,

    /// key to read
    #[argh(positional)]
    key: String,

    /// consistency level: default, stale or consistent
    #[argh(option, short = 'l', long = "level", default = "\"default\".into()")]
    level: String,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "set")]
/// write one or more key=value pairs
struct SetArgs {
    /// gateway or node address
    #[argh(positional)]
    server_address: String,

    /// pairs to write, as key=value
    #[argh(positional)]
    pairs: Vec<String>,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "delete")]
/// delete a key
struct DeleteArgs {
    /// gateway or node address
    #[argh(positional)]
    server_address: String,

    /// key to delete
    #[argh(positional)]
    key: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // Key-value calls print raw values for scripting, so they stay quiet
    if matches!(cli.command, Commands::Gateway(_) | Commands::Node(_)) {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    match cli.command {
        Commands::Gateway(args) => run_gateway(args).await,
        Commands::Node(args) => run_node(args).await,
        Commands::Get(args) => {
            let level = ConsistencyLevel::from_query(Some(&args.level));
            let value = KvClient::new(&args.server_address)?.get(&args.key, level).await?;
            println!("{}", value);
            Ok(())
        }
        Commands::Set(args) => {
            let pairs = parse_pairs(&args.pairs)?;
            KvClient::new(&args.server_address)?.set_many(&pairs).await?;
            Ok(())
        }
        Commands::Delete(args) => {
            KvClient::new(&args.server_address)?.delete(&args.key).await?;
            Ok(())
        }
    }
}

async fn run_gateway(args: GatewayArgs) -> Result<()> {
    let addr = parse_bind(&args.bind)?;
    let config = router_config(
        args.request_timeout_ms,
        args.deadline_ms,
        args.follow_redirects,
        args.failure_threshold,
    )?;

    tracing::info!("Starting raftgate client gateway on {}", addr);
    if args.services.is_empty() {
        tracing::info!("No initial services; waiting for /service_join announcements");
    } else {
        tracing::info!("Initial services: {:?}", args.services);
    }

    let router = Arc::new(RequestRouter::with_services(args.services, config));
    let gateway = ClientGateway::new(router);

    tokio::select! {
        result = gateway.run(addr) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("exiting"),
    }
    Ok(())
}

async fn run_node(args: NodeArgs) -> Result<()> {
    if args.id.trim().is_empty() {
        return Err(anyhow::anyhow!("node id is required"));
    }
    let addr = parse_bind(&args.bind)?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;

    let public_addr = resolve_public_addr(
        args.public_addr,
        std::env::var(PUBLIC_ADDR_ENV).ok(),
        listener.local_addr()?,
    );
    tracing::info!("Starting raftgate node {} advertised as {}", args.id, public_addr);

    let leader = match (&args.leader, &args.join) {
        (Some(leader), _) => leader.clone(),
        (None, Some(join)) => join.clone(),
        (None, None) => public_addr.clone(),
    };
    let store = Arc::new(MemoryStore::follower(public_addr.clone(), Some(leader)));
    if store.is_leader().await {
        tracing::info!("Node {} is the leader", args.id);
    }

    let config = NodeConfig {
        redirect_scheme: args.redirect_scheme,
    };
    let gateway = NodeGateway::new(store, config);
    let mut server = tokio::spawn(gateway.serve(listener));

    let client = HttpClient::default();
    if let Some(join_addr) = &args.join {
        let req = JoinRequest {
            http_addr: public_addr.clone(),
            raft_addr: args.raft.clone(),
            id: args.id.clone(),
        };
        join_cluster(&client, join_addr, &req)
            .await
            .map_err(|e| anyhow::anyhow!("failed to join node at {}: {}", join_addr, e))?;
    } else {
        tracing::info!("no join address set");
    }

    if let Some(gateway_addr) = &args.gateway {
        announce_to_gateway(&client, gateway_addr, &public_addr)
            .await
            .map_err(|e| anyhow::anyhow!("failed to announce to gateway {}: {}", gateway_addr, e))?;
    }

    tracing::info!("started successfully");
    tokio::select! {
        result = &mut server => result??,
        _ = tokio::signal::ctrl_c() => tracing::info!("exiting"),
    }
    Ok(())
}
