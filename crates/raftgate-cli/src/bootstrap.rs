// Copyright 2025 raftgate Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Startup helpers shared by the CLI subcommands.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, Result};
use raftgate_common::protocol::KeyValues;
use raftgate_router::{RegistryConfig, RouterConfig};

/// Environment variable consulted for a node's advertised address.
pub const PUBLIC_ADDR_ENV: &str = "RAFTGATE_PUBLIC_ADDR";

/// Address a node advertises to the cluster and to the gateway.
///
/// Priority: command-line flag, then `RAFTGATE_PUBLIC_ADDR`, then the address
/// the listener actually bound.
pub fn resolve_public_addr(flag: Option<String>, env: Option<String>, bound: SocketAddr) -> String {
    flag.or(env)
        .map(|addr| addr.trim().to_string())
        .filter(|addr| !addr.is_empty())
        .unwrap_or_else(|| bound.to_string())
}

/// Parses `key=value` arguments. The first `=` separates key from value.
pub fn parse_pairs(args: &[String]) -> Result<KeyValues> {
    if args.is_empty() {
        return Err(anyhow!("at least one key=value pair is required"));
    }

    let mut pairs = KeyValues::new();
    for arg in args {
        let (key, value) = arg
            .split_once('=')
            .ok_or_else(|| anyhow!("invalid pair '{}': expected key=value", arg))?;
        if key.is_empty() {
            return Err(anyhow!("invalid pair '{}': key is empty", arg));
        }
        pairs.insert(key.to_string(), value.to_string());
    }
    Ok(pairs)
}

pub fn parse_bind(bind: &str) -> Result<SocketAddr> {
    bind.parse()
        .map_err(|e| anyhow!("Invalid bind address {}: {}", bind, e))
}

/// Router configuration from the gateway's command-line options.
pub fn router_config(
    request_timeout_ms: u64,
    deadline_ms: u64,
    follow_redirects: bool,
    failure_threshold: u32,
) -> Result<RouterConfig> {
    if request_timeout_ms == 0 || deadline_ms == 0 {
        return Err(anyhow!("timeouts must be greater than zero"));
    }
    Ok(RouterConfig {
        request_timeout: Duration::from_millis(request_timeout_ms),
        operation_deadline: Duration::from_millis(deadline_ms),
        follow_redirects,
        registry: RegistryConfig { failure_threshold },
    })
}
