//! Startup configuration: command-line flags with environment fallbacks.

use anyhow::{Context, bail};
use std::net::SocketAddr;
use std::time::Duration;

use crate::cluster::TransportSettings;

pub const DEFAULT_BIND: &str = "0.0.0.0:8200";

pub const ENV_BIND: &str = "FEDERATION_BIND";
pub const ENV_NODES: &str = "FEDERATION_NODES";
pub const ENV_TIMEOUT_SECS: &str = "FEDERATION_TIMEOUT_SECS";

pub const USAGE: &str = "Usage: federated-search --node <host:port> [--node <host:port> ...] \
[--nodes <a;b;c>] [--bind <addr:port>] [--timeout-secs <n>] [--connect-timeout-secs <n>] \
[--pool-size <n>]";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: SocketAddr,
    /// Backend nodes in dispatch order; the first one answers single-node lookups.
    pub nodes: Vec<String>,
    pub transport: TransportSettings,
}

impl GatewayConfig {
    pub fn from_env_and_args() -> anyhow::Result<Self> {
        Self::from_sources(std::env::args().skip(1), |key| std::env::var(key).ok())
    }

    /// Flags win over the environment. An empty node list is rejected.
    pub fn from_sources<I, F>(args: I, env: F) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = String>,
        F: Fn(&str) -> Option<String>,
    {
        let mut bind: Option<String> = None;
        let mut nodes: Vec<String> = Vec::new();
        let mut timeout_secs: Option<u64> = None;
        let mut connect_timeout_secs: Option<u64> = None;
        let mut pool_size: Option<usize> = None;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--bind" => bind = Some(flag_value(&mut args, &arg)?),
                "--node" => nodes.push(flag_value(&mut args, &arg)?),
                "--nodes" => nodes.extend(split_nodes(&flag_value(&mut args, &arg)?)),
                "--timeout-secs" => timeout_secs = Some(parse_flag(&mut args, &arg)?),
                "--connect-timeout-secs" => {
                    connect_timeout_secs = Some(parse_flag(&mut args, &arg)?)
                }
                "--pool-size" => pool_size = Some(parse_flag(&mut args, &arg)?),
                other => tracing::warn!("Ignoring unknown argument '{}'", other),
            }
        }

        let bind = bind
            .or_else(|| env(ENV_BIND))
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr: SocketAddr = bind
            .parse()
            .with_context(|| format!("invalid bind address '{}'", bind))?;

        if nodes.is_empty()
            && let Some(list) = env(ENV_NODES)
        {
            nodes = split_nodes(&list);
        }
        if nodes.is_empty() {
            bail!(
                "node list is empty: pass --node <host:port> or set {}",
                ENV_NODES
            );
        }

        if timeout_secs.is_none()
            && let Some(raw) = env(ENV_TIMEOUT_SECS)
        {
            timeout_secs = Some(
                raw.trim()
                    .parse()
                    .with_context(|| format!("invalid {} '{}'", ENV_TIMEOUT_SECS, raw))?,
            );
        }

        let defaults = TransportSettings::default();
        let transport = TransportSettings {
            request_timeout: timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            connect_timeout: connect_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            pool_max_idle_per_host: pool_size.unwrap_or(defaults.pool_max_idle_per_host),
        };

        Ok(Self {
            bind_addr,
            nodes,
            transport,
        })
    }
}

/// `a;b;c` with surrounding whitespace and empty entries dropped.
pub fn split_nodes(list: &str) -> Vec<String> {
    list.split(';')
        .map(str::trim)
        .filter(|node| !node.is_empty())
        .map(str::to_string)
        .collect()
}

fn flag_value(args: &mut impl Iterator<Item = String>, flag: &str) -> anyhow::Result<String> {
    args.next()
        .with_context(|| format!("{} requires a value", flag))
}

fn parse_flag<T>(args: &mut impl Iterator<Item = String>, flag: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = flag_value(args, flag)?;
    raw.parse()
        .with_context(|| format!("invalid value '{}' for {}", raw, flag))
}
