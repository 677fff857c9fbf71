//! Thread-safe DNS resolution cache
//!
//! Removes resolution jitter from latency measurements: each hostname is
//! resolved once per run and every later request reuses the cached address.
//! Entries live for the whole process; a load-generation run is short-lived
//! enough that expiry would only add noise.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::RwLock;

use thiserror::Error;
use tokio::net::lookup_host;

/// DNS resolution errors
#[derive(Debug, Error)]
pub enum DnsError {
    /// The underlying lookup failed
    #[error("failed to resolve {host}: {source}")]
    Lookup {
        /// Hostname that failed to resolve
        host: String,
        /// Resolver error
        source: std::io::Error,
    },

    /// The lookup succeeded but returned no addresses
    #[error("no addresses found for {0}")]
    NoAddresses(String),
}

/// Hostname-to-address memoization shared by all workers
///
/// Reads proceed under a shared lock; a miss resolves outside any lock and
/// upgrades to an exclusive lock only for the insert. Concurrent misses for
/// the same host may each resolve redundantly; the last write wins, which is
/// preferred over blocking readers behind a slow resolution.
#[derive(Debug, Default)]
pub struct DnsCache {
    entries: RwLock<HashMap<String, String>>,
}

impl DnsCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `host[:port]` to `address[:port]`.
    ///
    /// Hosts that are already numeric address literals pass through
    /// unchanged. IPv4 results are formatted dotted; non-IPv4 results are
    /// bracket-wrapped so they remain usable as a connection-target literal.
    /// The port, if present, is reattached to the resolved address.
    pub async fn resolve(&self, target: &str) -> Result<String, DnsError> {
        let (host, port) = split_host_port(target);

        // Bracketed IPv6 literals are still literals.
        let bare = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        if bare.parse::<IpAddr>().is_ok() {
            return Ok(target.to_string());
        }

        if let Some(cached) = self.read().get(host).cloned() {
            return Ok(join_port(&cached, port));
        }

        // Miss: resolve without holding any lock so other hosts' lookups
        // (and every cache hit) proceed concurrently.
        let address = self.lookup(host).await?;
        self.write().insert(host.to_string(), address.clone());

        Ok(join_port(&address, port))
    }

    /// Insert a resolution without performing a lookup.
    pub fn prime(&self, host: impl Into<String>, address: impl Into<String>) {
        self.write().insert(host.into(), address.into());
    }

    /// Number of cached hostnames.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    async fn lookup(&self, host: &str) -> Result<String, DnsError> {
        let mut addrs = lookup_host((host, 0u16)).await.map_err(|e| DnsError::Lookup {
            host: host.to_string(),
            source: e,
        })?;

        let addr = addrs
            .next()
            .ok_or_else(|| DnsError::NoAddresses(host.to_string()))?;

        Ok(format_ip(addr.ip()))
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, String>> {
        match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, String>> {
        match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn format_ip(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => format!("[{}]", v6),
    }
}

/// Split `host[:port]`, tolerating bracketed IPv6 literals and bare IPv6
/// literals (multiple colons, no port).
fn split_host_port(target: &str) -> (&str, Option<&str>) {
    if let Some(rest) = target.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            let host = &target[..end + 2];
            let port = target[end + 2..].strip_prefix(':');
            return (host, port);
        }
    }

    match target.find(':') {
        Some(idx) if target[idx + 1..].contains(':') => (target, None),
        Some(idx) => (&target[..idx], Some(&target[idx + 1..])),
        None => (target, None),
    }
}

fn join_port(address: &str, port: Option<&str>) -> String {
    match port {
        Some(port) => format!("{}:{}", address, port),
        None => address.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_split_host_port() {
        assert_eq!(split_host_port("example.com"), ("example.com", None));
        assert_eq!(
            split_host_port("example.com:8080"),
            ("example.com", Some("8080"))
        );
        assert_eq!(split_host_port("::1"), ("::1", None));
        assert_eq!(split_host_port("[::1]:443"), ("[::1]", Some("443")));
        assert_eq!(split_host_port("[::1]"), ("[::1]", None));
    }

    #[test]
    fn test_format_ip() {
        assert_eq!(format_ip(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))), "10.0.0.1");
        assert_eq!(format_ip(IpAddr::V6(Ipv6Addr::LOCALHOST)), "[::1]");
    }

    #[tokio::test]
    async fn test_literal_addresses_pass_through() {
        let cache = DnsCache::new();

        assert_eq!(cache.resolve("127.0.0.1").await.unwrap(), "127.0.0.1");
        assert_eq!(
            cache.resolve("127.0.0.1:8080").await.unwrap(),
            "127.0.0.1:8080"
        );
        assert_eq!(cache.resolve("::1").await.unwrap(), "::1");
        assert_eq!(cache.resolve("[::1]:443").await.unwrap(), "[::1]:443");

        // Literals never populate the cache.
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_primed_entry_is_served_with_port() {
        let cache = DnsCache::new();
        cache.prime("api.internal", "10.1.2.3");

        assert_eq!(
            cache.resolve("api.internal:9000").await.unwrap(),
            "10.1.2.3:9000"
        );
        assert_eq!(cache.resolve("api.internal").await.unwrap(), "10.1.2.3");
    }

    #[tokio::test]
    async fn test_localhost_resolves_once() {
        let cache = DnsCache::new();

        let first = cache.resolve("localhost").await.unwrap();
        assert_eq!(cache.len(), 1);

        let second = cache.resolve("localhost").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_resolutions_of_distinct_hosts() {
        use std::sync::Arc;

        let cache = Arc::new(DnsCache::new());
        cache.prime("a.internal", "10.0.0.1");
        cache.prime("b.internal", "10.0.0.2");

        let a = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move { cache.resolve("a.internal:80").await.unwrap() }
        });
        let b = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move { cache.resolve("b.internal:80").await.unwrap() }
        });

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        assert_eq!(a, "10.0.0.1:80");
        assert_eq!(b, "10.0.0.2:80");
    }

    #[tokio::test]
    async fn test_same_host_resolved_twice_concurrently_converges() {
        use std::sync::Arc;

        let cache = Arc::new(DnsCache::new());

        let first = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move { cache.resolve("localhost").await.unwrap() }
        });
        let second = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move { cache.resolve("localhost").await.unwrap() }
        });

        let (first, second) = (first.await.unwrap(), second.await.unwrap());
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }
}
