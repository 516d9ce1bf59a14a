//! TXT lookup channel with bounded retry.
//!
//! The channel is the only piece of the agent that touches the network. It
//! wraps a `hickory_resolver` instance behind the [`TxtQuery`] trait so the
//! transfer and polling layers can be driven by scripted responses in tests.
//!
//! Responses are reassembled transparently: DNS may legitimately split one
//! logical string across several TXT character-strings and several answer
//! records, so the channel concatenates every character-string of every TXT
//! record, in record order, into a single buffer.

use hickory_resolver::{
    config::{NameServerConfig, ResolverConfig},
    name_server::TokioConnectionProvider,
    proto::xfer::Protocol,
    Resolver, TokioResolver,
};

/// Number of lookup attempts before a query is reported as failed.
const MAX_DNS_RETRIES: u32 = 3;

/// Delay between lookup attempts.
const DNS_RETRY_DELAY: std::time::Duration = std::time::Duration::from_millis(1000);

/// A resolver of TXT queries.
///
/// Implementations return the concatenated TXT payload for a query name, or
/// `None` when no data could be obtained. The production implementation is
/// [`DnsChannel`]; tests substitute scripted responders.
pub trait TxtQuery {
    /// Resolve `name` to its concatenated TXT strings.
    fn query(&self, name: &str) -> Option<String>;
}

impl<T: TxtQuery + ?Sized> TxtQuery for &T {
    fn query(&self, name: &str) -> Option<String> {
        (**self).query(name)
    }
}

/// Production TXT channel backed by `hickory_resolver`.
///
/// Lookups run synchronously on a dedicated tokio runtime owned by the
/// channel, mirroring the blocking call discipline of the tasking loop.
pub struct DnsChannel {
    runtime: tokio::runtime::Runtime,
    resolver: TokioResolver,
}

impl DnsChannel {
    /// Builds a channel for the given rendezvous domain.
    ///
    /// Resolver selection, in order:
    /// 1. An explicit `nameserver` override, when provided.
    /// 2. The IPv4 address the domain itself resolves to, queried directly
    ///    over UDP port 53 (the authoritative server doubles as resolver).
    /// 3. System default resolution.
    pub fn new(
        domain: &str,
        nameserver: Option<std::net::SocketAddr>,
    ) -> crate::error::Result<Self> {
        let server = nameserver.or_else(|| Self::resolve_ipv4_hint(domain));

        let resolver_config = match server {
            Some(addr) => {
                log::debug!("Using explicit DNS server {}", addr);
                let mut resolver_config = ResolverConfig::new();
                resolver_config.add_name_server(NameServerConfig::new(addr, Protocol::Udp));
                resolver_config
            }
            None => {
                log::debug!("Using system default resolution");
                ResolverConfig::default()
            }
        };

        let runtime = tokio::runtime::Runtime::new()?;
        let resolver = Resolver::builder_with_config(
            resolver_config,
            TokioConnectionProvider::default(),
        )
        .build();

        Ok(Self { runtime, resolver })
    }

    /// Resolves the rendezvous domain to an IPv4 literal usable as a direct
    /// resolver target. Returns `None` when resolution fails or yields no
    /// IPv4 address.
    fn resolve_ipv4_hint(domain: &str) -> Option<std::net::SocketAddr> {
        use std::net::ToSocketAddrs;

        (domain, 53u16)
            .to_socket_addrs()
            .ok()?
            .find(std::net::SocketAddr::is_ipv4)
    }

    /// Issues one TXT lookup and concatenates the answer.
    ///
    /// Returns `None` on resolution failure or an empty answer set.
    fn lookup_once(&self, name: &str) -> Option<String> {
        let fqdn = format!("{}.", name);

        match self.runtime.block_on(self.resolver.txt_lookup(fqdn)) {
            Ok(lookup) => {
                let mut buffer = String::new();
                for txt in lookup.iter() {
                    for part in txt.txt_data() {
                        buffer.push_str(&String::from_utf8_lossy(part));
                    }
                }

                if buffer.is_empty() {
                    None
                } else {
                    Some(buffer)
                }
            }
            Err(err) => {
                log::debug!("TXT lookup for {} failed: {}", name, err);
                None
            }
        }
    }
}

impl TxtQuery for DnsChannel {
    /// Resolve with retry: up to [`MAX_DNS_RETRIES`] attempts with a fixed
    /// inter-attempt delay. `None` only after exhausting all retries.
    fn query(&self, name: &str) -> Option<String> {
        for attempt in 1..=MAX_DNS_RETRIES {
            log::debug!("Attempt {}/{} for TXT \"{}\"", attempt, MAX_DNS_RETRIES, name);

            if let Some(response) = self.lookup_once(name) {
                log::debug!("Received TXT: {}", response);
                return Some(response);
            }

            if attempt < MAX_DNS_RETRIES {
                std::thread::sleep(DNS_RETRY_DELAY);
            }
        }

        log::debug!("No TXT for \"{}\" after {} retries", name, MAX_DNS_RETRIES);
        None
    }
}
