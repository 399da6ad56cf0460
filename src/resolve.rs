//! Turns a host string into an ordered list of candidate addresses.

use crate::addr::HostAddress;
use futures::future::BoxFuture;
use std::io;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

/// Asynchronous name lookup capability injected into a [`Connector`](crate::Connector).
///
/// The returned future is owned by the connector; dropping it cancels the lookup,
/// so a resolver must not rely on the future being polled to completion.
pub trait Resolve: Send + Sync {
    fn lookup(&self, host: &str) -> BoxFuture<'static, io::Result<Vec<IpAddr>>>;
}

/// Resolves names through the system resolver (`getaddrinfo`, via Tokio's blocking pool).
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemResolver;

impl Resolve for SystemResolver {
    fn lookup(&self, host: &str) -> BoxFuture<'static, io::Result<Vec<IpAddr>>> {
        let host = host.to_owned();
        Box::pin(async move {
            let addrs = tokio::net::lookup_host((host.as_str(), 0)).await?;
            let mut ips = Vec::new();
            for addr in addrs {
                if !ips.contains(&addr.ip()) {
                    ips.push(addr.ip());
                }
            }
            Ok::<_, io::Error>(ips)
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LookupId(u64);

impl LookupId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        LookupId(NEXT.fetch_add(1, Relaxed))
    }
}

/// An outstanding lookup. Dropping it cancels the lookup.
pub(crate) struct Lookup {
    pub id: LookupId,
    pub host: String,
    pub future: BoxFuture<'static, io::Result<Vec<IpAddr>>>,
}

pub(crate) enum Resolution {
    Ready(Vec<HostAddress>),
    Pending(Lookup),
}

/// Literal addresses resolve immediately; anything else goes through `resolver`.
pub(crate) fn start(resolver: &dyn Resolve, host: &str) -> Resolution {
    if let Ok(literal) = host.parse::<HostAddress>() {
        return Resolution::Ready(vec![literal]);
    }
    let lookup = Lookup {
        id: LookupId::next(),
        host: host.to_owned(),
        future: resolver.lookup(host),
    };
    log::debug!("Looking up {:?} ({:?})", lookup.host, lookup.id);
    Resolution::Pending(lookup)
}

/// Lookup failures are reported as an empty list.
pub(crate) fn finish(lookup: &Lookup, result: io::Result<Vec<IpAddr>>) -> Vec<HostAddress> {
    match result {
        Ok(ips) => {
            log::debug!("Resolved {:?} to {:?}", lookup.host, ips);
            ips.into_iter().map(HostAddress::from).collect()
        }
        Err(e) => {
            log::debug!("Lookup of {:?} failed: {}", lookup.host, e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    struct Unreachable;

    impl Resolve for Unreachable {
        fn lookup(&self, _: &str) -> BoxFuture<'static, io::Result<Vec<IpAddr>>> {
            panic!("literal addresses must not be looked up")
        }
    }

    #[test]
    fn literal_is_synchronous() {
        match start(&Unreachable, "127.0.0.1") {
            Resolution::Ready(addrs) => assert_eq!(addrs, vec![HostAddress::LOCALHOST]),
            Resolution::Pending(_) => panic!("expected synchronous resolution"),
        }
    }

    #[tokio::test]
    async fn names_go_through_resolver() {
        struct Fixed;

        impl Resolve for Fixed {
            fn lookup(&self, _: &str) -> BoxFuture<'static, io::Result<Vec<IpAddr>>> {
                Box::pin(async {
                    Ok::<_, io::Error>(vec![IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2))])
                })
            }
        }

        let lookup = match start(&Fixed, "db.internal") {
            Resolution::Pending(lookup) => lookup,
            Resolution::Ready(_) => panic!("expected a lookup"),
        };
        let Lookup { id, host, future } = lookup;
        let result = future.await;
        let lookup = Lookup {
            id,
            host,
            future: Box::pin(async { Ok::<_, io::Error>(Vec::new()) }),
        };
        assert_eq!(
            finish(&lookup, result),
            vec![HostAddress::from(Ipv4Addr::new(10, 0, 0, 2))]
        );
    }

    #[test]
    fn failed_lookup_is_empty() {
        let lookup = Lookup {
            id: LookupId::next(),
            host: "nowhere.invalid".to_owned(),
            future: Box::pin(async { Ok::<_, io::Error>(Vec::new()) }),
        };
        let err = io::Error::new(io::ErrorKind::NotFound, "no such host");
        assert!(finish(&lookup, Err(err)).is_empty());
    }

    #[test]
    fn lookup_ids_are_distinct() {
        assert_ne!(LookupId::next(), LookupId::next());
    }
}
