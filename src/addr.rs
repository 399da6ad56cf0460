use std::ffi::CString;
use std::fmt::{self, Display};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::str::FromStr;

/// An IP address with an optional IPv6 zone (interface name or numeric scope id).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HostAddress {
    ip: IpAddr,
    zone: Option<String>,
}

impl HostAddress {
    pub const LOCALHOST: HostAddress = HostAddress {
        ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
        zone: None,
    };

    pub const LOCALHOST_IPV6: HostAddress = HostAddress {
        ip: IpAddr::V6(Ipv6Addr::LOCALHOST),
        zone: None,
    };

    pub fn new(ip: IpAddr) -> Self {
        Self { ip, zone: None }
    }

    pub fn with_zone(ip: Ipv6Addr, zone: impl Into<String>) -> Self {
        Self {
            ip: IpAddr::V6(ip),
            zone: Some(zone.into()),
        }
    }

    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    pub fn zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    pub fn is_ipv4(&self) -> bool {
        self.ip.is_ipv4()
    }

    /// Builds the socket address for `port`, resolving the zone to a scope id.
    pub fn to_socket_addr(&self, port: u16) -> SocketAddr {
        match self.ip {
            IpAddr::V4(ip) => SocketAddr::V4(SocketAddrV4::new(ip, port)),
            IpAddr::V6(ip) => {
                let scope_id = self.zone.as_deref().map_or(0, scope_id_for_zone);
                SocketAddr::V6(SocketAddrV6::new(ip, port, 0, scope_id))
            }
        }
    }
}

fn scope_id_for_zone(zone: &str) -> u32 {
    if let Ok(id) = zone.parse::<u32>() {
        return id;
    }
    let name = match CString::new(zone) {
        Ok(name) => name,
        Err(_) => return 0,
    };
    // SAFETY: `name` is a valid NUL-terminated string for the duration of the call.
    let index = unsafe { libc::if_nametoindex(name.as_ptr()) };
    if index == 0 {
        log::debug!("Unknown interface for zone {:?}", zone);
    }
    index
}

impl From<IpAddr> for HostAddress {
    fn from(ip: IpAddr) -> Self {
        Self::new(ip)
    }
}

impl From<Ipv4Addr> for HostAddress {
    fn from(ip: Ipv4Addr) -> Self {
        Self::new(IpAddr::V4(ip))
    }
}

impl From<Ipv6Addr> for HostAddress {
    fn from(ip: Ipv6Addr) -> Self {
        Self::new(IpAddr::V6(ip))
    }
}

impl FromStr for HostAddress {
    type Err = io::Error;

    fn from_str(arg: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Not an IP address: {:?}", arg),
            )
        };

        let (unbracketed, bracketed) = match arg.strip_prefix('[') {
            Some(rest) => (rest.strip_suffix(']').ok_or_else(invalid)?, true),
            None => (arg, false),
        };

        match unbracketed.split_once('%') {
            Some((ip, zone)) if !zone.is_empty() => {
                let ip = Ipv6Addr::from_str(ip).map_err(|_| invalid())?;
                Ok(Self::with_zone(ip, zone))
            }
            Some(_) => Err(invalid()),
            None => match IpAddr::from_str(unbracketed) {
                // brackets only ever enclose IPv6 literals
                Ok(IpAddr::V4(_)) if bracketed => Err(invalid()),
                Ok(ip) => Ok(Self::new(ip)),
                Err(_) => Err(invalid()),
            },
        }
    }
}

impl Display for HostAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.zone {
            Some(zone) => write!(f, "{}%{}", self.ip, zone),
            None => write!(f, "{}", self.ip),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_literals() {
        assert_eq!(
            "127.0.0.1".parse::<HostAddress>().unwrap(),
            HostAddress::LOCALHOST
        );
        assert_eq!(
            "::1".parse::<HostAddress>().unwrap(),
            HostAddress::LOCALHOST_IPV6
        );
        assert_eq!(
            "[::1]".parse::<HostAddress>().unwrap(),
            HostAddress::LOCALHOST_IPV6
        );
    }

    #[test]
    fn rejects_names_and_bad_zones() {
        assert!("example.com".parse::<HostAddress>().is_err());
        assert!("".parse::<HostAddress>().is_err());
        assert!("127.0.0.1%eth0".parse::<HostAddress>().is_err());
        assert!("fe80::1%".parse::<HostAddress>().is_err());
        assert!("[::1".parse::<HostAddress>().is_err());
    }

    #[test]
    fn brackets_only_around_ipv6() {
        assert!("[127.0.0.1]".parse::<HostAddress>().is_err());
        assert_eq!(
            "[fe80::1%7]".parse::<HostAddress>().unwrap(),
            HostAddress::with_zone(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1), "7")
        );
    }

    #[test]
    fn numeric_zone_becomes_scope_id() {
        let a = "fe80::1%7".parse::<HostAddress>().unwrap();
        assert_eq!(a.zone(), Some("7"));
        match a.to_socket_addr(80) {
            SocketAddr::V6(sa) => {
                assert_eq!(sa.scope_id(), 7);
                assert_eq!(sa.port(), 80);
            }
            other => panic!("unexpected {}", other),
        }
        assert_eq!(a.to_string(), "fe80::1%7");
    }

    #[test]
    fn unknown_interface_zone_is_scope_zero() {
        let a = HostAddress::with_zone(Ipv6Addr::LOCALHOST, "no-such-iface0");
        match a.to_socket_addr(1) {
            SocketAddr::V6(sa) => assert_eq!(sa.scope_id(), 0),
            other => panic!("unexpected {}", other),
        }
    }

    #[test]
    fn ipv4_socket_addr() {
        let a = HostAddress::from(Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(a.to_socket_addr(60001), "10.0.0.1:60001".parse().unwrap());
    }
}
