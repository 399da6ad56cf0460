use clap::{ArgAction, Parser};
use sockconnect::HostAddress;
use std::time::Duration;

/// Connect to a host from a pre-bound local address, trying each resolved address in turn
#[derive(Parser, Debug)]
#[clap(version, about)]
pub struct Options {
    /// Logging verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Host name or IP address to connect to
    pub host: String,

    /// Port to connect to
    pub port: u16,

    /// Local address to bind to before connecting (e.g. 127.0.0.1, fe80::1%eth0)
    #[arg(short, long)]
    pub bind: Option<HostAddress>,

    /// Local port to bind to (0 picks one)
    #[arg(long, default_value_t = 0, requires = "bind")]
    pub bind_port: u16,

    /// Use a UDP socket instead of TCP
    #[arg(long)]
    pub udp: bool,

    /// Use an IPv6 socket
    #[arg(long = "ipv6", short = '6')]
    pub ipv6: bool,

    /// Per-address connect timeout, in milliseconds [default: 30000]
    #[arg(long, value_parser = millis)]
    pub timeout: Option<Duration>,

    /// Overall time to wait for a connection, in milliseconds [default: 30000]
    #[arg(long, value_parser = millis)]
    pub wait: Option<Duration>,
}

fn millis(arg: &str) -> Result<Duration, std::num::ParseIntError> {
    arg.parse().map(Duration::from_millis)
}
