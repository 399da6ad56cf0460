mod opt;

use sockconnect::err::DisplayError;
use sockconnect::{
    Connector, Domain, Event, Type, DEFAULT_CONNECT_TIMEOUT, DEFAULT_WAIT_TIMEOUT,
};
use std::net::{TcpStream, UdpSocket};

#[tokio::main]
async fn main() -> Result<(), DisplayError> {
    let opt::Options {
        verbose,
        host,
        port,
        bind,
        bind_port,
        udp,
        ipv6,
        timeout,
        wait,
    } = clap::Parser::parse();

    env_logger::Builder::new()
        .filter_level(match verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        })
        .init();

    let domain = if ipv6 { Domain::IPV6 } else { Domain::IPV4 };
    let ty = if udp { Type::DGRAM } else { Type::STREAM };

    let mut connector = Connector::new();
    connector.set_connect_timeout(timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT));
    let mut events = connector.subscribe();

    connector.create_socket(domain, ty, None)?;
    if let Some(address) = &bind {
        log::info!("Binding to {} port {}", address, bind_port);
        connector.bind_to(address, bind_port)?;
    }

    log::info!("Connecting to {} port {}", host, port);
    connector.connect_to_host(&host, port);
    let result = connector
        .wait_for_connected(wait.unwrap_or(DEFAULT_WAIT_TIMEOUT))
        .await;

    while let Ok(event) = events.try_recv() {
        match event {
            Event::StateChanged(phase) => log::debug!("State: {}", phase),
            Event::HostFound => log::info!("Host found"),
            Event::Connected => log::info!("Connected"),
            Event::Disconnected => log::info!("Disconnected"),
            Event::ErrorOccurred(e) => log::warn!("Error: {}", e),
        }
    }
    result?;

    if udp {
        let socket: UdpSocket = connector.assign()?;
        log::info!("{} -> {}", socket.local_addr()?, socket.peer_addr()?);
    } else {
        let stream: TcpStream = connector.assign()?;
        log::info!("{} -> {}", stream.local_addr()?, stream.peer_addr()?);
    }

    Ok(())
}
