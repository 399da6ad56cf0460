use socket2::Socket;
use std::io;
use std::net;

/// A socket object that can take over an already-connected descriptor.
pub trait AdoptSocket: Sized {
    fn adopt(socket: Socket) -> Result<Self, io::Error>;
}

impl AdoptSocket for Socket {
    fn adopt(socket: Socket) -> Result<Self, io::Error> {
        Ok(socket)
    }
}

impl AdoptSocket for net::TcpStream {
    fn adopt(socket: Socket) -> Result<Self, io::Error> {
        socket.set_nonblocking(false)?;
        let stream = net::TcpStream::from(socket);
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

impl AdoptSocket for net::UdpSocket {
    fn adopt(socket: Socket) -> Result<Self, io::Error> {
        socket.set_nonblocking(false)?;
        Ok(net::UdpSocket::from(socket))
    }
}

/// Must be called from within a Tokio runtime.
impl AdoptSocket for tokio::net::TcpStream {
    fn adopt(socket: Socket) -> Result<Self, io::Error> {
        let stream = tokio::net::TcpStream::from_std(socket.into())?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

/// Must be called from within a Tokio runtime.
impl AdoptSocket for tokio::net::UdpSocket {
    fn adopt(socket: Socket) -> Result<Self, io::Error> {
        tokio::net::UdpSocket::from_std(socket.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use socket2::{Domain, Type};
    use std::io::{Read, Write};

    #[test]
    fn adopted_tcp_stream_is_usable() {
        let listener = net::TcpListener::bind("127.0.0.1:0").unwrap();
        let socket = Socket::new(Domain::IPV4, Type::STREAM, None).unwrap();
        socket
            .connect(&listener.local_addr().unwrap().into())
            .unwrap();

        let mut stream = net::TcpStream::adopt(socket).unwrap();
        assert!(stream.nodelay().unwrap());
        let (mut peer, _) = listener.accept().unwrap();

        stream.write_all(b"ping").unwrap();
        let mut buf = [0; 4];
        peer.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");
    }

    #[tokio::test]
    async fn adopted_udp_socket_is_connected() {
        let peer = net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, None).unwrap();
        socket.set_nonblocking(true).unwrap();
        socket.connect(&peer.local_addr().unwrap().into()).unwrap();

        let udp = tokio::net::UdpSocket::adopt(socket).unwrap();
        assert_eq!(udp.peer_addr().unwrap(), peer.local_addr().unwrap());
    }
}
