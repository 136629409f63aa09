//! Socket I/O
//!
//! [`TcpStream`] is an [`Intercepted`] stream, so reads and writes on an
//! established connection report as `read` / `write`.

use super::io::Intercepted;
use super::{intercepted_call, symbols};
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};

pub type TcpStream = Intercepted<std::net::TcpStream>;

impl Intercepted<std::net::TcpStream> {
    /// Open a connection (reported as `connect`)
    pub fn connect<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        intercepted_call(symbols::CONNECT);
        std::net::TcpStream::connect(addr).map(Self::new)
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.get_ref().peer_addr()
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.get_ref().local_addr()
    }
}

#[derive(Debug)]
pub struct TcpListener {
    inner: std::net::TcpListener,
}

impl TcpListener {
    pub fn bind<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        intercepted_call(symbols::BIND);
        std::net::TcpListener::bind(addr).map(|inner| Self { inner })
    }

    /// Wait for an incoming connection (reported as `accept`)
    pub fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        intercepted_call(symbols::ACCEPT);
        self.inner
            .accept()
            .map(|(stream, addr)| (Intercepted::new(stream), addr))
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

#[derive(Debug)]
pub struct UdpSocket {
    inner: std::net::UdpSocket,
}

impl UdpSocket {
    pub fn bind<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        intercepted_call(symbols::BIND);
        std::net::UdpSocket::bind(addr).map(|inner| Self { inner })
    }

    pub fn send_to<A: ToSocketAddrs>(&self, buf: &[u8], addr: A) -> io::Result<usize> {
        intercepted_call(symbols::SENDTO);
        self.inner.send_to(buf, addr)
    }

    pub fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        intercepted_call(symbols::RECVFROM);
        self.inner.recv_from(buf)
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn test_tcp_echo() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4];
            stream.read_exact(&mut buf).unwrap();
            stream.write_all(&buf).unwrap();
        });

        let mut client = TcpStream::connect(addr).unwrap();
        assert_eq!(client.peer_addr().unwrap(), addr);
        client.write_all(b"ping").unwrap();
        let mut reply = [0u8; 4];
        client.read_exact(&mut reply).unwrap();
        assert_eq!(&reply, b"ping");
        server.join().unwrap();
    }

    #[test]
    fn test_udp_send_recv() {
        let a = UdpSocket::bind("127.0.0.1:0").unwrap();
        let b = UdpSocket::bind("127.0.0.1:0").unwrap();
        a.send_to(b"frame", b.local_addr().unwrap()).unwrap();

        let mut buf = [0u8; 16];
        let (n, from) = b.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"frame");
        assert_eq!(from, a.local_addr().unwrap());
    }
}
