//! # Socket client with reconnect.
//!
//! [`NetClient`] wraps a non-blocking TCP or UDP socket. `WouldBlock` is
//! handled with a cooperative [`sleep`] poll-loop, so socket waits never
//! block the runtime thread. Connection errors trigger one reconnect pass
//! per call, driven by a [`BackoffPolicy`] with a bounded attempt budget.
//!
//! Connection establishment itself uses the platform's blocking connect;
//! per the runtime's contract, task authors accept short blocking syscalls.

use std::io::{ErrorKind, Read, Write};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream, UdpSocket};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{RuntimeError, TaskError};
use crate::policies::BackoffPolicy;
use crate::retry::retry;
use crate::sleep::sleep;

/// Transport protocol of a [`NetClient`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Proto {
    /// Stream socket.
    Tcp,
    /// Datagram socket, `connect`ed to the peer.
    Udp,
}

impl FromStr for Proto {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Proto::Tcp),
            "udp" => Ok(Proto::Udp),
            other => Err(RuntimeError::InvalidArgument {
                reason: format!("unsupported protocol '{other}'"),
            }),
        }
    }
}

#[derive(Debug)]
enum Conn {
    Tcp(TcpStream),
    Udp(UdpSocket),
}

/// Reconnecting non-blocking socket client.
#[derive(Debug)]
pub struct NetClient {
    proto: Proto,
    addr: SocketAddr,
    conn: Option<Conn>,
    reconnect: BackoffPolicy,
    reconnect_attempts: u32,
    poll_interval: Duration,
}

impl NetClient {
    /// Creates a client for `addr`; call [`connect`](NetClient::connect)
    /// before sending.
    pub fn new(proto: Proto, addr: SocketAddr) -> Self {
        NetClient {
            proto,
            addr,
            conn: None,
            reconnect: BackoffPolicy::default(),
            reconnect_attempts: 3,
            poll_interval: Duration::from_millis(10),
        }
    }

    /// Overrides the reconnect backoff policy and attempt budget.
    pub fn with_reconnect(mut self, policy: BackoffPolicy, attempts: u32) -> Self {
        self.reconnect = policy;
        self.reconnect_attempts = attempts.max(1);
        self
    }

    /// Overrides how long the client sleeps between `WouldBlock` polls.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Whether a socket is currently established.
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Establishes the socket, retrying failures with the reconnect policy.
    pub async fn connect(&mut self) -> Result<(), TaskError> {
        let proto = self.proto;
        let addr = self.addr;
        let conn = retry(
            move || async move { connect_once(proto, addr) },
            self.reconnect_attempts,
            self.reconnect,
        )
        .await?;
        self.conn = Some(conn);
        Ok(())
    }

    /// Sends the whole buffer's prefix that the socket accepts, returning
    /// the byte count. Reconnects once on a connection error.
    pub async fn send(&mut self, buf: &[u8]) -> Result<usize, TaskError> {
        let mut reconnected = false;
        loop {
            if self.conn.is_none() {
                self.connect().await?;
            }
            let attempt = match self.conn.as_mut() {
                Some(Conn::Tcp(stream)) => stream.write(buf),
                Some(Conn::Udp(socket)) => socket.send(buf),
                None => continue,
            };
            match attempt {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    sleep(self.poll_interval).await;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    if reconnected {
                        return Err(e.into());
                    }
                    reconnected = true;
                    self.conn = None;
                }
            }
        }
    }

    /// Receives into `buf`, returning the byte count (`0` is end-of-stream
    /// for TCP). Reconnects once on a connection error.
    pub async fn recv(&mut self, buf: &mut [u8]) -> Result<usize, TaskError> {
        let mut reconnected = false;
        loop {
            if self.conn.is_none() {
                self.connect().await?;
            }
            let attempt = match self.conn.as_mut() {
                Some(Conn::Tcp(stream)) => stream.read(buf),
                Some(Conn::Udp(socket)) => socket.recv(buf),
                None => continue,
            };
            match attempt {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    sleep(self.poll_interval).await;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    if reconnected {
                        return Err(e.into());
                    }
                    reconnected = true;
                    self.conn = None;
                }
            }
        }
    }

    /// Drops the socket. The next send/recv reconnects.
    pub fn close(&mut self) {
        self.conn = None;
    }
}

fn connect_once(proto: Proto, addr: SocketAddr) -> Result<Conn, TaskError> {
    match proto {
        Proto::Tcp => {
            let stream = TcpStream::connect(addr)?;
            stream.set_nonblocking(true)?;
            Ok(Conn::Tcp(stream))
        }
        Proto::Udp => {
            let bind_addr: SocketAddr = if addr.is_ipv4() {
                (Ipv4Addr::UNSPECIFIED, 0).into()
            } else {
                (Ipv6Addr::UNSPECIFIED, 0).into()
            };
            let socket = UdpSocket::bind(bind_addr)?;
            socket.connect(addr)?;
            socket.set_nonblocking(true)?;
            Ok(Conn::Udp(socket))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_protocols() {
        assert_eq!("tcp".parse::<Proto>().unwrap(), Proto::Tcp);
        assert_eq!("UDP".parse::<Proto>().unwrap(), Proto::Udp);
        assert!("sctp".parse::<Proto>().is_err());
    }

    #[test]
    fn udp_roundtrip_over_loopback() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = server.local_addr().unwrap();

        let sent = crate::watch(async move {
            let mut client = NetClient::new(Proto::Udp, addr);
            client.connect().await?;
            client.send(b"ping").await
        })
        .unwrap();
        assert_eq!(sent, 4);

        let mut buf = [0u8; 8];
        let (got, _) = server.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..got], b"ping");
    }
}
