//! Delivery of assembled packets to the modem

use anyhow::{Context, Result};
use std::io::Write;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, info};

/// Byte-stream sink accepting complete KISS packets
pub trait PacketSink {
    fn send(&mut self, packet: &[u8]) -> Result<()>;
}

impl<S: PacketSink + ?Sized> PacketSink for Box<S> {
    fn send(&mut self, packet: &[u8]) -> Result<()> {
        (**self).send(packet)
    }
}

/// KISS over TCP, one connection per packet
#[derive(Debug, Clone)]
pub struct TcpKissSink {
    addr: String,
    connect_timeout: Duration,
}

impl TcpKissSink {
    pub fn new(addr: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    fn connect(&self) -> Result<TcpStream> {
        let addrs = self
            .addr
            .to_socket_addrs()
            .with_context(|| format!("Failed to resolve KISS endpoint {}", self.addr))?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    debug!("Connect to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }

        match last_err {
            Some(e) => Err(e).with_context(|| format!("Failed to connect to {}", self.addr)),
            None => anyhow::bail!("No addresses resolved for {}", self.addr),
        }
    }
}

impl PacketSink for TcpKissSink {
    fn send(&mut self, packet: &[u8]) -> Result<()> {
        let mut stream = self.connect()?;
        stream
            .write_all(packet)
            .with_context(|| format!("Failed to write packet to {}", self.addr))?;
        stream.flush()?;
        // The modem may already have closed its side
        let _ = stream.shutdown(Shutdown::Write);

        info!("Sent {} bytes to {}", packet.len(), self.addr);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_tcp_sink_delivers_bytes() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let mut received = Vec::new();
            for _ in 0..2 {
                let (mut conn, _) = listener.accept().unwrap();
                let mut buf = Vec::new();
                conn.read_to_end(&mut buf).unwrap();
                received.push(buf);
            }
            received
        });

        let mut sink = TcpKissSink::new(addr.to_string(), Duration::from_secs(2));
        sink.send(&[0xC0, 0x00, 0x41, 0xC0]).unwrap();
        sink.send(&[0xC0, 0x00, 0x42, 0xC0]).unwrap();

        let received = server.join().unwrap();
        assert_eq!(received[0], vec![0xC0, 0x00, 0x41, 0xC0]);
        assert_eq!(received[1], vec![0xC0, 0x00, 0x42, 0xC0]);
    }

    #[test]
    fn test_tcp_sink_connection_refused() {
        // Bind then drop to get a port nobody listens on
        let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        let mut sink = TcpKissSink::new(addr.to_string(), Duration::from_millis(500));
        assert!(sink.send(&[0xC0, 0xC0]).is_err());
    }

    #[test]
    fn test_tcp_sink_bad_address() {
        let mut sink = TcpKissSink::new("not an address", Duration::from_millis(100));
        assert!(sink.send(&[0xC0, 0xC0]).is_err());
    }
}
