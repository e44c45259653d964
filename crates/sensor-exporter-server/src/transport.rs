//! TCP transport over `std::net`.
//!
//! The listener socket is non-blocking so the exporter loop can poll it once
//! per iteration. Accepted streams are switched back to blocking mode with an
//! optional read timeout. The exporter narrows that timeout before every read
//! so the whole request, not just each read, finishes within it.

use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::time::Duration;

use tracing::{debug, info};

use sensor_exporter_core::{Connection, Listener};

/// Non-blocking TCP listener.
pub struct TcpTransport {
    addr: SocketAddr,
    read_timeout: Option<Duration>,
    listener: Option<TcpListener>,
}

impl TcpTransport {
    pub fn new(addr: SocketAddr, read_timeout: Option<Duration>) -> Self {
        Self {
            addr,
            // A zero timeout is rejected by the OS; treat it as "no timeout".
            read_timeout: read_timeout.filter(|t| !t.is_zero()),
            listener: None,
        }
    }

    /// Address the listener is bound to, once started.
    ///
    /// Differs from the configured address when port 0 was requested.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }
}

impl Listener for TcpTransport {
    type Connection = TcpConnection;

    fn begin(&mut self) -> io::Result<()> {
        if self.listener.is_some() {
            return Ok(());
        }
        let listener = TcpListener::bind(self.addr)?;
        listener.set_nonblocking(true)?;
        info!("Listening on {}", listener.local_addr()?);
        self.listener = Some(listener);
        Ok(())
    }

    fn accept(&mut self) -> io::Result<Option<TcpConnection>> {
        let Some(listener) = self.listener.as_ref() else {
            return Err(io::Error::new(
                ErrorKind::NotConnected,
                "listener not started",
            ));
        };

        match listener.accept() {
            Ok((stream, peer)) => {
                stream.set_nonblocking(false)?;
                stream.set_read_timeout(self.read_timeout)?;
                debug!("Client connected: {}", peer);
                Ok(Some(TcpConnection { stream, peer }))
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// An accepted client stream.
#[derive(Debug)]
pub struct TcpConnection {
    stream: TcpStream,
    peer: SocketAddr,
}

impl TcpConnection {
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl Read for TcpConnection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for TcpConnection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl Connection for TcpConnection {
    fn close(&mut self) -> io::Result<()> {
        self.stream.flush()?;
        match self.stream.shutdown(Shutdown::Write) {
            Err(e) if e.kind() != ErrorKind::NotConnected => Err(e),
            _ => {
                debug!("Client disconnected: {}", self.peer);
                Ok(())
            }
        }
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.stream.set_read_timeout(timeout.filter(|t| !t.is_zero()))
    }
}
