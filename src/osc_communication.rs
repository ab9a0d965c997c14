use std::net::{SocketAddrV4, UdpSocket};
use std::str::FromStr;

use rosc::encoder;
use rosc::OscPacket;

use crate::error::PlaybackError;

/*

    OSC I/O - as generic as possible.

*/

pub const BUFFER_SIZE: usize = 333072;

pub fn parse_addr(addr: &str) -> Result<SocketAddrV4, PlaybackError> {
    SocketAddrV4::from_str(addr).map_err(|e| PlaybackError::Config(format!("Invalid socket address {}: {}", addr, e)))
}

pub struct OSCClient {
    socket: UdpSocket,
    out_addr: SocketAddrV4,
}

impl OSCClient {
    pub fn new(bind_addr: &str, out_addr: &str) -> Result<OSCClient, PlaybackError> {
        let socket = UdpSocket::bind(parse_addr(bind_addr)?)?;

        Ok(OSCClient {
            socket,
            out_addr: parse_addr(out_addr)?,
        })
    }

    pub fn try_clone(&self) -> Result<OSCClient, PlaybackError> {
        Ok(OSCClient {
            socket: self.socket.try_clone()?,
            out_addr: self.out_addr,
        })
    }

    pub fn send(&self, packet: &OscPacket) -> Result<(), PlaybackError> {
        let bytes = encoder::encode(packet).map_err(|e| PlaybackError::Osc(e.to_string()))?;
        self.socket.send_to(&bytes, self.out_addr)?;
        Ok(())
    }
}

pub struct OSCPoller {
    socket: UdpSocket,
    buf: Vec<u8>,
}

impl OSCPoller {
    pub fn new(bind_addr: &str) -> Result<OSCPoller, PlaybackError> {
        let socket = UdpSocket::bind(parse_addr(bind_addr)?)?;

        // rosc::decoder::MTU is too small for large bundles
        Ok(OSCPoller {
            socket,
            buf: vec![0u8; BUFFER_SIZE],
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddrV4, PlaybackError> {
        match self.socket.local_addr()? {
            std::net::SocketAddr::V4(addr) => Ok(addr),
            other => Err(PlaybackError::Config(format!("Expected an IPv4 address, got {}", other))),
        }
    }

    // None blocks forever; with a timeout, poll() fails with an Io error of kind WouldBlock/TimedOut
    pub fn set_read_timeout(&self, timeout: Option<std::time::Duration>) -> Result<(), PlaybackError> {
        self.socket.set_read_timeout(timeout)?;
        Ok(())
    }

    // Blocks until a packet arrives
    pub fn poll(&mut self) -> Result<OscPacket, PlaybackError> {
        let (size, _) = self.socket.recv_from(&mut self.buf)?;
        let (_, packet) = rosc::decoder::decode_udp(&self.buf[..size]).map_err(|e| PlaybackError::Osc(e.to_string()))?;
        Ok(packet)
    }
}
