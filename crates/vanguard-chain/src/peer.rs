//! Network endpoints.

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use crate::{ChainError, ChainResult};

/// A peer endpoint: a 128-bit address (IPv4 addresses occupy the low 32
/// bits) and a port.
///
/// The all-zero endpoint (`0.0.0.0:0`) is a sentinel meaning "this node".
/// A committee snapshot records the local node under the sentinel so the
/// entry survives restarts where the advertised address changes; use
/// [`Peer::is_self_sentinel`] before treating an endpoint as routable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Peer {
    /// IP address, big-endian interpretation of the 16 wire bytes.
    pub ip: u128,
    /// Listening port.
    pub port: u32,
}

/// Serialized size: 16 address bytes + 4 port bytes.
pub(crate) const PEER_WIRE_SIZE: usize = 20;

impl Peer {
    /// Build an endpoint from address and port.
    pub fn new(ip: u128, port: u32) -> Self {
        Self { ip, port }
    }

    /// The `0.0.0.0:0` sentinel standing for the local node.
    pub fn self_sentinel() -> Self {
        Self { ip: 0, port: 0 }
    }

    /// Whether this endpoint is the local-node sentinel.
    pub fn is_self_sentinel(&self) -> bool {
        self.ip == 0 && self.port == 0
    }

    /// Append the wire form: 16 address bytes then port, big-endian.
    pub fn write_to(&self, buf: &mut impl BufMut) {
        buf.put_u128(self.ip);
        buf.put_u32(self.port);
    }

    /// Parse the wire form.
    pub fn read_from(buf: &mut impl Buf) -> ChainResult<Self> {
        if buf.remaining() < PEER_WIRE_SIZE {
            return Err(ChainError::Malformed("peer endpoint truncated".into()));
        }
        let ip = buf.get_u128();
        let port = buf.get_u32();
        Ok(Self { ip, port })
    }
}

impl std::fmt::Display for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.ip <= u32::MAX as u128 {
            let v4 = self.ip as u32;
            write!(
                f,
                "{}.{}.{}.{}:{}",
                (v4 >> 24) & 0xff,
                (v4 >> 16) & 0xff,
                (v4 >> 8) & 0xff,
                v4 & 0xff,
                self.port
            )
        } else {
            write!(f, "[{:032x}]:{}", self.ip, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_wire_roundtrip() {
        let peer = Peer::new(2307193356, 33133);
        let mut buf = BytesMut::new();
        peer.write_to(&mut buf);
        assert_eq!(buf.len(), PEER_WIRE_SIZE);

        let parsed = Peer::read_from(&mut buf.freeze()).unwrap();
        assert_eq!(parsed, peer);
    }

    #[test]
    fn test_truncated_rejected() {
        let mut buf = bytes::Bytes::from_static(&[0u8; 10]);
        assert!(Peer::read_from(&mut buf).is_err());
    }

    #[test]
    fn test_sentinel() {
        assert!(Peer::self_sentinel().is_self_sentinel());
        assert!(!Peer::new(1, 0).is_self_sentinel());
        assert_eq!(Peer::self_sentinel().to_string(), "0.0.0.0:0");
    }

    #[test]
    fn test_display_v4() {
        let peer = Peer::new(0x7f000001, 9030);
        assert_eq!(peer.to_string(), "127.0.0.1:9030");
    }
}
