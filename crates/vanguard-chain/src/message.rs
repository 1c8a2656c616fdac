//! Gossip envelope constants.
//!
//! Peer messages open with a two-byte header: the service class and the
//! instruction within it. The payload begins at [`MESSAGE_BODY_OFFSET`].

/// Service class of a gossip message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    /// Peer-discovery service.
    PeerDiscovery = 0x00,
    /// Directory service.
    Directory = 0x01,
    /// Shard node service.
    Node = 0x02,
    /// Lookup service.
    Lookup = 0x03,
}

/// Instruction within the node service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeInstruction {
    /// DS block announcement.
    DsBlock = 0x00,
    /// Final block announcement.
    FinalBlock = 0x01,
    /// View-change block announcement.
    VcBlock = 0x02,
}

/// Offset of the payload within an envelope: one type byte plus one
/// instruction byte.
pub const MESSAGE_BODY_OFFSET: usize = 2;

/// Build a fresh envelope around a payload.
pub fn build_node_envelope(instruction: NodeInstruction, payload: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(MESSAGE_BODY_OFFSET + payload.len());
    message.push(MessageType::Node as u8);
    message.push(instruction as u8);
    message.extend_from_slice(payload);
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_layout() {
        let message = build_node_envelope(NodeInstruction::VcBlock, b"payload");
        assert_eq!(message[0], MessageType::Node as u8);
        assert_eq!(message[1], NodeInstruction::VcBlock as u8);
        assert_eq!(&message[MESSAGE_BODY_OFFSET..], b"payload");
    }
}
