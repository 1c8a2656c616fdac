//! View-change blocks.
//!
//! A `VcBlock` certifies a completed view change: the candidate leader, the
//! faulty leaders being rotated out, and the committee cosignature over the
//! header. The wire layout is fixed field-for-field; all integers are
//! big-endian and variable-length fields carry a u32 length (or count)
//! prefix.

use bytes::{Buf, BufMut, Bytes};
use vanguard_crypto::{sha256, CoSignature, Hash256, PubKey, HASH_SIZE};

use crate::{BitVector, ChainError, ChainResult, CommitteeMember, Peer};

/// Protocol version tag expected in every view-change block header.
pub const VCBLOCK_VERSION: u32 = 1;

/// Sanity bound on variable-length key material.
const MAX_KEY_BYTES: usize = 1024;

/// Sanity bound on the faulty-leader list.
const MAX_FAULTY_LEADERS: usize = 4096;

/// The DS consensus sub-phase the faulty leader was in when the view change
/// fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ViewChangeState {
    /// Preparing DS-block consensus.
    DsBlockConsensusPrep = 1,
    /// Running DS-block consensus.
    DsBlockConsensus = 2,
    /// Preparing final-block consensus.
    FinalBlockConsensusPrep = 3,
    /// Running final-block consensus.
    FinalBlockConsensus = 4,
    /// Running view-change consensus itself.
    ViewChangeConsensus = 5,
}

impl ViewChangeState {
    /// Whether the view change preceded a DS block. Such blocks are applied
    /// together with that DS block by a separate path, never on their own.
    pub fn is_ds_block_state(&self) -> bool {
        matches!(
            self,
            ViewChangeState::DsBlockConsensusPrep | ViewChangeState::DsBlockConsensus
        )
    }

    /// Parse a wire discriminant.
    pub fn from_u8(value: u8) -> ChainResult<Self> {
        match value {
            1 => Ok(ViewChangeState::DsBlockConsensusPrep),
            2 => Ok(ViewChangeState::DsBlockConsensus),
            3 => Ok(ViewChangeState::FinalBlockConsensusPrep),
            4 => Ok(ViewChangeState::FinalBlockConsensus),
            5 => Ok(ViewChangeState::ViewChangeConsensus),
            other => Err(ChainError::UnknownDiscriminant {
                field: "view change state",
                value: other,
            }),
        }
    }
}

/// View-change block header. Its serialized form is what cosigners sign and
/// what the block hash commits to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcBlockHeader {
    /// Protocol version tag.
    pub version: u32,
    /// Hash of the preceding block in the link chain.
    pub prev_hash: Hash256,
    /// DS epoch in which the view change occurs.
    pub vc_ds_epoch_no: u64,
    /// Fine-grained epoch number; strictly the current epoch at acceptance.
    pub vc_epoch_no: u64,
    /// DS consensus sub-phase of the faulty leader.
    pub vc_state: ViewChangeState,
    /// Endpoint of the proposed new leader.
    pub candidate_leader_peer: Peer,
    /// Public key of the proposed new leader.
    pub candidate_leader_pub_key: PubKey,
    /// Leaders to rotate to the committee tail, in eviction order.
    pub faulty_leaders: Vec<CommitteeMember>,
    /// Hash of the committee snapshot the signers attest to.
    pub committee_hash: Hash256,
    /// Microseconds since the Unix epoch.
    pub timestamp_micros: u64,
}

impl VcBlockHeader {
    /// Append the canonical wire form.
    pub fn write_to(&self, buf: &mut impl BufMut) {
        buf.put_u32(self.version);
        buf.put_slice(self.prev_hash.as_bytes());
        buf.put_u64(self.vc_ds_epoch_no);
        buf.put_u64(self.vc_epoch_no);
        buf.put_u8(self.vc_state as u8);
        self.candidate_leader_peer.write_to(buf);
        put_varbytes(buf, self.candidate_leader_pub_key.as_bytes());
        buf.put_u32(self.faulty_leaders.len() as u32);
        for leader in &self.faulty_leaders {
            put_varbytes(buf, leader.pub_key.as_bytes());
            leader.peer.write_to(buf);
        }
        buf.put_slice(self.committee_hash.as_bytes());
        buf.put_u64(self.timestamp_micros);
    }

    /// The canonical wire form as a buffer.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(128 + self.faulty_leaders.len() * 56);
        self.write_to(&mut buf);
        buf
    }

    /// Parse the wire form.
    pub fn read_from(buf: &mut impl Buf) -> ChainResult<Self> {
        if buf.remaining() < 4 + HASH_SIZE + 8 + 8 + 1 {
            return Err(ChainError::Malformed("header truncated".into()));
        }
        let version = buf.get_u32();
        let prev_hash = get_hash(buf)?;
        let vc_ds_epoch_no = buf.get_u64();
        let vc_epoch_no = buf.get_u64();
        let vc_state = ViewChangeState::from_u8(buf.get_u8())?;
        let candidate_leader_peer = Peer::read_from(buf)?;
        let candidate_leader_pub_key = get_pub_key(buf)?;

        if buf.remaining() < 4 {
            return Err(ChainError::Malformed("faulty leader count truncated".into()));
        }
        let n_faulty = buf.get_u32() as usize;
        if n_faulty > MAX_FAULTY_LEADERS {
            return Err(ChainError::LengthOutOfBounds {
                field: "faulty leaders",
                len: n_faulty,
            });
        }
        let mut faulty_leaders = Vec::with_capacity(n_faulty);
        for _ in 0..n_faulty {
            let pub_key = get_pub_key(buf)?;
            let peer = Peer::read_from(buf)?;
            faulty_leaders.push(CommitteeMember::new(pub_key, peer));
        }

        let committee_hash = get_hash(buf)?;
        if buf.remaining() < 8 {
            return Err(ChainError::Malformed("timestamp truncated".into()));
        }
        let timestamp_micros = buf.get_u64();

        Ok(Self {
            version,
            prev_hash,
            vc_ds_epoch_no,
            vc_epoch_no,
            vc_state,
            candidate_leader_peer,
            candidate_leader_pub_key,
            faulty_leaders,
            committee_hash,
            timestamp_micros,
        })
    }

    /// The hash committing to this header: SHA-256 of its wire form.
    pub fn compute_hash(&self) -> Hash256 {
        sha256(&self.serialize())
    }
}

/// A complete view-change block: header, the two cosignature halves, and
/// the signer bitmaps for each round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcBlock {
    /// Signed header.
    pub header: VcBlockHeader,
    /// Round-one (challenge) cosignature.
    pub cs1: CoSignature,
    /// Round-two (response) cosignature; the threshold artifact verified on
    /// acceptance.
    pub cs2: CoSignature,
    /// Round-one signer bitmap.
    pub b1: BitVector,
    /// Round-two signer bitmap.
    pub b2: BitVector,
    /// Canonical identity, `SHA-256(serialize(header))`.
    pub block_hash: Hash256,
}

impl VcBlock {
    /// Assemble a block, binding the hash to the header's wire form.
    pub fn new(
        header: VcBlockHeader,
        cs1: CoSignature,
        cs2: CoSignature,
        b1: BitVector,
        b2: BitVector,
    ) -> Self {
        let block_hash = header.compute_hash();
        Self {
            header,
            cs1,
            cs2,
            b1,
            b2,
            block_hash,
        }
    }

    /// The canonical wire form.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(512);
        self.header.write_to(&mut buf);
        put_varbytes(&mut buf, &self.cs1.to_bytes());
        put_varbytes(&mut buf, &self.cs2.to_bytes());
        self.b1.write_to(&mut buf);
        self.b2.write_to(&mut buf);
        buf
    }

    /// Parse one block from `bytes[offset..]`.
    ///
    /// Data past the end of the block is ignored; peers may append suffix
    /// data that is not part of the certificate.
    pub fn deserialize(bytes: &[u8], offset: usize) -> ChainResult<Self> {
        if offset > bytes.len() {
            return Err(ChainError::Malformed("offset past end of buffer".into()));
        }
        let mut buf = Bytes::copy_from_slice(&bytes[offset..]);

        let header = VcBlockHeader::read_from(&mut buf)?;
        let cs1 = get_cosig(&mut buf)?;
        let cs2 = get_cosig(&mut buf)?;
        let b1 = BitVector::read_from(&mut buf)?;
        let b2 = BitVector::read_from(&mut buf)?;

        Ok(Self::new(header, cs1, cs2, b1, b2))
    }

    /// The message the round-two cosignature covers:
    /// `serialize(header) ‖ cs1 ‖ wire(b1)`.
    pub fn cosig_message(&self) -> Vec<u8> {
        let mut message = self.header.serialize();
        message.extend_from_slice(&self.cs1.to_bytes());
        message.extend_from_slice(&self.b1.to_wire_bytes());
        message
    }
}

fn put_varbytes(buf: &mut impl BufMut, bytes: &[u8]) {
    buf.put_u32(bytes.len() as u32);
    buf.put_slice(bytes);
}

fn get_varbytes(buf: &mut impl Buf, field: &'static str) -> ChainResult<Vec<u8>> {
    if buf.remaining() < 4 {
        return Err(ChainError::Malformed(format!("{field} length truncated")));
    }
    let len = buf.get_u32() as usize;
    if len > MAX_KEY_BYTES {
        return Err(ChainError::LengthOutOfBounds { field, len });
    }
    if buf.remaining() < len {
        return Err(ChainError::Malformed(format!("{field} body truncated")));
    }
    let mut bytes = vec![0u8; len];
    buf.copy_to_slice(&mut bytes);
    Ok(bytes)
}

fn get_pub_key(buf: &mut impl Buf) -> ChainResult<PubKey> {
    let bytes = get_varbytes(buf, "public key")?;
    PubKey::from_slice(&bytes).ok_or_else(|| ChainError::Malformed("public key size".into()))
}

fn get_cosig(buf: &mut impl Buf) -> ChainResult<CoSignature> {
    let bytes = get_varbytes(buf, "cosignature")?;
    CoSignature::from_slice(&bytes).ok_or_else(|| ChainError::Malformed("cosignature size".into()))
}

fn get_hash(buf: &mut impl Buf) -> ChainResult<Hash256> {
    if buf.remaining() < HASH_SIZE {
        return Err(ChainError::Malformed("hash truncated".into()));
    }
    let mut bytes = [0u8; HASH_SIZE];
    buf.copy_to_slice(&mut bytes);
    Ok(Hash256(bytes))
}
