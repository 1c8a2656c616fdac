//! Builders for committees, signed view-change blocks, and PoW submissions.

use std::time::{SystemTime, UNIX_EPOCH};

use vanguard_chain::{
    num_for_consensus, BitVector, Committee, CommitteeMember, Peer, VcBlock, VcBlockHeader,
    ViewChangeState, VCBLOCK_VERSION,
};
use vanguard_crypto::{
    combine_secret_keys, sha256, sign, CoSignature, KeyPair, PubKey, SecretKey,
};
use vanguard_pow::PowSubmission;

/// Microseconds since the Unix epoch.
pub fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before Unix epoch")
        .as_micros() as u64
}

/// A committee of `n` fresh members with sequential test endpoints,
/// together with their keypairs (index-aligned).
pub fn committee_with_keys(n: usize) -> (Committee, Vec<KeyPair>) {
    let keypairs: Vec<KeyPair> = (0..n).map(|_| KeyPair::generate()).collect();
    let members = keypairs
        .iter()
        .enumerate()
        .map(|(i, kp)| CommitteeMember::new(kp.public, Peer::new(0x0a00_0000 + i as u128, 33133)))
        .collect();
    (Committee::from_members(members), keypairs)
}

/// Parameters for [`build_signed_vc_block`].
pub struct VcBlockSpec<'a> {
    /// The committee the block is validated against.
    pub committee: &'a Committee,
    /// Keypairs aligned with the committee's member order.
    pub keypairs: &'a [KeyPair],
    /// DS epoch of the view change.
    pub ds_epoch: u64,
    /// Epoch of the view change.
    pub epoch: u64,
    /// Leaders rotated out, in order.
    pub faulty_leaders: Vec<CommitteeMember>,
    /// Header timestamp; defaults to now when `None`.
    pub timestamp_micros: Option<u64>,
    /// Signer count; defaults to the exact consensus threshold.
    pub signer_count: Option<usize>,
}

/// Build a view-change block whose round-two cosignature verifies against
/// the first `signer_count` committee members.
pub fn build_signed_vc_block(spec: &VcBlockSpec<'_>) -> VcBlock {
    let n = spec.committee.len();
    let candidate = spec
        .committee
        .get(1)
        .copied()
        .unwrap_or_else(|| *spec.committee.leader().expect("empty committee"));

    let header = VcBlockHeader {
        version: VCBLOCK_VERSION,
        prev_hash: sha256(b"previous block"),
        vc_ds_epoch_no: spec.ds_epoch,
        vc_epoch_no: spec.epoch,
        vc_state: ViewChangeState::FinalBlockConsensus,
        candidate_leader_peer: candidate.peer,
        candidate_leader_pub_key: candidate.pub_key,
        faulty_leaders: spec.faulty_leaders.clone(),
        committee_hash: spec.committee.snapshot_hash(),
        timestamp_micros: spec.timestamp_micros.unwrap_or_else(now_micros),
    };

    let signers = spec.signer_count.unwrap_or_else(|| num_for_consensus(n));
    let mut b1 = BitVector::new(n);
    let mut b2 = BitVector::new(n);
    for i in 0..signers.min(n) {
        b1.set(i, true);
        b2.set(i, true);
    }

    let cs1 = CoSignature {
        challenge: [0x11; 32],
        response: [0x22; 32],
    };

    let secrets: Vec<&SecretKey> = spec.keypairs[..signers.min(n)]
        .iter()
        .map(|k| &k.secret)
        .collect();
    let combined = combine_secret_keys(&secrets);
    let signing_pair = KeyPair {
        public: combined.public_key(),
        secret: combined,
    };

    let mut message = header.serialize();
    message.extend_from_slice(&cs1.to_bytes());
    message.extend_from_slice(&b1.to_wire_bytes());
    let cs2 = sign(&message, &signing_pair).expect("signing cannot fail for a valid key");

    VcBlock::new(header, cs1, cs2, b1, b2)
}

/// A PoW submission with the fixed randomness the original admission tests
/// use.
pub fn pow_submission(block_number: u64, difficulty: u8, pub_key: PubKey) -> PowSubmission {
    let mut rand1 = [0u8; 32];
    rand1[0] = b'0';
    rand1[1] = b'1';
    let mut rand2 = [0u8; 32];
    rand2[0] = b'0';
    rand2[1] = b'2';

    PowSubmission {
        block_number,
        difficulty,
        rand1,
        rand2,
        ip_addr: 2_307_193_356,
        pub_key,
        lookup_id: 0,
        gas_price: 0,
    }
}
