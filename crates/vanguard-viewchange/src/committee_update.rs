//! Committee rotation after a view change.

use tracing::{error, info};
use vanguard_chain::{Committee, CommitteeMember, Peer, VcBlock};
use vanguard_crypto::PubKey;

/// Rotate each faulty leader to the committee tail, matching members with
/// `matches`. The faulty pair is appended even when no member matched; an
/// unmatched leader is an inconsistent snapshot, logged at ERROR, but the
/// protocol must keep moving and heal through resync.
fn rotate_faulty_leaders<F>(vc_block: &VcBlock, committee: &mut Committee, matches: F)
where
    F: Fn(&CommitteeMember, &CommitteeMember) -> bool,
{
    for faulty in &vc_block.header.faulty_leaders {
        match committee.position(|member| matches(member, faulty)) {
            Some(index) => {
                committee.remove(index);
            }
            None => {
                error!(
                    faulty_leader = %faulty.pub_key,
                    endpoint = %faulty.peer,
                    "Fatal: cannot find the DS leader to rotate out"
                );
            }
        }
        committee.push_back(*faulty);
    }
}

/// Apply a validated view change to the live committee.
///
/// Members are matched by key and endpoint. When the faulty leader is this
/// node, the block names it by its advertised endpoint while the committee
/// records it under the self sentinel, so that pair is matched by
/// `(self_key, 0.0.0.0)` instead. In guard mode the committee is pinned
/// and nothing moves.
pub fn update_ds_committee_after_vc(
    vc_block: &VcBlock,
    committee: &mut Committee,
    self_key: &PubKey,
    guard_mode: bool,
) {
    if guard_mode {
        info!("Guard mode: DS committee composition left unchanged");
        return;
    }

    rotate_faulty_leaders(vc_block, committee, |member, faulty| {
        if faulty.pub_key == *self_key && faulty.peer == Peer::self_sentinel() {
            member.pub_key == *self_key && member.peer.is_self_sentinel()
        } else {
            member == faulty
        }
    });
}

/// Replay a view change against a reconstructed committee during recovery.
///
/// Endpoints may have drifted across restarts, so members are matched by
/// public key only. Guard-mode behavior is identical to the live path.
pub fn update_retrieve_ds_committee_after_vc(
    vc_block: &VcBlock,
    committee: &mut Committee,
    guard_mode: bool,
) {
    if guard_mode {
        info!("Guard mode: DS committee composition left unchanged");
        return;
    }

    rotate_faulty_leaders(vc_block, committee, |member, faulty| {
        member.pub_key == faulty.pub_key
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use vanguard_chain::{BitVector, VcBlockHeader, ViewChangeState, VCBLOCK_VERSION};
    use vanguard_crypto::{sha256, CoSignature, KeyPair};

    fn committee_of(n: usize) -> Committee {
        Committee::from_members(
            (0..n)
                .map(|i| {
                    CommitteeMember::new(
                        KeyPair::generate().public,
                        Peer::new(0x0a000000 + i as u128, 33133),
                    )
                })
                .collect(),
        )
    }

    fn vc_block_evicting(faulty: Vec<CommitteeMember>) -> VcBlock {
        let header = VcBlockHeader {
            version: VCBLOCK_VERSION,
            prev_hash: sha256(b"prev"),
            vc_ds_epoch_no: 1,
            vc_epoch_no: 10,
            vc_state: ViewChangeState::FinalBlockConsensus,
            candidate_leader_peer: Peer::new(0x0a000001, 33133),
            candidate_leader_pub_key: KeyPair::generate().public,
            faulty_leaders: faulty,
            committee_hash: sha256(b"committee"),
            timestamp_micros: 0,
        };
        let sig = CoSignature {
            challenge: [0u8; 32],
            response: [0u8; 32],
        };
        VcBlock::new(header, sig, sig, BitVector::new(0), BitVector::new(0))
    }

    #[test]
    fn test_faulty_leader_rotates_to_tail() {
        let mut committee = committee_of(5);
        let old_leader = *committee.leader().unwrap();
        let next = *committee.get(1).unwrap();

        let block = vc_block_evicting(vec![old_leader]);
        let self_key = KeyPair::generate().public;
        update_ds_committee_after_vc(&block, &mut committee, &self_key, false);

        assert_eq!(committee.len(), 5);
        assert_eq!(committee.leader(), Some(&next));
        assert_eq!(committee.get(4), Some(&old_leader));
    }

    #[test]
    fn test_guard_mode_pins_committee() {
        let mut committee = committee_of(4);
        let snapshot = committee.clone();
        let block = vc_block_evicting(vec![*committee.leader().unwrap()]);

        update_ds_committee_after_vc(&block, &mut committee, &KeyPair::generate().public, true);
        assert_eq!(committee, snapshot);

        update_retrieve_ds_committee_after_vc(&block, &mut committee, true);
        assert_eq!(committee, snapshot);
    }

    #[test]
    fn test_self_matched_through_sentinel() {
        // This node is the faulty leader; its committee seat carries the
        // self sentinel rather than a routable endpoint.
        let self_kp = KeyPair::generate();
        let mut committee = committee_of(3);
        let mut members: Vec<CommitteeMember> = committee.iter().copied().collect();
        members.insert(0, CommitteeMember::new(self_kp.public, Peer::self_sentinel()));
        committee = Committee::from_members(members);
        let second = *committee.get(1).unwrap();

        let block = vc_block_evicting(vec![CommitteeMember::new(
            self_kp.public,
            Peer::self_sentinel(),
        )]);
        update_ds_committee_after_vc(&block, &mut committee, &self_kp.public, false);

        assert_eq!(committee.len(), 4);
        assert_eq!(committee.leader(), Some(&second));
        assert_eq!(committee.get(3).unwrap().pub_key, self_kp.public);
        assert_eq!(
            committee
                .iter()
                .filter(|m| m.pub_key == self_kp.public)
                .count(),
            1
        );
    }

    #[test]
    fn test_missing_member_still_appended() {
        let mut committee = committee_of(3);
        let stranger = CommitteeMember::new(KeyPair::generate().public, Peer::new(99, 99));

        let block = vc_block_evicting(vec![stranger]);
        update_ds_committee_after_vc(&block, &mut committee, &KeyPair::generate().public, false);

        // Nothing was removed, the stranger joined the tail.
        assert_eq!(committee.len(), 4);
        assert_eq!(committee.get(3), Some(&stranger));
    }

    #[test]
    fn test_retrieval_matches_despite_endpoint_drift() {
        let mut committee = committee_of(3);
        let old_leader = *committee.leader().unwrap();

        // Same key, different endpoint than the committee records.
        let drifted = CommitteeMember::new(old_leader.pub_key, Peer::new(0xdead, 1));
        let block = vc_block_evicting(vec![drifted]);
        update_retrieve_ds_committee_after_vc(&block, &mut committee, false);

        assert_eq!(committee.len(), 3);
        assert_eq!(committee.get(2), Some(&drifted));
        assert!(committee
            .iter()
            .filter(|m| m.pub_key == old_leader.pub_key)
            .count()
            == 1);
    }

    #[test]
    fn test_multiple_faulty_leaders_in_order() {
        let mut committee = committee_of(5);
        let first = *committee.get(0).unwrap();
        let second = *committee.get(1).unwrap();

        let block = vc_block_evicting(vec![first, second]);
        update_ds_committee_after_vc(&block, &mut committee, &KeyPair::generate().public, false);

        assert_eq!(committee.len(), 5);
        assert_eq!(committee.get(3), Some(&first));
        assert_eq!(committee.get(4), Some(&second));
    }
}
