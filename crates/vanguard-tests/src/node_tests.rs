//! Node wiring and recovery replay tests.

use vanguard_chain::{Committee, CommitteeMember, Peer};

use crate::{build_signed_vc_block, committee_with_keys, TestNode, VcBlockSpec};

#[test]
fn test_recovery_replay_reproduces_live_rotation() {
    let (committee, keypairs) = committee_with_keys(10);
    let test_node = TestNode::new(committee.clone(), 100, 4);

    let block = build_signed_vc_block(&VcBlockSpec {
        committee: &committee,
        keypairs: &keypairs,
        ds_epoch: 5,
        epoch: 100,
        faulty_leaders: vec![*committee.leader().unwrap()],
        timestamp_micros: None,
        signer_count: None,
    });
    test_node
        .node
        .process_vc_block(&block.serialize(), 0, Peer::new(1, 1))
        .unwrap();
    let live_committee = test_node.node.committee().lock().clone();

    // Rebuild the pre-view-change committee with drifted endpoints, as a
    // restarted node would, and replay from storage.
    let mut recovered = Committee::from_members(
        committee
            .iter()
            .enumerate()
            .map(|(i, m)| CommitteeMember::new(m.pub_key, Peer::new(0xbb00 + i as u128, 9)))
            .collect(),
    );
    let replayed = test_node.node.replay_view_changes(&mut recovered).unwrap();
    assert_eq!(replayed, 1);

    // Same key order as the live committee after rotation.
    let live_keys: Vec<_> = live_committee.iter().map(|m| m.pub_key).collect();
    let recovered_keys: Vec<_> = recovered.iter().map(|m| m.pub_key).collect();
    assert_eq!(live_keys, recovered_keys);
}

#[test]
fn test_replay_skips_non_vc_links() {
    use vanguard_chain::{BlockLink, BlockType};
    use vanguard_crypto::sha256;

    let (committee, _keypairs) = committee_with_keys(4);
    let test_node = TestNode::new(committee.clone(), 100, 4);

    // A DS link with no stored body must not disturb the replay.
    test_node
        .node
        .block_link_chain()
        .add_block_link(&BlockLink {
            index: 0,
            ds_epoch: 5,
            block_type: BlockType::Ds,
            block_hash: sha256(b"a ds block"),
        })
        .unwrap();

    let mut recovered = committee.clone();
    let replayed = test_node.node.replay_view_changes(&mut recovered).unwrap();
    assert_eq!(replayed, 0);
    assert_eq!(recovered, committee);
}

#[test]
fn test_replay_tolerates_missing_body() {
    use vanguard_chain::{BlockLink, BlockType};
    use vanguard_crypto::sha256;

    let (committee, _keypairs) = committee_with_keys(4);
    let test_node = TestNode::new(committee.clone(), 100, 4);

    // A VC link whose body never landed: the documented dangling-link
    // state after a failed body write.
    test_node
        .node
        .block_link_chain()
        .add_block_link(&BlockLink {
            index: 0,
            ds_epoch: 5,
            block_type: BlockType::Vc,
            block_hash: sha256(b"body lost"),
        })
        .unwrap();

    let mut recovered = committee.clone();
    let replayed = test_node.node.replay_view_changes(&mut recovered).unwrap();
    assert_eq!(replayed, 0);
    assert_eq!(recovered, committee);
}

#[test]
fn test_lookup_node_accepts_without_forwarding() {
    let (committee, keypairs) = committee_with_keys(10);
    let test_node =
        TestNode::with_config_tweak(committee.clone(), 100, 4, |c| c.lookup_node_mode = true);

    let block = build_signed_vc_block(&VcBlockSpec {
        committee: &committee,
        keypairs: &keypairs,
        ds_epoch: 5,
        epoch: 100,
        faulty_leaders: vec![*committee.leader().unwrap()],
        timestamp_micros: None,
        signer_count: None,
    });

    test_node
        .node
        .process_vc_block(&block.serialize(), 0, Peer::new(1, 1))
        .unwrap();
    assert_eq!(test_node.node.block_link_chain().latest_index(), Some(0));
}

#[test]
fn test_difficulty_retarget_uses_node_config() {
    let (committee, _keypairs) = committee_with_keys(4);
    let test_node = TestNode::new(committee, 100, 4);

    let next = vanguard_pow::calculate_new_difficulty(
        3,
        test_node.node.config().mining.min_difficulty,
        20,
        23,
        test_node.node.config().mining.expected_nodes,
        test_node.node.config().mining.difficulty_adjust_threshold,
        200,
        test_node.node.config().mining.num_blocks_per_year,
    );
    assert_eq!(next, 4);
}
