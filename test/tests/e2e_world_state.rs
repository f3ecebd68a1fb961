use std::time::Duration;

use peerlink_peer::{PeerId, PeerlinkError, Place, SessionConfig, SharedRecord};
use peerlink_shared::{AuthorityError, RosterMember};
use peerlink_test::{exchange, init_logging, run_rounds, LoopbackHub, TestClock, TestPeer};

const PUBLISH_WAIT: Duration = Duration::from_millis(150);

#[test]
fn late_joiner_sees_the_same_changes_once() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let mut a = TestPeer::join(&hub, 2, "a", clock.now());
    let mut b = TestPeer::join(&hub, 9, "b", clock.now());

    assert!(a.session.is_world_authority());
    assert!(!b.session.is_world_authority());

    // initial publish carries the default state and changes nothing on b
    exchange(&mut [&mut a, &mut b], &mut clock);
    assert!(b.log.scalars.is_empty());

    clock.advance(PUBLISH_WAIT);
    a.session.set_world_scalar(40.0).unwrap();
    a.session.set_world_flag(3, true).unwrap();
    exchange(&mut [&mut a, &mut b], &mut clock);

    assert_eq!(b.log.scalars, vec![40.0]);
    assert_eq!(b.log.flags_raised, vec![3]);
    assert!(b.log.flags_cleared.is_empty());

    let mut c = TestPeer::join(&hub, 7, "c", clock.now());
    // joining already started the pull
    assert!(!c.session.request_snapshot(clock.now()));
    exchange(&mut [&mut a, &mut b, &mut c], &mut clock);
    run_rounds(&mut [&mut a, &mut b, &mut c], &mut clock, PUBLISH_WAIT, 4);

    assert_eq!(c.session.world().scalar(), 40.0);
    assert!(c.session.world().flag(3));
    assert_eq!(c.log.scalars, vec![40.0]);
    assert_eq!(c.log.flags_raised, vec![3]);
    assert_eq!(c.log.snapshots_applied, vec![PeerId::new(2)]);
    assert!(!c.session.is_snapshot_pending());

    // b answered nothing and saw nothing new
    assert_eq!(b.log.scalars, vec![40.0]);
    assert_eq!(b.log.flags_raised, vec![3]);
}

#[test]
fn snapshot_carries_records() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let mut a = TestPeer::join(&hub, 2, "a", clock.now());

    let record = SharedRecord::try_new(1, vec![0xAB, 0xCD]).unwrap();
    a.session.set_world_record(11, record.clone()).unwrap();
    a.session
        .set_world_record(12, SharedRecord::from_state(4))
        .unwrap();
    exchange(&mut [&mut a], &mut clock);

    let mut b = TestPeer::join(&hub, 9, "b", clock.now());
    assert!(b.session.is_snapshot_pending());
    exchange(&mut [&mut a, &mut b], &mut clock);

    let mut records = b.log.records.clone();
    records.sort_unstable();
    assert_eq!(records, vec![11, 12]);
    assert_eq!(b.session.world().record(11), Some(&record));
    assert_eq!(b.session.world().record(12).map(SharedRecord::state), Some(4));
}

#[test]
fn non_authority_cannot_mutate() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let mut a = TestPeer::join(&hub, 2, "a", clock.now());
    let mut b = TestPeer::join(&hub, 9, "b", clock.now());

    let result = b.session.set_world_scalar(10.0);
    match result {
        Err(PeerlinkError::Authority(AuthorityError::NotAuthority { local, authority })) => {
            assert_eq!(local, PeerId::new(9));
            assert_eq!(authority, PeerId::new(2));
        }
        _ => panic!("Expected NotAuthority error"),
    }
    assert_eq!(b.session.world().scalar(), 100.0);

    run_rounds(&mut [&mut a, &mut b], &mut clock, PUBLISH_WAIT, 3);
    assert!(a.log.scalars.is_empty());
    assert_eq!(a.session.world().scalar(), 100.0);
}

#[test]
fn scalar_is_clamped() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let mut a = TestPeer::join(&hub, 2, "a", clock.now());
    let mut b = TestPeer::join(&hub, 9, "b", clock.now());

    a.session.set_world_scalar(-25.0).unwrap();
    exchange(&mut [&mut a, &mut b], &mut clock);

    assert_eq!(a.session.world().scalar(), 0.0);
    assert_eq!(b.session.world().scalar(), 0.0);
    assert_eq!(b.log.scalars, vec![0.0]);
}

#[test]
fn lower_id_joiner_pulls_the_world_before_taking_over() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let mut a = TestPeer::join(&hub, 2, "a", clock.now());
    let mut b = TestPeer::join(&hub, 9, "b", clock.now());
    exchange(&mut [&mut a, &mut b], &mut clock);

    clock.advance(PUBLISH_WAIT);
    a.session.set_world_scalar(40.0).unwrap();
    a.session.set_world_flag(3, true).unwrap();
    exchange(&mut [&mut a, &mut b], &mut clock);
    assert_eq!(b.log.scalars, vec![40.0]);

    let mut d = TestPeer::join(&hub, 1, "d", clock.now());
    assert!(d.session.is_world_authority());
    assert!(!d.session.is_reconciled());
    match d.session.set_world_scalar(5.0) {
        Err(PeerlinkError::Authority(AuthorityError::Unreconciled { local })) => {
            assert_eq!(local, PeerId::new(1));
        }
        _ => panic!("Expected Unreconciled error"),
    }

    exchange(&mut [&mut a, &mut b, &mut d], &mut clock);
    run_rounds(&mut [&mut a, &mut b, &mut d], &mut clock, PUBLISH_WAIT, 3);

    // the previous authority served the snapshot and nobody lost state
    assert_eq!(d.log.snapshots_applied, vec![PeerId::new(2)]);
    assert_eq!(d.log.scalars, vec![40.0]);
    assert_eq!(d.log.flags_raised, vec![3]);
    assert!(d.session.is_reconciled());
    for peer in [&a, &b, &d] {
        assert_eq!(peer.session.world().scalar(), 40.0);
        assert!(peer.session.world().flag(3));
        assert_eq!(peer.session.elected_authority(), Some(PeerId::new(1)));
    }
    assert_eq!(b.log.scalars, vec![40.0]);
    assert!(b.log.flags_cleared.is_empty());

    // now reconciled, the new authority drives the world
    d.session.set_world_scalar(60.0).unwrap();
    run_rounds(&mut [&mut a, &mut b, &mut d], &mut clock, PUBLISH_WAIT, 2);
    assert_eq!(b.log.scalars, vec![40.0, 60.0]);
    assert_eq!(a.session.world().scalar(), 60.0);
}

#[test]
fn authority_moves_to_next_lowest_id() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let mut a = TestPeer::join(&hub, 2, "a", clock.now());
    let mut b = TestPeer::join(&hub, 9, "b", clock.now());
    let mut c = TestPeer::join(&hub, 7, "c", clock.now());
    exchange(&mut [&mut a, &mut b, &mut c], &mut clock);

    assert_eq!(c.session.elected_authority(), Some(PeerId::new(2)));

    hub.disconnect(PeerId::new(2));
    exchange(&mut [&mut b, &mut c], &mut clock);

    assert_eq!(b.session.elected_authority(), Some(PeerId::new(7)));
    assert!(c.session.is_world_authority());
    assert_eq!(c.log.elected.last(), Some(&Some(PeerId::new(7))));
    assert_eq!(b.log.leaves, vec![PeerId::new(2)]);

    // the new authority publishes its copy
    clock.advance(PUBLISH_WAIT);
    c.session.set_world_flag(0, true).unwrap();
    exchange(&mut [&mut b, &mut c], &mut clock);
    assert_eq!(b.log.flags_raised, vec![0]);
}

#[test]
fn recipient_filter_limits_publishing() {
    init_logging();
    let config = SessionConfig {
        world_recipient_place: Some(Place::RoleAArea),
        ..SessionConfig::default()
    };
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let mut a = TestPeer::join_with(&hub, 2, "a", config.clone(), clock.now());
    let mut b = TestPeer::join_with(&hub, 9, "b", config, clock.now());

    b.session.set_place(Place::Lobby);
    exchange(&mut [&mut a, &mut b], &mut clock);

    a.session.set_world_scalar(55.0).unwrap();
    run_rounds(&mut [&mut a, &mut b], &mut clock, PUBLISH_WAIT, 3);
    assert!(b.log.scalars.is_empty());
    assert_eq!(b.session.world().scalar(), 100.0);

    // entering the filtered place triggers a publish
    b.session.set_place(Place::RoleAArea);
    run_rounds(&mut [&mut b, &mut a], &mut clock, PUBLISH_WAIT, 3);
    assert_eq!(b.log.scalars, vec![55.0]);
}

#[test]
fn unanswered_snapshot_gives_up() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    // a roster member with no session behind it never answers
    let _silent = hub.connect(RosterMember::new(1u64, "silent"));
    let mut b = TestPeer::join(&hub, 9, "b", clock.now());
    assert_eq!(b.session.elected_authority(), Some(PeerId::new(1)));

    assert!(b.session.is_snapshot_pending());
    assert!(!b.session.is_reconciled());
    run_rounds(&mut [&mut b], &mut clock, Duration::from_millis(500), 16);

    assert_eq!(b.log.snapshots_failed, vec![3]);
    assert!(!b.session.is_snapshot_pending());
    assert!(b.session.is_reconciled());
    assert_eq!(hub.pending(PeerId::new(1)), 3);
}
