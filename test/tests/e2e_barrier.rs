use std::{collections::BTreeMap, time::Duration};

use peerlink_peer::{PeerId, PeerlinkError, Place, Role};
use peerlink_shared::{BarrierError, BarrierTimeout, Channel, Message, RoleAssignment};
use peerlink_test::{exchange, init_logging, run_rounds, LoopbackHub, TestClock, TestPeer};

const HOST: PeerId = PeerId::new(2);
const B: PeerId = PeerId::new(9);
const C: PeerId = PeerId::new(7);

fn roles() -> BTreeMap<PeerId, Role> {
    BTreeMap::from([(HOST, Role::Lobby), (B, Role::RoleB), (C, Role::RoleA)])
}

fn session(hub: &LoopbackHub, clock: &mut TestClock) -> (TestPeer, TestPeer, TestPeer) {
    let mut a = TestPeer::join(hub, 2, "host", clock.now());
    let mut b = TestPeer::join(hub, 9, "b", clock.now());
    let mut c = TestPeer::join(hub, 7, "c", clock.now());
    exchange(&mut [&mut a, &mut b, &mut c], clock);
    (a, b, c)
}

#[test]
fn barrier_completes_when_every_peer_acks() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let (mut a, mut b, mut c) = session(&hub, &mut clock);

    let epoch = a.session.begin_transition(clock.now(), &roles()).unwrap();
    assert_eq!(epoch, 1);
    assert!(a.session.is_barrier_pending());
    assert_eq!(a.session.expected_acks(), vec![C, B]);
    assert_eq!(a.session.presence().local_record().unwrap().place, Place::Lobby);

    exchange(&mut [&mut a, &mut b, &mut c], &mut clock);

    let request = b.log.transitions[0];
    assert_eq!(request.role, Role::RoleB);
    assert_eq!(request.place, Place::RoleBArea);
    assert_eq!(c.log.transitions[0].place, Place::RoleAArea);
    assert_eq!(b.log.last_place(HOST), Some(Place::Lobby));

    assert!(b.session.complete_transition(Place::RoleBArea));
    exchange(&mut [&mut a, &mut b, &mut c], &mut clock);
    assert!(a.log.barriers_completed.is_empty());
    assert_eq!(a.session.expected_acks(), vec![C]);

    assert!(c.session.complete_transition(Place::RoleAArea));
    exchange(&mut [&mut a, &mut b, &mut c], &mut clock);

    assert_eq!(a.log.barriers_completed, vec![1]);
    assert!(!a.session.is_barrier_pending());
    assert!(a.session.expected_acks().is_empty());
    assert_eq!(a.log.last_place(B), Some(Place::RoleBArea));
    assert!(a.log.roles.contains(&(B, Role::RoleB)));

    // the deadline was cancelled with the barrier
    run_rounds(&mut [&mut a, &mut b, &mut c], &mut clock, Duration::from_secs(1), 12);
    assert!(a.log.barriers_timed_out.is_empty());
}

#[test]
fn completing_elsewhere_does_not_ack() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let (mut a, mut b, mut c) = session(&hub, &mut clock);

    a.session.begin_transition(clock.now(), &roles()).unwrap();
    exchange(&mut [&mut a, &mut b, &mut c], &mut clock);

    assert!(!b.session.complete_transition(Place::Lobby));
    exchange(&mut [&mut a, &mut b, &mut c], &mut clock);
    assert_eq!(a.session.expected_acks(), vec![C, B]);
}

#[test]
fn barrier_abandoned_at_deadline() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let (mut a, mut b, mut c) = session(&hub, &mut clock);

    a.session.begin_transition(clock.now(), &roles()).unwrap();
    exchange(&mut [&mut a, &mut b, &mut c], &mut clock);
    b.session.complete_transition(Place::RoleBArea);
    exchange(&mut [&mut a, &mut b, &mut c], &mut clock);

    run_rounds(&mut [&mut a, &mut b, &mut c], &mut clock, Duration::from_secs(1), 11);

    assert_eq!(
        a.log.barriers_timed_out,
        vec![BarrierTimeout {
            epoch: 1,
            missing: vec![C],
        }]
    );
    assert!(a.log.barriers_completed.is_empty());
    assert!(!a.session.is_barrier_pending());
    assert!(a.session.expected_acks().is_empty());

    // a late ack is stale and changes nothing
    c.session.complete_transition(Place::RoleAArea);
    exchange(&mut [&mut a, &mut b, &mut c], &mut clock);
    assert!(a.log.barriers_completed.is_empty());

    // the host may start again with a fresh epoch
    let epoch = a.session.begin_transition(clock.now(), &roles()).unwrap();
    assert_eq!(epoch, 2);
}

#[test]
fn departed_peer_no_longer_holds_the_barrier() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let (mut a, mut b, mut c) = session(&hub, &mut clock);

    a.session.begin_transition(clock.now(), &roles()).unwrap();
    exchange(&mut [&mut a, &mut b, &mut c], &mut clock);
    b.session.complete_transition(Place::RoleBArea);
    exchange(&mut [&mut a, &mut b, &mut c], &mut clock);

    hub.disconnect(C);
    exchange(&mut [&mut a, &mut b], &mut clock);

    assert_eq!(a.log.barriers_completed, vec![1]);
    assert!(a.log.leaves.contains(&C));
}

#[test]
fn barrier_targets_follow_the_roster() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let (mut a, _b, _c) = session(&hub, &mut clock);

    let partial = BTreeMap::from([(HOST, Role::Lobby), (B, Role::RoleB)]);
    match a.session.begin_transition(clock.now(), &partial) {
        Err(PeerlinkError::Barrier(BarrierError::MissingRole { peer })) => {
            assert_eq!(peer, C);
        }
        _ => panic!("Expected MissingRole error"),
    }
    assert!(!a.session.is_barrier_pending());

    // a role for someone outside the roster is not waited on
    let mut roles = roles();
    roles.insert(PeerId::new(5), Role::RoleA);
    let epoch = a.session.begin_transition(clock.now(), &roles).unwrap();
    assert_eq!(epoch, 1);
    assert_eq!(a.session.expected_acks(), vec![C, B]);
}

#[test]
fn only_the_host_begins() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let (mut a, mut b, _c) = session(&hub, &mut clock);

    let result = b.session.begin_transition(clock.now(), &roles());
    match result {
        Err(PeerlinkError::Barrier(BarrierError::NotHost { local, host })) => {
            assert_eq!(local, B);
            assert_eq!(host, Some(HOST));
        }
        _ => panic!("Expected NotHost error"),
    }

    a.session.begin_transition(clock.now(), &roles()).unwrap();
    let result = a.session.begin_transition(clock.now(), &roles());
    match result {
        Err(PeerlinkError::Barrier(BarrierError::AlreadyPending { epoch })) => {
            assert_eq!(epoch, 1);
        }
        _ => panic!("Expected AlreadyPending error"),
    }
}

#[test]
fn lone_host_completes_immediately() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let mut a = TestPeer::join(&hub, 2, "host", clock.now());

    let roles = BTreeMap::from([(HOST, Role::RoleA)]);
    a.session.begin_transition(clock.now(), &roles).unwrap();
    exchange(&mut [&mut a], &mut clock);

    assert_eq!(a.log.barriers_completed, vec![1]);
    assert_eq!(a.log.last_place(HOST), Some(Place::RoleAArea));
}

#[test]
fn repeated_assignment_is_acked_again() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let (mut a, mut b, mut c) = session(&hub, &mut clock);

    a.session.begin_transition(clock.now(), &roles()).unwrap();
    exchange(&mut [&mut a, &mut b, &mut c], &mut clock);
    b.session.complete_transition(Place::RoleBArea);
    exchange(&mut [&mut a, &mut b, &mut c], &mut clock);
    assert_eq!(hub.pending(HOST), 0);

    let assignment = RoleAssignment {
        peer: B,
        role: Role::RoleB,
        epoch: 1,
    };
    hub.inject(HOST, B, Channel::CONTROL, &assignment.serialize().unwrap());
    b.tick(clock.now());

    assert_eq!(hub.pending(HOST), 1);
    assert_eq!(b.log.transitions.len(), 1);
}

#[test]
fn assignment_from_non_host_is_ignored() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let (_a, mut b, _c) = session(&hub, &mut clock);

    let assignment = RoleAssignment {
        peer: B,
        role: Role::RoleB,
        epoch: 1,
    };
    hub.inject(C, B, Channel::CONTROL, &assignment.serialize().unwrap());
    b.tick(clock.now());

    assert!(b.log.transitions.is_empty());
    assert_eq!(hub.pending(C), 0);
}
