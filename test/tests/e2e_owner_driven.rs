use std::time::Duration;

use peerlink_peer::{ObjectId, PeerId, PeerlinkError, Transform};
use peerlink_shared::{Channel, Message, ObjectError, OwnerAssign, Quat, Vec3};
use peerlink_test::{exchange, init_logging, run_rounds, LoopbackHub, TestClock, TestPeer};

const A: PeerId = PeerId::new(2);
const B: PeerId = PeerId::new(9);

fn avatar() -> ObjectId {
    ObjectId::new(100)
}

fn observed(peer: &mut TestPeer, id: ObjectId) -> (Transform, bool) {
    let object = peer.session.object(id).unwrap();
    let mut object = object.borrow_mut();
    let sync = object.owner_driven_mut().unwrap();
    (sync.transform(), sync.has_sample())
}

fn pair(hub: &LoopbackHub, clock: &mut TestClock) -> (TestPeer, TestPeer) {
    let mut a = TestPeer::join(hub, 2, "a", clock.now());
    let mut b = TestPeer::join(hub, 9, "b", clock.now());
    exchange(&mut [&mut a, &mut b], clock);
    (a, b)
}

#[test]
fn observer_adopts_and_follows_the_owner() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let (mut a, mut b) = pair(&hub, &mut clock);

    let _avatar = a.session.spawn_owned(avatar(), A).unwrap();
    a.session
        .set_transform(
            avatar(),
            Transform {
                position: Vec3::new(1.0, 2.0, 3.0),
                rotation: Quat::IDENTITY,
                velocity: Vec3::new(1.0, 0.0, 0.0),
            },
        )
        .unwrap();
    exchange(&mut [&mut a, &mut b], &mut clock);

    assert_eq!(b.log.spawns, vec![avatar()]);
    assert_eq!(b.session.owner(avatar()).unwrap(), A);
    let (transform, has_sample) = observed(&mut b, avatar());
    assert!(has_sample);
    assert!((transform.position - Vec3::new(1.0, 2.0, 3.0)).length() < 0.1);

    // with the owner silent the observer keeps extrapolating along the velocity
    hub.set_lossy(Channel::TRANSFORM, true);
    run_rounds(&mut [&mut a, &mut b], &mut clock, Duration::from_millis(50), 6);
    let (transform, _) = observed(&mut b, avatar());
    assert!(transform.position.x > 1.05);
    assert!(hub.dropped_count() > 0);
}

#[test]
fn observer_waits_for_a_first_sample() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let (mut a, mut b) = pair(&hub, &mut clock);

    hub.set_lossy(Channel::TRANSFORM, true);
    let _avatar = a.session.spawn_owned(avatar(), A).unwrap();
    a.session
        .set_transform(
            avatar(),
            Transform {
                position: Vec3::new(4.0, 0.0, 0.0),
                ..Transform::default()
            },
        )
        .unwrap();
    run_rounds(&mut [&mut a, &mut b], &mut clock, Duration::from_millis(50), 4);

    // the reliable spawn arrived, no sample did
    let (transform, has_sample) = observed(&mut b, avatar());
    assert!(!has_sample);
    assert_eq!(transform.position, Vec3::ZERO);
}

#[test]
fn ownership_handoff() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let (mut a, mut b) = pair(&hub, &mut clock);

    let _avatar = a.session.spawn_owned(avatar(), A).unwrap();
    exchange(&mut [&mut a, &mut b], &mut clock);

    a.session.set_owner(avatar(), B).unwrap();
    b.session
        .set_transform(
            avatar(),
            Transform {
                position: Vec3::new(0.0, 7.0, 0.0),
                ..Transform::default()
            },
        )
        .unwrap();
    exchange(&mut [&mut a, &mut b], &mut clock);

    assert_eq!(b.session.owner(avatar()).unwrap(), B);
    assert_eq!(b.log.owner_changes, vec![(avatar(), B)]);
    assert_eq!(a.log.owner_changes, vec![(avatar(), B)]);

    run_rounds(&mut [&mut a, &mut b], &mut clock, Duration::from_millis(50), 3);
    let (transform, has_sample) = observed(&mut a, avatar());
    assert!(has_sample);
    assert!((transform.position - Vec3::new(0.0, 7.0, 0.0)).length() < 0.1);
}

#[test]
fn reassignment_by_a_non_owner_is_rejected() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let (mut a, mut b) = pair(&hub, &mut clock);

    let _avatar = a.session.spawn_owned(avatar(), A).unwrap();
    exchange(&mut [&mut a, &mut b], &mut clock);

    match b.session.set_owner(avatar(), B) {
        Err(PeerlinkError::Object(ObjectError::NotOwner { id, owner })) => {
            assert_eq!(id, avatar());
            assert_eq!(owner, A);
        }
        _ => panic!("Expected NotOwner error"),
    }

    // a forged handoff straight onto the wire changes nothing
    let takeover = OwnerAssign {
        object: avatar(),
        owner: B,
    };
    hub.inject(B, A, Channel::CONTROL, &takeover.serialize().unwrap());
    a.tick(clock.now());
    assert_eq!(a.session.owner(avatar()).unwrap(), A);
    assert!(a.log.owner_changes.is_empty());

    // nor may b announce an unknown object on a's behalf
    let stray = OwnerAssign {
        object: ObjectId::new(300),
        owner: A,
    };
    hub.inject(B, A, Channel::CONTROL, &stray.serialize().unwrap());
    a.tick(clock.now());
    assert!(a.session.object(ObjectId::new(300)).is_err());
    assert!(a.log.spawns.is_empty());
}

#[test]
fn samples_from_a_non_owner_are_ignored() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let (mut a, mut b) = pair(&hub, &mut clock);

    let _avatar = a.session.spawn_owned(avatar(), A).unwrap();
    exchange(&mut [&mut a, &mut b], &mut clock);

    // b writes into its adopted copy, but only the owner sends
    b.session
        .set_transform(
            avatar(),
            Transform {
                position: Vec3::new(9.0, 9.0, 9.0),
                ..Transform::default()
            },
        )
        .unwrap();
    run_rounds(&mut [&mut a, &mut b], &mut clock, Duration::from_millis(50), 3);

    let (transform, has_sample) = observed(&mut a, avatar());
    assert!(!has_sample);
    assert_eq!(transform.position, Vec3::ZERO);
}

#[test]
fn dropped_handle_tears_the_object_down() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let (mut a, _b) = pair(&hub, &mut clock);

    let handle = a.session.spawn_owned(avatar(), A).unwrap();
    assert!(a.session.object(avatar()).is_ok());
    drop(handle);

    match a.session.object(avatar()) {
        Err(PeerlinkError::Object(ObjectError::NotFound { id })) => assert_eq!(id, avatar()),
        _ => panic!("Expected NotFound error"),
    }
}

#[test]
fn duplicate_spawn_is_rejected() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let (mut a, _b) = pair(&hub, &mut clock);

    let _avatar = a.session.spawn_owned(avatar(), A).unwrap();
    match a.session.spawn_owned(avatar(), A) {
        Err(PeerlinkError::Object(ObjectError::IdCollision { id, owner })) => {
            assert_eq!(id, avatar());
            assert_eq!(owner, A);
        }
        _ => panic!("Expected IdCollision error"),
    }

    assert!(a.session.despawn(avatar()));
    assert!(a.session.object(avatar()).is_err());
}
