use std::time::Duration;

use peerlink_peer::{ObjectId, PeerId, PeerlinkError, PhysicsState};
use peerlink_shared::{ObjectError, Vec3};
use peerlink_test::{exchange, init_logging, run_rounds, LoopbackHub, TestClock, TestPeer};

const A: PeerId = PeerId::new(2);
const B: PeerId = PeerId::new(9);

fn prop() -> ObjectId {
    ObjectId::derive("props/crate_01")
}

fn holder(peer: &mut TestPeer, id: ObjectId) -> PeerId {
    let object = peer.session.object(id).unwrap();
    let mut object = object.borrow_mut();
    object.contested_mut().unwrap().holder()
}

fn pair(hub: &LoopbackHub, clock: &mut TestClock) -> (TestPeer, TestPeer) {
    let mut a = TestPeer::join(hub, 2, "a", clock.now());
    let mut b = TestPeer::join(hub, 9, "b", clock.now());
    exchange(&mut [&mut a, &mut b], clock);
    (a, b)
}

#[test]
fn racing_claims_converge_on_highest_id() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let (mut a, mut b) = pair(&hub, &mut clock);
    let _prop_a = a.session.spawn_contested(prop()).unwrap();
    let _prop_b = b.session.spawn_contested(prop()).unwrap();

    assert!(a.session.request_authority(clock.now(), prop()).unwrap());
    assert!(b.session.request_authority(clock.now(), prop()).unwrap());
    exchange(&mut [&mut a, &mut b], &mut clock);

    assert_eq!(holder(&mut a, prop()), B);
    assert_eq!(holder(&mut b, prop()), B);
    assert_eq!(a.session.owner(prop()).unwrap(), B);
    assert_eq!(a.log.authority_changes, vec![(prop(), A), (prop(), B)]);
    assert_eq!(b.log.authority_changes, vec![(prop(), B)]);
}

#[test]
fn holder_state_reaches_observers() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let (mut a, mut b) = pair(&hub, &mut clock);
    let _prop_a = a.session.spawn_contested(prop()).unwrap();
    let _prop_b = b.session.spawn_contested(prop()).unwrap();

    b.session.request_authority(clock.now(), prop()).unwrap();
    b.session
        .set_physics(
            prop(),
            PhysicsState {
                position: Vec3::new(5.0, 1.0, 0.0),
                ..PhysicsState::default()
            },
        )
        .unwrap();
    exchange(&mut [&mut a, &mut b], &mut clock);

    let object = a.session.object(prop()).unwrap();
    let state = object.borrow_mut().contested_mut().unwrap().state();
    assert!((state.position - Vec3::new(5.0, 1.0, 0.0)).length() < 1.0e-3);
}

#[test]
fn lower_id_cannot_take_over() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let (mut a, mut b) = pair(&hub, &mut clock);
    let _prop_a = a.session.spawn_contested(prop()).unwrap();
    let _prop_b = b.session.spawn_contested(prop()).unwrap();

    b.session.request_authority(clock.now(), prop()).unwrap();
    exchange(&mut [&mut a, &mut b], &mut clock);

    run_rounds(&mut [&mut a, &mut b], &mut clock, Duration::from_secs(1), 2);
    assert!(!a.session.request_authority(clock.now(), prop()).unwrap());
    exchange(&mut [&mut a, &mut b], &mut clock);
    assert_eq!(holder(&mut b, prop()), B);
}

#[test]
fn cooldown_holds_back_requests() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let (mut a, mut b) = pair(&hub, &mut clock);
    let _prop_a = a.session.spawn_contested(prop()).unwrap();
    let _prop_b = b.session.spawn_contested(prop()).unwrap();

    a.session.request_authority(clock.now(), prop()).unwrap();
    exchange(&mut [&mut a, &mut b], &mut clock);
    assert_eq!(holder(&mut b, prop()), A);

    // the handoff to A is still fresh on B
    assert!(!b.session.request_authority(clock.now(), prop()).unwrap());

    let now = clock.advance(Duration::from_millis(600));
    assert!(b.session.request_authority(now, prop()).unwrap());
    exchange(&mut [&mut a, &mut b], &mut clock);
    assert_eq!(holder(&mut a, prop()), B);
}

#[test]
fn departed_holder_releases_the_object() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let (mut a, mut b) = pair(&hub, &mut clock);
    let _prop_a = a.session.spawn_contested(prop()).unwrap();
    let _prop_b = b.session.spawn_contested(prop()).unwrap();

    b.session.request_authority(clock.now(), prop()).unwrap();
    exchange(&mut [&mut a, &mut b], &mut clock);
    assert_eq!(holder(&mut a, prop()), B);

    hub.disconnect(B);
    exchange(&mut [&mut a], &mut clock);

    assert_eq!(holder(&mut a, prop()), PeerId::UNOWNED);
    assert_eq!(a.session.owner(prop()).unwrap(), PeerId::UNOWNED);
    assert_eq!(a.log.authority_changes.last(), Some(&(prop(), PeerId::UNOWNED)));

    // free again, no cooldown applies
    assert!(a.session.request_authority(clock.now(), prop()).unwrap());
    assert_eq!(holder(&mut a, prop()), A);
}

#[test]
fn unknown_object_is_adopted_from_a_request() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let (mut a, mut b) = pair(&hub, &mut clock);
    let _prop_a = a.session.spawn_contested(prop()).unwrap();

    a.session.request_authority(clock.now(), prop()).unwrap();
    exchange(&mut [&mut a, &mut b], &mut clock);

    assert_eq!(b.log.spawns, vec![prop()]);
    assert_eq!(b.log.authority_changes, vec![(prop(), A)]);
    assert_eq!(holder(&mut b, prop()), A);
}

#[test]
fn owner_driven_object_is_not_contested() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let (mut a, _b) = pair(&hub, &mut clock);
    let avatar = ObjectId::new(1);
    let _avatar = a.session.spawn_owned(avatar, A).unwrap();

    let result = a.session.request_authority(clock.now(), avatar);
    match result {
        Err(PeerlinkError::Object(ObjectError::WrongModel { id, .. })) => {
            assert_eq!(id, avatar);
        }
        _ => panic!("Expected WrongModel error"),
    }
}
