use std::{cell::RefCell, rc::Rc};

use peerlink_peer::{PeerId, Place, Role};
use peerlink_shared::{Channel, HandlerError, Message};
use peerlink_test::{exchange, init_logging, Emote, LoopbackHub, TestClock, TestPeer};

const A: PeerId = PeerId::new(2);
const B: PeerId = PeerId::new(9);
const C: PeerId = PeerId::new(7);

#[test]
fn place_and_ready_are_shared() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let mut a = TestPeer::join(&hub, 2, "a", clock.now());
    let mut b = TestPeer::join(&hub, 9, "b", clock.now());
    exchange(&mut [&mut a, &mut b], &mut clock);

    assert_eq!(a.log.joins, vec![B]);
    assert_eq!(b.log.joins, vec![A]);

    b.session.set_place(Place::Lobby);
    b.session.set_ready(true);
    exchange(&mut [&mut a, &mut b], &mut clock);

    assert_eq!(a.log.places, vec![(B, Place::Lobby)]);
    assert_eq!(a.log.ready, vec![(B, true)]);
    let record = a.session.presence().get(B).unwrap();
    assert_eq!(record.name, "b");
    assert_eq!(record.place, Place::Lobby);
    assert!(record.ready);

    // unchanged values are not rebroadcast
    b.session.set_ready(true);
    b.session.set_place(Place::Lobby);
    exchange(&mut [&mut a, &mut b], &mut clock);
    assert_eq!(a.log.ready.len(), 1);
    assert_eq!(a.log.places.len(), 1);
}

#[test]
fn late_joiner_is_told_where_everyone_is() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let mut a = TestPeer::join(&hub, 2, "a", clock.now());
    let mut b = TestPeer::join(&hub, 9, "b", clock.now());
    exchange(&mut [&mut a, &mut b], &mut clock);

    b.session.set_place(Place::RoleBArea);
    b.session.set_ready(true);
    exchange(&mut [&mut a, &mut b], &mut clock);

    let mut c = TestPeer::join(&hub, 7, "c", clock.now());
    exchange(&mut [&mut a, &mut b, &mut c], &mut clock);

    let mut joins = c.log.joins.clone();
    joins.sort();
    assert_eq!(joins, vec![A, B]);
    assert_eq!(c.log.last_place(B), Some(Place::RoleBArea));
    assert_eq!(c.log.ready, vec![(B, true)]);
    assert!(c.session.presence().peers_in_place(Place::RoleBArea).contains(&B));
    assert_eq!(a.log.joins, vec![B, C]);
}

#[test]
fn leaving_peer_is_forgotten() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let mut a = TestPeer::join(&hub, 2, "a", clock.now());
    let mut b = TestPeer::join(&hub, 9, "b", clock.now());
    exchange(&mut [&mut a, &mut b], &mut clock);

    hub.disconnect(B);
    exchange(&mut [&mut a], &mut clock);

    assert_eq!(a.log.leaves, vec![B]);
    assert!(!a.session.presence().contains(B));
    assert_eq!(a.session.presence().len(), 1);
}

#[test]
fn host_leaving_moves_the_host() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let mut a = TestPeer::join(&hub, 2, "a", clock.now());
    let mut b = TestPeer::join(&hub, 9, "b", clock.now());
    let mut c = TestPeer::join(&hub, 7, "c", clock.now());
    exchange(&mut [&mut a, &mut b, &mut c], &mut clock);
    assert_eq!(b.session.host(), Some(A));

    hub.disconnect(A);
    exchange(&mut [&mut b, &mut c], &mut clock);

    assert_eq!(b.session.host(), Some(C));
    assert!(c.session.is_host());
    assert!(!b.session.is_host());
}

#[test]
fn spoofed_presence_is_dropped() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let mut a = TestPeer::join(&hub, 2, "a", clock.now());
    let mut b = TestPeer::join(&hub, 9, "b", clock.now());
    exchange(&mut [&mut a, &mut b], &mut clock);

    let forged = peerlink_shared::PresenceState {
        peer: A,
        place: Place::RoleAArea,
        role: Role::RoleA,
    };
    hub.inject(B, A, Channel::CONTROL, &forged.serialize().unwrap());
    a.tick(clock.now());

    assert!(a.log.places.is_empty());
    assert_eq!(a.session.presence().local_record().unwrap().place, Place::None);
}

#[test]
fn malformed_and_unknown_packets_are_dropped() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let mut a = TestPeer::join(&hub, 2, "a", clock.now());
    let mut b = TestPeer::join(&hub, 9, "b", clock.now());
    exchange(&mut [&mut a, &mut b], &mut clock);

    hub.inject(B, A, Channel::CONTROL, &[]);
    hub.inject(B, A, Channel::CONTROL, &[0x7F, 1, 2, 3]);
    hub.inject(B, A, Channel::CONTROL, &[0x01, 0, 0]);
    b.session.set_place(Place::Lobby);
    exchange(&mut [&mut a, &mut b], &mut clock);

    // the valid packet behind the bad ones still lands
    assert_eq!(a.log.places, vec![(B, Place::Lobby)]);
    assert!(a.log.errors.is_empty());
}

#[test]
fn extension_messages_reach_their_handler() {
    init_logging();
    let hub = LoopbackHub::new();
    let mut clock = TestClock::new();
    let mut a = TestPeer::join(&hub, 2, "a", clock.now());
    let mut b = TestPeer::join(&hub, 9, "b", clock.now());

    let received = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&received);
    a.session
        .try_register_message::<Emote, _>(move |_, sender, emote| {
            if sender != emote.peer {
                return Err(HandlerError::Rejected {
                    reason: "emote for someone else".to_string(),
                });
            }
            sink.borrow_mut().push((sender, emote.code));
            Ok(())
        })
        .unwrap();

    b.session.send_to(A, &Emote { peer: B, code: 4 }).unwrap();
    b.session.send_to_all(&Emote { peer: A, code: 5 }).unwrap();
    exchange(&mut [&mut a, &mut b], &mut clock);

    assert_eq!(*received.borrow(), vec![(B, 4)]);
}
